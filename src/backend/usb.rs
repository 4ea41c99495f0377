//! USB backend: enumerate Sony still-image devices through a host-stack
//! collaborator and open container-framed transports to them.

use crate::backend::{Backend, BackendKind, Device, DeviceInfo, DeviceKey};
use crate::error::{Error, Result};
use crate::transport::usb::{UsbPipes, UsbTransport};

pub const SONY_VENDOR_ID: u16 = 0x054C;

pub const USB_CLASS_STILL_IMAGE: u8 = 6;
pub const USB_SUBCLASS_STILL_IMAGE: u8 = 1;
pub const USB_PROTOCOL_PTP: u8 = 1;

const USB_ENDPOINT_DIR_IN: u8 = 0x80;
const USB_TRANSFER_TYPE_MASK: u8 = 0x03;
const USB_TRANSFER_TYPE_BULK: u8 = 0x02;
const USB_TRANSFER_TYPE_INTERRUPT: u8 = 0x03;

#[derive(Debug, Clone)]
pub struct UsbEndpointDesc {
    pub address: u8,
    pub attributes: u8,
}

#[derive(Debug, Clone)]
pub struct UsbInterfaceDesc {
    pub class: u8,
    pub subclass: u8,
    pub protocol: u8,
    pub endpoints: Vec<UsbEndpointDesc>,
}

/// One enumerated device as reported by the host stack.
#[derive(Debug, Clone)]
pub struct UsbDeviceDesc {
    /// Host-assigned id, stable while the device stays plugged in.
    pub id: u64,
    pub vendor_id: u16,
    pub product_id: u16,
    pub bcd_usb: u16,
    pub manufacturer: String,
    pub product: String,
    pub serial: String,
    pub interfaces: Vec<UsbInterfaceDesc>,
}

/// The endpoints of a still-image interface selected for PTP traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PtpEndpoints {
    pub bulk_in: u8,
    pub bulk_out: u8,
    pub interrupt_in: u8,
}

/// The native USB stack. Implementations wrap libusb, IOKit or similar
/// and own per-call timeouts (default 20 seconds).
pub trait UsbHost {
    fn enumerate(&mut self) -> Result<Vec<UsbDeviceDesc>>;

    /// Claim the still-image interface of the identified device and bind
    /// its pipes.
    fn open(&mut self, id: u64, endpoints: &PtpEndpoints) -> Result<Box<dyn UsbPipes>>;

    /// True when a hot-plug notification arrived since the last refresh.
    fn hotplug_pending(&self) -> bool {
        false
    }
}

/// Pick the bulk-in, bulk-out and interrupt-in endpoints of the first
/// still-image/PTP interface, if the device has one.
pub fn find_ptp_endpoints(desc: &UsbDeviceDesc) -> Option<PtpEndpoints> {
    for iface in &desc.interfaces {
        if iface.class != USB_CLASS_STILL_IMAGE
            || iface.subclass != USB_SUBCLASS_STILL_IMAGE
            || iface.protocol != USB_PROTOCOL_PTP
        {
            continue;
        }
        let mut endpoints = PtpEndpoints {
            bulk_in: 0,
            bulk_out: 0,
            interrupt_in: 0,
        };
        for ep in &iface.endpoints {
            match ep.attributes & USB_TRANSFER_TYPE_MASK {
                USB_TRANSFER_TYPE_BULK => {
                    if ep.address & USB_ENDPOINT_DIR_IN != 0 {
                        endpoints.bulk_in = ep.address;
                    } else {
                        endpoints.bulk_out = ep.address;
                    }
                }
                USB_TRANSFER_TYPE_INTERRUPT => {
                    if ep.address & USB_ENDPOINT_DIR_IN != 0 {
                        endpoints.interrupt_in = ep.address;
                    }
                }
                _ => {}
            }
        }
        if endpoints.bulk_in != 0 && endpoints.bulk_out != 0 {
            return Some(endpoints);
        }
    }
    None
}

pub struct UsbBackend<H: UsbHost> {
    host: H,
    descs: Vec<UsbDeviceDesc>,
}

impl<H: UsbHost> UsbBackend<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            descs: Vec::new(),
        }
    }
}

impl<H: UsbHost> Backend for UsbBackend<H> {
    fn kind(&self) -> BackendKind {
        BackendKind::Usb
    }

    fn refresh_list(&mut self, list: &mut Vec<DeviceInfo>) -> Result<()> {
        log::trace!("usb refresh_list");
        self.descs.clear();
        for desc in self.host.enumerate()? {
            if desc.vendor_id != SONY_VENDOR_ID {
                continue;
            }
            if find_ptp_endpoints(&desc).is_none() {
                continue;
            }
            log::info!("found device: {} ({})", desc.product, desc.manufacturer);
            list.push(DeviceInfo {
                backend: BackendKind::Usb,
                manufacturer: desc.manufacturer.clone(),
                product: desc.product.clone(),
                serial: desc.serial.clone(),
                usb_vendor_id: Some(desc.vendor_id),
                usb_product_id: Some(desc.product_id),
                usb_version: Some(desc.bcd_usb),
                host: None,
                key: DeviceKey::Usb(desc.id),
            });
            self.descs.push(desc);
        }
        Ok(())
    }

    fn needs_refresh(&self) -> bool {
        self.host.hotplug_pending()
    }

    fn release_list(&mut self) {
        self.descs.clear();
    }

    fn open_device(&mut self, info: &DeviceInfo) -> Result<Device> {
        log::trace!("usb open_device {}", info.product);
        let DeviceKey::Usb(id) = info.key else {
            return Err(Error::BackendUnavailable);
        };
        let desc = self
            .descs
            .iter()
            .find(|d| d.id == id)
            .ok_or(Error::NotSupported)?;
        let endpoints = find_ptp_endpoints(desc).ok_or(Error::NotSupported)?;
        let pipes = self.host.open(id, &endpoints)?;
        Ok(Device::new(info.clone(), Box::new(UsbTransport::new(pipes))))
    }

    fn close_device(&mut self, device: Device) {
        log::trace!("usb close_device {}", device.info.product);
        drop(device);
    }

    fn close(&mut self) {
        self.descs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn still_image_interface() -> UsbInterfaceDesc {
        UsbInterfaceDesc {
            class: 6,
            subclass: 1,
            protocol: 1,
            endpoints: vec![
                UsbEndpointDesc {
                    address: 0x81,
                    attributes: 0x02,
                },
                UsbEndpointDesc {
                    address: 0x02,
                    attributes: 0x02,
                },
                UsbEndpointDesc {
                    address: 0x83,
                    attributes: 0x03,
                },
            ],
        }
    }

    fn camera(id: u64, vendor_id: u16) -> UsbDeviceDesc {
        UsbDeviceDesc {
            id,
            vendor_id,
            product_id: 0x0D9F,
            bcd_usb: 0x0320,
            manufacturer: "Sony".into(),
            product: "ILCE-7M4".into(),
            serial: "00001".into(),
            interfaces: vec![still_image_interface()],
        }
    }

    struct StubHost {
        devices: Vec<UsbDeviceDesc>,
        hotplug: bool,
    }

    impl UsbHost for StubHost {
        fn enumerate(&mut self) -> Result<Vec<UsbDeviceDesc>> {
            Ok(self.devices.clone())
        }

        fn open(&mut self, _id: u64, _endpoints: &PtpEndpoints) -> Result<Box<dyn UsbPipes>> {
            Err(Error::NotSupported)
        }

        fn hotplug_pending(&self) -> bool {
            self.hotplug
        }
    }

    #[test]
    fn endpoint_selection() {
        let desc = camera(1, SONY_VENDOR_ID);
        let endpoints = find_ptp_endpoints(&desc).unwrap();
        assert_eq!(
            endpoints,
            PtpEndpoints {
                bulk_in: 0x81,
                bulk_out: 0x02,
                interrupt_in: 0x83
            }
        );
    }

    #[test]
    fn refresh_filters_vendor_and_interface() {
        let mut other = camera(2, 0x04A9);
        other.product = "EOS R5".into();
        let mut no_ptp = camera(3, SONY_VENDOR_ID);
        no_ptp.interfaces[0].class = 8;

        let mut backend = UsbBackend::new(StubHost {
            devices: vec![camera(1, SONY_VENDOR_ID), other, no_ptp],
            hotplug: false,
        });
        let mut list = Vec::new();
        backend.refresh_list(&mut list).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].product, "ILCE-7M4");
        assert_eq!(list[0].usb_vendor_id, Some(SONY_VENDOR_ID));
        assert_eq!(list[0].backend, BackendKind::Usb);
    }

    #[test]
    fn hotplug_flag_surfaces_as_needs_refresh() {
        let backend = UsbBackend::new(StubHost {
            devices: Vec::new(),
            hotplug: true,
        });
        assert!(backend.needs_refresh());
    }
}
