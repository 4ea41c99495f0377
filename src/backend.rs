//! Backends discover devices on one kind of physical channel and open
//! transports to them.

pub mod ip;
pub mod usb;

use crate::error::Result;
use crate::ptp::PtpEvent;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Usb,
    Ip,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Usb => "usb",
            BackendKind::Ip => "ip",
        }
    }
}

/// Identifies one physical device within its backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DeviceKey {
    Usb(u64),
    Ip(String),
}

/// One discovered device. Produced by a backend refresh and valid until
/// the next refresh or registry teardown.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub backend: BackendKind,
    pub manufacturer: String,
    pub product: String,
    pub serial: String,
    pub usb_vendor_id: Option<u16>,
    pub usb_product_id: Option<u16>,
    pub usb_version: Option<u16>,
    /// Network address, for devices found over IP discovery.
    pub host: Option<String>,
    pub(crate) key: DeviceKey,
}

/// An opened device: its info record plus the active transport.
pub struct Device {
    pub info: DeviceInfo,
    pub(crate) transport: Box<dyn Transport>,
    pub(crate) disconnected: bool,
}

impl Device {
    pub fn new(info: DeviceInfo, transport: Box<dyn Transport>) -> Self {
        Self {
            info,
            transport,
            disconnected: false,
        }
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    pub(crate) fn mark_disconnected(&mut self) {
        if !self.disconnected {
            log::warn!("device {} disconnected", self.info.product);
            self.disconnected = true;
        }
    }

    /// Drain one pending device event, if the transport carries them.
    pub fn read_event(&mut self) -> Result<Option<PtpEvent>> {
        self.transport.read_event()
    }
}

/// A device-discovery and channel-opening backend.
///
/// Discovery is either synchronous (`refresh_list` fills the list before
/// returning) or asynchronous (`refresh_list` starts it; the caller polls
/// `poll_list_updates` while `is_refreshing_list` stays true).
pub trait Backend {
    fn kind(&self) -> BackendKind;

    fn refresh_list(&mut self, list: &mut Vec<DeviceInfo>) -> Result<()>;

    /// Hot-plug hint: true when the device list is known stale.
    fn needs_refresh(&self) -> bool {
        false
    }

    fn is_refreshing_list(&self) -> bool {
        false
    }

    /// Drain incremental discovery results. Returns true when a device was
    /// added.
    fn poll_list_updates(&mut self, _list: &mut Vec<DeviceInfo>) -> bool {
        false
    }

    /// Drop device records from the last refresh (open devices excluded).
    fn release_list(&mut self) {}

    fn open_device(&mut self, info: &DeviceInfo) -> Result<Device>;

    fn close_device(&mut self, device: Device);

    /// Teardown; closes whatever the backend still holds.
    fn close(&mut self) {}
}
