//! The device registry fans discovery and open/close out across every
//! active backend and keeps the flat list of known devices.

use crate::backend::{Backend, BackendKind, Device, DeviceInfo};
use crate::error::{Error, Result};

#[derive(Default)]
pub struct DeviceRegistry {
    backends: Vec<Box<dyn Backend>>,
    devices: Vec<DeviceInfo>,
    open_count: usize,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_backend(&mut self, backend: Box<dyn Backend>) {
        log::debug!("registered {} backend", backend.kind().as_str());
        self.backends.push(backend);
    }

    pub fn devices(&self) -> &[DeviceInfo] {
        &self.devices
    }

    /// Re-run discovery on every backend. Asynchronous backends keep
    /// feeding `poll_list_updates` afterwards.
    pub fn refresh_list(&mut self) {
        self.devices.clear();
        for backend in &mut self.backends {
            if let Err(e) = backend.refresh_list(&mut self.devices) {
                log::error!("{} refresh failed: {e}", backend.kind().as_str());
            }
        }
    }

    pub fn needs_refresh(&self) -> bool {
        self.backends.iter().any(|b| b.needs_refresh())
    }

    pub fn is_refreshing_list(&self) -> bool {
        self.backends.iter().any(|b| b.is_refreshing_list())
    }

    /// Drain incremental discovery results from asynchronous backends.
    /// Returns true when any backend added a device.
    pub fn poll_list_updates(&mut self) -> bool {
        let mut found = false;
        for backend in &mut self.backends {
            found |= backend.poll_list_updates(&mut self.devices);
        }
        found
    }

    pub fn release_list(&mut self) {
        self.devices.clear();
        for backend in &mut self.backends {
            backend.release_list();
        }
    }

    fn backend_mut(&mut self, kind: BackendKind) -> Result<&mut Box<dyn Backend>> {
        self.backends
            .iter_mut()
            .find(|b| b.kind() == kind)
            .ok_or(Error::BackendUnavailable)
    }

    pub fn open_device(&mut self, info: &DeviceInfo) -> Result<Device> {
        let info = info.clone();
        let device = self.backend_mut(info.backend)?.open_device(&info)?;
        self.open_count += 1;
        Ok(device)
    }

    pub fn close_device(&mut self, device: Device) {
        let kind = device.info.backend;
        match self.backend_mut(kind) {
            Ok(backend) => backend.close_device(device),
            Err(_) => log::error!("no {} backend to close device on", kind.as_str()),
        }
        self.open_count = self.open_count.saturating_sub(1);
    }

    pub fn open_device_count(&self) -> usize {
        self.open_count
    }

    pub fn close(&mut self) {
        for backend in &mut self.backends {
            backend.close();
        }
        self.backends.clear();
        self.devices.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DeviceKey;

    struct FakeBackend {
        kind: BackendKind,
        devices: Vec<&'static str>,
        refreshed: usize,
        opened: usize,
        closed: usize,
    }

    impl FakeBackend {
        fn new(kind: BackendKind, devices: Vec<&'static str>) -> Self {
            Self {
                kind,
                devices,
                refreshed: 0,
                opened: 0,
                closed: 0,
            }
        }
    }

    impl Backend for FakeBackend {
        fn kind(&self) -> BackendKind {
            self.kind
        }

        fn refresh_list(&mut self, list: &mut Vec<DeviceInfo>) -> Result<()> {
            self.refreshed += 1;
            for product in &self.devices {
                list.push(DeviceInfo {
                    backend: self.kind,
                    manufacturer: "Sony".into(),
                    product: product.to_string(),
                    serial: String::new(),
                    usb_vendor_id: None,
                    usb_product_id: None,
                    usb_version: None,
                    host: None,
                    key: match self.kind {
                        BackendKind::Usb => DeviceKey::Usb(1),
                        BackendKind::Ip => DeviceKey::Ip("10.0.0.1".into()),
                    },
                });
            }
            Ok(())
        }

        fn open_device(&mut self, _info: &DeviceInfo) -> Result<Device> {
            self.opened += 1;
            Err(Error::NotSupported)
        }

        fn close_device(&mut self, _device: Device) {
            self.closed += 1;
        }
    }

    #[test]
    fn refresh_fans_out_to_all_backends() {
        let mut registry = DeviceRegistry::new();
        registry.add_backend(Box::new(FakeBackend::new(BackendKind::Usb, vec!["ILCE-1"])));
        registry.add_backend(Box::new(FakeBackend::new(BackendKind::Ip, vec!["ILCE-7M4"])));
        registry.refresh_list();
        assert_eq!(registry.devices().len(), 2);
        let products: Vec<_> = registry.devices().iter().map(|d| d.product.as_str()).collect();
        assert_eq!(products, vec!["ILCE-1", "ILCE-7M4"]);
    }

    #[test]
    fn open_routes_to_matching_backend() {
        let mut registry = DeviceRegistry::new();
        registry.add_backend(Box::new(FakeBackend::new(BackendKind::Usb, vec!["ILCE-1"])));
        registry.refresh_list();
        let info = registry.devices()[0].clone();
        // The fake backend refuses to open, but the call must land on it.
        assert!(matches!(
            registry.open_device(&info),
            Err(Error::NotSupported)
        ));
    }

    #[test]
    fn open_on_missing_backend_is_unavailable() {
        let mut registry = DeviceRegistry::new();
        registry.add_backend(Box::new(FakeBackend::new(BackendKind::Usb, vec!["ILCE-1"])));
        registry.refresh_list();
        let mut info = registry.devices()[0].clone();
        info.backend = BackendKind::Ip;
        assert!(matches!(
            registry.open_device(&info),
            Err(Error::BackendUnavailable)
        ));
    }

    #[test]
    fn close_tears_down_backends() {
        let mut registry = DeviceRegistry::new();
        registry.add_backend(Box::new(FakeBackend::new(BackendKind::Usb, vec!["ILCE-1"])));
        registry.refresh_list();
        registry.close();
        assert!(registry.devices().is_empty());
        assert!(!registry.needs_refresh());
    }
}
