use std::{thread, time::Duration};

use alphalink::{DeviceRegistry, IpBackend, IpBackendConfig};

fn main() {
    use simple_logger::SimpleLogger;
    SimpleLogger::new().init().unwrap();

    let mut registry = DeviceRegistry::new();
    registry.add_backend(Box::new(IpBackend::new(IpBackendConfig::default())));

    registry.refresh_list();
    while registry.is_refreshing_list() {
        registry.poll_list_updates();
        thread::sleep(Duration::from_millis(200));
    }

    if registry.devices().is_empty() {
        println!("No cameras found.");
        return;
    }
    for device in registry.devices() {
        println!(
            "{} ({}) via {}{}",
            device.product,
            device.manufacturer,
            device.backend.as_str(),
            device
                .host
                .as_deref()
                .map(|h| format!(" at {h}"))
                .unwrap_or_default()
        );
    }

    registry.close();
    println!("Finished!");
}
