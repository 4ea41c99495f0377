//! Client library for Sony Alpha cameras speaking PTP (Picture Transfer
//! Protocol) with the SDIO vendor extension.
//!
//! The crate discovers cameras over USB and over the network, opens a
//! communication channel, and exposes one uniform request/response
//! interface on top: device metadata, typed property reads and writes,
//! vendor control commands, captured-image and live-view download, and
//! camera-settings upload/download.
//!
//! The layering, bottom up:
//!
//! - [`wire`]: endian-aware byte cursors and the PTP UTF-16LE string codec.
//! - [`transport`]: one implementation per physical framing (USB container
//!   framing, PTP-over-IP packets, an escape-ferried shape), each turning
//!   one logical PTP transaction into channel bytes.
//! - [`backend`]: device discovery and channel setup per transport family
//!   (USB enumeration through a host-stack trait, SSDP + HTTP/XML for the
//!   network), aggregated by the [`registry`].
//! - [`session`]: the PTP/SDIO engine: the Sony authentication handshake,
//!   descriptor-table parsing, a typed property/control cache, and image
//!   and settings transfer.
//! - [`metadata`]: frozen per-code display names, value enumerations and
//!   formatters.
//!
//! A typical caller refreshes a [`DeviceRegistry`], opens one of the
//! discovered devices, wraps it in a [`Session`] and calls
//! [`Session::connect`]:
//!
//! ```no_run
//! use alphalink::{DeviceRegistry, IpBackend, IpBackendConfig, ProtocolVersion, Session};
//!
//! let mut registry = DeviceRegistry::new();
//! registry.add_backend(Box::new(IpBackend::new(IpBackendConfig::default())));
//! registry.refresh_list();
//! while registry.is_refreshing_list() {
//!     registry.poll_list_updates();
//! }
//! if let Some(info) = registry.devices().first().cloned() {
//!     let device = registry.open_device(&info)?;
//!     let mut session = Session::new(device);
//!     session.connect(ProtocolVersion::V300)?;
//!     if let Some(shutter) = session.get_property_as_string(alphalink::ptp::prop::SHUTTER_SPEED) {
//!         println!("shutter speed: {shutter}");
//!     }
//! }
//! # Ok::<(), alphalink::Error>(())
//! ```

pub mod backend;
pub mod error;
pub mod http;
pub mod metadata;
pub mod ptp;
pub mod registry;
pub mod session;
pub mod transport;
pub mod value;
pub mod wire;
pub mod xml;

pub use backend::ip::{IpBackend, IpBackendConfig};
pub use backend::usb::{UsbBackend, UsbDeviceDesc, UsbHost};
pub use backend::{Backend, BackendKind, Device, DeviceInfo};
pub use error::{Error, Result};
pub use ptp::{ProtocolVersion, PtpEvent, Request, Response};
pub use registry::DeviceRegistry;
pub use session::{
    CapturedImageInfo, ControlDescriptor, LiveViewFrames, PropValueEnum, PropertyDescriptor,
    Session,
};
pub use transport::{BufferKind, Transport, TransferBuffer};
pub use value::{DataType, Value};
