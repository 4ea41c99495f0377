//! Network backend: SSDP discovery of Sony Digital Imaging devices and
//! PTP-over-IP channel setup.
//!
//! Discovery is asynchronous: `refresh_list` multicasts an M-SEARCH from
//! every configured local interface and opens a non-blocking socket;
//! callers drain `poll_list_updates` until the ten-second window closes.

use std::net::{Ipv4Addr, SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant};

use crate::backend::{Backend, BackendKind, Device, DeviceInfo, DeviceKey};
use crate::error::{Error, Result};
use crate::http;
use crate::transport::ip::{
    recv_init_command_ack, recv_init_event_ack, send_init_command_request,
    send_init_event_request, IpTransport, PacketReader, FRIENDLY_NAME, INITIATOR_GUID,
};
use crate::xml;

/// The PTP-IP data and event sockets both connect to this port.
pub const PTPIP_PORT: u16 = 15740;

const SSDP_MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);
const SSDP_PORT: u16 = 1900;

const SONY_IMAGING_URN: &str = ":urn:schemas-sony-com:service:DigitalImaging";

const M_SEARCH: &str = "M-SEARCH * HTTP/1.1\r\n\
    HOST: 239.255.255.250:1900\r\n\
    MAN: \"ssdp:discover\"\r\n\
    ST: ssdp:all\r\n\
    MX: 2\r\n\
    \r\n";

#[derive(Debug, Clone)]
pub struct IpBackendConfig {
    /// Local IPv4 interface addresses to multicast the M-SEARCH from.
    /// Empty means the default route only.
    pub local_addrs: Vec<Ipv4Addr>,
    /// How long the discovery socket stays open after a refresh.
    pub discovery_window: Duration,
    pub http_timeout: Duration,
    pub data_timeout: Duration,
    pub event_timeout: Duration,
}

impl Default for IpBackendConfig {
    fn default() -> Self {
        Self {
            local_addrs: Vec::new(),
            discovery_window: Duration::from_secs(10),
            http_timeout: Duration::from_secs(5),
            data_timeout: Duration::from_secs(60),
            event_timeout: Duration::from_secs(5),
        }
    }
}

/// Extract the LOCATION of an SSDP response whose USN names the Sony
/// Digital Imaging service. Header matching is case-insensitive.
fn parse_ssdp_response(text: &str) -> Option<&str> {
    let mut location = None;
    let mut usn = None;
    for line in text.split("\r\n") {
        let Some(colon) = line.find(':') else { continue };
        let name = line[..colon].trim();
        let value = line[colon + 1..].trim();
        if name.eq_ignore_ascii_case("location") {
            location = Some(value);
        } else if name.eq_ignore_ascii_case("usn") {
            usn = Some(value);
        }
    }
    if usn?.contains(SONY_IMAGING_URN) {
        location
    } else {
        None
    }
}

pub struct IpBackend {
    config: IpBackendConfig,
    discovery: Option<UdpSocket>,
    deadline: Option<Instant>,
}

impl IpBackend {
    pub fn new(config: IpBackendConfig) -> Self {
        Self {
            config,
            discovery: None,
            deadline: None,
        }
    }

    fn fetch_device_description(&self, location: &str) -> Option<DeviceInfo> {
        let response = match http::get(location, self.config.http_timeout) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("device description fetch failed for {location}: {e}");
                return None;
            }
        };
        if response.status != 200 {
            log::warn!("device description fetch for {location} returned {}", response.status);
            return None;
        }
        let body = String::from_utf8_lossy(&response.body);
        let texts = xml::element_texts(&body, &["friendlyName", "manufacturer"]);
        let product = texts[0]?.to_string();
        let manufacturer = texts[1].unwrap_or("").to_string();
        let host = http::parse_url(location)?.host;
        Some(DeviceInfo {
            backend: BackendKind::Ip,
            manufacturer,
            product,
            serial: String::new(),
            usb_vendor_id: None,
            usb_product_id: None,
            usb_version: None,
            host: Some(host.clone()),
            key: DeviceKey::Ip(host),
        })
    }

    fn close_discovery(&mut self) {
        self.discovery = None;
        self.deadline = None;
    }
}

impl Backend for IpBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Ip
    }

    fn refresh_list(&mut self, _list: &mut Vec<DeviceInfo>) -> Result<()> {
        log::trace!("ip refresh_list");
        self.close_discovery();

        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.set_broadcast(true)?;
        socket.set_nonblocking(true)?;

        let target = SocketAddr::from((SSDP_MULTICAST_ADDR, SSDP_PORT));
        if self.config.local_addrs.is_empty() {
            if let Err(e) = socket.send_to(M_SEARCH.as_bytes(), target) {
                log::error!("M-SEARCH send failed: {e}");
            }
        } else {
            for addr in &self.config.local_addrs {
                log::info!("sending M-SEARCH on interface {addr}");
                if let Err(e) = socket2::SockRef::from(&socket).set_multicast_if_v4(addr) {
                    log::error!("failed to select multicast interface {addr}: {e}");
                }
                if let Err(e) = socket.send_to(M_SEARCH.as_bytes(), target) {
                    log::error!("M-SEARCH send failed on {addr}: {e}");
                }
            }
        }

        self.discovery = Some(socket);
        self.deadline = Some(Instant::now() + self.config.discovery_window);
        Ok(())
    }

    fn is_refreshing_list(&self) -> bool {
        self.discovery.is_some()
    }

    fn poll_list_updates(&mut self, list: &mut Vec<DeviceInfo>) -> bool {
        let Some(socket) = self.discovery.as_ref() else {
            return false;
        };

        let mut found = false;
        let mut buf = [0u8; 4096];
        loop {
            match socket.recv_from(&mut buf) {
                Ok((n, from)) => {
                    let Ok(text) = std::str::from_utf8(&buf[..n]) else {
                        continue;
                    };
                    let Some(location) = parse_ssdp_response(text) else {
                        continue;
                    };
                    log::info!("found Sony Imaging device at {location} (answered from {from})");
                    if let Some(info) = self.fetch_device_description(location) {
                        list.push(info);
                        found = true;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    log::warn!("discovery socket error: {e}");
                    break;
                }
            }
        }

        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            log::trace!("SSDP discovery stopped after waiting for responses");
            self.close_discovery();
        }
        found
    }

    fn open_device(&mut self, info: &DeviceInfo) -> Result<Device> {
        log::trace!("ip open_device {}", info.product);
        let DeviceKey::Ip(host) = &info.key else {
            return Err(Error::BackendUnavailable);
        };

        let addr = (host.as_str(), PTPIP_PORT)
            .to_socket_addrs()?
            .next()
            .ok_or(Error::ConnectionClosed)?;

        let mut data = TcpStream::connect_timeout(&addr, self.config.data_timeout)
            .map_err(Error::from_stream)?;
        data.set_read_timeout(Some(self.config.data_timeout))?;
        data.set_write_timeout(Some(self.config.data_timeout))?;

        let mut reader = PacketReader::new();
        send_init_command_request(&mut data, &INITIATOR_GUID, FRIENDLY_NAME)?;
        let session_id = recv_init_command_ack(&mut reader, &mut data)?;

        let mut event = TcpStream::connect_timeout(&addr, self.config.event_timeout)
            .map_err(Error::from_stream)?;
        event.set_read_timeout(Some(self.config.event_timeout))?;
        event.set_write_timeout(Some(self.config.event_timeout))?;

        let mut event_reader = PacketReader::new();
        send_init_event_request(&mut event, session_id)?;
        recv_init_event_ack(&mut event_reader, &mut event)?;

        let transport = IpTransport::with_readers(data, Some(event), reader, event_reader);
        Ok(Device::new(info.clone(), Box::new(transport)))
    }

    fn close_device(&mut self, device: Device) {
        log::trace!("ip close_device {}", device.info.product);
        drop(device);
    }

    fn close(&mut self) {
        self.close_discovery();
    }
}
