//! Minimal HTTP/1.1 GET client for fetching SSDP device descriptions.

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub path: String,
}

/// Parse an absolute URL of the shape `scheme://host[:port][/path]`.
pub fn parse_url(url: &str) -> Option<Url> {
    let (scheme, rest) = match url.find("://") {
        Some(pos) => (&url[..pos], &url[pos + 3..]),
        None => ("http", url),
    };
    let (authority, path) = match rest.find('/') {
        Some(pos) => (&rest[..pos], &rest[pos..]),
        None => (rest, "/"),
    };
    let (host, port) = match authority.rfind(':') {
        Some(pos) => {
            let port = authority[pos + 1..].parse().ok()?;
            (&authority[..pos], port)
        }
        None => (authority, if scheme == "https" { 443 } else { 80 }),
    };
    if host.is_empty() {
        return None;
    }
    Some(Url {
        scheme: scheme.to_string(),
        host: host.to_string(),
        port,
        path: path.to_string(),
    })
}

#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: String,
    pub body: Vec<u8>,
}

/// Parse a raw HTTP/1.x response: status line, headers up to the blank
/// line, body as the rest.
pub(crate) fn parse_response(raw: &[u8]) -> Result<HttpResponse> {
    let header_end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or(Error::MalformedResponse)?;
    let head = std::str::from_utf8(&raw[..header_end]).map_err(|_| Error::MalformedResponse)?;
    let mut lines = head.split("\r\n");
    let status_line = lines.next().ok_or(Error::MalformedResponse)?;
    if !status_line.starts_with("HTTP/1.") {
        return Err(Error::MalformedResponse);
    }
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .ok_or(Error::MalformedResponse)?;
    let headers = head[status_line.len()..].trim_start_matches("\r\n").to_string();
    Ok(HttpResponse {
        status,
        headers,
        body: raw[header_end + 4..].to_vec(),
    })
}

/// GET the given URL with `Connection: close`, reading until the peer
/// closes. The timeout bounds connect, send and each read.
pub fn get(url: &str, timeout: Duration) -> Result<HttpResponse> {
    let parsed = parse_url(url).ok_or(Error::MalformedResponse)?;
    log::debug!("GET {url}");

    let addr = (parsed.host.as_str(), parsed.port)
        .to_socket_addrs()?
        .next()
        .ok_or(Error::ConnectionClosed)?;
    let mut stream = TcpStream::connect_timeout(&addr, timeout).map_err(Error::from_stream)?;
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;

    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        parsed.path, parsed.host
    );
    stream
        .write_all(request.as_bytes())
        .map_err(Error::from_stream)?;

    let mut raw = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => raw.extend_from_slice(&chunk[..n]),
            Err(e) => return Err(Error::from_stream(e)),
        }
    }
    if raw.is_empty() {
        return Err(Error::ConnectionClosed);
    }
    parse_response(&raw)
}
