//! Minimal HTTP/1.1 JSON transport over a plain TCP stream.
//!
//! One connection per record, `Connection: close`, and only the status line
//! of the answer is read.
//!
//! There is no TLS. An `https://` collector is only reachable through a
//! TLS-terminating proxy that forwards plain HTTP to it; point
//! `AIRNODE_COLLECTOR_HOST`/`AIRNODE_COLLECTOR_PORT` at that proxy.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};

use airnode_core::telemetry::TelemetryRecord;
use airnode_core::transport::{DeliveryStatus, Transport};
use log::debug;

use crate::config::CollectorConfig;
use crate::error::TransportError;

pub struct HttpTransport {
    config: CollectorConfig,
}

impl HttpTransport {
    pub fn new(config: CollectorConfig) -> Self {
        Self { config }
    }

    /// Full request text for a JSON `body`.
    fn request(&self, body: &str) -> String {
        let mut request = format!(
            "POST {} HTTP/1.1\r\nHost: {}:{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
            self.config.path,
            self.config.host,
            self.config.port,
            body.len()
        );
        if let Some(auth) = &self.config.authorization {
            request.push_str("Authorization: ");
            request.push_str(auth);
            request.push_str("\r\n");
        }
        request.push_str("\r\n");
        request.push_str(body);
        request
    }

    fn connect(&self) -> Result<TcpStream, TransportError> {
        let endpoint = format!("{}:{}", self.config.host, self.config.port);
        let addr = (self.config.host.as_str(), self.config.port)
            .to_socket_addrs()?
            .next()
            .ok_or(TransportError::Unresolved(endpoint))?;

        let stream = TcpStream::connect_timeout(&addr, self.config.timeout)?;
        stream.set_write_timeout(Some(self.config.timeout))?;
        stream.set_read_timeout(Some(self.config.timeout))?;
        Ok(stream)
    }
}

impl Transport for HttpTransport {
    type Error = TransportError;

    fn send(&mut self, record: &TelemetryRecord) -> Result<DeliveryStatus, Self::Error> {
        let body = serde_json::to_string(record)?;
        debug!("POST {} {}", self.config.path, body);

        let mut stream = self.connect()?;
        stream.write_all(self.request(&body).as_bytes())?;
        stream.flush()?;

        let mut status_line = String::new();
        BufReader::new(stream).read_line(&mut status_line)?;
        parse_status_line(&status_line).map(DeliveryStatus::new)
    }
}

/// Status code of an `HTTP/1.x NNN Reason` line.
fn parse_status_line(line: &str) -> Result<u16, TransportError> {
    let malformed = || TransportError::MalformedResponse(line.trim_end().to_string());

    let mut parts = line.split_whitespace();
    let version = parts.next().ok_or_else(malformed)?;
    if !version.starts_with("HTTP/") {
        return Err(malformed());
    }
    parts
        .next()
        .and_then(|code| code.parse().ok())
        .ok_or_else(malformed)
}
