use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs, UdpSocket},
    time::Duration,
};

use anyhow::{Context, Result};
use log::debug;

use crate::{lookup::extract_addresses, message::Message, name::Name};

/// Largest reply accepted unless configured otherwise.
pub const DEFAULT_RESPONSE_SIZE: u16 = 512;

/// How long to wait for a reply unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Message transport over UDP.
///
/// Each call sends one datagram and waits for one reply. There are no
/// retries; a lost datagram shows up as a timeout error.
#[derive(Debug, Clone)]
pub struct UdpTransport {
    nameserver: String,
    max_response_size: u16,
    timeout: Duration,
}

impl UdpTransport {
    /// Creates a new UdpTransport object.
    ///
    /// The nameserver is an IP address or host name, optionally followed by
    /// a port. Port 53 is used when none is given.
    pub fn new(nameserver: String, max_size: u16) -> Self {
        Self {
            nameserver,
            max_response_size: max_size,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets how long to wait for a reply.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sends a DNS request and returns the raw reply datagram.
    pub fn send(&self, request: &Message) -> Result<Vec<u8>> {
        let server = self.server_addr()?;
        let local: SocketAddr = match server {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (std::net::Ipv6Addr::UNSPECIFIED, 0).into(),
        };

        let socket = UdpSocket::bind(local).context("failed to bind local socket")?;
        socket.set_read_timeout(Some(self.timeout))?;
        socket
            .connect(server)
            .with_context(|| format!("failed to connect to {server}"))?;

        let request_bytes = request.encode()?;
        socket.send(&request_bytes)?;
        debug!(
            "sent query {:#06x} ({} bytes) to {server}",
            request.header.id,
            request_bytes.len()
        );

        let mut response_buf = vec![0; self.max_response_size as usize];
        let len = socket
            .recv(&mut response_buf)
            .with_context(|| format!("no reply from {server}"))?;
        response_buf.truncate(len);
        debug!("received {len} bytes from {server}");

        Ok(response_buf)
    }

    /// Queries the A records of `name` and returns the whole reply.
    pub fn resolve(&self, name: &Name) -> Result<Message> {
        let id = rand::random();
        let response = self.send(&Message::query(id, name.clone()))?;
        let message = Message::from_bytes(&response)?;
        message.check_reply(id)?;
        Ok(message)
    }

    /// Queries the A records of `name` and returns their addresses.
    pub fn lookup(&self, name: &Name) -> Result<Vec<Ipv4Addr>> {
        let id = rand::random();
        let response = self.send(&Message::query(id, name.clone()))?;
        Ok(extract_addresses(&response, id)?.collect())
    }

    fn server_addr(&self) -> Result<SocketAddr> {
        if let Ok(addr) = self.nameserver.parse::<SocketAddr>() {
            return Ok(addr);
        }
        if let Ok(ip) = self.nameserver.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, 53));
        }

        let host = if self.nameserver.contains(':') {
            self.nameserver.clone()
        } else {
            format!("{}:53", self.nameserver)
        };
        host.to_socket_addrs()
            .with_context(|| format!("failed to resolve nameserver {}", self.nameserver))?
            .next()
            .with_context(|| format!("no address for nameserver {}", self.nameserver))
    }
}
