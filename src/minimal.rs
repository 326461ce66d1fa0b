use std::net::Ipv4Addr;

use arec::{Name, Record};
use serde::Serialize;

/// A minimal representation of an answer record, for JSON output.
///
/// Address records carry the address; anything else carries its type and the
/// record data as hex.
#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
#[serde(untagged)]
pub enum MinimalRecord {
    /// IPv4 address record.
    A { name: Name, ttl: u32, addr: Ipv4Addr },
    /// Any other record.
    Opaque {
        name: Name,
        #[serde(rename = "type")]
        r_type: String,
        ttl: u32,
        data: String,
    },
}

impl From<Record> for MinimalRecord {
    fn from(value: Record) -> Self {
        match value.addr() {
            Some(addr) => MinimalRecord::A {
                name: value.name,
                ttl: value.ttl,
                addr,
            },
            None => MinimalRecord::Opaque {
                r_type: value.r_type.to_string(),
                data: value.data.iter().map(|b| format!("{b:02x}")).collect(),
                name: value.name,
                ttl: value.ttl,
            },
        }
    }
}
