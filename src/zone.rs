use std::{collections::HashMap, net::Ipv4Addr, str::FromStr};

use anyhow::Context;
use log::debug;
use serde::Deserialize;

use crate::{
    error::{Error, Result},
    message::{Class, Header, Message, OperationCode, Record, RecordType},
    name::Name,
};

/// TTL given to records added without one.
pub const DEFAULT_TTL: u32 = 300;

/// Records served when no zone file is configured.
pub const DEFAULT_RECORDS: &[(&str, &str)] = &[
    ("example.com.", "93.184.216.34"),
    ("test.com.", "192.168.1.1"),
    ("demo.com.", "10.0.0.1"),
];

/// An address record owned by the zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneRecord {
    pub name: Name,
    pub r_type: RecordType,
    pub class: Class,
    pub ttl: u32,
    pub addr: Ipv4Addr,
}

/// The authoritative records of this server, one address per name.
///
/// Names are matched exactly and case-insensitively in their fully qualified
/// form, so `Example.COM` and `example.com.` are the same entry. The store is
/// filled before serving and only read afterwards, so it can be shared
/// between threads behind an `Arc` without locking.
#[derive(Debug, Clone)]
pub struct ZoneStore {
    ttl: u32,
    records: HashMap<String, ZoneRecord>,
}

impl Default for ZoneStore {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }
}

impl ZoneStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates an empty store whose records get `ttl` unless told otherwise.
    pub fn with_ttl(ttl: u32) -> Self {
        Self {
            ttl,
            records: HashMap::new(),
        }
    }

    /// Parse a ZoneStore from an input text in TOML format.
    ///
    /// The input contains a `records` list with one record per item. Each
    /// record has a `name` and an IPv4 `addr`, and may override the TTL with
    /// `ttl`. A top-level `ttl` sets the default for the whole file.
    ///
    /// # Example
    ///
    /// ```toml
    /// ttl = 60
    ///
    /// [[records]]
    /// name = "example.com."
    /// addr = "93.184.216.34"
    /// ```
    pub fn from_toml(input: &str) -> anyhow::Result<Self> {
        let file: ZoneFile = toml::from_str(input)?;

        let mut zone = Self::with_ttl(file.ttl.unwrap_or(DEFAULT_TTL));
        for entry in file.records {
            let ttl = entry.ttl.unwrap_or(zone.ttl);
            zone.insert(&entry.name, &entry.addr, ttl)
                .with_context(|| format!("invalid zone record for {:?}", entry.name))?;
        }

        Ok(zone)
    }

    /// Adds an address record with the default TTL, replacing any record
    /// already held for the name.
    pub fn add_record(&mut self, name: &str, addr: &str) -> Result<()> {
        self.insert(name, addr, self.ttl)
    }

    /// Adds several records, stopping at the first invalid one.
    pub fn add_records<'a, I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a (&'a str, &'a str)>,
    {
        for (name, addr) in records {
            self.add_record(name, addr)?;
        }
        Ok(())
    }

    fn insert(&mut self, name: &str, addr: &str, ttl: u32) -> Result<()> {
        let addr = Ipv4Addr::from_str(addr).map_err(|_| Error::InvalidAddress(addr.to_owned()))?;
        let name = Name::from_str(name)?;

        let record = ZoneRecord {
            name: name.to_lowercase(),
            r_type: RecordType::A,
            class: Class::In,
            ttl,
            addr,
        };
        self.records.insert(key(&name), record);
        Ok(())
    }

    /// Returns the record held for `name`, if any.
    pub fn lookup(&self, name: &Name) -> Option<&ZoneRecord> {
        self.records.get(&key(name))
    }

    /// Returns the number of names in the store.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Builds the authoritative reply to a query.
    ///
    /// Every A question whose name is held gets one answer record, named the
    /// way the question spelled it. Names that are not held produce no
    /// record and the reply still carries RCODE 0. Only standard queries are
    /// answered; other opcodes get an empty reply.
    pub fn answer(&self, query: &Message) -> Message {
        let mut response = Message::new();
        response.header = Header {
            id: query.header.id,
            is_response: true,
            op_code: query.header.op_code,
            is_authority: true,
            recursion_desired: query.header.recursion_desired,
            ..Default::default()
        };
        response.questions = query.questions.clone();

        if matches!(query.header.op_code, OperationCode::Query) {
            for question in &query.questions {
                if question.q_type != RecordType::A {
                    continue;
                }

                match self.lookup(&question.name) {
                    Some(record) => {
                        debug!("answer: {} {}", question.name, record.addr);
                        response.answer_records.push(Record::a(
                            question.name.clone(),
                            record.class,
                            record.ttl,
                            record.addr,
                        ));
                    }
                    None => debug!("no record for {}", question.name),
                }
            }
        }

        response.header.question_count = response.questions.len() as u16;
        response.header.answer_count = response.answer_records.len() as u16;
        response
    }

    /// Decodes a query datagram and encodes the reply to send back, at most
    /// `max_len` bytes long.
    ///
    /// Returns `None` for datagrams that are themselves responses, which are
    /// never answered. A reply that does not fit has TC set and loses answer
    /// records from the end until it does; if the echoed questions alone are
    /// still too long they are dropped as well.
    pub fn answer_datagram(&self, buf: &[u8], max_len: usize) -> Result<Option<Vec<u8>>> {
        let query = Message::from_bytes(buf)?;
        if query.header.is_response {
            return Ok(None);
        }

        let mut response = self.answer(&query);
        let encoded = response.encode()?;
        if encoded.len() <= max_len {
            return Ok(Some(encoded));
        }

        debug!("truncating {} byte reply to fit {max_len} bytes", encoded.len());
        truncate(&mut response, encoded.len(), max_len);
        response.encode().map(Some)
    }
}

/// Drops trailing answers from an encoded-`len`-byte reply until it fits
/// `max_len`, then the questions if that is not enough, and sets TC.
fn truncate(response: &mut Message, mut len: usize, max_len: usize) {
    response.header.is_truncated = true;
    while len > max_len {
        match response.answer_records.pop() {
            Some(record) => len -= record.wire_len(),
            None => break,
        }
    }
    if len > max_len {
        response.questions.clear();
    }

    response.header.question_count = response.questions.len() as u16;
    response.header.answer_count = response.answer_records.len() as u16;
}

/// Map key for a name: lower-cased, fully qualified.
fn key(name: &Name) -> String {
    name.to_lowercase().to_string()
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ZoneFile {
    ttl: Option<u32>,
    #[serde(default)]
    records: Vec<ZoneEntry>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ZoneEntry {
    name: String,
    addr: String,
    ttl: Option<u32>,
}
