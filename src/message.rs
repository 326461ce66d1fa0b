use std::{fmt::Display, net::Ipv4Addr};

use crate::{
    bytes::{read_exact, read_u16, read_u32, Bytes},
    error::{Error, Result, Section},
    name::Name,
};

/// Size of the fixed message header.
pub const HEADER_LEN: usize = 12;

/// A DNS message.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct Message {
    pub header: Header,
    pub questions: Vec<Question>,
    pub answer_records: Vec<Record>,
    pub authority_records: Vec<Record>,
    pub additional_records: Vec<Record>,
}

impl Message {
    /// Creates a new empty Message.
    pub fn new() -> Self {
        Default::default()
    }

    /// Decodes a complete message.
    ///
    /// Each section must hold exactly the number of entries its header count
    /// declares, and no bytes may follow the last entry.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let header = Header::from_bytes(buf)?;
        let mut offset = HEADER_LEN;

        let mut questions = vec![];
        for _ in 0..header.question_count {
            ensure_more(buf, offset, Section::Question, header.question_count)?;
            let (question, next) = Question::from_bytes(buf, offset)?;
            questions.push(question);
            offset = next;
        }

        let mut sections = [
            (Section::Answer, header.answer_count, vec![]),
            (Section::Authority, header.authority_count, vec![]),
            (Section::Additional, header.additional_count, vec![]),
        ];
        for (section, count, records) in sections.iter_mut() {
            for _ in 0..*count {
                ensure_more(buf, offset, *section, *count)?;
                let (record, next) = Record::from_bytes(buf, offset)?;
                records.push(record);
                offset = next;
            }
        }

        if offset != buf.len() {
            return Err(Error::CountMismatch {
                section: Section::Additional,
                declared: header.additional_count,
            });
        }

        let [(_, _, answer_records), (_, _, authority_records), (_, _, additional_records)] =
            sections;

        Ok(Self {
            header,
            questions,
            answer_records,
            authority_records,
            additional_records,
        })
    }

    /// Converts a Message to a byte stream.
    ///
    /// The header counts written are the actual section lengths, whatever
    /// `self.header` holds.
    pub fn to_bytes(&self, bytes: &mut Bytes) -> Result<()> {
        let count =
            |len: usize, section| u16::try_from(len).map_err(|_| Error::SectionOverflow(section));

        let header = Header {
            question_count: count(self.questions.len(), Section::Question)?,
            answer_count: count(self.answer_records.len(), Section::Answer)?,
            authority_count: count(self.authority_records.len(), Section::Authority)?,
            additional_count: count(self.additional_records.len(), Section::Additional)?,
            ..self.header.clone()
        };
        header.to_bytes(bytes);

        for question in &self.questions {
            question.to_bytes(bytes);
        }

        for record in self
            .answer_records
            .iter()
            .chain(&self.authority_records)
            .chain(&self.additional_records)
        {
            record.to_bytes(bytes)?;
        }

        Ok(())
    }

    /// Encodes the message into a fresh buffer.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut bytes = Bytes::new();
        self.to_bytes(&mut bytes)?;
        Ok(bytes.into_vec())
    }
}

/// Fails with a count mismatch if the buffer ended on an entry boundary
/// before the section was complete.
fn ensure_more(buf: &[u8], offset: usize, section: Section, declared: u16) -> Result<()> {
    if offset >= buf.len() {
        return Err(Error::CountMismatch { section, declared });
    }
    Ok(())
}

/// A DNS operation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationCode {
    /// A standard query.
    #[default]
    Query,
    /// An inverse query.
    InverseQuery,
    /// A server status request.
    Status,
    /// A zone change notification.
    Notify,
    /// A dynamic update.
    Update,
    /// Any other code.
    Unknown(u8),
}

impl From<u8> for OperationCode {
    fn from(value: u8) -> Self {
        use OperationCode::*;

        match value {
            0 => Query,
            1 => InverseQuery,
            2 => Status,
            4 => Notify,
            5 => Update,
            _ => Unknown(value),
        }
    }
}

impl From<OperationCode> for u8 {
    fn from(value: OperationCode) -> Self {
        use OperationCode::*;

        match value {
            Query => 0,
            InverseQuery => 1,
            Status => 2,
            Notify => 4,
            Update => 5,
            Unknown(code) => code,
        }
    }
}

/// A DNS response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseCode {
    /// No error condition.
    #[default]
    Success,
    /// The name server was unable to interpret the query.
    FormatError,
    /// The name server was unable to process the query due to a problem with
    /// the name server.
    ServerFailure,
    /// The domain name referenced in the query does not exist.
    NameError,
    /// The name server does not support the request kind of query.
    NotImplemented,
    /// The name server refuses to perform the specified operation for policy reasons.
    Refused,
    /// Any other code.
    Unknown(u8),
}

impl From<u8> for ResponseCode {
    fn from(value: u8) -> Self {
        use ResponseCode::*;

        match value {
            0 => Success,
            1 => FormatError,
            2 => ServerFailure,
            3 => NameError,
            4 => NotImplemented,
            5 => Refused,
            _ => Unknown(value),
        }
    }
}

impl From<ResponseCode> for u8 {
    fn from(value: ResponseCode) -> Self {
        use ResponseCode::*;

        match value {
            Success => 0,
            FormatError => 1,
            ServerFailure => 2,
            NameError => 3,
            NotImplemented => 4,
            Refused => 5,
            Unknown(code) => code,
        }
    }
}

impl Display for ResponseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ResponseCode::*;

        match self {
            Success => write!(f, "success"),
            FormatError => write!(f, "format_error"),
            ServerFailure => write!(f, "server_failure"),
            NameError => write!(f, "nonexistent_domain"),
            NotImplemented => write!(f, "not_implemented"),
            Refused => write!(f, "refused"),
            Unknown(code) => write!(f, "rcode{code}"),
        }
    }
}

/// Message header.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct Header {
    pub id: u16,
    pub is_response: bool,
    pub op_code: OperationCode,
    pub is_authority: bool,
    pub is_truncated: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    /// The three reserved bits between RA and RCODE, kept as read.
    pub z: u8,
    pub resp_code: ResponseCode,
    pub question_count: u16,
    pub answer_count: u16,
    pub authority_count: u16,
    pub additional_count: u16,
}

impl Header {
    /// Decodes the header at the start of a message.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let Some(raw) = buf.get(..HEADER_LEN) else {
            return Err(Error::ShortBuffer { len: buf.len() });
        };
        let word = |i: usize| u16::from_be_bytes([raw[i], raw[i + 1]]);

        let (is_response, op_code, is_authority, is_truncated, recursion_desired) = {
            let byte = raw[2];
            let is_response = ((byte >> 7) & 1) == 1;
            let op_code = (byte >> 3) & 0b1111;
            let is_authority = ((byte >> 2) & 1) == 1;
            let is_truncated = ((byte >> 1) & 1) == 1;
            let recursion_desired = (byte & 1) == 1;
            (
                is_response,
                op_code.into(),
                is_authority,
                is_truncated,
                recursion_desired,
            )
        };

        let (recursion_available, z, resp_code) = {
            let byte = raw[3];
            let recursion_available = ((byte >> 7) & 1) == 1;
            let z = (byte >> 4) & 0b111;
            let resp_code = byte & 0b1111;
            (recursion_available, z, resp_code.into())
        };

        Ok(Self {
            id: word(0),
            is_response,
            op_code,
            is_authority,
            is_truncated,
            recursion_desired,
            recursion_available,
            z,
            resp_code,
            question_count: word(4),
            answer_count: word(6),
            authority_count: word(8),
            additional_count: word(10),
        })
    }

    /// Converts a Header to a byte stream.
    pub fn to_bytes(&self, bytes: &mut Bytes) {
        bytes.write_u16(self.id);

        let codes1 = {
            let mut byte = 0;
            byte |= (self.is_response as u8) << 7;
            byte |= (u8::from(self.op_code) & 0b1111) << 3;
            byte |= (self.is_authority as u8) << 2;
            byte |= (self.is_truncated as u8) << 1;
            byte |= self.recursion_desired as u8;
            byte
        };
        bytes.write(codes1);

        let codes2 = {
            let mut byte = 0;
            byte |= (self.recursion_available as u8) << 7;
            byte |= (self.z & 0b111) << 4;
            byte |= u8::from(self.resp_code) & 0b1111;
            byte
        };
        bytes.write(codes2);

        bytes.write_u16(self.question_count);
        bytes.write_u16(self.answer_count);
        bytes.write_u16(self.authority_count);
        bytes.write_u16(self.additional_count);
    }
}

/// The type of a record or question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// A host address.
    A,
    /// An authoritative name server.
    Ns,
    /// The canonical name for an alias.
    Cname,
    /// Marks the start of a zone of authority.
    Soa,
    /// A domain name pointer.
    Ptr,
    /// Mail exchange.
    Mx,
    /// Text strings.
    Txt,
    /// An IPv6 host address.
    Aaaa,
    /// A request for all records.
    Any,
    /// Any other type, carried as its code.
    Unknown(u16),
}

impl From<u16> for RecordType {
    fn from(value: u16) -> Self {
        use RecordType::*;

        match value {
            1 => A,
            2 => Ns,
            5 => Cname,
            6 => Soa,
            12 => Ptr,
            15 => Mx,
            16 => Txt,
            28 => Aaaa,
            255 => Any,
            _ => Unknown(value),
        }
    }
}

impl From<RecordType> for u16 {
    fn from(value: RecordType) -> Self {
        use RecordType::*;

        match value {
            A => 1,
            Ns => 2,
            Cname => 5,
            Soa => 6,
            Ptr => 12,
            Mx => 15,
            Txt => 16,
            Aaaa => 28,
            Any => 255,
            Unknown(code) => code,
        }
    }
}

impl Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use RecordType::*;

        match self {
            A => write!(f, "A"),
            Ns => write!(f, "NS"),
            Cname => write!(f, "CNAME"),
            Soa => write!(f, "SOA"),
            Ptr => write!(f, "PTR"),
            Mx => write!(f, "MX"),
            Txt => write!(f, "TXT"),
            Aaaa => write!(f, "AAAA"),
            Any => write!(f, "ANY"),
            Unknown(code) => write!(f, "TYPE{code}"),
        }
    }
}

/// DNS record class.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Class {
    /// Internet.
    #[default]
    In,
    /// CS Net.
    Cs,
    /// Chaos.
    Ch,
    /// Hesiod.
    Hs,
    /// Any.
    Any,
    /// Any other class, carried as its code.
    Unknown(u16),
}

impl From<u16> for Class {
    fn from(value: u16) -> Self {
        match value {
            1 => Class::In,
            2 => Class::Cs,
            3 => Class::Ch,
            4 => Class::Hs,
            255 => Class::Any,
            _ => Class::Unknown(value),
        }
    }
}

impl From<Class> for u16 {
    fn from(value: Class) -> Self {
        match value {
            Class::In => 1,
            Class::Cs => 2,
            Class::Ch => 3,
            Class::Hs => 4,
            Class::Any => 255,
            Class::Unknown(code) => code,
        }
    }
}

impl Display for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Class::In => write!(f, "IN"),
            Class::Cs => write!(f, "CS"),
            Class::Ch => write!(f, "CH"),
            Class::Hs => write!(f, "HS"),
            Class::Any => write!(f, "ANY"),
            Class::Unknown(code) => write!(f, "CLASS{code}"),
        }
    }
}

/// A DNS question.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Question {
    pub name: Name,
    pub q_type: RecordType,
    pub q_class: Class,
}

impl Question {
    /// Decodes a question starting at `offset`.
    pub fn from_bytes(buf: &[u8], offset: usize) -> Result<(Self, usize)> {
        let (name, fixed) = Name::from_bytes(buf, offset)?;
        let truncated = || Error::TruncatedRecord { offset };
        let (q_type, next) = read_u16(buf, fixed).ok_or_else(truncated)?;
        let (q_class, next) = read_u16(buf, next).ok_or_else(truncated)?;

        let question = Self {
            name,
            q_type: q_type.into(),
            q_class: q_class.into(),
        };
        Ok((question, next))
    }

    /// Converts a Question to a byte stream.
    pub fn to_bytes(&self, bytes: &mut Bytes) {
        self.name.to_bytes(bytes);
        bytes.write_u16(self.q_type.into());
        bytes.write_u16(self.q_class.into());
    }
}

/// A DNS resource record.
///
/// The record data is kept as raw bytes. Only A records are interpreted, see
/// [`Record::addr`].
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Record {
    pub name: Name,
    pub r_type: RecordType,
    pub class: Class,
    pub ttl: u32,
    pub data: Vec<u8>,
}

impl Record {
    /// Creates an IPv4 address record.
    pub fn a(name: Name, class: Class, ttl: u32, addr: Ipv4Addr) -> Self {
        Self {
            name,
            r_type: RecordType::A,
            class,
            ttl,
            data: addr.octets().to_vec(),
        }
    }

    /// Returns the address of an A record with four bytes of data.
    pub fn addr(&self) -> Option<Ipv4Addr> {
        if self.r_type != RecordType::A {
            return None;
        }
        let octets: [u8; 4] = self.data.as_slice().try_into().ok()?;
        Some(Ipv4Addr::from(octets))
    }

    /// Decodes a record starting at `offset`.
    pub fn from_bytes(buf: &[u8], offset: usize) -> Result<(Self, usize)> {
        let (name, fixed) = Name::from_bytes(buf, offset)?;
        let truncated = || Error::TruncatedRecord { offset };
        let (r_type, next) = read_u16(buf, fixed).ok_or_else(truncated)?;
        let (class, next) = read_u16(buf, next).ok_or_else(truncated)?;
        let (ttl, next) = read_u32(buf, next).ok_or_else(truncated)?;
        let (rd_len, next) = read_u16(buf, next).ok_or_else(truncated)?;
        let (data, next) = read_exact(buf, next, rd_len as usize).ok_or_else(truncated)?;

        let record = Self {
            name,
            r_type: r_type.into(),
            class: class.into(),
            ttl,
            data: data.to_vec(),
        };
        Ok((record, next))
    }

    /// Converts a Record to a byte stream.
    ///
    /// Fails without writing anything if the data does not fit a 16-bit
    /// RDLENGTH.
    pub fn to_bytes(&self, bytes: &mut Bytes) -> Result<()> {
        let rd_len = u16::try_from(self.data.len()).map_err(|_| Error::RecordTooLong {
            len: self.data.len(),
        })?;

        self.name.to_bytes(bytes);
        bytes.write_u16(self.r_type.into());
        bytes.write_u16(self.class.into());
        bytes.write_u32(self.ttl);
        bytes.write_u16(rd_len);
        bytes.write_all(&self.data);
        Ok(())
    }

    /// Returns the length of the uncompressed wire form.
    pub fn wire_len(&self) -> usize {
        self.name.wire_len() + 10 + self.data.len()
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {} {} ", self.name, self.class, self.ttl, self.r_type)?;
        match self.addr() {
            Some(addr) => write!(f, "{addr}"),
            None => {
                write!(f, "\\# {}", self.data.len())?;
                if !self.data.is_empty() {
                    write!(f, " ")?;
                }
                for byte in &self.data {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}
