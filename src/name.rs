use std::{fmt::Display, str::FromStr};

use serde::Serialize;

use crate::{
    bytes::{read_exact, read_u16, read_u8, Bytes},
    error::{Error, NameError, Result},
};

/// Longest label allowed on the wire.
pub const MAX_LABEL_LEN: usize = 63;

/// Longest name allowed on the wire, counting length bytes and the root label.
pub const MAX_NAME_LEN: usize = 255;

/// Longest chain of compression pointers followed while decoding one name.
pub const MAX_POINTER_DEPTH: usize = 32;

/// A DNS label.
///
/// Labels hold raw bytes; the wire format does not restrict them to ASCII.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
struct Label(Vec<u8>);

impl Label {
    /// Converts a Label to a byte stream.
    fn to_bytes(&self, bytes: &mut Bytes) {
        bytes.write(self.0.len() as u8);
        bytes.write_all(&self.0);
    }

    /// Returns the length of the label.
    fn len(&self) -> usize {
        self.0.len()
    }
}

/// A fully qualified DNS domain name.
///
/// The root label is implicit, so `example.com.` holds two labels. Every Name
/// is valid by construction: labels are 1 to 63 bytes long and the encoded
/// form fits in 255 bytes. Case is preserved.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Default)]
pub struct Name {
    labels: Vec<Label>,
}

impl Name {
    /// Returns the root name.
    pub fn root() -> Self {
        Self { labels: vec![] }
    }

    /// Creates a Name from labels, checking label and name lengths.
    fn from_labels(labels: Vec<Label>) -> std::result::Result<Self, NameError> {
        for label in &labels {
            if label.len() == 0 {
                return Err(NameError::EmptyLabel);
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(NameError::LabelTooLong);
            }
        }

        let name = Self { labels };
        if name.wire_len() > MAX_NAME_LEN {
            return Err(NameError::TooLong);
        }

        Ok(name)
    }

    /// Decodes a name starting at `offset` in a complete message.
    ///
    /// Compression pointers are followed and must point strictly before
    /// their own position. Returns the name and the offset of the byte after
    /// it, which for a compressed name is the byte after the first pointer.
    pub fn from_bytes(buf: &[u8], offset: usize) -> Result<(Self, usize)> {
        let mut labels = vec![];
        let next = read_labels(buf, offset, 0, &mut labels)?;
        Ok((Self { labels }, next))
    }

    /// Converts a Name to a byte stream. Names are never compressed.
    pub fn to_bytes(&self, bytes: &mut Bytes) {
        for label in &self.labels {
            label.to_bytes(bytes);
        }
        bytes.write(0);
    }

    /// Returns the length of the uncompressed wire form.
    pub fn wire_len(&self) -> usize {
        wire_len(&self.labels)
    }

    /// Returns true if this name represents the root name.
    pub fn is_root(&self) -> bool {
        self.labels.is_empty()
    }

    /// Returns an iterator over the raw labels, leftmost first.
    pub fn labels(&self) -> impl Iterator<Item = &[u8]> {
        self.labels.iter().map(|l| l.0.as_slice())
    }

    /// Returns a copy of the name with ASCII letters lower-cased.
    pub fn to_lowercase(&self) -> Name {
        let labels = self
            .labels
            .iter()
            .map(|l| Label(l.0.to_ascii_lowercase()))
            .collect();
        Self { labels }
    }
}

fn wire_len(labels: &[Label]) -> usize {
    labels.iter().fold(1, |acc, l| acc + l.len() + 1)
}

fn malformed(offset: usize, reason: NameError) -> Error {
    Error::MalformedName { offset, reason }
}

/// Appends the labels found at `offset` to `labels`, following at most
/// `MAX_POINTER_DEPTH - depth` further pointers.
fn read_labels(buf: &[u8], offset: usize, depth: usize, labels: &mut Vec<Label>) -> Result<usize> {
    let mut offset = offset;
    loop {
        let (len, after_len) =
            read_u8(buf, offset).ok_or_else(|| malformed(offset, NameError::Truncated))?;

        match len {
            0 => return Ok(after_len),
            1..=63 => {
                let (label, next) = read_exact(buf, after_len, len as usize)
                    .ok_or_else(|| malformed(offset, NameError::Truncated))?;
                labels.push(Label(label.to_vec()));
                if wire_len(labels) > MAX_NAME_LEN {
                    return Err(malformed(offset, NameError::TooLong));
                }
                offset = next;
            }
            64..=191 => return Err(malformed(offset, NameError::ReservedLabelType(len))),
            _ => {
                let (ptr, next) =
                    read_u16(buf, offset).ok_or_else(|| malformed(offset, NameError::Truncated))?;
                let target = (ptr & 0x3fff) as usize;
                if target >= offset {
                    return Err(malformed(offset, NameError::ForwardPointer { target }));
                }
                if depth >= MAX_POINTER_DEPTH {
                    return Err(malformed(offset, NameError::PointerDepth));
                }
                read_labels(buf, target, depth + 1, labels)?;
                return Ok(next);
            }
        }
    }
}

/// Encodes a textual name in uncompressed wire form.
pub fn encode_name(name: &str) -> Result<Vec<u8>> {
    let name = Name::from_str(name)?;
    let mut bytes = Bytes::new();
    name.to_bytes(&mut bytes);
    Ok(bytes.into_vec())
}

impl FromStr for Name {
    type Err = Error;

    /// Parses a dot-separated name. A trailing dot is optional; `""` and `"."`
    /// are the root name.
    ///
    /// Accepts the escapes that `Display` writes: `\.` and `\\` for a literal
    /// dot or backslash, and `\DDD` for any byte by its decimal value.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = |reason| Error::InvalidName {
            name: s.to_owned(),
            reason,
        };

        if s == "." {
            return Ok(Self::root());
        }

        let labels = parse_labels(s).map_err(invalid)?;
        Self::from_labels(labels).map_err(invalid)
    }
}

/// Splits text on unescaped dots. A single trailing dot ends the name.
fn parse_labels(s: &str) -> std::result::Result<Vec<Label>, NameError> {
    let mut labels = vec![];
    let mut label = vec![];
    let mut bytes = s.bytes();

    while let Some(byte) = bytes.next() {
        match byte {
            b'.' => labels.push(Label(std::mem::take(&mut label))),
            b'\\' => label.push(unescape(&mut bytes)?),
            _ => label.push(byte),
        }
    }
    if !label.is_empty() {
        labels.push(Label(label));
    }

    Ok(labels)
}

/// Reads the rest of an escape sequence after its backslash.
fn unescape(bytes: &mut impl Iterator<Item = u8>) -> std::result::Result<u8, NameError> {
    let first = bytes.next().ok_or(NameError::BadEscape)?;
    if !first.is_ascii_digit() {
        return Ok(first);
    }

    let mut value = u32::from(first - b'0');
    for _ in 0..2 {
        match bytes.next() {
            Some(digit) if digit.is_ascii_digit() => value = value * 10 + u32::from(digit - b'0'),
            _ => return Err(NameError::BadEscape),
        }
    }
    u8::try_from(value).map_err(|_| NameError::BadEscape)
}

impl Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_root() {
            return write!(f, ".");
        }

        for label in &self.labels {
            for &byte in &label.0 {
                match byte {
                    b'.' => write!(f, "\\.")?,
                    b'\\' => write!(f, "\\\\")?,
                    0x21..=0x7e => write!(f, "{}", byte as char)?,
                    _ => write!(f, "\\{byte:03}")?,
                }
            }
            write!(f, ".")?;
        }
        Ok(())
    }
}

impl Serialize for Name {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
