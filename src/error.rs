use std::fmt::Display;

use thiserror::Error;

/// Errors produced while encoding or decoding DNS messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The buffer cannot hold a 12-byte message header.
    #[error("buffer of {len} bytes is too short for a message header")]
    ShortBuffer { len: usize },

    /// A name on the wire could not be decoded.
    #[error("malformed name at offset {offset}: {reason}")]
    MalformedName { offset: usize, reason: NameError },

    /// The fixed fields or data of a question or record run past the buffer.
    #[error("truncated record at offset {offset}")]
    TruncatedRecord { offset: usize },

    /// A section holds a different number of entries than the header declares.
    #[error("{section} section does not match its declared count of {declared}")]
    CountMismatch { section: Section, declared: u16 },

    /// A well-formed message that is not the reply we were waiting for.
    #[error("unexpected reply: {0}")]
    UnexpectedReply(ReplyMismatch),

    /// A zone entry whose address is not an IPv4 address.
    #[error("invalid IPv4 address: {0:?}")]
    InvalidAddress(String),

    /// A textual name that cannot be encoded.
    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: NameError },

    /// A section has more entries than a 16-bit count can describe.
    #[error("too many entries in {0} section")]
    SectionOverflow(Section),

    /// Record data longer than a 16-bit RDLENGTH can describe.
    #[error("record data of {len} bytes is too long")]
    RecordTooLong { len: usize },
}

/// The reason a name was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    /// A length byte with top bits `01` or `10`.
    #[error("label length byte {0:#04x} uses reserved bits")]
    ReservedLabelType(u8),
    /// A pointer to its own position or later.
    #[error("pointer to offset {target} does not point backward")]
    ForwardPointer { target: usize },
    /// More chained pointers than `MAX_POINTER_DEPTH`.
    #[error("pointer chain is too deep")]
    PointerDepth,
    /// The buffer ends inside the name.
    #[error("name runs past the end of the buffer")]
    Truncated,
    /// The encoded name exceeds 255 bytes.
    #[error("name is longer than 255 bytes")]
    TooLong,
    /// A label exceeds 63 bytes.
    #[error("label is longer than 63 bytes")]
    LabelTooLong,
    /// Two dots in a row, or a leading dot.
    #[error("empty label")]
    EmptyLabel,
    /// A backslash not followed by a character or by three digits up to 255.
    #[error("invalid escape sequence")]
    BadEscape,
}

/// Why a reply was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyMismatch {
    /// The QR bit is clear.
    NotAResponse,
    /// The ID differs from the query's.
    IdMismatch { expected: u16, actual: u16 },
}

impl Display for ReplyMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplyMismatch::NotAResponse => write!(f, "message is not a response"),
            ReplyMismatch::IdMismatch { expected, actual } => {
                write!(f, "expected id {expected:#06x}, got {actual:#06x}")
            }
        }
    }
}

/// A section of a DNS message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Question,
    Answer,
    Authority,
    Additional,
}

impl Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Section::Question => "question",
            Section::Answer => "answer",
            Section::Authority => "authority",
            Section::Additional => "additional",
        };

        write!(f, "{name}")
    }
}

pub type Result<T> = std::result::Result<T, Error>;
