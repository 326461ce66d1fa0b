//! Outbound A queries and the addresses carried by their replies.

use std::{net::Ipv4Addr, str::FromStr};

use crate::{
    error::{Error, ReplyMismatch, Result},
    message::{Class, Header, Message, Question, Record, RecordType},
    name::Name,
};

impl Message {
    /// Creates a standard query with recursion desired for the A records of
    /// `name`.
    ///
    /// Picking the ID is up to the caller.
    pub fn query(id: u16, name: Name) -> Self {
        Self {
            header: Header {
                id,
                recursion_desired: true,
                question_count: 1,
                ..Default::default()
            },
            questions: vec![Question {
                name,
                q_type: RecordType::A,
                q_class: Class::In,
            }],
            ..Default::default()
        }
    }

    /// Checks that this message is the reply to the query with `id`.
    pub fn check_reply(&self, id: u16) -> Result<()> {
        if !self.header.is_response {
            return Err(Error::UnexpectedReply(ReplyMismatch::NotAResponse));
        }
        if self.header.id != id {
            return Err(Error::UnexpectedReply(ReplyMismatch::IdMismatch {
                expected: id,
                actual: self.header.id,
            }));
        }
        Ok(())
    }

    /// Returns the IPv4 addresses in the answer section, in order.
    pub fn addresses(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        self.answer_records.iter().filter_map(Record::addr)
    }
}

/// Encodes an A query for `name` with the given ID.
pub fn encode_query(id: u16, name: &str) -> Result<Vec<u8>> {
    let name = Name::from_str(name)?;
    Message::query(id, name).encode()
}

/// Decodes the reply to the query with `expected_id` and returns its answer
/// addresses.
///
/// A buffer that does not parse fails with the structural error; a message
/// that parses but is not our reply fails with [`Error::UnexpectedReply`].
pub fn extract_addresses(buf: &[u8], expected_id: u16) -> Result<Addresses> {
    let reply = Message::from_bytes(buf)?;
    reply.check_reply(expected_id)?;
    Ok(Addresses {
        records: reply.answer_records.into_iter(),
    })
}

/// Addresses of the A records in an answer section.
///
/// Yields one address per A record with four bytes of data, in answer order,
/// duplicates included. It can be consumed only once.
#[derive(Debug)]
pub struct Addresses {
    records: std::vec::IntoIter<Record>,
}

impl Iterator for Addresses {
    type Item = Ipv4Addr;

    fn next(&mut self) -> Option<Self::Item> {
        self.records.find_map(|record| record.addr())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.records.size_hint().1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytes::Bytes;

    fn name(s: &str) -> Name {
        Name::from_str(s).unwrap()
    }

    fn reply(id: u16, answers: Vec<Record>) -> Vec<u8> {
        let mut message = Message::query(id, name("example.com"));
        message.header.is_response = true;
        message.answer_records = answers;
        message.encode().unwrap()
    }

    #[test]
    fn query_bytes_for_example_com() {
        let bytes = encode_query(0x1234, "example.com").unwrap();
        let expected = [
            0x12, 0x34, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
            0x07, 0x65, 0x78, 0x61, 0x6d, 0x70, 0x6c, 0x65, 0x03, 0x63, 0x6f, 0x6d, 0x00, //
            0x00, 0x01, 0x00, 0x01,
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn query_rejects_bad_names() {
        assert!(matches!(
            encode_query(1, "bad..name"),
            Err(Error::InvalidName { .. })
        ));
    }

    #[test]
    fn query_round_trip() {
        let query = Message::query(7, name("example.com"));
        let mut bytes = Bytes::new();
        query.to_bytes(&mut bytes).unwrap();
        assert_eq!(Message::from_bytes(bytes.used()).unwrap(), query);
    }

    #[test]
    fn extract_in_order_with_duplicates() {
        let owner = name("example.com");
        let buf = reply(
            0x1234,
            vec![
                Record::a(owner.clone(), Class::In, 60, Ipv4Addr::new(10, 0, 0, 1)),
                Record {
                    name: owner.clone(),
                    r_type: RecordType::Cname,
                    class: Class::In,
                    ttl: 60,
                    data: crate::name::encode_name("alias.example.com").unwrap(),
                },
                Record::a(owner.clone(), Class::In, 60, Ipv4Addr::new(10, 0, 0, 2)),
                Record::a(owner.clone(), Class::In, 60, Ipv4Addr::new(10, 0, 0, 1)),
                Record {
                    name: owner,
                    r_type: RecordType::A,
                    class: Class::In,
                    ttl: 60,
                    data: vec![1, 2, 3, 4, 5],
                },
            ],
        );

        let addrs: Vec<_> = extract_addresses(&buf, 0x1234).unwrap().collect();
        assert_eq!(
            addrs,
            [
                Ipv4Addr::new(10, 0, 0, 1),
                Ipv4Addr::new(10, 0, 0, 2),
                Ipv4Addr::new(10, 0, 0, 1)
            ]
        );
    }

    #[test]
    fn addresses_are_consumed_once() {
        let owner = name("example.com");
        let buf = reply(
            9,
            vec![Record::a(owner, Class::In, 60, Ipv4Addr::new(1, 1, 1, 1))],
        );
        let mut addrs = extract_addresses(&buf, 9).unwrap();
        assert_eq!(addrs.next(), Some(Ipv4Addr::new(1, 1, 1, 1)));
        assert_eq!(addrs.next(), None);
        assert_eq!(addrs.next(), None);
    }

    #[test]
    fn id_mismatch_is_unexpected_reply() {
        let buf = reply(0x4321, vec![]);
        assert_eq!(
            extract_addresses(&buf, 0x1234).unwrap_err(),
            Error::UnexpectedReply(ReplyMismatch::IdMismatch {
                expected: 0x1234,
                actual: 0x4321
            })
        );
    }

    #[test]
    fn query_is_not_a_reply() {
        let buf = encode_query(0x1234, "example.com").unwrap();
        assert_eq!(
            extract_addresses(&buf, 0x1234).unwrap_err(),
            Error::UnexpectedReply(ReplyMismatch::NotAResponse)
        );
    }

    #[test]
    fn malformed_reply_is_not_unexpected_reply() {
        let mut buf = reply(1, vec![]);
        buf.truncate(20);
        let err = extract_addresses(&buf, 1).unwrap_err();
        assert!(!matches!(err, Error::UnexpectedReply(_)), "{err}");
    }

    #[test]
    fn borrowed_addresses() {
        let owner = name("example.com");
        let buf = reply(
            3,
            vec![Record::a(owner, Class::In, 60, Ipv4Addr::new(8, 8, 4, 4))],
        );
        let message = Message::from_bytes(&buf).unwrap();
        assert!(message.check_reply(3).is_ok());
        assert_eq!(
            message.addresses().collect::<Vec<_>>(),
            [Ipv4Addr::new(8, 8, 4, 4)]
        );
    }
}
