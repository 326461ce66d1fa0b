//! DNS wire format for A-record lookups and a small authoritative zone.
//!
//! The codec works on plain byte slices. Decoding never trusts the input:
//! every step reads from `(buffer, offset)` and returns the value with the
//! next offset or a typed [`Error`], including for compressed names.

mod bytes;
mod error;
mod lookup;
mod message;
mod name;
mod udp;
mod zone;

pub use bytes::Bytes;
pub use error::{Error, NameError, ReplyMismatch, Result, Section};
pub use lookup::{encode_query, extract_addresses, Addresses};
pub use message::{
    Class, Header, Message, OperationCode, Question, Record, RecordType, ResponseCode, HEADER_LEN,
};
pub use name::{encode_name, Name, MAX_LABEL_LEN, MAX_NAME_LEN, MAX_POINTER_DEPTH};
pub use udp::{UdpTransport, DEFAULT_RESPONSE_SIZE, DEFAULT_TIMEOUT};
pub use zone::{ZoneRecord, ZoneStore, DEFAULT_RECORDS, DEFAULT_TTL};

#[cfg(test)]
mod tests {
    use std::{net::Ipv4Addr, str::FromStr};

    use rand::{rngs::StdRng, Rng, SeedableRng};

    use crate::{Class, Message, Name, Question, Record, RecordType};

    /// A reply with compressed names in every section.
    fn compressed_reply() -> Vec<u8> {
        vec![
            0x12, 0x34, 0x81, 0x80, 0x00, 0x01, 0x00, 0x02, 0x00, 0x01, 0x00, 0x01,
            // question: www.example.com A IN
            0x03, b'w', b'w', b'w', 0x07, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0x03, b'c',
            b'o', b'm', 0x00, 0x00, 0x01, 0x00, 0x01,
            // answer: www.example.com CNAME example.com
            0xc0, 0x0c, 0x00, 0x05, 0x00, 0x01, 0x00, 0x00, 0x00, 0x3c, 0x00, 0x02, 0xc0, 0x10,
            // answer: example.com A 93.184.216.34
            0xc0, 0x10, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x3c, 0x00, 0x04, 93, 184,
            216, 34,
            // authority: example.com NS ns.example.com
            0xc0, 0x10, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x0e, 0x10, 0x00, 0x05, 0x02, b'n',
            b's', 0xc0, 0x10,
            // additional: ns.example.com A 192.0.2.1
            0xc0, 0x4b, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x0e, 0x10, 0x00, 0x04, 192, 0, 2,
            1,
        ]
    }

    fn pick_name(rng: &mut StdRng) -> Name {
        let names = ["example.com", "a.b.c.d.e", "x", "Mixed.Case.Org"];
        Name::from_str(names[rng.random_range(0..names.len())]).unwrap()
    }

    fn random_message(rng: &mut StdRng) -> Message {
        let mut message = Message::new();
        message.header.id = rng.random();
        message.header.is_response = rng.random();
        message.header.recursion_desired = rng.random();

        for _ in 0..rng.random_range(0..3) {
            message.questions.push(Question {
                name: pick_name(rng),
                q_type: rng.random::<u16>().into(),
                q_class: rng.random::<u16>().into(),
            });
        }
        for _ in 0..rng.random_range(0..4) {
            let data: Vec<u8> = (0..rng.random_range(0..20)).map(|_| rng.random()).collect();
            message.answer_records.push(Record {
                name: pick_name(rng),
                r_type: rng.random::<u16>().into(),
                class: Class::In,
                ttl: rng.random(),
                data,
            });
        }
        if rng.random_ratio(1, 2) {
            message.additional_records.push(Record::a(
                pick_name(rng),
                Class::In,
                rng.random(),
                Ipv4Addr::from(rng.random::<u32>()),
            ));
        }

        message.header.question_count = message.questions.len() as u16;
        message.header.answer_count = message.answer_records.len() as u16;
        message.header.additional_count = message.additional_records.len() as u16;
        message
    }

    #[test]
    fn compressed_reply_decodes() {
        let message = Message::from_bytes(&compressed_reply()).unwrap();
        let example = Name::from_str("example.com").unwrap();

        assert_eq!(message.answer_records.len(), 2);
        assert_eq!(message.answer_records[0].r_type, RecordType::Cname);
        // rdata is kept as sent, pointer included
        assert_eq!(message.answer_records[0].data, [0xc0, 0x10]);
        assert_eq!(message.answer_records[1].name, example);
        assert_eq!(
            message.addresses().collect::<Vec<_>>(),
            [Ipv4Addr::new(93, 184, 216, 34)]
        );
        assert_eq!(
            message.additional_records[0].name,
            Name::from_str("ns.example.com").unwrap()
        );
    }

    #[test]
    fn random_messages_round_trip() {
        let mut rng = StdRng::seed_from_u64(1035);
        for _ in 0..1000 {
            let message = random_message(&mut rng);
            let bytes = message.encode().unwrap();
            assert_eq!(Message::from_bytes(&bytes).unwrap(), message);
        }
    }

    #[test]
    fn random_buffers_never_panic() {
        let mut rng = StdRng::seed_from_u64(0xd15ea5e);
        let mut buf = vec![0u8; 600];
        for _ in 0..20_000 {
            let len = rng.random_range(0..buf.len());
            rng.fill(&mut buf[..len]);
            // make a header that claims a handful of entries half the time
            if len >= 12 && rng.random_ratio(1, 2) {
                buf[4..12].fill(0);
                buf[5] = rng.random_range(0..4);
                buf[7] = rng.random_range(0..4);
            }
            let _ = Message::from_bytes(&buf[..len]);
            let _ = Name::from_bytes(&buf[..len], rng.random_range(0..=len));
        }
    }

    #[test]
    fn mutated_replies_never_panic() {
        let original = compressed_reply();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20_000 {
            let mut buf = original.clone();
            for _ in 0..rng.random_range(1..4) {
                let i = rng.random_range(0..buf.len());
                buf[i] = rng.random();
            }
            let end = rng.random_range(0..=buf.len());
            let _ = Message::from_bytes(&buf[..end]);
        }
    }

    #[test]
    fn compressed_reply_prefixes_fail() {
        let buf = compressed_reply();
        for end in 0..buf.len() {
            assert!(Message::from_bytes(&buf[..end]).is_err(), "prefix {end}");
        }
    }
}
