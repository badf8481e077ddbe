use bitstream_io::{BigEndian, BitReader, BitWriter};

use crate::error::DnsError;

use super::header::DNSHeader;
use super::question::DNSQuestion;
use super::resource::DNSResource;
use super::types::{DNSOpcode, DNSResponseCode};

#[derive(Clone, Debug)]
pub struct DNSPacket {
    pub header: DNSHeader,
    pub questions: Vec<DNSQuestion>,
    pub answers: Vec<DNSResource>,
    pub authorities: Vec<DNSResource>,
    pub additional: Vec<DNSResource>,
}

impl DNSPacket {
    pub fn query(id: u16, question: DNSQuestion) -> Self {
        DNSPacket {
            header: DNSHeader {
                id,
                qr: false,
                opcode: DNSOpcode::Query,
                aa: false,
                tc: false,
                rd: true,
                ra: false,
                z: 0,
                rcode: DNSResponseCode::NoError,
                qdcount: 1,
                ancount: 0,
                nscount: 0,
                arcount: 0,
            },
            questions: vec![question],
            answers: Vec::new(),
            authorities: Vec::new(),
            additional: Vec::new(),
        }
    }

    /// Builds an empty response shell that mirrors the question and id of `self`,
    /// with `qr`/`ra` set and the given response code. Callers attach answers.
    pub fn response_shell(&self, rcode: DNSResponseCode) -> Self {
        DNSPacket {
            header: DNSHeader {
                id: self.header.id,
                qr: true,
                opcode: self.header.opcode,
                aa: false,
                tc: false,
                rd: self.header.rd,
                ra: true,
                z: 0,
                rcode,
                qdcount: self.header.qdcount,
                ancount: 0,
                nscount: 0,
                arcount: 0,
            },
            questions: self.questions.clone(),
            answers: Vec::new(),
            authorities: Vec::new(),
            additional: Vec::new(),
        }
    }

    fn sync_counts(&mut self) {
        self.header.qdcount = self.questions.len() as u16;
        self.header.ancount = self.answers.len() as u16;
        self.header.nscount = self.authorities.len() as u16;
        self.header.arcount = self.additional.len() as u16;
    }

    pub fn question_matches(&self, other: &DNSPacket) -> bool {
        self.questions.len() == other.questions.len()
            && self
                .questions
                .iter()
                .zip(other.questions.iter())
                .all(|(a, b)| a.name().eq_ignore_ascii_case(&b.name()) && a.qtype == b.qtype)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DnsError> {
        let mut packet = self.clone();
        packet.sync_counts();

        let mut bytes = Vec::new();
        {
            let mut writer = BitWriter::endian(&mut bytes, BigEndian);
            packet.header.write(&mut writer)?;
            for question in &packet.questions {
                question.write(&mut writer)?;
            }
            for answer in &packet.answers {
                answer.write(&mut writer)?;
            }
            for authority in &packet.authorities {
                authority.write(&mut writer)?;
            }
            for additional in &packet.additional {
                additional.write(&mut writer)?;
            }
        }
        Ok(bytes)
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, DnsError> {
        let mut reader = BitReader::endian(buf, BigEndian);
        let header = DNSHeader::read(&mut reader)?;

        let mut questions = Vec::with_capacity(header.qdcount as usize);
        for _ in 0..header.qdcount {
            questions.push(DNSQuestion::read(&mut reader, buf)?);
        }

        let mut answers = Vec::with_capacity(header.ancount as usize);
        for _ in 0..header.ancount {
            answers.push(DNSResource::read(&mut reader, buf)?);
        }

        let mut authorities = Vec::with_capacity(header.nscount as usize);
        for _ in 0..header.nscount {
            authorities.push(DNSResource::read(&mut reader, buf)?);
        }

        let mut additional = Vec::with_capacity(header.arcount as usize);
        for _ in 0..header.arcount {
            additional.push(DNSResource::read(&mut reader, buf)?);
        }

        Ok(DNSPacket {
            header,
            questions,
            answers,
            authorities,
            additional,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::question::DNSQuestion;
    use super::super::resource::DNSResource;
    use super::super::types::DNSResourceType;
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn query_then_response_round_trips() {
        let query = DNSPacket::query(1234, DNSQuestion::new("example.com", DNSResourceType::A));
        let bytes = query.to_bytes().unwrap();
        let parsed = DNSPacket::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.header.id, 1234);
        assert_eq!(parsed.questions[0].name(), "example.com");

        let mut response = parsed.response_shell(DNSResponseCode::NoError);
        response
            .answers
            .push(DNSResource::new_a("example.com", 300, Ipv4Addr::new(1, 1, 1, 1)));
        let response_bytes = response.to_bytes().unwrap();
        let parsed_response = DNSPacket::from_bytes(&response_bytes).unwrap();
        assert_eq!(parsed_response.header.ancount, 1);
        assert!(parsed_response.question_matches(&query));
    }
}
