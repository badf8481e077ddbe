use std::net::{Ipv4Addr, Ipv6Addr};

use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter};
use serde::{Deserialize, Serialize};

use crate::error::DnsError;

use super::types::{DNSResourceClass, DNSResourceType};
use super::wire::{labels_to_name, name_to_labels, read_name, write_name};

/// Record data. Anything this resolver doesn't need to inspect structurally (MX, TXT,
/// SOA, and anything not listed at all) is kept as the RFC 3597 "unknown RR" raw bytes
/// rather than modeled field-by-field — this resolver only originates and filters on
/// A/AAAA/CNAME/NS/PTR, everything else just needs to round-trip untouched.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum RData {
    A(Ipv4Addr),
    AAAA(Ipv6Addr),
    CNAME(Vec<String>),
    NS(Vec<String>),
    PTR(Vec<String>),
    Generic(Vec<u8>),
}

impl RData {
    fn rtype(&self) -> DNSResourceType {
        match self {
            RData::A(_) => DNSResourceType::A,
            RData::AAAA(_) => DNSResourceType::AAAA,
            RData::CNAME(_) => DNSResourceType::CNAME,
            RData::NS(_) => DNSResourceType::NS,
            RData::PTR(_) => DNSResourceType::PTR,
            RData::Generic(_) => DNSResourceType::Other(0),
        }
    }

    /// Renders the presentation form used for blocklist matching and logging, e.g.
    /// `"1.1.1.1"` or `"cname.example.com."` — never the full RR line.
    pub fn to_presentation(&self) -> String {
        match self {
            RData::A(addr) => addr.to_string(),
            RData::AAAA(addr) => addr.to_string(),
            RData::CNAME(labels) | RData::NS(labels) | RData::PTR(labels) => {
                labels_to_name(labels)
            }
            RData::Generic(bytes) => hex::encode(bytes),
        }
    }

    fn write_bytes(&self) -> Result<Vec<u8>, DnsError> {
        match self {
            RData::A(addr) => Ok(addr.octets().to_vec()),
            RData::AAAA(addr) => Ok(addr.octets().to_vec()),
            RData::CNAME(labels) | RData::NS(labels) | RData::PTR(labels) => {
                let mut buf = Vec::new();
                {
                    let mut writer = BitWriter::endian(&mut buf, BigEndian);
                    write_name(&mut writer, labels)?;
                }
                Ok(buf)
            }
            RData::Generic(bytes) => Ok(bytes.clone()),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DNSResource {
    pub labels: Vec<String>,
    pub rtype: DNSResourceType,
    pub rclass: DNSResourceClass,
    pub ttl: u32,
    pub rdata: RData,
}

impl DNSResource {
    pub fn new_a(name: &str, ttl: u32, addr: Ipv4Addr) -> Self {
        DNSResource {
            labels: name_to_labels(name),
            rtype: DNSResourceType::A,
            rclass: DNSResourceClass::IN,
            ttl,
            rdata: RData::A(addr),
        }
    }

    pub fn new_aaaa(name: &str, ttl: u32, addr: Ipv6Addr) -> Self {
        DNSResource {
            labels: name_to_labels(name),
            rtype: DNSResourceType::AAAA,
            rclass: DNSResourceClass::IN,
            ttl,
            rdata: RData::AAAA(addr),
        }
    }

    pub fn new_ptr(name: &str, ttl: u32, target: &str) -> Self {
        DNSResource {
            labels: name_to_labels(name),
            rtype: DNSResourceType::PTR,
            rclass: DNSResourceClass::IN,
            ttl,
            rdata: RData::PTR(name_to_labels(target)),
        }
    }

    pub fn name(&self) -> String {
        labels_to_name(&self.labels)
    }

    /// The text used for blocklist matching: the last whitespace-separated token of the
    /// presentation form, matching the resolved address regardless of RR type.
    pub fn blocklist_token(&self) -> String {
        self.rdata.to_presentation()
    }

    pub fn write(&self, writer: &mut BitWriter<&mut Vec<u8>, BigEndian>) -> Result<(), DnsError> {
        write_name(writer, &self.labels)?;
        let rtype = if matches!(self.rdata, RData::Generic(_)) {
            self.rtype
        } else {
            self.rdata.rtype()
        };
        writer
            .write::<u16>(16, rtype.into())
            .map_err(|e| DnsError::Parse(e.to_string()))?;
        writer
            .write::<u16>(16, self.rclass.into())
            .map_err(|e| DnsError::Parse(e.to_string()))?;
        writer
            .write::<u32>(32, self.ttl)
            .map_err(|e| DnsError::Parse(e.to_string()))?;
        let rdata_bytes = self.rdata.write_bytes()?;
        writer
            .write::<u16>(16, rdata_bytes.len() as u16)
            .map_err(|e| DnsError::Parse(e.to_string()))?;
        writer
            .write_bytes(&rdata_bytes)
            .map_err(|e| DnsError::Parse(e.to_string()))?;
        Ok(())
    }

    pub fn read(
        reader: &mut BitReader<&[u8], BigEndian>,
        packet_buf: &[u8],
    ) -> Result<Self, DnsError> {
        let err = |e: std::io::Error| DnsError::Parse(e.to_string());
        let labels = read_name(reader, packet_buf)?;
        let rtype = DNSResourceType::from(reader.read::<u16>(16).map_err(err)?);
        let rclass = DNSResourceClass::from(reader.read::<u16>(16).map_err(err)?);
        let ttl = reader.read::<u32>(32).map_err(err)?;
        let rdlength = reader.read::<u16>(16).map_err(err)?;

        let rdata = match rtype {
            DNSResourceType::A if rdlength == 4 => {
                let mut octets = [0u8; 4];
                reader.read_bytes(&mut octets).map_err(err)?;
                RData::A(Ipv4Addr::from(octets))
            }
            DNSResourceType::AAAA if rdlength == 16 => {
                let mut octets = [0u8; 16];
                reader.read_bytes(&mut octets).map_err(err)?;
                RData::AAAA(Ipv6Addr::from(octets))
            }
            DNSResourceType::CNAME => RData::CNAME(read_name(reader, packet_buf)?),
            DNSResourceType::NS => RData::NS(read_name(reader, packet_buf)?),
            DNSResourceType::PTR => RData::PTR(read_name(reader, packet_buf)?),
            _ => {
                let mut buf = vec![0u8; rdlength as usize];
                reader.read_bytes(&mut buf).map_err(err)?;
                RData::Generic(buf)
            }
        };

        Ok(DNSResource {
            labels,
            rtype,
            rclass,
            ttl,
            rdata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_record_round_trips() {
        let rr = DNSResource::new_a("example.com", 300, Ipv4Addr::new(93, 184, 216, 34));
        let mut bytes = Vec::new();
        {
            let mut writer = BitWriter::endian(&mut bytes, BigEndian);
            rr.write(&mut writer).unwrap();
        }
        let mut reader = BitReader::endian(bytes.as_slice(), BigEndian);
        let parsed = DNSResource::read(&mut reader, &bytes).unwrap();
        assert_eq!(parsed.name(), "example.com");
        assert!(matches!(parsed.rdata, RData::A(addr) if addr == Ipv4Addr::new(93, 184, 216, 34)));
    }

    #[test]
    fn blocklist_token_is_bare_address() {
        let rr = DNSResource::new_a("ads.example.com", 60, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(rr.blocklist_token(), "10.0.0.1");
    }
}
