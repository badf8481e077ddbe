use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter};
use serde::{Deserialize, Serialize};

use crate::error::DnsError;

use super::types::{DNSResourceClass, DNSResourceType};
use super::wire::{labels_to_name, name_to_labels, read_name, write_name};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DNSQuestion {
    pub labels: Vec<String>,
    pub qtype: DNSResourceType,
    pub qclass: DNSResourceClass,
}

impl DNSQuestion {
    pub fn new(name: &str, qtype: DNSResourceType) -> Self {
        DNSQuestion {
            labels: name_to_labels(name),
            qtype,
            qclass: DNSResourceClass::IN,
        }
    }

    pub fn name(&self) -> String {
        labels_to_name(&self.labels)
    }

    pub fn write(&self, writer: &mut BitWriter<&mut Vec<u8>, BigEndian>) -> Result<(), DnsError> {
        write_name(writer, &self.labels)?;
        writer
            .write::<u16>(16, self.qtype.into())
            .map_err(|e| DnsError::Parse(e.to_string()))?;
        writer
            .write::<u16>(16, self.qclass.into())
            .map_err(|e| DnsError::Parse(e.to_string()))?;
        Ok(())
    }

    pub fn read(
        reader: &mut BitReader<&[u8], BigEndian>,
        packet_buf: &[u8],
    ) -> Result<Self, DnsError> {
        let labels = read_name(reader, packet_buf)?;
        let err = |e: std::io::Error| DnsError::Parse(e.to_string());
        let qtype = DNSResourceType::from(reader.read::<u16>(16).map_err(err)?);
        let qclass = DNSResourceClass::from(reader.read::<u16>(16).map_err(err)?);
        Ok(DNSQuestion {
            labels,
            qtype,
            qclass,
        })
    }
}
