use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter};
use serde::{Deserialize, Serialize};

use crate::error::DnsError;

use super::types::{DNSOpcode, DNSResponseCode};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DNSHeader {
    pub id: u16,
    pub qr: bool,
    pub opcode: DNSOpcode,
    pub aa: bool,
    pub tc: bool,
    pub rd: bool,
    pub ra: bool,
    pub z: u8,
    pub rcode: DNSResponseCode,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

impl DNSHeader {
    pub fn write(&self, writer: &mut BitWriter<&mut Vec<u8>, BigEndian>) -> Result<(), DnsError> {
        writer
            .write::<u16>(16, self.id)
            .map_err(|e| DnsError::Parse(e.to_string()))?;
        writer
            .write_bit(self.qr)
            .map_err(|e| DnsError::Parse(e.to_string()))?;
        writer
            .write::<u8>(4, self.opcode.into())
            .map_err(|e| DnsError::Parse(e.to_string()))?;
        writer
            .write_bit(self.aa)
            .map_err(|e| DnsError::Parse(e.to_string()))?;
        writer
            .write_bit(self.tc)
            .map_err(|e| DnsError::Parse(e.to_string()))?;
        writer
            .write_bit(self.rd)
            .map_err(|e| DnsError::Parse(e.to_string()))?;
        writer
            .write_bit(self.ra)
            .map_err(|e| DnsError::Parse(e.to_string()))?;
        writer
            .write::<u8>(3, self.z)
            .map_err(|e| DnsError::Parse(e.to_string()))?;
        writer
            .write::<u8>(4, self.rcode.into())
            .map_err(|e| DnsError::Parse(e.to_string()))?;
        writer
            .write::<u16>(16, self.qdcount)
            .map_err(|e| DnsError::Parse(e.to_string()))?;
        writer
            .write::<u16>(16, self.ancount)
            .map_err(|e| DnsError::Parse(e.to_string()))?;
        writer
            .write::<u16>(16, self.nscount)
            .map_err(|e| DnsError::Parse(e.to_string()))?;
        writer
            .write::<u16>(16, self.arcount)
            .map_err(|e| DnsError::Parse(e.to_string()))?;
        Ok(())
    }

    pub fn read(reader: &mut BitReader<&[u8], BigEndian>) -> Result<Self, DnsError> {
        let err = |e: std::io::Error| DnsError::Parse(e.to_string());
        let id = reader.read::<u16>(16).map_err(err)?;
        let qr = reader.read_bit().map_err(err)?;
        let opcode = DNSOpcode::from(reader.read::<u8>(4).map_err(err)?);
        let aa = reader.read_bit().map_err(err)?;
        let tc = reader.read_bit().map_err(err)?;
        let rd = reader.read_bit().map_err(err)?;
        let ra = reader.read_bit().map_err(err)?;
        let z = reader.read::<u8>(3).map_err(err)?;
        let rcode = DNSResponseCode::from(reader.read::<u8>(4).map_err(err)?);
        let qdcount = reader.read::<u16>(16).map_err(err)?;
        let ancount = reader.read::<u16>(16).map_err(err)?;
        let nscount = reader.read::<u16>(16).map_err(err)?;
        let arcount = reader.read::<u16>(16).map_err(err)?;
        Ok(DNSHeader {
            id,
            qr,
            opcode,
            aa,
            tc,
            rd,
            ra,
            z,
            rcode,
            qdcount,
            ancount,
            nscount,
            arcount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_the_wire() {
        let header = DNSHeader {
            id: 0xbeef,
            qr: true,
            opcode: DNSOpcode::Query,
            aa: false,
            tc: false,
            rd: true,
            ra: true,
            z: 0,
            rcode: DNSResponseCode::NoError,
            qdcount: 1,
            ancount: 2,
            nscount: 0,
            arcount: 0,
        };

        let mut bytes = Vec::new();
        {
            let mut writer = BitWriter::endian(&mut bytes, BigEndian);
            header.write(&mut writer).unwrap();
        }

        let mut reader = BitReader::endian(bytes.as_slice(), BigEndian);
        let parsed = DNSHeader::read(&mut reader).unwrap();
        assert_eq!(parsed, header);
    }
}
