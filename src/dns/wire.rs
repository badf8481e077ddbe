use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter};

use crate::error::DnsError;

/// Shared read/write behavior for every packet component. Mirrors the split between
/// a simple `read` (no compression support) and `read_with_buffer` (follows pointers
/// against the full datagram) that name decompression needs.
pub trait PacketComponent: Sized {
    fn write(&self, writer: &mut BitWriter<&mut Vec<u8>, BigEndian>) -> Result<(), DnsError>;

    fn read_with_buffer(
        reader: &mut BitReader<&[u8], BigEndian>,
        packet_buf: &[u8],
    ) -> Result<Self, DnsError>;
}

/// Domain names over the wire: length-prefixed labels terminated by a zero byte, with
/// support for the 0xC0 compression pointer (a 14-bit offset into `packet_buf`).
pub fn read_name(
    reader: &mut BitReader<&[u8], BigEndian>,
    packet_buf: &[u8],
) -> Result<Vec<String>, DnsError> {
    let mut labels = Vec::new();
    let mut jumps = 0;

    loop {
        let len = reader
            .read::<u8>(8)
            .map_err(|e| DnsError::Parse(e.to_string()))?;

        if len == 0 {
            break;
        }

        if len & 0xC0 == 0xC0 {
            let lo = reader
                .read::<u8>(8)
                .map_err(|e| DnsError::Parse(e.to_string()))?;
            let pointer = (((len & 0x3F) as usize) << 8) | lo as usize;
            let mut tail = read_name_at(packet_buf, pointer, &mut jumps)?;
            labels.append(&mut tail);
            return Ok(labels);
        }

        if len > 63 {
            return Err(DnsError::Parse(format!("label length {len} exceeds 63")));
        }

        let mut buf = vec![0u8; len as usize];
        reader
            .read_bytes(&mut buf)
            .map_err(|e| DnsError::Parse(e.to_string()))?;
        labels.push(String::from_utf8_lossy(&buf).into_owned());

        jumps += 1;
        if jumps > 128 {
            return Err(DnsError::Parse("name has too many labels".into()));
        }
    }

    Ok(labels)
}

/// Follows a compression pointer by re-reading labels directly out of the raw packet
/// bytes starting at `offset`, recursing through further pointers as needed.
fn read_name_at(buf: &[u8], mut offset: usize, jumps: &mut u32) -> Result<Vec<String>, DnsError> {
    let mut labels = Vec::new();

    loop {
        *jumps += 1;
        if *jumps > 128 {
            return Err(DnsError::Parse("compression pointer loop".into()));
        }

        let len = *buf
            .get(offset)
            .ok_or_else(|| DnsError::Parse("pointer past end of packet".into()))?;
        offset += 1;

        if len == 0 {
            return Ok(labels);
        }

        if len & 0xC0 == 0xC0 {
            let lo = *buf
                .get(offset)
                .ok_or_else(|| DnsError::Parse("truncated pointer".into()))?;
            let next = (((len & 0x3F) as usize) << 8) | lo as usize;
            let mut tail = read_name_at(buf, next, jumps)?;
            labels.append(&mut tail);
            return Ok(labels);
        }

        if len > 63 {
            return Err(DnsError::Parse(format!("label length {len} exceeds 63")));
        }

        let end = offset + len as usize;
        let slice = buf
            .get(offset..end)
            .ok_or_else(|| DnsError::Parse("label past end of packet".into()))?;
        labels.push(String::from_utf8_lossy(slice).into_owned());
        offset = end;
    }
}

/// Writes `labels` uncompressed (this resolver never emits compression pointers).
pub fn write_name(
    writer: &mut BitWriter<&mut Vec<u8>, BigEndian>,
    labels: &[String],
) -> Result<(), DnsError> {
    for label in labels {
        if label.is_empty() {
            continue;
        }
        if label.len() > 63 {
            return Err(DnsError::Parse(format!("label {label:?} exceeds 63 bytes")));
        }
        writer
            .write::<u8>(8, label.len() as u8)
            .map_err(|e| DnsError::Parse(e.to_string()))?;
        writer
            .write_bytes(label.as_bytes())
            .map_err(|e| DnsError::Parse(e.to_string()))?;
    }
    writer
        .write::<u8>(8, 0)
        .map_err(|e| DnsError::Parse(e.to_string()))?;
    Ok(())
}

/// Joins wire labels into the usual dotted presentation form, e.g. `["www","example","com"]`
/// becomes `"www.example.com"`. The root name becomes `"."`.
pub fn labels_to_name(labels: &[String]) -> String {
    if labels.is_empty() {
        ".".to_string()
    } else {
        labels.join(".")
    }
}

pub fn name_to_labels(name: &str) -> Vec<String> {
    let trimmed = name.trim_end_matches('.');
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('.').map(|s| s.to_string()).collect()
    }
}
