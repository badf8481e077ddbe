use serde::{Deserialize, Serialize};

/// Record types this resolver understands on the wire. Anything else round-trips
/// as `Other(raw)` so unknown RRs from upstream can still be cached and re-served.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DNSResourceType {
    #[default]
    A,
    NS,
    CNAME,
    SOA,
    PTR,
    MX,
    TXT,
    AAAA,
    SRV,
    OPT,
    ANY,
    Other(u16),
}

impl From<u16> for DNSResourceType {
    fn from(value: u16) -> Self {
        match value {
            1 => DNSResourceType::A,
            2 => DNSResourceType::NS,
            5 => DNSResourceType::CNAME,
            6 => DNSResourceType::SOA,
            12 => DNSResourceType::PTR,
            15 => DNSResourceType::MX,
            16 => DNSResourceType::TXT,
            28 => DNSResourceType::AAAA,
            33 => DNSResourceType::SRV,
            41 => DNSResourceType::OPT,
            255 => DNSResourceType::ANY,
            other => DNSResourceType::Other(other),
        }
    }
}

impl From<DNSResourceType> for u16 {
    fn from(value: DNSResourceType) -> Self {
        match value {
            DNSResourceType::A => 1,
            DNSResourceType::NS => 2,
            DNSResourceType::CNAME => 5,
            DNSResourceType::SOA => 6,
            DNSResourceType::PTR => 12,
            DNSResourceType::MX => 15,
            DNSResourceType::TXT => 16,
            DNSResourceType::AAAA => 28,
            DNSResourceType::SRV => 33,
            DNSResourceType::OPT => 41,
            DNSResourceType::ANY => 255,
            DNSResourceType::Other(raw) => raw,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DNSResourceClass {
    #[default]
    IN,
    CH,
    ANY,
    Other(u16),
}

impl From<u16> for DNSResourceClass {
    fn from(value: u16) -> Self {
        match value {
            1 => DNSResourceClass::IN,
            3 => DNSResourceClass::CH,
            255 => DNSResourceClass::ANY,
            other => DNSResourceClass::Other(other),
        }
    }
}

impl From<DNSResourceClass> for u16 {
    fn from(value: DNSResourceClass) -> Self {
        match value {
            DNSResourceClass::IN => 1,
            DNSResourceClass::CH => 3,
            DNSResourceClass::ANY => 255,
            DNSResourceClass::Other(raw) => raw,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DNSOpcode {
    #[default]
    Query,
    IQuery,
    Status,
    Other(u8),
}

impl From<u8> for DNSOpcode {
    fn from(value: u8) -> Self {
        match value {
            0 => DNSOpcode::Query,
            1 => DNSOpcode::IQuery,
            2 => DNSOpcode::Status,
            other => DNSOpcode::Other(other),
        }
    }
}

impl From<DNSOpcode> for u8 {
    fn from(value: DNSOpcode) -> Self {
        match value {
            DNSOpcode::Query => 0,
            DNSOpcode::IQuery => 1,
            DNSOpcode::Status => 2,
            DNSOpcode::Other(raw) => raw,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DNSResponseCode {
    #[default]
    NoError,
    FormatError,
    ServerFailure,
    NameError,
    NotImplemented,
    Refused,
    Other(u8),
}

impl From<u8> for DNSResponseCode {
    fn from(value: u8) -> Self {
        match value {
            0 => DNSResponseCode::NoError,
            1 => DNSResponseCode::FormatError,
            2 => DNSResponseCode::ServerFailure,
            3 => DNSResponseCode::NameError,
            4 => DNSResponseCode::NotImplemented,
            5 => DNSResponseCode::Refused,
            other => DNSResponseCode::Other(other),
        }
    }
}

impl From<DNSResponseCode> for u8 {
    fn from(value: DNSResponseCode) -> Self {
        match value {
            DNSResponseCode::NoError => 0,
            DNSResponseCode::FormatError => 1,
            DNSResponseCode::ServerFailure => 2,
            DNSResponseCode::NameError => 3,
            DNSResponseCode::NotImplemented => 4,
            DNSResponseCode::Refused => 5,
            DNSResponseCode::Other(raw) => raw,
        }
    }
}
