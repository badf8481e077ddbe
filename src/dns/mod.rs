pub mod header;
pub mod packet;
pub mod question;
pub mod resource;
pub mod types;
pub mod wire;

pub use header::DNSHeader;
pub use packet::DNSPacket;
pub use question::DNSQuestion;
pub use resource::{DNSResource, RData};
pub use types::{DNSOpcode, DNSResourceClass, DNSResourceType, DNSResponseCode};
