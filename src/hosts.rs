use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Static name/address overrides, built once at startup and read-only thereafter.
/// Grounded on `gollum/hosts/hosts.go`'s `hmap`/`LookupStaticHostV4`/`LookupStaticHostV6`/
/// `LookupStaticAddr`. The text-file parser itself is out of scope (spec §1, §9); this type
/// takes pre-parsed maps and the CLI bootstrap is responsible for reading the file.
#[derive(Debug, Clone, Default)]
pub struct HostsResolver {
    v4: HashMap<String, Vec<Ipv4Addr>>,
    v6: HashMap<String, Vec<Ipv6Addr>>,
    ptr: HashMap<String, Vec<String>>,
}

impl HostsResolver {
    pub fn new(
        v4: HashMap<String, Vec<Ipv4Addr>>,
        v6: HashMap<String, Vec<Ipv6Addr>>,
        ptr: HashMap<String, Vec<String>>,
    ) -> Self {
        HostsResolver { v4, v6, ptr }
    }

    pub fn lookup_a(&self, name: &str) -> Vec<Ipv4Addr> {
        self.v4
            .get(&name.to_ascii_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    pub fn lookup_aaaa(&self, name: &str) -> Vec<Ipv6Addr> {
        self.v6
            .get(&name.to_ascii_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    pub fn lookup_ptr(&self, reverse_name: &str) -> Vec<String> {
        self.ptr
            .get(&reverse_name.to_ascii_lowercase())
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_empty_slice_for_unknown_name() {
        let hosts = HostsResolver::default();
        assert!(hosts.lookup_a("nowhere.example.").is_empty());
        assert!(hosts.lookup_aaaa("nowhere.example.").is_empty());
        assert!(hosts.lookup_ptr("1.0.0.10.in-addr.arpa.").is_empty());
    }

    #[test]
    fn finds_configured_override() {
        let mut v4 = HashMap::new();
        v4.insert("router.lan".to_string(), vec![Ipv4Addr::new(192, 168, 1, 1)]);
        let hosts = HostsResolver::new(v4, HashMap::new(), HashMap::new());
        assert_eq!(
            hosts.lookup_a("Router.LAN"),
            vec![Ipv4Addr::new(192, 168, 1, 1)]
        );
    }
}
