use std::collections::HashSet;

use crate::dns::DNSResource;

/// Literal-address blocklist, loaded once at boot from the blacklist file (spec §4.8, §6).
/// Matching is case-sensitive exact string comparison against the last whitespace-separated
/// token of an answer's presentation form — deliberately not structural (no CIDR semantics),
/// grounded on `gollum/utility/utility.go`'s `CheckBlockedIP`, which does the same tab-split
/// trick against `a.String()` rather than parsing the address out of the RR.
#[derive(Debug, Clone, Default)]
pub struct AnswerFilter {
    blocked: HashSet<String>,
}

impl AnswerFilter {
    pub fn new(entries: impl IntoIterator<Item = String>) -> Self {
        AnswerFilter {
            blocked: entries.into_iter().collect(),
        }
    }

    pub fn from_text(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(|line| line.trim())
                .filter(|line| !line.is_empty())
                .map(|line| line.to_string()),
        )
    }

    /// True if any answer RR in `records` should cause the whole reply to be dropped.
    pub fn is_blocked(&self, records: &[DNSResource]) -> bool {
        records
            .iter()
            .any(|rr| self.blocked.contains(&rr.blocklist_token()))
    }

    pub fn len(&self) -> usize {
        self.blocked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn blocks_exact_address_match() {
        let filter = AnswerFilter::from_text("6.6.6.6\n1.2.3.4\n");
        let records = vec![DNSResource::new_a("ads.example.com", 60, Ipv4Addr::new(6, 6, 6, 6))];
        assert!(filter.is_blocked(&records));
    }

    #[test]
    fn does_not_block_unlisted_address() {
        let filter = AnswerFilter::from_text("6.6.6.6\n");
        let records = vec![DNSResource::new_a("example.com", 60, Ipv4Addr::new(9, 9, 9, 9))];
        assert!(!filter.is_blocked(&records));
    }
}
