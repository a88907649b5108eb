//! Occurrence counting across a whole scan.

use crate::format::{Candidate, KeyFormat};
use std::collections::{BTreeMap, HashMap};

/// One distinct validated value and how often it was seen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Format of the value
    pub format: KeyFormat,
    /// The value exactly as matched (after normalization)
    pub value: String,
    /// Number of occurrences
    pub count: u64,
    /// Offset of the first occurrence
    pub first_offset: u64,
}

/// Counts at the end of a scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Distinct validated items
    pub total: usize,
    /// Items seen more than once
    pub repeated: usize,
    /// Items seen exactly once
    pub singletons: usize,
    /// Candidates that failed validation
    pub rejected: u64,
}

/// Validated values and their occurrence counts, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OccurrenceTable {
    entries: Vec<Entry>,
    index: HashMap<(KeyFormat, String), usize>,
    rejected: BTreeMap<KeyFormat, u64>,
}

impl OccurrenceTable {
    /// Creates an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one accepted candidate
    pub fn record(&mut self, candidate: Candidate) {
        let key = (candidate.format, candidate.value);
        if let Some(&i) = self.index.get(&key) {
            self.entries[i].count += 1;
            return;
        }

        self.index.insert(key.clone(), self.entries.len());
        self.entries.push(Entry {
            format: key.0,
            value: key.1,
            count: 1,
            first_offset: candidate.offset,
        });
    }

    /// Counts one rejected candidate
    pub fn record_rejection(&mut self, format: KeyFormat) {
        *self.rejected.entry(format).or_insert(0) += 1;
    }

    /// Occurrences of a value, if it was seen
    pub fn count(&self, format: KeyFormat, value: &str) -> Option<u64> {
        self.index
            .get(&(format, value.to_string()))
            .map(|&i| self.entries[i].count)
    }

    /// All entries in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// Entries whose format is in `formats`
    pub fn entries_for<'a>(&'a self, formats: &'a [KeyFormat]) -> impl Iterator<Item = &'a Entry> {
        self.entries.iter().filter(move |e| formats.contains(&e.format))
    }

    /// Number of distinct values
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing was accepted
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total rejected candidates
    pub fn rejected(&self) -> u64 {
        self.rejected.values().sum()
    }

    /// Summary over the whole table
    pub fn summary(&self) -> Summary {
        Self::summarize(self.entries.iter(), self.rejected())
    }

    /// Summary restricted to some formats
    pub fn summary_for(&self, formats: &[KeyFormat]) -> Summary {
        let rejected = formats
            .iter()
            .filter_map(|f| self.rejected.get(f))
            .sum();
        Self::summarize(self.entries_for(formats), rejected)
    }

    /// Folds another table into this one, keeping first-seen order
    pub fn merge(&mut self, other: OccurrenceTable) {
        for entry in other.entries {
            let key = (entry.format, entry.value);
            match self.index.get(&key) {
                Some(&i) => self.entries[i].count += entry.count,
                None => {
                    self.index.insert(key.clone(), self.entries.len());
                    self.entries.push(Entry {
                        format: key.0,
                        value: key.1,
                        count: entry.count,
                        first_offset: entry.first_offset,
                    });
                }
            }
        }
        for (format, n) in other.rejected {
            *self.rejected.entry(format).or_insert(0) += n;
        }
    }

    fn summarize<'a>(entries: impl Iterator<Item = &'a Entry>, rejected: u64) -> Summary {
        let mut summary = Summary {
            rejected,
            ..Summary::default()
        };
        for entry in entries {
            summary.total += 1;
            if entry.count > 1 {
                summary.repeated += 1;
            } else {
                summary.singletons += 1;
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn candidate(format: KeyFormat, value: &str, offset: u64) -> Candidate {
        Candidate::new(format, value, offset)
    }

    #[test]
    fn test_counts_and_order() {
        let mut table = OccurrenceTable::new();
        table.record(candidate(KeyFormat::Bech32Address, "bc1b", 10));
        table.record(candidate(KeyFormat::Bech32Address, "bc1a", 20));
        table.record(candidate(KeyFormat::Bech32Address, "bc1b", 30));

        let values: Vec<(&str, u64, u64)> = table
            .iter()
            .map(|e| (e.value.as_str(), e.count, e.first_offset))
            .collect();
        assert_eq!(values, vec![("bc1b", 2, 10), ("bc1a", 1, 20)]);
    }

    #[test]
    fn test_exact_match_no_case_folding() {
        let mut table = OccurrenceTable::new();
        table.record(candidate(KeyFormat::HexKey, "abcd", 0));
        table.record(candidate(KeyFormat::HexKey, "ABCD", 4));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_same_value_different_format() {
        let mut table = OccurrenceTable::new();
        table.record(candidate(KeyFormat::ExtendedPublicKey, "x", 0));
        table.record(candidate(KeyFormat::ExtendedPrivateKey, "x", 0));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_summary() {
        let mut table = OccurrenceTable::new();
        table.record(candidate(KeyFormat::WifKey, "K1", 0));
        table.record(candidate(KeyFormat::WifKey, "K1", 1));
        table.record(candidate(KeyFormat::WifKey, "K2", 2));
        table.record(candidate(KeyFormat::Bech32Address, "bc1", 3));
        table.record_rejection(KeyFormat::WifKey);

        assert_eq!(
            table.summary(),
            Summary {
                total: 3,
                repeated: 1,
                singletons: 2,
                rejected: 1
            }
        );
        assert_eq!(
            table.summary_for(&[KeyFormat::Bech32Address]),
            Summary {
                total: 1,
                repeated: 0,
                singletons: 1,
                rejected: 0
            }
        );
    }

    #[test]
    fn test_merge() {
        let mut a = OccurrenceTable::new();
        a.record(candidate(KeyFormat::HexKey, "aa", 0));
        let mut b = OccurrenceTable::new();
        b.record(candidate(KeyFormat::HexKey, "aa", 5));
        b.record(candidate(KeyFormat::HexKey, "bb", 6));
        b.record_rejection(KeyFormat::WifKey);

        a.merge(b);
        assert_eq!(a.count(KeyFormat::HexKey, "aa"), Some(2));
        assert_eq!(a.count(KeyFormat::HexKey, "bb"), Some(1));
        assert_eq!(a.rejected(), 1);
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(OccurrenceTable::new().summary(), Summary::default());
    }
}
