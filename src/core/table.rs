//! Bounded, ordered rule storage with all-or-nothing replacement
//!
//! The table is copy-on-write: the current rules live in an `Arc<[Rule]>`
//! that readers clone under a momentary read lock and then scan lock-free.
//! Writers serialise on their own mutex, build and validate the replacement
//! off to the side, and publish it with a single pointer swap. A reader
//! therefore sees either the old table or the new one, never a mix.
//!
//! The only mutation is a full replace; there is no per-rule insert, update or delete.

use super::codec::{self, RECORD_WIDTH};
use super::error::{RecordError, TableError};
use super::firewall::Rule;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Maximum number of rules the table holds
pub const MAX_RULES: usize = 50;

#[derive(Debug)]
pub struct RuleTable {
    current: RwLock<Arc<[Rule]>>,
    writer: Mutex<()>,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleTable {
    /// Creates an empty table
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::from(Vec::new())),
            writer: Mutex::new(()),
        }
    }

    /// Returns the current rules in storage order.
    ///
    /// The returned slice stays valid and unchanged even if the table is
    /// replaced while the caller holds it.
    pub fn snapshot(&self) -> Arc<[Rule]> {
        // The guarded value is only ever assigned whole, so a poisoned lock
        // still holds a complete table.
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replaces the whole table.
    ///
    /// # Errors
    ///
    /// - [`TableError::CapacityExceeded`] if there are more than [`MAX_RULES`]
    ///   candidates; nothing is validated in that case
    /// - [`TableError::InvalidRule`] for the first candidate failing
    ///   [`Rule::validate`], with its 0-based index
    ///
    /// On error the table is left exactly as it was.
    pub fn replace_all(&self, candidates: Vec<Rule>) -> Result<(), TableError> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        if candidates.len() > MAX_RULES {
            tracing::warn!(
                count = candidates.len(),
                max = MAX_RULES,
                "Rejected rule table: capacity exceeded"
            );
            return Err(TableError::CapacityExceeded {
                count: candidates.len(),
                max: MAX_RULES,
            });
        }

        for (index, rule) in candidates.iter().enumerate() {
            if let Err(source) = rule.validate() {
                tracing::warn!(index, error = %source, "Rejected rule table: invalid rule");
                return Err(TableError::InvalidRule { index, source });
            }
        }

        self.publish(candidates);
        Ok(())
    }

    /// Replaces the table from a stream of concatenated binary records.
    ///
    /// Returns the number of bytes consumed, which is always `bytes.len()`.
    ///
    /// # Errors
    ///
    /// - [`TableError::MalformedRecord`] if the length is not a multiple of
    ///   [`RECORD_WIDTH`] (a trailing partial record)
    /// - [`TableError::CapacityExceeded`] if the stream holds more than
    ///   [`MAX_RULES`] records; checked before any record is decoded
    /// - [`TableError::InvalidRule`] for the first record that fails to decode
    ///
    /// On error the table is left exactly as it was.
    pub fn store_records(&self, bytes: &[u8]) -> Result<usize, TableError> {
        if bytes.len() % RECORD_WIDTH != 0 {
            tracing::warn!(len = bytes.len(), "Rejected rule stream: trailing partial record");
            return Err(TableError::MalformedRecord {
                len: bytes.len(),
                record_width: RECORD_WIDTH,
            });
        }

        let count = bytes.len() / RECORD_WIDTH;
        if count > MAX_RULES {
            tracing::warn!(count, max = MAX_RULES, "Rejected rule stream: capacity exceeded");
            return Err(TableError::CapacityExceeded {
                count,
                max: MAX_RULES,
            });
        }

        let mut rules = Vec::with_capacity(count);
        for (index, chunk) in bytes.chunks_exact(RECORD_WIDTH).enumerate() {
            match codec::decode(chunk) {
                Ok(rule) => rules.push(rule),
                Err(RecordError::Invalid(source)) => {
                    tracing::warn!(index, error = %source, "Rejected rule stream: invalid record");
                    return Err(TableError::InvalidRule { index, source });
                }
                // chunks_exact only yields full records
                Err(RecordError::Malformed { len, .. }) => {
                    return Err(TableError::MalformedRecord {
                        len,
                        record_width: RECORD_WIDTH,
                    });
                }
            }
        }

        self.replace_all(rules)?;
        Ok(bytes.len())
    }

    /// Current table re-encoded as concatenated records, in storage order
    pub fn dump_records(&self) -> Vec<u8> {
        codec::encode_all(&self.snapshot())
    }

    /// Swaps in a fully validated table. Caller holds the writer lock.
    fn publish(&self, rules: Vec<Rule>) {
        let count = rules.len();
        let next: Arc<[Rule]> = Arc::from(rules);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = next;
        tracing::info!(rules = count, "Rule table replaced");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::InvalidRule;
    use crate::core::firewall::{Action, RuleDirection};
    use crate::core::test_helpers::{sample_record, tcp_rule};

    fn rules(n: usize) -> Vec<Rule> {
        (0..n)
            .map(|i| tcp_rule(&format!("r{i}"), RuleDirection::Any, 1000 + i as u16, Action::Accept))
            .collect()
    }

    #[test]
    fn test_new_table_is_empty() {
        let table = RuleTable::new();
        assert!(table.is_empty());
        assert!(table.snapshot().is_empty());
        assert!(table.dump_records().is_empty());
    }

    #[test]
    fn test_replace_all_keeps_order() {
        let table = RuleTable::new();
        let candidates = rules(3);
        table.replace_all(candidates.clone()).unwrap();
        assert_eq!(&*table.snapshot(), &candidates[..]);
    }

    #[test]
    fn test_replace_all_at_capacity() {
        let table = RuleTable::new();
        table.replace_all(rules(MAX_RULES)).unwrap();
        assert_eq!(table.len(), MAX_RULES);
    }

    #[test]
    fn test_replace_all_over_capacity_leaves_table() {
        let table = RuleTable::new();
        table.replace_all(rules(2)).unwrap();
        let before = table.dump_records();

        let err = table.replace_all(rules(MAX_RULES + 1)).unwrap_err();
        assert_eq!(
            err,
            TableError::CapacityExceeded {
                count: MAX_RULES + 1,
                max: MAX_RULES,
            }
        );
        assert_eq!(table.dump_records(), before);
    }

    #[test]
    fn test_capacity_checked_before_validation() {
        let table = RuleTable::new();
        let mut candidates = rules(MAX_RULES + 1);
        candidates[0].source_prefix_len = 99;
        assert!(matches!(
            table.replace_all(candidates),
            Err(TableError::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn test_invalid_rule_reports_index_and_leaves_table() {
        let table = RuleTable::new();
        table.replace_all(rules(1)).unwrap();
        let before = table.snapshot();

        let mut candidates = rules(4);
        candidates[2].dest_prefix_len = 33;
        candidates[3].source_prefix_len = 40;
        assert_eq!(
            table.replace_all(candidates),
            Err(TableError::InvalidRule {
                index: 2,
                source: InvalidRule::DestPrefixTooLong(33),
            })
        );
        assert_eq!(&*table.snapshot(), &*before);
    }

    #[test]
    fn test_replace_with_empty_clears() {
        let table = RuleTable::new();
        table.replace_all(rules(3)).unwrap();
        table.replace_all(Vec::new()).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_snapshot_unaffected_by_later_replace() {
        let table = RuleTable::new();
        table.replace_all(rules(2)).unwrap();
        let held = table.snapshot();
        table.replace_all(rules(5)).unwrap();
        assert_eq!(held.len(), 2);
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn test_store_records_round_trip() {
        let table = RuleTable::new();
        let mut bytes = sample_record().to_vec();
        bytes.extend_from_slice(&sample_record());
        assert_eq!(table.store_records(&bytes), Ok(bytes.len()));
        assert_eq!(table.len(), 2);
        assert_eq!(table.dump_records(), bytes);
    }

    #[test]
    fn test_store_records_trailing_partial() {
        let table = RuleTable::new();
        table.store_records(&sample_record()).unwrap();
        let before = table.dump_records();

        let mut bytes = [sample_record(), sample_record()].concat();
        bytes.extend_from_slice(&[1, 2, 3]);
        assert_eq!(
            table.store_records(&bytes),
            Err(TableError::MalformedRecord {
                len: RECORD_WIDTH * 2 + 3,
                record_width: RECORD_WIDTH,
            })
        );
        assert_eq!(table.dump_records(), before);
    }

    #[test]
    fn test_store_records_invalid_record_index() {
        let table = RuleTable::new();
        let mut bad = sample_record();
        bad[20] = 0; // direction tag
        let bytes = [sample_record(), sample_record(), bad].concat();
        assert_eq!(
            table.store_records(&bytes),
            Err(TableError::InvalidRule {
                index: 2,
                source: InvalidRule::UnknownDirection(0),
            })
        );
        assert!(table.is_empty());
    }

    #[test]
    fn test_store_records_over_capacity() {
        let table = RuleTable::new();
        let bytes = sample_record().repeat(MAX_RULES + 1);
        assert!(matches!(
            table.store_records(&bytes),
            Err(TableError::CapacityExceeded { count, .. }) if count == MAX_RULES + 1
        ));
        assert!(table.is_empty());
    }

    #[test]
    fn test_store_empty_stream_clears() {
        let table = RuleTable::new();
        table.store_records(&sample_record()).unwrap();
        assert_eq!(table.store_records(&[]), Ok(0));
        assert!(table.is_empty());
    }
}
