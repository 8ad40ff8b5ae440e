//! Multi-way merge iterator for sorted runs.
//!
//! Merges any number of sorted, duplicate-free sources into a single
//! strictly increasing stream. Values of keys present in several sources
//! are folded with a [`MergePolicy`], oldest source first.

use crate::error::Result;
use crate::sorter::MergePolicy;
use crate::Entry;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A sorted source of entries. Lower source indices hold older data.
pub type Source<'a> = Box<dyn Iterator<Item = Result<Entry>> + 'a>;

/// Entry in the merge heap
struct MergeEntry {
    key: Vec<u8>,
    value: Vec<u8>,
    source: usize,
}

impl PartialEq for MergeEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.source == other.source
    }
}

impl Eq for MergeEntry {}

impl PartialOrd for MergeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (smallest key first)
        other.key.cmp(&self.key).then_with(|| {
            // For equal keys, pop the older source first
            other.source.cmp(&self.source)
        })
    }
}

/// Multi-way merge iterator over sorted sources.
pub struct MergeIterator<'a> {
    heap: BinaryHeap<MergeEntry>,
    sources: Vec<Source<'a>>,
    policy: &'a MergePolicy,
    failed: bool,
}

impl<'a> MergeIterator<'a> {
    /// Create a merge iterator; primes the heap with the head of every source.
    pub fn new(sources: Vec<Source<'a>>, policy: &'a MergePolicy) -> Result<Self> {
        let mut iter =
            Self { heap: BinaryHeap::with_capacity(sources.len()), sources, policy, failed: false };

        for idx in 0..iter.sources.len() {
            iter.pull(idx)?;
        }

        Ok(iter)
    }

    /// Advance the source at the given index and add its next entry to the heap
    fn pull(&mut self, source: usize) -> Result<()> {
        if let Some(entry) = self.sources[source].next() {
            let (key, value) = entry?;
            self.heap.push(MergeEntry { key, value, source });
        }
        Ok(())
    }

    fn merge_next(&mut self) -> Result<Option<Entry>> {
        let Some(first) = self.heap.pop() else {
            return Ok(None);
        };
        self.pull(first.source)?;

        let key = first.key;
        let mut value = first.value;
        while self.heap.peek().is_some_and(|e| e.key == key) {
            if let Some(next) = self.heap.pop() {
                self.pull(next.source)?;
                self.policy.merge_into(&key, &mut value, next.value);
            }
        }

        Ok(Some((key, value)))
    }
}

impl Iterator for MergeIterator<'_> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        match self.merge_next() {
            Ok(entry) => entry.map(Ok),
            Err(e) => {
                log::error!("Error advancing merge source: {}", e);
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source<'a>(entries: &'a [(&'a str, &'a str)]) -> Source<'a> {
        Box::new(entries.iter().map(|(k, v)| Ok((k.as_bytes().to_vec(), v.as_bytes().to_vec()))))
    }

    fn collect(iter: MergeIterator<'_>) -> Vec<(String, String)> {
        iter.map(|e| {
            let (k, v) = e.unwrap();
            (String::from_utf8(k).unwrap(), String::from_utf8(v).unwrap())
        })
        .collect()
    }

    fn pairs(entries: &[(&str, &str)]) -> Vec<(String, String)> {
        entries.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_merge_iterator_disjoint() {
        let policy = MergePolicy::default();
        let a = [("a", "1"), ("c", "3"), ("e", "5")];
        let b = [("b", "2"), ("d", "4"), ("f", "6")];
        let iter = MergeIterator::new(vec![source(&a), source(&b)], &policy).unwrap();

        assert_eq!(
            collect(iter),
            pairs(&[("a", "1"), ("b", "2"), ("c", "3"), ("d", "4"), ("e", "5"), ("f", "6")])
        );
    }

    #[test]
    fn test_merge_iterator_duplicates_last_write_wins() {
        let policy = MergePolicy::LastWriteWins;
        let old = [("a", "old"), ("b", "old")];
        let mid = [("b", "mid"), ("c", "mid")];
        let new = [("b", "new")];
        let iter =
            MergeIterator::new(vec![source(&old), source(&mid), source(&new)], &policy).unwrap();

        assert_eq!(collect(iter), pairs(&[("a", "old"), ("b", "new"), ("c", "mid")]));
    }

    #[test]
    fn test_merge_iterator_duplicates_first_write_wins() {
        let policy = MergePolicy::FirstWriteWins;
        let old = [("k", "first")];
        let new = [("k", "second")];
        let iter = MergeIterator::new(vec![source(&old), source(&new)], &policy).unwrap();

        assert_eq!(collect(iter), pairs(&[("k", "first")]));
    }

    #[test]
    fn test_merge_iterator_custom_is_chronological() {
        let policy = MergePolicy::custom(|_key, older, newer| [older, b"+", newer].concat());
        let runs = [[("k", "1")], [("k", "2")], [("k", "3")]];
        let sources = runs.iter().map(|r| source(r)).collect();
        let iter = MergeIterator::new(sources, &policy).unwrap();

        assert_eq!(collect(iter), pairs(&[("k", "1+2+3")]));
    }

    #[test]
    fn test_merge_iterator_empty_sources() {
        let policy = MergePolicy::default();
        let iter = MergeIterator::new(vec![source(&[]), source(&[])], &policy).unwrap();
        assert!(collect(iter).is_empty());
    }

    #[test]
    fn test_merge_iterator_source_error() {
        let policy = MergePolicy::default();
        let good = [("a", "1"), ("z", "26")];
        let failing: Source<'_> = Box::new(
            vec![Ok((b"b".to_vec(), b"2".to_vec())), Err(crate::Error::format("bad block"))]
                .into_iter(),
        );
        let mut iter = MergeIterator::new(vec![source(&good), failing], &policy).unwrap();

        assert_eq!(iter.next().unwrap().unwrap().0, b"a");
        assert!(iter.next().unwrap().is_err());
        assert!(iter.next().is_none());
    }
}
