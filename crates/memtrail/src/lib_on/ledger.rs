use crate::origin::Origin;
use crate::output::{LeakRecord, LeakReport};

/// Metadata for one outstanding allocation. The address is an opaque
/// identity, compared but never dereferenced.
#[derive(Debug, Clone)]
pub struct Record {
    address: usize,
    size: usize,
    origin: Origin,
}

impl Record {
    pub fn address(&self) -> usize {
        self.address
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// Insertion-ordered registry of live allocations, keyed by address.
///
/// Append is O(1) amortized, removal a linear scan from the head. The
/// asymmetry is deliberate: leak reports are rare and ordered, frees are
/// expected to find their record near the front. Iteration order (and
/// therefore report order) is insertion order.
///
/// The ledger itself never checks for duplicate addresses; the interception
/// layer removes before re-appending on resize, which is the only path that
/// could reuse an address.
#[derive(Debug, Default)]
pub struct Ledger {
    records: Vec<Record>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record at the tail.
    pub fn append(&mut self, address: usize, size: usize, origin: Origin) {
        self.records.push(Record {
            address,
            size,
            origin,
        });
    }

    /// Removes the first record matching `address`, scanning from the head.
    /// `None` signals that the address is not tracked.
    pub fn remove(&mut self, address: usize) -> Option<Record> {
        let index = self.records.iter().position(|r| r.address == address)?;
        Some(self.records.remove(index))
    }

    pub fn contains(&self, address: usize) -> bool {
        self.records.iter().any(|r| r.address == address)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in insertion order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Removes and yields every record, oldest first. Used by teardown to
    /// force-release whatever is still tracked.
    pub(crate) fn drain(&mut self) -> std::vec::Drain<'_, Record> {
        self.records.drain(..)
    }

    /// Snapshot of the remaining records for reporting.
    pub fn snapshot(&self) -> LeakReport {
        LeakReport::new(
            self.records
                .iter()
                .map(|r| LeakRecord {
                    size: r.size,
                    address: r.address,
                    origin: r.origin.clone(),
                })
                .collect(),
        )
    }
}
