//! Bitmap-backed document sets.

use bit_vec::BitVec;

/// A set of document ids within one segment.
///
/// Bit `i` is set when document `i` is a member. Sets of different sizes can
/// be combined; the shorter one is treated as having no members beyond its
/// end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocSet {
    bits: BitVec,
}

impl DocSet {
    /// Create an empty set able to hold ids below `max_doc`.
    pub fn new(max_doc: u32) -> Self {
        DocSet {
            bits: BitVec::from_elem(max_doc as usize, false),
        }
    }

    /// Create a set containing every id below `max_doc`.
    pub fn full(max_doc: u32) -> Self {
        DocSet {
            bits: BitVec::from_elem(max_doc as usize, true),
        }
    }

    /// Create a set from explicit ids. Ids at or past `max_doc` are ignored.
    pub fn from_docs<I: IntoIterator<Item = u32>>(max_doc: u32, docs: I) -> Self {
        let mut set = DocSet::new(max_doc);
        for doc in docs {
            set.insert(doc);
        }
        set
    }

    /// Add a document. Returns false when `doc` is outside the set's range.
    pub fn insert(&mut self, doc: u32) -> bool {
        let index = doc as usize;
        if index >= self.bits.len() {
            return false;
        }
        self.bits.set(index, true);
        true
    }

    /// Check membership.
    pub fn contains(&self, doc: u32) -> bool {
        self.bits.get(doc as usize).unwrap_or(false)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.bits.iter().filter(|bit| *bit).count()
    }

    /// Whether the set has no members.
    pub fn is_empty(&self) -> bool {
        self.bits.none()
    }

    /// Upper bound (exclusive) of ids this set can hold.
    pub fn max_doc(&self) -> u32 {
        self.bits.len() as u32
    }

    /// Members present in both sets.
    pub fn intersect(&self, other: &DocSet) -> DocSet {
        let (mut bits, rhs) = self.aligned(other);
        bits.and(&rhs);
        DocSet { bits }
    }

    /// Members present in either set.
    pub fn union(&self, other: &DocSet) -> DocSet {
        let (mut bits, rhs) = self.aligned(other);
        bits.or(&rhs);
        DocSet { bits }
    }

    /// Members of this set that are not in `other`.
    pub fn difference(&self, other: &DocSet) -> DocSet {
        let (mut bits, rhs) = self.aligned(other);
        bits.difference(&rhs);
        DocSet { bits }
    }

    /// Iterate over members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, bit)| *bit)
            .map(|(doc, _)| doc as u32)
    }

    fn aligned(&self, other: &DocSet) -> (BitVec, BitVec) {
        let len = self.bits.len().max(other.bits.len());
        let mut lhs = self.bits.clone();
        let mut rhs = other.bits.clone();
        lhs.grow(len - lhs.len(), false);
        rhs.grow(len - rhs.len(), false);
        (lhs, rhs)
    }
}

impl FromIterator<u32> for DocSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let docs: Vec<u32> = iter.into_iter().collect();
        let max_doc = docs.iter().max().map_or(0, |max| max + 1);
        DocSet::from_docs(max_doc, docs)
    }
}
