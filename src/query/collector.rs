//! Collector implementations for gathering scored documents.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt::Debug;

use crate::error::Result;
use crate::index::searcher::ScoredDoc;

/// Trait for collecting search results.
pub trait Collector: Send + Debug {
    /// Collect a document hit.
    fn collect(&mut self, doc_id: u32, score: f32) -> Result<()>;

    /// Get the final results, best first.
    fn results(&self) -> Vec<ScoredDoc>;

    /// Get the total number of hits collected.
    fn total_hits(&self) -> u64;

    /// Reset the collector for a new search.
    fn reset(&mut self);
}

/// Order hits by score descending, then by document id ascending.
pub fn rank_order(a: &ScoredDoc, b: &ScoredDoc) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.doc_id.cmp(&b.doc_id))
}

/// Sort hits best first.
pub fn sort_hits(hits: &mut [ScoredDoc]) {
    hits.sort_by(rank_order);
}

/// A collector that keeps the top N documents by score.
///
/// Among equal scores the lower document id wins.
#[derive(Debug)]
pub struct TopDocsCollector {
    /// Maximum number of documents to collect.
    max_docs: usize,
    /// Collected hits; the heap top is the worst kept hit.
    hits: BinaryHeap<HeapEntry>,
    /// Total number of documents processed.
    total_hits: u64,
}

#[derive(Debug, Clone, Copy)]
struct HeapEntry(ScoredDoc);

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    // Greater means worse, so the max-heap surfaces the hit to evict.
    fn cmp(&self, other: &Self) -> Ordering {
        rank_order(&self.0, &other.0)
    }
}

impl TopDocsCollector {
    /// Create a new top docs collector.
    pub fn new(max_docs: usize) -> Self {
        TopDocsCollector {
            max_docs,
            hits: BinaryHeap::with_capacity(max_docs.min(1024)),
            total_hits: 0,
        }
    }

    /// Get the maximum number of documents to collect.
    pub fn max_docs(&self) -> usize {
        self.max_docs
    }

    /// Fold another collector's hits into this one.
    pub fn merge(&mut self, other: TopDocsCollector) {
        self.total_hits += other.total_hits;
        for entry in other.hits {
            self.offer(entry);
        }
    }

    /// Consume the collector and return its hits, best first.
    pub fn into_sorted_vec(self) -> Vec<ScoredDoc> {
        self.hits
            .into_sorted_vec()
            .into_iter()
            .map(|entry| entry.0)
            .collect()
    }

    fn offer(&mut self, entry: HeapEntry) {
        if self.max_docs == 0 {
            return;
        }

        if self.hits.len() < self.max_docs {
            self.hits.push(entry);
        } else if let Some(worst) = self.hits.peek() {
            if entry < *worst {
                self.hits.pop();
                self.hits.push(entry);
            }
        }
    }
}

impl Collector for TopDocsCollector {
    fn collect(&mut self, doc_id: u32, score: f32) -> Result<()> {
        self.total_hits += 1;
        self.offer(HeapEntry(ScoredDoc::new(doc_id, score)));
        Ok(())
    }

    fn results(&self) -> Vec<ScoredDoc> {
        let mut results: Vec<ScoredDoc> = self.hits.iter().map(|entry| entry.0).collect();
        sort_hits(&mut results);
        results
    }

    fn total_hits(&self) -> u64 {
        self.total_hits
    }

    fn reset(&mut self) {
        self.hits.clear();
        self.total_hits = 0;
    }
}
