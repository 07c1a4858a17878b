//! Index collaborator interfaces and a reference in-memory segment.
//!
//! # Module Structure
//!
//! - `doc_set`: Bit set of document ids
//! - `reader`: Per-segment read access (vectors, numerics, terms)
//! - `searcher`: Domain scoped nearest-neighbor search
//! - `memory`: Single segment in-memory index implementing both traits

pub mod doc_set;
pub mod memory;
pub mod reader;
pub mod searcher;

pub use self::doc_set::DocSet;
pub use self::memory::{ID_FIELD, MemoryDocument, MemoryIndex, MemoryIndexBuilder};
pub use self::reader::{NO_MORE_DOCS, SegmentReader, VectorIterator};
pub use self::searcher::{KnnSearcher, ScoredDoc};
