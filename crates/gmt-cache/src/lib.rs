//! Chunk cache and paginator: deterministic splitting of large results into
//! bounded pieces, stored under a cache key for resumable retrieval.

pub mod split;
pub mod store;

pub use split::split_text;
pub use store::{Chunk, ChunkStore, derive_key, generate_token};
