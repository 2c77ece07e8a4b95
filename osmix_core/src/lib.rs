//! Shared building blocks: byte buffers, protobuf value readers and writers, bounding boxes,
//! tile coordinates, zlib compression and a size-bounded cache.

pub mod compression;
mod concurrency;
pub mod io;
pub mod types;

pub use concurrency::ConcurrencyLimits;
pub use types::*;
