//! Reference engine: a linked chain of non-empty segments.

pub mod arena;
mod engine;

pub use arena::{Chain, SegmentIdx};
pub use engine::ReferenceExtender;
