//! SIMD-windowed engine.
//!
//! Segment lengths are stored as a flat ring of narrow unsigned integers and
//! every in-flight pulse occupies one lane of a pair of window registers, so
//! one kernel call advances up to a full register of pulses at once.

mod engine;
pub mod kernel;
pub mod lane;
pub mod vector;

pub use engine::{RingGeometry, Windowed8, Windowed16, WindowedExtender};
pub use kernel::KernelBackend;
pub use lane::Lane;
pub use vector::LaneVector;
