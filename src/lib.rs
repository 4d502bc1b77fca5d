//! Pulse-level simulation of Snaperz extenders.
//!
//! Two engines compute the same transition: a linked-segment reference engine
//! and a windowed engine that packs in-flight pulses into SIMD lanes.

pub mod extender;
pub mod params;
pub mod reference;
pub mod runner;
pub mod windowed;

pub use extender::{AnyExtender, EngineKind, Extender};
pub use params::{ExtenderParams, ParamsError};
pub use reference::ReferenceExtender;
pub use runner::{Outcome, RunConfig};
pub use windowed::{KernelBackend, Windowed8, Windowed16, WindowedExtender};
