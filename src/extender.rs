//! Engine-independent interface and engine selection.

use std::fmt;

use tracing::debug;

use crate::params::{ExtenderParams, LaneWidth, ParamsError};
use crate::reference::ReferenceExtender;
use crate::windowed::{KernelBackend, Lane, Windowed8, Windowed16, WindowedExtender};

/// A pulse-level extender simulation.
///
/// Equality means "evolves identically from here on" and ignores the pulse
/// count, which is what cycle detection compares.
pub trait Extender: Clone + PartialEq {
    /// Fully extended extender. `kernel` is a request and may be ignored by
    /// engines without a vector kernel.
    fn create(params: ExtenderParams, kernel: Option<KernelBackend>) -> Result<Self, ParamsError>;

    fn simulate_pulse(&mut self);

    fn finished(&self) -> bool;

    fn pulses(&self) -> u64;
}

impl Extender for ReferenceExtender {
    fn create(params: ExtenderParams, _kernel: Option<KernelBackend>) -> Result<Self, ParamsError> {
        Ok(ReferenceExtender::new(params))
    }

    #[inline]
    fn simulate_pulse(&mut self) {
        ReferenceExtender::simulate_pulse(self);
    }

    #[inline]
    fn finished(&self) -> bool {
        ReferenceExtender::finished(self)
    }

    #[inline]
    fn pulses(&self) -> u64 {
        ReferenceExtender::pulses(self)
    }
}

impl<T: Lane, const N: usize> Extender for WindowedExtender<T, N> {
    fn create(params: ExtenderParams, kernel: Option<KernelBackend>) -> Result<Self, ParamsError> {
        WindowedExtender::with_backend(params, kernel)
    }

    #[inline]
    fn simulate_pulse(&mut self) {
        WindowedExtender::simulate_pulse(self);
    }

    #[inline]
    fn finished(&self) -> bool {
        WindowedExtender::finished(self)
    }

    #[inline]
    fn pulses(&self) -> u64 {
        WindowedExtender::pulses(self)
    }
}

/// Which engine to simulate with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EngineKind {
    /// Windowed engine when the length fits a supported lane width,
    /// reference engine otherwise.
    #[default]
    Auto,
    Reference,
    Windowed,
}

/// An extender built by one of the engines, chosen at runtime.
#[derive(Clone, Debug)]
pub enum AnyExtender {
    Reference(ReferenceExtender),
    Windowed8(Windowed8),
    Windowed16(Windowed16),
}

impl AnyExtender {
    /// Build the requested engine.
    ///
    /// `Windowed` fails with [`ParamsError::LaneOverflow`] for lengths wider
    /// than 16-bit lanes; `Auto` falls back to the reference engine instead.
    pub fn new(
        params: ExtenderParams,
        engine: EngineKind,
        kernel: Option<KernelBackend>,
    ) -> Result<Self, ParamsError> {
        let built = match engine {
            EngineKind::Reference => AnyExtender::Reference(ReferenceExtender::new(params)),
            EngineKind::Windowed => Self::windowed(params, kernel)?,
            EngineKind::Auto => match Self::windowed(params, kernel) {
                Ok(ext) => ext,
                Err(err) => {
                    debug!(length = params.length(), %err, "falling back to the reference engine");
                    AnyExtender::Reference(ReferenceExtender::new(params))
                }
            },
        };
        debug!(
            length = params.length(),
            push_limit = params.push_limit(),
            last_push_limit = params.last_push_limit(),
            engine = %built,
            "engine selected"
        );
        Ok(built)
    }

    fn windowed(
        params: ExtenderParams,
        kernel: Option<KernelBackend>,
    ) -> Result<Self, ParamsError> {
        match params.lane_width() {
            LaneWidth::U8 => Windowed8::create(params, kernel).map(AnyExtender::Windowed8),
            LaneWidth::U16 => Windowed16::create(params, kernel).map(AnyExtender::Windowed16),
            LaneWidth::U32 | LaneWidth::U64 => Err(ParamsError::LaneOverflow {
                length: params.length(),
                bits: LaneWidth::U16.bits(),
                max: LaneWidth::U16.max_value(),
            }),
        }
    }

    /// Kernel backend in use, if this is a windowed engine.
    pub fn backend(&self) -> Option<KernelBackend> {
        match self {
            AnyExtender::Reference(_) => None,
            AnyExtender::Windowed8(ext) => Some(ext.backend()),
            AnyExtender::Windowed16(ext) => Some(ext.backend()),
        }
    }
}

impl fmt::Display for AnyExtender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnyExtender::Reference(_) => f.write_str("reference"),
            AnyExtender::Windowed8(ext) => write!(f, "windowed u8x32 ({:?})", ext.backend()),
            AnyExtender::Windowed16(ext) => write!(f, "windowed u16x16 ({:?})", ext.backend()),
        }
    }
}
