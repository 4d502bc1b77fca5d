//! Run an extender until it retracts or provably never will.
//!
//! Cycle detection follows the tortoise-and-hare scheme: a fast extender
//! advances every pulse, an independent slow one every second pulse, and the
//! two are compared as they go. Equal states before retraction mean the
//! dynamics entered a cycle that does not contain the retracted state.

use std::fmt;
use std::ops::RangeInclusive;
use std::sync::OnceLock;

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::extender::{AnyExtender, EngineKind, Extender};
use crate::params::{ExtenderParams, ParamsError};
use crate::windowed::KernelBackend;

/// Pulses between progress messages when not configured otherwise.
pub const DEFAULT_LOG_INTERVAL: u64 = 100_000_000;

static PHYSICAL_CORES: OnceLock<usize> = OnceLock::new();

/// How a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The extender fully retracted after this many pulses.
    Finished { pulses: u64 },
    /// A repeated state was seen at this pulse; the extender never retracts.
    Loop { pulses: u64 },
    /// The pulse budget ran out first.
    Unresolved { pulses: u64 },
}

impl Outcome {
    pub fn pulses(&self) -> u64 {
        match *self {
            Outcome::Finished { pulses }
            | Outcome::Loop { pulses }
            | Outcome::Unresolved { pulses } => pulses,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Finished { pulses } => write!(f, "Done! {pulses} pulses in total."),
            Outcome::Loop { pulses } => write!(f, "Loop at {pulses} pulses."),
            Outcome::Unresolved { pulses } => write!(f, "Gave up after {pulses} pulses."),
        }
    }
}

/// Configuration for a single run.
///
/// `RunConfig::default()` picks the engine and kernel automatically and
/// checks for loops on even pulses.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub engine: EngineKind,
    /// `None` means auto-detect. Set `SNAPERZ_AUTO_KERNEL=0` to force the
    /// scalar kernel under auto-detection.
    pub kernel: Option<KernelBackend>,
    pub check_loop: bool,
    /// Compare after every pulse instead of every second one. Finds loops a
    /// pulse earlier at the cost of twice the comparisons.
    pub fast_loop_detection: bool,
    /// Pulses between progress messages; 0 disables them.
    pub log_interval: u64,
    pub max_pulses: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::Auto,
            kernel: None,
            check_loop: true,
            fast_loop_detection: false,
            log_interval: DEFAULT_LOG_INTERVAL,
            max_pulses: None,
        }
    }
}

impl RunConfig {
    pub fn engine(mut self, engine: EngineKind) -> Self {
        self.engine = engine;
        self
    }

    /// Force a specific kernel backend.
    pub fn kernel(mut self, backend: KernelBackend) -> Self {
        self.kernel = Some(backend);
        self
    }

    pub fn check_loop(mut self, enabled: bool) -> Self {
        self.check_loop = enabled;
        self
    }

    pub fn fast_loop_detection(mut self, enabled: bool) -> Self {
        self.fast_loop_detection = enabled;
        self
    }

    pub fn log_interval(mut self, pulses: u64) -> Self {
        self.log_interval = pulses;
        self
    }

    pub fn max_pulses(mut self, limit: Option<u64>) -> Self {
        self.max_pulses = limit;
        self
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Params(#[from] ParamsError),
    #[error("failed to build sweep thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Simulate with the engine selected by `config`.
pub fn run(params: ExtenderParams, config: &RunConfig) -> Result<Outcome, ParamsError> {
    Ok(match AnyExtender::new(params, config.engine, config.kernel)? {
        AnyExtender::Reference(ext) => drive(ext, config),
        AnyExtender::Windowed8(ext) => drive(ext, config),
        AnyExtender::Windowed16(ext) => drive(ext, config),
    })
}

/// Simulate with a specific engine type.
pub fn run_engine<E: Extender>(params: ExtenderParams, config: &RunConfig) -> Result<Outcome, ParamsError> {
    Ok(drive(E::create(params, config.kernel)?, config))
}

fn drive<E: Extender>(mut fast: E, config: &RunConfig) -> Outcome {
    // The slow extender owns separate storage; it is advanced independently.
    let mut slow = fast.clone();

    while !fast.finished() {
        if config.max_pulses.is_some_and(|limit| fast.pulses() >= limit) {
            return Outcome::Unresolved {
                pulses: fast.pulses(),
            };
        }

        fast.simulate_pulse();
        let pulses = fast.pulses();

        if config.log_interval != 0 && pulses % config.log_interval == 0 {
            info!("{pulses} pulses so far...");
        }

        if config.check_loop {
            let even = pulses % 2 == 0;
            if even {
                slow.simulate_pulse();
            }
            if (even || config.fast_loop_detection) && fast == slow {
                return Outcome::Loop { pulses };
            }
        }
    }

    Outcome::Finished {
        pulses: fast.pulses(),
    }
}

/// Result for one length of a sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SweepRow {
    pub params: ExtenderParams,
    pub outcome: Outcome,
}

/// Run every length in `lengths` at the given period, in parallel.
///
/// Each length is an independent single-threaded run. Rows come back in
/// length order.
pub fn sweep(
    lengths: RangeInclusive<u32>,
    period: u32,
    config: &RunConfig,
    threads: Option<usize>,
) -> Result<Vec<SweepRow>, RunError> {
    let threads = resolve_thread_count(threads);
    debug!(threads, from = lengths.start(), to = lengths.end(), period, "starting sweep");
    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;

    let rows = pool.install(|| {
        lengths
            .into_par_iter()
            .map(|length| {
                let params = ExtenderParams::from_period(length, period)?;
                let outcome = run(params, config)?;
                Ok(SweepRow { params, outcome })
            })
            .collect::<Result<Vec<_>, ParamsError>>()
    })?;
    Ok(rows)
}

#[inline]
fn physical_core_count() -> usize {
    *PHYSICAL_CORES.get_or_init(|| num_cpus::get_physical().max(1))
}

fn resolve_thread_count(requested: Option<usize>) -> usize {
    requested.unwrap_or_else(physical_core_count).max(1)
}
