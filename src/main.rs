#[cfg(feature = "mimalloc-global")]
#[global_allocator]
static GLOBAL_ALLOCATOR: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use snaperz::params::{DEFAULT_PERIOD, ExtenderParams};
use snaperz::runner::{self, RunConfig};
use snaperz::{EngineKind, KernelBackend};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "snaperz", version)]
#[command(about = "Simulate Snaperz extenders pulse by pulse")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Simulate one extender until it retracts or loops
    Run {
        /// Number of pistons in the extender
        #[arg(short, long)]
        length: u32,

        /// Repeater-line period in game ticks
        #[arg(short, long, default_value_t = DEFAULT_PERIOD)]
        period: u32,

        /// Override the push limit derived from the period
        #[arg(long, requires = "last_push_limit")]
        push_limit: Option<u32>,

        /// Override the last push limit derived from the period
        #[arg(long, requires = "push_limit")]
        last_push_limit: Option<u32>,

        #[command(flatten)]
        engine: EngineArgs,

        /// Pulses between progress messages (0 disables them)
        #[arg(long, default_value_t = runner::DEFAULT_LOG_INTERVAL)]
        log_interval: u64,
    },

    /// Simulate every length in a range in parallel
    Sweep {
        #[arg(long)]
        from: u32,

        #[arg(long)]
        to: u32,

        /// Repeater-line period in game ticks
        #[arg(short, long, default_value_t = DEFAULT_PERIOD)]
        period: u32,

        /// Worker threads (defaults to the physical core count)
        #[arg(long)]
        threads: Option<usize>,

        #[command(flatten)]
        engine: EngineArgs,
    },
}

#[derive(Args)]
struct EngineArgs {
    #[arg(long, value_enum, default_value_t = EngineArg::Auto)]
    engine: EngineArg,

    #[arg(long, value_enum, default_value_t = KernelArg::Auto)]
    kernel: KernelArg,

    /// Skip cycle detection
    #[arg(long)]
    no_loop_check: bool,

    /// Compare for loops after every pulse instead of every second one
    #[arg(long)]
    fast_loop_detection: bool,

    /// Give up after this many pulses
    #[arg(long)]
    max_pulses: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum EngineArg {
    Auto,
    Reference,
    Windowed,
}

#[derive(Clone, Copy, ValueEnum)]
enum KernelArg {
    Auto,
    Scalar,
    Avx2,
}

impl EngineArgs {
    fn config(&self) -> RunConfig {
        let engine = match self.engine {
            EngineArg::Auto => EngineKind::Auto,
            EngineArg::Reference => EngineKind::Reference,
            EngineArg::Windowed => EngineKind::Windowed,
        };
        let config = RunConfig::default()
            .engine(engine)
            .check_loop(!self.no_loop_check)
            .fast_loop_detection(self.fast_loop_detection)
            .max_pulses(self.max_pulses);
        match self.kernel {
            KernelArg::Auto => config,
            KernelArg::Scalar => config.kernel(KernelBackend::Scalar),
            KernelArg::Avx2 => config.kernel(KernelBackend::Avx2),
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            length,
            period,
            push_limit,
            last_push_limit,
            engine,
            log_interval,
        } => {
            let params = match (push_limit, last_push_limit) {
                (Some(push), Some(last)) => ExtenderParams::new(length, push, last),
                _ => ExtenderParams::from_period(length, period),
            }
            .context("invalid extender parameters")?;
            let config = engine.config().log_interval(log_interval);

            println!("Running {length} extender, {period} tick period.");
            let start = Instant::now();
            let outcome = runner::run(params, &config)?;
            let elapsed = start.elapsed();

            println!("{outcome}");
            println!();
            println!("The operation took {} seconds.", elapsed.as_secs_f64());
        }
        Command::Sweep {
            from,
            to,
            period,
            threads,
            engine,
        } => {
            if from > to {
                bail!("empty sweep range {from}..={to}");
            }
            // Interleaved progress from parallel runs is not useful.
            let config = engine.config().log_interval(0);

            let start = Instant::now();
            let rows = runner::sweep(from..=to, period, &config, threads)?;
            let elapsed = start.elapsed();

            for row in rows {
                println!("L={:<6} {}", row.params.length(), row.outcome);
            }
            println!();
            println!("The operation took {} seconds.", elapsed.as_secs_f64());
        }
    }
    Ok(())
}
