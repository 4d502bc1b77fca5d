//! Engine throughput comparison.
//!
//! Runs the same extenders through the reference and windowed engines,
//! reports timing, and checks that finishing extenders agree on the pulse
//! count. Use with `--release` for meaningful results.

use rand::{Rng, SeedableRng};
use snaperz::params::ExtenderParams;
use snaperz::runner::{self, Outcome, RunConfig};
use snaperz::{Extender, ReferenceExtender, Windowed8, Windowed16};
use std::time::Instant;

struct Scenario {
    name: String,
    length: u32,
    period: u32,
}

const MAX_PULSES: u64 = 2_000_000;
const RANDOM_SCENARIOS: usize = 4;
const SEED: u64 = 0x5EED_1234_ABCD_EF01;

fn time_engine<E: Extender>(params: ExtenderParams, config: &RunConfig) -> (f64, Outcome) {
    let start = Instant::now();
    let outcome = runner::run_engine::<E>(params, config).expect("engine accepts parameters");
    (start.elapsed().as_secs_f64() * 1000.0, outcome)
}

fn main() {
    let mut scenarios = vec![
        Scenario {
            name: "p12-L40".into(),
            length: 40,
            period: 12,
        },
        Scenario {
            name: "p12-L33".into(),
            length: 33,
            period: 12,
        },
        Scenario {
            name: "p16-L20-loop".into(),
            length: 20,
            period: 16,
        },
    ];
    let mut rng = rand::rngs::StdRng::seed_from_u64(SEED);
    for _ in 0..RANDOM_SCENARIOS {
        let length = rng.gen_range(20..=120);
        scenarios.push(Scenario {
            name: format!("p12-L{length}-random"),
            length,
            period: 12,
        });
    }

    let config = RunConfig::default().log_interval(0).max_pulses(Some(MAX_PULSES));

    println!("{:<20} {:>12} {:>12} {:>12}  outcome", "scenario", "reference", "windowed8", "windowed16");
    println!("{}", "-".repeat(80));

    for s in &scenarios {
        let params = ExtenderParams::from_period(s.length, s.period).expect("valid parameters");
        let (reference_ms, reference) = time_engine::<ReferenceExtender>(params, &config);
        let (w8_ms, w8) = time_engine::<Windowed8>(params, &config);
        let (w16_ms, w16) = time_engine::<Windowed16>(params, &config);

        if let Outcome::Finished { .. } = reference {
            assert_eq!(reference, w8, "{}: windowed8 disagrees", s.name);
            assert_eq!(reference, w16, "{}: windowed16 disagrees", s.name);
        }

        println!(
            "{:<20} {:>10.1}ms {:>10.1}ms {:>10.1}ms  {}",
            s.name, reference_ms, w8_ms, w16_ms, reference
        );
    }
}
