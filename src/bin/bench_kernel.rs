use rand::{Rng, SeedableRng};
use snaperz::params::ExtenderParams;
use snaperz::windowed::kernel::{self, KernelBackend, KernelConstants};
use snaperz::windowed::{Lane, LaneVector, Windowed8};
use std::env;
use std::hint::black_box;
use std::time::Instant;

#[derive(Clone, Debug)]
struct BenchConfig {
    length: u32,
    period: u32,
    calls: u64,
    pulses: u64,
    seed: u64,
    json: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            length: 200,
            period: 12,
            calls: 50_000_000,
            pulses: 20_000_000,
            seed: 0xA5A5_5EED_7788_1122,
            json: false,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct RunResult {
    kernel_ns: f64,
    pulse_ns: f64,
    finished: bool,
}

fn parse_args() -> BenchConfig {
    let mut cfg = BenchConfig::default();
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--length" => {
                if let Some(v) = args.next() {
                    cfg.length = v.parse().expect("--length expects u32");
                }
            }
            "--period" => {
                if let Some(v) = args.next() {
                    cfg.period = v.parse().expect("--period expects u32");
                }
            }
            "--calls" => {
                if let Some(v) = args.next() {
                    cfg.calls = v.parse().expect("--calls expects u64");
                }
            }
            "--pulses" => {
                if let Some(v) = args.next() {
                    cfg.pulses = v.parse().expect("--pulses expects u64");
                }
            }
            "--seed" => {
                if let Some(v) = args.next() {
                    cfg.seed = if let Some(hex) = v.strip_prefix("0x") {
                        u64::from_str_radix(hex, 16).expect("--seed hex parse failed")
                    } else {
                        v.parse().expect("--seed expects u64")
                    };
                }
            }
            "--json" => {
                cfg.json = true;
            }
            other => panic!("unknown arg: {other}"),
        }
    }
    cfg
}

fn random_window(rng: &mut rand::rngs::StdRng, max: u32) -> LaneVector<u8, 32> {
    let mut v = LaneVector::zero();
    for lane in 0..32 {
        let value = rng.gen_range(0..=max);
        v.set_lane(lane, <u8 as Lane>::from_u32(value).expect("lane value fits u8"));
    }
    v
}

fn run_backend(cfg: &BenchConfig, backend: KernelBackend) -> RunResult {
    let params = ExtenderParams::from_period(cfg.length, cfg.period).expect("valid parameters");
    let constants = KernelConstants::<u8>::new(&params).expect("length fits u8 lanes");
    let mut rng = rand::rngs::StdRng::seed_from_u64(cfg.seed);
    let mut curr = random_window(&mut rng, 4);
    let mut next = random_window(&mut rng, cfg.length + 1);
    let mut counter = random_window(&mut rng, cfg.length + 1);
    let mut last_seg = LaneVector::zero();

    let start = Instant::now();
    for _ in 0..cfg.calls {
        kernel::transition(
            backend,
            black_box(&mut curr),
            black_box(&mut next),
            black_box(&mut counter),
            &mut last_seg,
            &constants,
        );
    }
    let kernel_ns = start.elapsed().as_secs_f64() * 1e9 / cfg.calls as f64;

    let mut ext = Windowed8::with_backend(params, Some(backend)).expect("length fits u8 lanes");
    let start = Instant::now();
    for _ in 0..cfg.pulses {
        ext.simulate_pulse();
    }
    let pulse_ns = start.elapsed().as_secs_f64() * 1e9 / cfg.pulses as f64;

    RunResult {
        kernel_ns,
        pulse_ns,
        finished: ext.finished(),
    }
}

fn main() {
    let cfg = parse_args();
    let scalar = run_backend(&cfg, KernelBackend::Scalar);

    let avx2_supported = {
        #[cfg(target_arch = "x86_64")]
        {
            std::is_x86_feature_detected!("avx2")
        }
        #[cfg(not(target_arch = "x86_64"))]
        {
            false
        }
    };

    let avx2 = if avx2_supported {
        Some(run_backend(&cfg, KernelBackend::Avx2))
    } else {
        None
    };

    if cfg.json {
        match avx2 {
            Some(avx2_res) => {
                println!(
                    "{{\"length\":{},\"period\":{},\"calls\":{},\"pulses\":{},\"seed\":{},\"scalar\":{{\"kernel_ns\":{:.3},\"pulse_ns\":{:.3}}},\"avx2\":{{\"supported\":true,\"kernel_ns\":{:.3},\"pulse_ns\":{:.3}}},\"speedup\":{:.6}}}",
                    cfg.length,
                    cfg.period,
                    cfg.calls,
                    cfg.pulses,
                    cfg.seed,
                    scalar.kernel_ns,
                    scalar.pulse_ns,
                    avx2_res.kernel_ns,
                    avx2_res.pulse_ns,
                    scalar.pulse_ns / avx2_res.pulse_ns,
                );
            }
            None => {
                println!(
                    "{{\"length\":{},\"period\":{},\"calls\":{},\"pulses\":{},\"seed\":{},\"scalar\":{{\"kernel_ns\":{:.3},\"pulse_ns\":{:.3}}},\"avx2\":{{\"supported\":false}}}}",
                    cfg.length,
                    cfg.period,
                    cfg.calls,
                    cfg.pulses,
                    cfg.seed,
                    scalar.kernel_ns,
                    scalar.pulse_ns,
                );
            }
        }
    } else {
        println!(
            "scalar: kernel_ns={:.3}, pulse_ns={:.3}, finished={}",
            scalar.kernel_ns, scalar.pulse_ns, scalar.finished
        );
        match avx2 {
            Some(avx2_res) => {
                println!(
                    "avx2: kernel_ns={:.3}, pulse_ns={:.3}, finished={}, speedup={:.3}x",
                    avx2_res.kernel_ns,
                    avx2_res.pulse_ns,
                    avx2_res.finished,
                    scalar.pulse_ns / avx2_res.pulse_ns,
                );
                assert_eq!(scalar.finished, avx2_res.finished, "backends disagree");
            }
            None => {
                println!("avx2: unsupported");
            }
        }
    }
}
