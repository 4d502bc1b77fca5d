use snaperz::extender::EngineKind;
use snaperz::params::ExtenderParams;
use snaperz::runner::{self, Outcome, RunConfig};
use snaperz::{KernelBackend, ReferenceExtender, Windowed8, Windowed16};

fn reference_config() -> RunConfig {
    RunConfig::default().engine(EngineKind::Reference).log_interval(0)
}

fn windowed_config() -> RunConfig {
    RunConfig::default().engine(EngineKind::Windowed).log_interval(0)
}

#[test]
fn finishing_extenders_report_their_pulse_count() {
    for (length, pulses) in [(3, 3), (8, 23), (22, 919), (33, 36_504)] {
        let params = ExtenderParams::from_period(length, 12).unwrap();
        let expected = Outcome::Finished { pulses };
        assert_eq!(runner::run(params, &reference_config()).unwrap(), expected, "length {length}");
        assert_eq!(runner::run(params, &windowed_config()).unwrap(), expected, "length {length}");
    }
}

#[test]
fn reference_loops_are_found_on_even_pulses() {
    for (length, pulses) in [(14, 468), (15, 150), (16, 184), (20, 1540)] {
        let params = ExtenderParams::from_period(length, 16).unwrap();
        assert_eq!(
            runner::run(params, &reference_config()).unwrap(),
            Outcome::Loop { pulses },
            "length {length}"
        );
    }
}

#[test]
fn fast_loop_detection_finds_loops_one_pulse_earlier() {
    let config = reference_config().fast_loop_detection(true);
    for (length, pulses) in [(14, 467), (15, 149), (16, 183), (20, 1539)] {
        let params = ExtenderParams::from_period(length, 16).unwrap();
        assert_eq!(runner::run(params, &config).unwrap(), Outcome::Loop { pulses }, "length {length}");
    }

    let params = ExtenderParams::new(15, 2, 2).unwrap();
    assert_eq!(runner::run(params, &config).unwrap(), Outcome::Loop { pulses: 91 });
    let windowed = windowed_config().fast_loop_detection(true);
    assert_eq!(runner::run(params, &windowed).unwrap(), Outcome::Loop { pulses: 367 });
}

#[test]
fn equal_push_limits_loop() {
    let params = ExtenderParams::new(13, 2, 2).unwrap();
    assert_eq!(
        runner::run(params, &reference_config()).unwrap(),
        Outcome::Loop { pulses: 468 }
    );
    let params = ExtenderParams::new(15, 2, 2).unwrap();
    assert_eq!(
        runner::run(params, &reference_config()).unwrap(),
        Outcome::Loop { pulses: 92 }
    );
}

#[test]
fn windowed_loops_agree_in_kind() {
    // The windowed state also encodes the pipeline phase, so a repeat can
    // be seen later than with the reference engine.
    let cases = [
        (ExtenderParams::from_period(14, 16).unwrap(), 1872),
        (ExtenderParams::from_period(15, 16).unwrap(), 400),
        (ExtenderParams::from_period(16, 16).unwrap(), 1656),
        (ExtenderParams::from_period(20, 16).unwrap(), 1540),
        (ExtenderParams::new(13, 2, 2).unwrap(), 1638),
        (ExtenderParams::new(15, 2, 2).unwrap(), 368),
    ];
    for (params, pulses) in cases {
        let expected = Outcome::Loop { pulses };
        assert_eq!(
            runner::run_engine::<Windowed8>(params, &windowed_config()).unwrap(),
            expected,
            "{params:?}"
        );
        assert_eq!(
            runner::run_engine::<Windowed16>(params, &windowed_config()).unwrap(),
            expected,
            "{params:?}"
        );
    }

    let fast = windowed_config().fast_loop_detection(true);
    let params = ExtenderParams::from_period(14, 16).unwrap();
    assert_eq!(runner::run(params, &fast).unwrap(), Outcome::Loop { pulses: 1871 });
}

#[test]
fn disabled_loop_check_runs_to_the_budget() {
    let params = ExtenderParams::from_period(14, 16).unwrap();
    let config = reference_config().check_loop(false).max_pulses(Some(5_000));
    assert_eq!(runner::run(params, &config).unwrap(), Outcome::Unresolved { pulses: 5_000 });
}

#[test]
fn explicit_kernels_give_identical_outcomes() {
    let params = ExtenderParams::from_period(29, 12).unwrap();
    for backend in [KernelBackend::Scalar, KernelBackend::Avx2] {
        let config = windowed_config().kernel(backend);
        assert_eq!(
            runner::run(params, &config).unwrap(),
            Outcome::Finished { pulses: 11_251 }
        );
    }
}

#[test]
fn generic_runner_accepts_any_engine() {
    let params = ExtenderParams::from_period(12, 16).unwrap();
    let config = reference_config();
    let expected = Outcome::Finished { pulses: 92 };
    assert_eq!(runner::run_engine::<ReferenceExtender>(params, &config).unwrap(), expected);
    assert_eq!(runner::run_engine::<Windowed8>(params, &config).unwrap(), expected);
}

#[test]
fn sweep_returns_rows_in_length_order() {
    let config = RunConfig::default().log_interval(0).max_pulses(Some(50_000));
    let rows = runner::sweep(1..=12, 12, &config, Some(2)).unwrap();
    let lengths: Vec<u32> = rows.iter().map(|row| row.params.length()).collect();
    assert_eq!(lengths, (1..=12).collect::<Vec<_>>());

    let pulses: Vec<Outcome> = rows.iter().map(|row| row.outcome).collect();
    let expected: Vec<Outcome> = [1, 3, 3, 9, 9, 23, 22, 23, 23, 23, 54, 57]
        .into_iter()
        .map(|pulses| Outcome::Finished { pulses })
        .collect();
    assert_eq!(pulses, expected);
}

#[test]
fn sweep_rejects_short_periods() {
    let config = RunConfig::default().log_interval(0);
    assert!(runner::sweep(1..=3, 8, &config, Some(1)).is_err());
}
