use snaperz::params::{ExtenderParams, ParamsError};
use snaperz::windowed::{KernelBackend, WindowedExtender};
use snaperz::{Windowed8, Windowed16};

fn pulses_to_finish<T: snaperz::windowed::Lane, const N: usize>(
    mut ext: WindowedExtender<T, N>,
    cap: u64,
) -> Option<u64> {
    while !ext.finished() {
        if ext.pulses() >= cap {
            return None;
        }
        ext.simulate_pulse();
    }
    Some(ext.pulses())
}

const PERIOD_12: [(u32, u64); 12] = [
    (1, 1),
    (2, 3),
    (3, 3),
    (4, 9),
    (6, 23),
    (7, 22),
    (11, 54),
    (13, 117),
    (16, 451),
    (21, 3728),
    (24, 919),
    (30, 4673),
];

#[test]
fn eight_bit_lanes_match_regression_counts() {
    for (length, pulses) in PERIOD_12 {
        let params = ExtenderParams::from_period(length, 12).unwrap();
        for backend in [KernelBackend::Scalar, KernelBackend::Avx2] {
            let ext = Windowed8::with_backend(params, Some(backend)).unwrap();
            assert_eq!(
                pulses_to_finish(ext, 100_000),
                Some(pulses),
                "length {length} {backend:?}"
            );
        }
    }
}

#[test]
fn sixteen_bit_lanes_match_regression_counts() {
    for (length, pulses) in PERIOD_12 {
        let params = ExtenderParams::from_period(length, 12).unwrap();
        let ext = Windowed16::new(params).unwrap();
        assert_eq!(pulses_to_finish(ext, 100_000), Some(pulses), "length {length}");
    }
}

#[test]
fn windows_longer_than_one_register_pair() {
    // 41 segments overflow the 32-cell span of the 16-bit engine; the
    // 8-bit engine pads them to an even ring inside one span.
    let params = ExtenderParams::from_period(40, 12).unwrap();
    assert_eq!(pulses_to_finish(Windowed16::new(params).unwrap(), 100_000), Some(21_567));
    assert_eq!(pulses_to_finish(Windowed8::new(params).unwrap(), 100_000), Some(21_567));
}

#[test]
fn period_16_counts() {
    for (length, pulses) in [(4, 8), (5, 18), (7, 39), (12, 92), (13, 190)] {
        let params = ExtenderParams::from_period(length, 16).unwrap();
        assert_eq!(
            pulses_to_finish(Windowed8::new(params).unwrap(), 100_000),
            Some(pulses),
            "length {length}"
        );
    }
}

#[test]
fn blocks_are_conserved_every_pulse() {
    for (length, period) in [(1, 12), (8, 12), (31, 12), (32, 16), (33, 12), (70, 20), (200, 12)] {
        let params = ExtenderParams::from_period(length, period).unwrap();
        let mut narrow = Windowed8::new(params).unwrap();
        let mut wide = Windowed16::new(params).unwrap();
        for pulse in 1..=1_000 {
            narrow.simulate_pulse();
            wide.simulate_pulse();
            assert_eq!(narrow.resident_total(), length as u64 + 1, "u8 length {length} pulse {pulse}");
            assert_eq!(wide.resident_total(), length as u64 + 1, "u16 length {length} pulse {pulse}");
        }
    }
}

#[test]
fn lengths_beyond_the_lane_are_rejected() {
    let params = ExtenderParams::from_period(255, 12).unwrap();
    assert!(matches!(
        Windowed8::new(params),
        Err(ParamsError::LaneOverflow { bits: 8, .. })
    ));
    let params = ExtenderParams::from_period(65_535, 12).unwrap();
    assert!(matches!(
        Windowed16::new(params),
        Err(ParamsError::LaneOverflow { bits: 16, .. })
    ));
}

#[test]
fn runs_are_deterministic() {
    let params = ExtenderParams::from_period(57, 12).unwrap();
    let mut a = Windowed8::new(params).unwrap();
    let mut b = Windowed8::new(params).unwrap();
    assert_eq!(a, a.clone());
    for _ in 0..3_000 {
        a.simulate_pulse();
        b.simulate_pulse();
        assert_eq!(a, b);
        assert_eq!(a.finished(), b.finished());
    }
    assert_eq!(a.pulses(), 3_000);
}

#[test]
fn scalar_and_avx2_backends_agree_on_state() {
    let params = ExtenderParams::from_period(90, 16).unwrap();
    let mut scalar = Windowed8::with_backend(params, Some(KernelBackend::Scalar)).unwrap();
    let mut vector = Windowed8::with_backend(params, Some(KernelBackend::Avx2)).unwrap();
    for _ in 0..2_000 {
        scalar.simulate_pulse();
        vector.simulate_pulse();
        assert_eq!(scalar, vector);
    }
}
