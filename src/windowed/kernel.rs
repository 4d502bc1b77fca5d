//! Branch-free transition kernel for the windowed engine.
//!
//! One call applies the push/pull rule to every lane of a window pair at
//! once. Lane `j` of `curr` and lane `j` of `next` are two neighbouring
//! segments seen by the same in-flight pulse; the per-lane counter tracks how
//! many blocks that pulse has walked past so the segment carrying the
//! extended block can be recognised.

use std::sync::OnceLock;

use super::lane::Lane;
use super::vector::LaneVector;
use crate::params::ExtenderParams;

/// Width of the hardware register the AVX2 kernel operates on.
pub const AVX2_REGISTER_BYTES: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KernelBackend {
    Scalar,
    Avx2,
}

static AUTO_KERNEL_BACKEND: OnceLock<KernelBackend> = OnceLock::new();

/// Splatted per-run constants, narrowed to the lane type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KernelConstants<T: Lane> {
    pub push_limit: T,
    pub last_push_limit: T,
    pub len_plus_one: T,
}

impl<T: Lane> KernelConstants<T> {
    /// `None` when the block count does not fit the lane type.
    pub fn new(params: &ExtenderParams) -> Option<Self> {
        Some(Self {
            push_limit: T::from_u32(params.push_limit())?,
            last_push_limit: T::from_u32(params.last_push_limit())?,
            len_plus_one: T::from_u32(params.length().checked_add(1)?)?,
        })
    }
}

/// Mutable views of the four registers one kernel call touches.
pub struct WindowLanes<'a, T> {
    pub curr: &'a mut [T],
    pub next: &'a mut [T],
    pub counter: &'a mut [T],
    pub last_seg: &'a mut [T],
}

/// Portable kernel.
#[inline(always)]
pub fn transition_scalar<T: Lane, const N: usize>(
    curr: &mut LaneVector<T, N>,
    next: &mut LaneVector<T, N>,
    counter: &mut LaneVector<T, N>,
    last_seg: &mut LaneVector<T, N>,
    constants: &KernelConstants<T>,
) {
    let zeros = LaneVector::<T, N>::zero();
    let ones = LaneVector::<T, N>::splat(T::ONE);
    let push_limit = LaneVector::<T, N>::splat(constants.push_limit);
    let last_push_limit = LaneVector::<T, N>::splat(constants.last_push_limit);
    let len_plus_one = LaneVector::<T, N>::splat(constants.len_plus_one);

    // A lane is at the last segment once it has seen every block.
    *counter = counter.wrapping_add(curr);
    let last_mask = counter.eq_mask(&len_plus_one);

    // Push: min(limit, C - 1), only where C > 1. C = 0 wraps C - 1 to MAX,
    // which the zero mask clears.
    let curr_minus_one = curr.wrapping_sub(&ones);
    let limit = LaneVector::select(&last_mask, &last_push_limit, &push_limit);
    let equal_one = curr.eq_mask(&ones);
    let equal_zero = curr.eq_mask(&zeros);
    let push_delta = limit
        .min(&curr_minus_one)
        .and_not(&equal_one)
        .and_not(&equal_zero);

    // Pull: take the whole next segment where C == 1, unless this is the
    // last segment.
    let pull_delta = next.and_not(&last_mask).and(&equal_one);

    let delta = pull_delta.wrapping_sub(&push_delta);
    *curr = curr.wrapping_add(&delta);
    *next = next.wrapping_sub(&delta);

    // A pull can complete the count; once complete the counter stays at zero
    // until the pulse wraps back around to segment 0.
    *counter = counter.wrapping_add(&delta);
    *last_seg = counter.eq_mask(&len_plus_one);
    *counter = counter.and_not(last_seg);
}

#[cfg(target_arch = "x86_64")]
macro_rules! avx2_transition {
    ($name:ident, $ty:ty, $signed:ty, $set1:ident, $add:ident, $sub:ident, $cmpeq:ident, $min:ident) => {
        /// AVX2 kernel over a single 256-bit register per operand.
        ///
        /// # Safety
        /// Requires AVX2. Every slice in `lanes` must be 32 bytes long.
        #[target_feature(enable = "avx2")]
        pub unsafe fn $name(lanes: WindowLanes<'_, $ty>, constants: &KernelConstants<$ty>) {
            use std::arch::x86_64::{
                __m256i, $add, $cmpeq, $min, $set1, $sub, _mm256_and_si256, _mm256_andnot_si256,
                _mm256_blendv_epi8, _mm256_loadu_si256, _mm256_setzero_si256, _mm256_storeu_si256,
            };

            debug_assert_eq!(std::mem::size_of_val(lanes.curr), AVX2_REGISTER_BYTES);
            debug_assert_eq!(std::mem::size_of_val(lanes.next), AVX2_REGISTER_BYTES);
            debug_assert_eq!(std::mem::size_of_val(lanes.counter), AVX2_REGISTER_BYTES);
            debug_assert_eq!(std::mem::size_of_val(lanes.last_seg), AVX2_REGISTER_BYTES);

            let curr_ptr = lanes.curr.as_mut_ptr() as *mut __m256i;
            let next_ptr = lanes.next.as_mut_ptr() as *mut __m256i;
            let counter_ptr = lanes.counter.as_mut_ptr() as *mut __m256i;
            let last_seg_ptr = lanes.last_seg.as_mut_ptr() as *mut __m256i;

            unsafe {
                let zeros = _mm256_setzero_si256();
                let ones = $set1(1);
                let push_limit = $set1(constants.push_limit as $signed);
                let last_push_limit = $set1(constants.last_push_limit as $signed);
                let len_plus_one = $set1(constants.len_plus_one as $signed);

                let curr = _mm256_loadu_si256(curr_ptr);
                let next = _mm256_loadu_si256(next_ptr);
                let mut counter = _mm256_loadu_si256(counter_ptr);

                counter = $add(counter, curr);
                let last_mask = $cmpeq(counter, len_plus_one);

                let curr_minus_one = $sub(curr, ones);
                let limit = _mm256_blendv_epi8(push_limit, last_push_limit, last_mask);
                let mut push_delta = $min(limit, curr_minus_one);
                let equal_one = $cmpeq(curr, ones);
                push_delta = _mm256_andnot_si256(equal_one, push_delta);
                let equal_zero = $cmpeq(curr, zeros);
                push_delta = _mm256_andnot_si256(equal_zero, push_delta);

                let mut pull_delta = _mm256_andnot_si256(last_mask, next);
                pull_delta = _mm256_and_si256(equal_one, pull_delta);

                let delta = $sub(pull_delta, push_delta);
                _mm256_storeu_si256(curr_ptr, $add(curr, delta));
                _mm256_storeu_si256(next_ptr, $sub(next, delta));

                counter = $add(counter, delta);
                let last_seg = $cmpeq(counter, len_plus_one);
                _mm256_storeu_si256(last_seg_ptr, last_seg);
                _mm256_storeu_si256(counter_ptr, _mm256_andnot_si256(last_seg, counter));
            }
        }
    };
}

#[cfg(target_arch = "x86_64")]
avx2_transition!(
    transition_avx2_u8,
    u8,
    i8,
    _mm256_set1_epi8,
    _mm256_add_epi8,
    _mm256_sub_epi8,
    _mm256_cmpeq_epi8,
    _mm256_min_epu8
);

#[cfg(target_arch = "x86_64")]
avx2_transition!(
    transition_avx2_u16,
    u16,
    i16,
    _mm256_set1_epi16,
    _mm256_add_epi16,
    _mm256_sub_epi16,
    _mm256_cmpeq_epi16,
    _mm256_min_epu16
);

/// Dispatch one kernel call to the selected backend.
///
/// An AVX2 request runs the portable kernel when the CPU lacks AVX2 or the
/// vector is not one 256-bit register.
#[inline(always)]
pub fn transition<T: Lane, const N: usize>(
    backend: KernelBackend,
    curr: &mut LaneVector<T, N>,
    next: &mut LaneVector<T, N>,
    counter: &mut LaneVector<T, N>,
    last_seg: &mut LaneVector<T, N>,
    constants: &KernelConstants<T>,
) {
    match backend {
        KernelBackend::Scalar => transition_scalar(curr, next, counter, last_seg, constants),
        KernelBackend::Avx2 => {
            #[cfg(target_arch = "x86_64")]
            {
                if N * std::mem::size_of::<T>() != AVX2_REGISTER_BYTES || !avx2_available() {
                    return transition_scalar(curr, next, counter, last_seg, constants);
                }
                let lanes = WindowLanes {
                    curr: curr.as_mut_slice(),
                    next: next.as_mut_slice(),
                    counter: counter.as_mut_slice(),
                    last_seg: last_seg.as_mut_slice(),
                };
                // SAFETY: AVX2 is present and every operand spans 32 bytes.
                unsafe { T::transition_avx2(lanes, constants) };
            }
            #[cfg(not(target_arch = "x86_64"))]
            transition_scalar(curr, next, counter, last_seg, constants);
        }
    }
}

#[inline]
fn avx2_available() -> bool {
    #[cfg(target_arch = "x86_64")]
    {
        std::is_x86_feature_detected!("avx2")
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        false
    }
}

#[inline]
fn detect_kernel_backend() -> KernelBackend {
    let auto_enabled = std::env::var("SNAPERZ_AUTO_KERNEL")
        .ok()
        .and_then(|v| {
            let v = v.trim();
            if v.is_empty() {
                None
            } else if v == "1" || v.eq_ignore_ascii_case("true") {
                Some(true)
            } else if v == "0" || v.eq_ignore_ascii_case("false") {
                Some(false)
            } else {
                None
            }
        })
        .unwrap_or(true);

    if auto_enabled {
        *AUTO_KERNEL_BACKEND.get_or_init(|| {
            if avx2_available() {
                KernelBackend::Avx2
            } else {
                KernelBackend::Scalar
            }
        })
    } else {
        KernelBackend::Scalar
    }
}

/// Resolve a requested backend against the CPU and the register size.
pub fn resolve_kernel_backend(
    requested: Option<KernelBackend>,
    register_bytes: usize,
) -> KernelBackend {
    let backend = requested.unwrap_or_else(detect_kernel_backend);
    match backend {
        KernelBackend::Avx2 if register_bytes == AVX2_REGISTER_BYTES && avx2_available() => {
            KernelBackend::Avx2
        }
        KernelBackend::Avx2 => {
            tracing::debug!(register_bytes, "AVX2 kernel unavailable, using scalar kernel");
            KernelBackend::Scalar
        }
        KernelBackend::Scalar => KernelBackend::Scalar,
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};

    use super::{KernelBackend, KernelConstants, resolve_kernel_backend, transition_scalar};
    use crate::params::ExtenderParams;
    use crate::windowed::lane::Lane;
    use crate::windowed::vector::LaneVector;

    fn constants<T: Lane>(length: u32, push: u32, last: u32) -> KernelConstants<T> {
        KernelConstants::new(&ExtenderParams::new(length, push, last).unwrap()).unwrap()
    }

    #[test]
    fn constants_reject_overflow() {
        let params = ExtenderParams::new(255, 1, 2).unwrap();
        assert!(KernelConstants::<u8>::new(&params).is_none());
        assert!(KernelConstants::<u16>::new(&params).is_some());
    }

    #[test]
    fn scalar_kernel_applies_push_and_pull() {
        let k = constants::<u8>(10, 2, 3);
        let mut curr = LaneVector::<u8, 32>::zero();
        let mut next = LaneVector::<u8, 32>::zero();
        let mut counter = LaneVector::<u8, 32>::zero();
        let mut last_seg = LaneVector::<u8, 32>::zero();

        // Lane 0: pull a 3-segment into a single piston.
        curr.set_lane(0, 1);
        next.set_lane(0, 3);
        // Lane 1: interior push capped by the push limit.
        curr.set_lane(1, 5);
        next.set_lane(1, 0);
        // Lane 2: push of length-1 only.
        curr.set_lane(2, 2);
        next.set_lane(2, 4);
        // Lane 3: last segment (counter completes at 11) pushes with the
        // last push limit; the pushed blocks belong to the next segment so
        // the count is no longer complete.
        counter.set_lane(3, 6);
        curr.set_lane(3, 5);
        // Lane 4: last segment of length one pulls nothing.
        counter.set_lane(4, 10);
        curr.set_lane(4, 1);
        next.set_lane(4, 7);

        transition_scalar(&mut curr, &mut next, &mut counter, &mut last_seg, &k);

        assert_eq!((curr.lane(0), next.lane(0)), (4, 0));
        assert_eq!((curr.lane(1), next.lane(1)), (3, 2));
        assert_eq!((curr.lane(2), next.lane(2)), (1, 5));
        assert_eq!((curr.lane(3), next.lane(3)), (2, 3));
        assert_eq!((curr.lane(4), next.lane(4)), (1, 7));

        assert_eq!(last_seg.lane(3), 0);
        assert_eq!(last_seg.lane(4), u8::MAX);
        assert_eq!(last_seg.lane(0), 0);
        assert_eq!(counter.lane(3), 8);
        // Completed lanes reset their counter.
        assert_eq!(counter.lane(4), 0);
        assert_eq!(counter.lane(0), 4);
    }

    #[test]
    fn empty_lanes_are_inert() {
        let k = constants::<u16>(40, 1, 2);
        let mut curr = LaneVector::<u16, 16>::zero();
        let mut next = LaneVector::<u16, 16>::splat(9);
        let mut counter = LaneVector::<u16, 16>::splat(3);
        let mut last_seg = LaneVector::<u16, 16>::zero();
        transition_scalar(&mut curr, &mut next, &mut counter, &mut last_seg, &k);
        assert_eq!(curr, LaneVector::zero());
        assert_eq!(next, LaneVector::splat(9));
        assert_eq!(counter, LaneVector::splat(3));
        assert_eq!(last_seg, LaneVector::zero());
    }

    #[test]
    fn scalar_request_is_honoured() {
        assert_eq!(
            resolve_kernel_backend(Some(KernelBackend::Scalar), 32),
            KernelBackend::Scalar
        );
        assert_eq!(
            resolve_kernel_backend(Some(KernelBackend::Avx2), 16),
            KernelBackend::Scalar
        );
    }

    fn random_vector<T: Lane, const N: usize>(rng: &mut rand::rngs::StdRng, max: u32) -> LaneVector<T, N> {
        let mut v = LaneVector::<T, N>::zero();
        for i in 0..N {
            let value = rng.gen_range(0..=max);
            v.set_lane(i, T::from_u32(value).unwrap());
        }
        v
    }

    fn assert_avx2_matches_scalar<T: Lane, const N: usize>(length: u32, seed: u64) {
        #[cfg(target_arch = "x86_64")]
        {
            if !std::is_x86_feature_detected!("avx2") {
                return;
            }
            let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
            for _ in 0..2048 {
                let push = rng.gen_range(1..=12);
                let last = rng.gen_range(push..=12);
                let k = constants::<T>(length, push, last);

                let curr = random_vector::<T, N>(&mut rng, 4);
                let next = random_vector::<T, N>(&mut rng, length + 1);
                let counter = random_vector::<T, N>(&mut rng, length + 1);

                let mut scalar = (curr, next, counter, LaneVector::<T, N>::zero());
                let mut simd = scalar;
                transition_scalar(&mut scalar.0, &mut scalar.1, &mut scalar.2, &mut scalar.3, &k);
                super::transition(
                    KernelBackend::Avx2,
                    &mut simd.0,
                    &mut simd.1,
                    &mut simd.2,
                    &mut simd.3,
                    &k,
                );
                assert_eq!(scalar, simd);
            }
        }
        #[cfg(not(target_arch = "x86_64"))]
        {
            let _ = (length, seed);
        }
    }

    #[test]
    fn avx2_matches_scalar_randomized_u8() {
        assert_avx2_matches_scalar::<u8, 32>(6, 0xA55A_F00D_1122_3344);
        assert_avx2_matches_scalar::<u8, 32>(200, 0x0DDB_A11C_AFE0_0001);
    }

    #[test]
    fn avx2_matches_scalar_randomized_u16() {
        assert_avx2_matches_scalar::<u16, 16>(9, 0x5EED_1234_ABCD_EF01);
        assert_avx2_matches_scalar::<u16, 16>(60_000, 0xFEED_FACE_0000_0002);
    }
}
