use super::kernel::{self, KernelBackend, KernelConstants};
use super::lane::Lane;
use super::vector::LaneVector;
use crate::params::{ExtenderParams, ParamsError};

/// Ring layout of the windowed engine.
///
/// Segment lengths live in a ring of `ring_len` cells. The two window
/// registers together cover `saturation` consecutive ring cells, one lane per
/// in-flight pulse; once `saturation` steps have run every window lane is
/// live and the oldest one is flushed back to the ring on each step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RingGeometry {
    ring_len: usize,
    saturation: usize,
}

impl RingGeometry {
    pub fn new(segment_count: usize, lanes: usize) -> Self {
        let span = 2 * lanes;
        // A short ring must be even so that both windows stay aligned with
        // the pulses they carry.
        let ring_len = if segment_count > span {
            segment_count
        } else {
            segment_count + (segment_count & 1)
        };
        Self {
            ring_len,
            saturation: ring_len.min(span),
        }
    }

    #[inline]
    pub fn ring_len(&self) -> usize {
        self.ring_len
    }

    #[inline]
    pub fn saturation(&self) -> usize {
        self.saturation
    }

    /// Lane that receives the segment read at each step.
    #[inline]
    pub fn insert_lane(&self) -> usize {
        self.saturation / 2 - 1
    }
}

/// Extender simulated with every in-flight pulse packed into SIMD lanes.
///
/// Pulses are pipelined: each step advances all live pulses by one segment,
/// and each simulated pulse adds two steps behind the previous one. Lane `j`
/// of the current window holds the segment pulse `j` is standing on; the
/// next window holds the segment right after it.
#[derive(Clone, Debug)]
pub struct WindowedExtender<T: Lane, const N: usize> {
    params: ExtenderParams,
    geometry: RingGeometry,
    constants: KernelConstants<T>,
    backend: KernelBackend,
    segments: Box<[T]>,
    windows: [LaneVector<T, N>; 2],
    counter: LaneVector<T, N>,
    last_seg: [LaneVector<T, N>; 2],
    parity: usize,
    cursor: usize,
    steps: u64,
    pulses: u64,
}

/// 32 lanes of 8 bits, for extenders up to 254 long.
pub type Windowed8 = WindowedExtender<u8, 32>;

/// 16 lanes of 16 bits, for extenders up to 65534 long.
pub type Windowed16 = WindowedExtender<u16, 16>;

impl<T: Lane, const N: usize> WindowedExtender<T, N> {
    const REGISTER_BYTES: usize = N * std::mem::size_of::<T>();
    const LANES_OK: () = assert!(N >= 1, "window needs at least one lane");

    /// Fully extended extender using the auto-detected kernel.
    pub fn new(params: ExtenderParams) -> Result<Self, ParamsError> {
        Self::with_backend(params, None)
    }

    /// `backend` is a request; it is downgraded to the scalar kernel when the
    /// CPU or register size cannot run it.
    pub fn with_backend(
        params: ExtenderParams,
        backend: Option<KernelBackend>,
    ) -> Result<Self, ParamsError> {
        let () = Self::LANES_OK;
        let constants = KernelConstants::new(&params).ok_or(ParamsError::LaneOverflow {
            length: params.length(),
            bits: T::BITS,
            max: T::MAX.to_u64(),
        })?;

        let geometry = RingGeometry::new(params.segment_count(), N);
        let mut segments = vec![T::ZERO; geometry.ring_len()].into_boxed_slice();
        segments[..params.segment_count()].fill(T::ONE);

        Ok(Self {
            params,
            geometry,
            constants,
            backend: kernel::resolve_kernel_backend(backend, Self::REGISTER_BYTES),
            segments,
            windows: [LaneVector::zero(); 2],
            counter: LaneVector::zero(),
            last_seg: [LaneVector::zero(); 2],
            parity: 0,
            cursor: 0,
            steps: 0,
            pulses: 0,
        })
    }

    /// Advance every in-flight pulse by one segment.
    pub fn simulate_step(&mut self) {
        let ring_len = self.geometry.ring_len;
        let saturation = self.geometry.saturation;
        let cursor = self.cursor;

        self.parity ^= 1;
        let (curr, next) = window_pair(&mut self.windows, self.parity);

        if self.steps >= saturation as u64 {
            self.segments[(cursor + ring_len - saturation) % ring_len] = next.lane(0);
        }
        next.shift_down(T::ZERO);
        next.set_lane(self.geometry.insert_lane(), self.segments[cursor]);

        kernel::transition(
            self.backend,
            curr,
            next,
            &mut self.counter,
            &mut self.last_seg[self.parity],
            &self.constants,
        );

        self.cursor = (cursor + 1) % ring_len;
        self.steps += 1;
    }

    /// Start one more pulse at the head of the extender.
    pub fn simulate_pulse(&mut self) {
        while self.cursor >= self.geometry.saturation {
            self.simulate_step();
        }
        self.simulate_step();
        self.simulate_step();
        self.pulses += 1;
    }

    /// Whether the head segment has absorbed every block.
    ///
    /// The head segment is the ring cell at index 0. The last two steps
    /// each wrote a mask for one window; the one that handled cell 0 (if
    /// any) tells whether its lane's count completed there.
    pub fn finished(&self) -> bool {
        let ring_len = self.geometry.ring_len;
        let insert_lane = self.geometry.insert_lane();
        let recent = [
            ((self.cursor + ring_len - 1) % ring_len, self.parity),
            ((self.cursor + ring_len - 2) % ring_len, self.parity ^ 1),
        ];
        for (read_at, buffer) in recent {
            // Lanes below the insert lane trail the read position by two
            // cells each.
            let lag = (read_at + ring_len - 1) % ring_len;
            if lag % 2 == 0 && lag <= 2 * insert_lane {
                return self.last_seg[buffer].lane(insert_lane - lag / 2) != T::ZERO;
            }
        }
        false
    }

    /// Total blocks held by the ring and the windows. Always `L + 1`.
    pub fn resident_total(&self) -> u64 {
        let ring_len = self.geometry.ring_len;
        let live = (self.geometry.saturation as u64).min(self.steps) as usize;
        // Cells read during the last `live` steps are held by the windows.
        let in_window = |index: usize| (self.cursor + ring_len - 1 - index) % ring_len < live;
        let ring: u64 = self
            .segments
            .iter()
            .enumerate()
            .filter(|&(index, _)| !in_window(index))
            .map(|(_, &len)| len.to_u64())
            .sum();
        ring + self.windows[0].total() + self.windows[1].total()
    }

    #[inline]
    pub fn pulses(&self) -> u64 {
        self.pulses
    }

    #[inline]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[inline]
    pub fn geometry(&self) -> RingGeometry {
        self.geometry
    }

    #[inline]
    pub fn backend(&self) -> KernelBackend {
        self.backend
    }

    #[inline]
    fn saturated(&self) -> bool {
        self.steps >= self.geometry.saturation as u64
    }
}

/// Split the window array into (current, next) for a step whose next window
/// sits at `next_index`.
#[inline(always)]
fn window_pair<T: Lane, const N: usize>(
    windows: &mut [LaneVector<T, N>; 2],
    next_index: usize,
) -> (&mut LaneVector<T, N>, &mut LaneVector<T, N>) {
    let [first, second] = windows;
    if next_index == 1 {
        (first, second)
    } else {
        (second, first)
    }
}

/// Two extenders compare equal when they would evolve identically: same
/// parameters and pipeline phase, same window contents by role, and same
/// ring cells outside the windows. The pulse count is not compared.
impl<T: Lane, const N: usize> PartialEq for WindowedExtender<T, N> {
    fn eq(&self, other: &Self) -> bool {
        if self.params != other.params
            || self.saturated() != other.saturated()
            || self.cursor != other.cursor
        {
            return false;
        }
        if self.windows[self.parity] != other.windows[other.parity]
            || self.windows[self.parity ^ 1] != other.windows[other.parity ^ 1]
        {
            return false;
        }
        let ring_len = self.geometry.ring_len;
        (0..ring_len - self.geometry.saturation).all(|offset| {
            let index = (self.cursor + offset) % ring_len;
            self.segments[index] == other.segments[index]
        })
    }
}

impl<T: Lane, const N: usize> Eq for WindowedExtender<T, N> {}
