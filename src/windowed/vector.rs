//! Portable N-lane register.
//!
//! `LaneVector` models one vector register as a plain array so the window
//! logic can be written once for every element width. The lane-wise loops
//! are simple enough for the compiler to vectorize on its own; the AVX2
//! kernel loads the same memory directly.

use super::lane::Lane;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(C, align(32))]
pub struct LaneVector<T: Lane, const N: usize>(pub [T; N]);

impl<T: Lane, const N: usize> Default for LaneVector<T, N> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<T: Lane, const N: usize> LaneVector<T, N> {
    #[inline(always)]
    pub fn zero() -> Self {
        Self([T::ZERO; N])
    }

    #[inline(always)]
    pub fn splat(value: T) -> Self {
        Self([value; N])
    }

    #[inline(always)]
    pub fn lane(&self, index: usize) -> T {
        self.0[index]
    }

    #[inline(always)]
    pub fn set_lane(&mut self, index: usize, value: T) {
        self.0[index] = value;
    }

    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.0
    }

    #[inline(always)]
    fn zip_with(&self, other: &Self, f: impl Fn(T, T) -> T) -> Self {
        let mut out = [T::ZERO; N];
        for (dst, (&a, &b)) in out.iter_mut().zip(self.0.iter().zip(other.0.iter())) {
            *dst = f(a, b);
        }
        Self(out)
    }

    #[inline(always)]
    pub fn wrapping_add(&self, other: &Self) -> Self {
        self.zip_with(other, T::wrapping_add)
    }

    #[inline(always)]
    pub fn wrapping_sub(&self, other: &Self) -> Self {
        self.zip_with(other, T::wrapping_sub)
    }

    /// Unsigned lane-wise minimum.
    #[inline(always)]
    pub fn min(&self, other: &Self) -> Self {
        self.zip_with(other, |a, b| a.min(b))
    }

    /// All-ones where the lanes are equal, zero elsewhere.
    #[inline(always)]
    pub fn eq_mask(&self, other: &Self) -> Self {
        self.zip_with(other, |a, b| if a == b { T::MAX } else { T::ZERO })
    }

    #[inline(always)]
    pub fn and(&self, other: &Self) -> Self {
        self.zip_with(other, |a, b| a & b)
    }

    /// `self & !mask`, lane-wise.
    #[inline(always)]
    pub fn and_not(&self, mask: &Self) -> Self {
        self.zip_with(mask, |a, m| a & !m)
    }

    /// Pick `if_set` where `mask` is all-ones and `if_clear` elsewhere.
    #[inline(always)]
    pub fn select(mask: &Self, if_set: &Self, if_clear: &Self) -> Self {
        if_clear
            .and_not(mask)
            .zip_with(&if_set.and(mask), |a, b| a | b)
    }

    /// Move every lane one step toward lane 0, dropping lane 0 and filling
    /// the top lane with `fill`.
    #[inline(always)]
    pub fn shift_down(&mut self, fill: T) {
        self.0.copy_within(1.., 0);
        self.0[N - 1] = fill;
    }

    /// Sum of all lanes, widened.
    pub fn total(&self) -> u64 {
        self.0.iter().map(|&lane| lane.to_u64()).sum()
    }
}
