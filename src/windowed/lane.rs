//! Element types a window lane can hold.

use std::fmt::Debug;
use std::ops::{BitAnd, BitOr, Not};

#[cfg(target_arch = "x86_64")]
use super::kernel::{KernelConstants, WindowLanes};

/// An unsigned lane element. Arithmetic wraps like the vector instructions
/// it stands in for; masks are all-ones (`MAX`) or zero.
pub trait Lane:
    Copy
    + Default
    + Eq
    + Ord
    + Debug
    + Send
    + Sync
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + Not<Output = Self>
    + 'static
{
    const ZERO: Self;
    const ONE: Self;
    const MAX: Self;
    const BITS: u32;

    fn wrapping_add(self, rhs: Self) -> Self;
    fn wrapping_sub(self, rhs: Self) -> Self;
    fn from_u32(value: u32) -> Option<Self>;
    fn to_u64(self) -> u64;

    /// Run the transition kernel over one 256-bit register per operand.
    ///
    /// # Safety
    /// The CPU must support AVX2 and every slice in `lanes` must span exactly
    /// 32 bytes.
    #[cfg(target_arch = "x86_64")]
    unsafe fn transition_avx2(lanes: WindowLanes<'_, Self>, constants: &KernelConstants<Self>);
}

macro_rules! impl_lane {
    ($ty:ty, $avx2:ident) => {
        impl Lane for $ty {
            const ZERO: Self = 0;
            const ONE: Self = 1;
            const MAX: Self = <$ty>::MAX;
            const BITS: u32 = <$ty>::BITS;

            #[inline(always)]
            fn wrapping_add(self, rhs: Self) -> Self {
                <$ty>::wrapping_add(self, rhs)
            }

            #[inline(always)]
            fn wrapping_sub(self, rhs: Self) -> Self {
                <$ty>::wrapping_sub(self, rhs)
            }

            #[inline]
            fn from_u32(value: u32) -> Option<Self> {
                <$ty>::try_from(value).ok()
            }

            #[inline(always)]
            fn to_u64(self) -> u64 {
                self as u64
            }

            #[cfg(target_arch = "x86_64")]
            #[inline(always)]
            unsafe fn transition_avx2(lanes: WindowLanes<'_, Self>, constants: &KernelConstants<Self>) {
                unsafe { super::kernel::$avx2(lanes, constants) }
            }
        }
    };
}

impl_lane!(u8, transition_avx2_u8);
impl_lane!(u16, transition_avx2_u16);
