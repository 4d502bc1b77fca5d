//! Extender parameters shared by every engine.
//!
//! A Snaperz extender is fully described by its length and the two push
//! limits. The push limits follow from the period of the repeater line:
//! pistons inside the extender can only push `period / 4 - 2` blocks before
//! blocks start moving in front of them (the virtual push limit), capped by
//! the hard piston limit. The segment holding the extended block is not
//! bound by the virtual limit and may push one extra block.

use thiserror::Error;

/// Hard push limit of a single piston.
pub const HARD_PUSH_LIMIT: u32 = 12;

/// Default repeater-line period in game ticks.
pub const DEFAULT_PERIOD: u32 = 12;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamsError {
    #[error("extender length must be at least 1")]
    ZeroLength,
    #[error("push limit must be at least 1")]
    ZeroPushLimit,
    #[error("period {period} gives a virtual push limit of 0 (need a period of at least 12)")]
    PeriodTooShort { period: u32 },
    #[error("last push limit {last} is below the push limit {push}")]
    LastBelowPush { push: u32, last: u32 },
    #[error("push limit {limit} exceeds the hard push limit {}", HARD_PUSH_LIMIT)]
    AboveHardLimit { limit: u32 },
    #[error("length {length} does not fit in {bits}-bit lanes (max {max})")]
    LaneOverflow { length: u32, bits: u32, max: u64 },
}

/// Immutable simulation parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ExtenderParams {
    length: u32,
    push_limit: u32,
    last_push_limit: u32,
}

impl ExtenderParams {
    pub fn new(length: u32, push_limit: u32, last_push_limit: u32) -> Result<Self, ParamsError> {
        if length == 0 {
            return Err(ParamsError::ZeroLength);
        }
        if push_limit == 0 {
            return Err(ParamsError::ZeroPushLimit);
        }
        if last_push_limit < push_limit {
            return Err(ParamsError::LastBelowPush {
                push: push_limit,
                last: last_push_limit,
            });
        }
        if last_push_limit > HARD_PUSH_LIMIT {
            return Err(ParamsError::AboveHardLimit {
                limit: last_push_limit,
            });
        }
        if length == u32::MAX {
            return Err(ParamsError::LaneOverflow {
                length,
                bits: 32,
                max: u32::MAX as u64,
            });
        }
        Ok(Self {
            length,
            push_limit,
            last_push_limit,
        })
    }

    /// Derive the push limits from the repeater-line period.
    pub fn from_period(length: u32, period: u32) -> Result<Self, ParamsError> {
        let virtual_limit = virtual_push_limit(period);
        if virtual_limit == 0 {
            return Err(ParamsError::PeriodTooShort { period });
        }
        let push_limit = virtual_limit.min(HARD_PUSH_LIMIT);
        let last_push_limit = (push_limit + 1).min(HARD_PUSH_LIMIT);
        Self::new(length, push_limit, last_push_limit)
    }

    #[inline]
    pub fn length(&self) -> u32 {
        self.length
    }

    #[inline]
    pub fn push_limit(&self) -> u32 {
        self.push_limit
    }

    #[inline]
    pub fn last_push_limit(&self) -> u32 {
        self.last_push_limit
    }

    /// Number of segments, one per piston plus one for the extended block.
    /// This is also the total number of blocks (conserved across pulses).
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.length as usize + 1
    }

    /// Narrowest lane that can hold any segment length.
    pub fn lane_width(&self) -> LaneWidth {
        LaneWidth::for_length(self.length)
    }
}

/// Virtual push limit for a repeater line with the given period.
#[inline]
pub const fn virtual_push_limit(period: u32) -> u32 {
    (period / 4).saturating_sub(2)
}

/// Unsigned element widths, narrowest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LaneWidth {
    U8,
    U16,
    U32,
    U64,
}

impl LaneWidth {
    pub const ALL: [LaneWidth; 4] = [LaneWidth::U8, LaneWidth::U16, LaneWidth::U32, LaneWidth::U64];

    pub const fn bits(self) -> u32 {
        match self {
            LaneWidth::U8 => 8,
            LaneWidth::U16 => 16,
            LaneWidth::U32 => 32,
            LaneWidth::U64 => 64,
        }
    }

    pub const fn max_value(self) -> u64 {
        match self {
            LaneWidth::U8 => u8::MAX as u64,
            LaneWidth::U16 => u16::MAX as u64,
            LaneWidth::U32 => u32::MAX as u64,
            LaneWidth::U64 => u64::MAX,
        }
    }

    /// Smallest width holding `length + 1`.
    pub fn for_length(length: u32) -> LaneWidth {
        let total = length as u64 + 1;
        Self::ALL
            .into_iter()
            .find(|width| total <= width.max_value())
            .unwrap_or(LaneWidth::U64)
    }
}
