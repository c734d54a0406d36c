//! Price window partitioning.
//!
//! The listing site truncates every query at a fixed result depth, so the
//! catalog is swept as a sequence of narrow price windows instead of one
//! query. Window width follows a piecewise schedule: narrow where listing
//! density is high, wider towards the premium end.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A half-open price window `[min, max)` in whole currency units.
///
/// Bounds are private so every value goes through the `min < max` check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPriceRange")]
pub struct PriceRange {
    min: u32,
    max: u32,
}

#[derive(Deserialize)]
struct RawPriceRange {
    min: u32,
    max: u32,
}

impl TryFrom<RawPriceRange> for PriceRange {
    type Error = ScheduleError;

    fn try_from(raw: RawPriceRange) -> Result<Self, Self::Error> {
        Self::new(raw.min, raw.max)
    }
}

impl PriceRange {
    /// Builds a window, rejecting empty or inverted bounds.
    pub fn new(min: u32, max: u32) -> Result<Self, ScheduleError> {
        if min >= max {
            return Err(ScheduleError::EmptyRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    /// Exclusive upper bound.
    pub fn max(&self) -> u32 {
        self.max
    }

    /// Inclusive upper bound, as the site's price filter expects it.
    pub fn max_inclusive(&self) -> u32 {
        self.max - 1
    }

    pub fn width(&self) -> u32 {
        self.max - self.min
    }

    /// Label used both in the query string and in `price_range_searched`.
    pub fn query_label(&self) -> String {
        format!("{}-{}", self.min, self.max_inclusive())
    }
}

impl fmt::Display for PriceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.min, self.max)
    }
}

/// One segment of the schedule: windows of `step` width up to `upper`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBand {
    pub upper: u32,
    pub step: u32,
}

impl PriceBand {
    pub const fn new(upper: u32, step: u32) -> Self {
        Self { upper, step }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("price range [{min}, {max}) is empty")]
    EmptyRange { min: u32, max: u32 },

    #[error("price schedule has no bands")]
    NoBands,

    #[error("band {index} has a zero step")]
    ZeroStep { index: usize },

    #[error("band {index} upper bound {upper} does not exceed previous bound {previous}")]
    NonIncreasingBand {
        index: usize,
        upper: u32,
        previous: u32,
    },
}

/// Validated piecewise schedule covering `[floor, ceiling)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSchedule {
    floor: u32,
    bands: Vec<PriceBand>,
}

impl PriceSchedule {
    pub fn new(floor: u32, bands: Vec<PriceBand>) -> Result<Self, ScheduleError> {
        if bands.is_empty() {
            return Err(ScheduleError::NoBands);
        }

        let mut previous = floor;
        for (index, band) in bands.iter().enumerate() {
            if band.step == 0 {
                return Err(ScheduleError::ZeroStep { index });
            }
            if band.upper <= previous {
                return Err(ScheduleError::NonIncreasingBand {
                    index,
                    upper: band.upper,
                    previous,
                });
            }
            previous = band.upper;
        }

        Ok(Self { floor, bands })
    }

    pub fn floor(&self) -> u32 {
        self.floor
    }

    /// Exclusive upper end of the whole schedule.
    pub fn ceiling(&self) -> u32 {
        // Validated non-empty in `new`.
        self.bands.last().map_or(self.floor, |band| band.upper)
    }

    pub fn bands(&self) -> &[PriceBand] {
        &self.bands
    }

    /// Generates the ordered, contiguous, non-overlapping window sequence.
    ///
    /// A band whose width is not a multiple of its step ends with a shorter
    /// window so that the next band starts exactly at the band boundary.
    pub fn partition(&self) -> Vec<PriceRange> {
        let mut ranges = Vec::new();
        let mut start = self.floor;

        for band in &self.bands {
            while start < band.upper {
                let end = start.saturating_add(band.step).min(band.upper);
                ranges.push(PriceRange { min: start, max: end });
                start = end;
            }
        }

        ranges
    }
}

impl Default for PriceSchedule {
    fn default() -> Self {
        Self {
            floor: 0,
            bands: vec![
                PriceBand::new(2500, 50),
                PriceBand::new(6000, 100),
                PriceBand::new(20000, 500),
            ],
        }
    }
}
