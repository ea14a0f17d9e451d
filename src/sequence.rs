use chrono::{Datelike, Duration, NaiveDateTime, SubsecRound, Timelike};
use std::fmt;

use crate::catalog::RegionId;

/// Time spacing between consecutive tiles, in minutes. Always a positive multiple of 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution(u32);

impl Resolution {
    pub const STEP: u32 = 5;

    pub fn new(minutes: u32) -> Option<Self> {
        if minutes >= Self::STEP && minutes % Self::STEP == 0 {
            Some(Resolution(minutes))
        } else {
            None
        }
    }

    pub fn minutes(self) -> u32 {
        self.0
    }

    pub fn duration(self) -> Duration {
        Duration::minutes(i64::from(self.0))
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceItem {
    pub index: usize,
    pub timestamp: NaiveDateTime,
    pub remote_filename: String,
}

impl SequenceItem {
    /// Name of the local file the tile is saved under.
    ///
    /// Frame names are a contiguous, zero-padded numeric sequence so that
    /// frame encoders can consume the directory directly.
    pub fn local_filename(&self, frame_naming: bool) -> String {
        if frame_naming {
            format!("{:05}.png", self.index)
        } else {
            format!("{}_{}", self.index, self.remote_filename)
        }
    }
}

pub fn remote_filename(timestamp: NaiveDateTime, region: RegionId) -> String {
    format!(
        "download_px250_{}_{}_{}.png",
        timestamp.format("%Y_%m_%d"),
        region,
        timestamp.format("%H%M")
    )
}

/// Rounds to the nearest multiple of `resolution` counted from 0001-01-01 00:00, the same grid
/// the image cache's tile times were requested on. Halfway values round up.
pub fn round_to_resolution(timestamp: NaiveDateTime, resolution: Resolution) -> NaiveDateTime {
    let timestamp = timestamp.trunc_subsecs(0);
    let grain = resolution.duration().num_seconds();
    let elapsed = i64::from(timestamp.date().num_days_from_ce() - 1) * 86_400
        + i64::from(timestamp.time().num_seconds_from_midnight());
    let remainder = elapsed.rem_euclid(grain);
    let shift = if remainder * 2 >= grain {
        grain - remainder
    } else {
        -remainder
    };
    timestamp + Duration::seconds(shift)
}

/// Builds the ordered list of tiles covering `start..=end`.
///
/// Both ends are rounded independently before stepping. An `end` that rounds to before `start`
/// produces an empty sequence.
pub fn generate(
    start: NaiveDateTime,
    end: NaiveDateTime,
    region: RegionId,
    resolution: Resolution,
) -> Vec<SequenceItem> {
    let start = round_to_resolution(start, resolution);
    let end = round_to_resolution(end, resolution);
    if end < start {
        return Vec::new();
    }

    let steps = (end - start).num_minutes() / i64::from(resolution.minutes());
    (0..=steps)
        .map(|step| {
            let timestamp = start + Duration::minutes(step * i64::from(resolution.minutes()));
            SequenceItem {
                index: step as usize,
                timestamp,
                remote_filename: remote_filename(timestamp, region),
            }
        })
        .collect()
}
