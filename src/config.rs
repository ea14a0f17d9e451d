use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::catalog::{Catalog, RegionId};
use crate::sequence::Resolution;

pub static DATE_FORMAT: &str = "%Y-%m-%d";
pub static TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid resolution value {0}: use a multiple of 5, minimum 5")]
    Resolution(u32),
    #[error("region not (yet) defined: {name} (known regions: {known})")]
    UnknownRegion { name: String, known: String },
    #[error("could not parse {field} {value:?}: {source}")]
    Timestamp {
        field: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("last {0} hours reaches outside the supported date range")]
    LastHours(u32),
    #[error("max requests must be between 1 and {max}, got {value}")]
    MaxRequests { value: usize, max: usize },
}

/// Time range flags as given on the command line. Anything left out falls back to a default
/// relative to `now`.
#[derive(Debug, Default, Clone)]
pub struct TimeBounds<'a> {
    pub start_date: Option<&'a str>,
    pub start_time: Option<&'a str>,
    pub end_date: Option<&'a str>,
    pub end_time: Option<&'a str>,
    /// Overrides the start flags with `end - last_hours`.
    pub last_hours: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPlan {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub region: RegionId,
    pub resolution: Resolution,
    pub max_requests: usize,
}

/// Validates every user supplied value. Nothing touches the network or disk before this
/// succeeds. All times are UTC, including `now`.
pub fn plan(
    catalog: &Catalog,
    bounds: &TimeBounds<'_>,
    region: &str,
    resolution: u32,
    max_requests: usize,
    now: NaiveDateTime,
) -> Result<DownloadPlan, ConfigError> {
    let resolution = Resolution::new(resolution).ok_or(ConfigError::Resolution(resolution))?;
    let region = catalog
        .region_id(region)
        .ok_or_else(|| ConfigError::UnknownRegion {
            name: region.to_string(),
            known: catalog.region_names().collect::<Vec<_>>().join(", "),
        })?;
    if max_requests == 0 || max_requests > Semaphore::MAX_PERMITS {
        return Err(ConfigError::MaxRequests {
            value: max_requests,
            max: Semaphore::MAX_PERMITS,
        });
    }
    let (start, end) = resolve_window(bounds, now)?;

    Ok(DownloadPlan {
        start,
        end,
        region,
        resolution,
        max_requests,
    })
}

pub fn resolve_window(
    bounds: &TimeBounds<'_>,
    now: NaiveDateTime,
) -> Result<(NaiveDateTime, NaiveDateTime), ConfigError> {
    let end = combine(
        bounds.end_date,
        bounds.end_time,
        now - Duration::minutes(15),
        ("end date", "end time"),
    )?;
    let start = match bounds.last_hours {
        Some(hours) => end
            .checked_sub_signed(Duration::hours(i64::from(hours)))
            .ok_or(ConfigError::LastHours(hours))?,
        None => combine(
            bounds.start_date,
            bounds.start_time,
            now - Duration::hours(2),
            ("start date", "start time"),
        )?,
    };
    Ok((start, end))
}

fn combine(
    date: Option<&str>,
    time: Option<&str>,
    default: NaiveDateTime,
    fields: (&'static str, &'static str),
) -> Result<NaiveDateTime, ConfigError> {
    let date = match date {
        Some(value) => {
            NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|source| {
                ConfigError::Timestamp {
                    field: fields.0,
                    value: value.to_string(),
                    source,
                }
            })?
        }
        None => default.date(),
    };
    let time = match time {
        Some(value) => {
            NaiveTime::parse_from_str(value, TIME_FORMAT).map_err(|source| {
                ConfigError::Timestamp {
                    field: fields.1,
                    value: value.to_string(),
                    source,
                }
            })?
        }
        None => default.time(),
    };
    Ok(NaiveDateTime::new(date, time))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2020-01-01 12:00", "%Y-%m-%d %H:%M").unwrap()
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    #[test]
    fn explicit_bounds_are_parsed() {
        let bounds = TimeBounds {
            start_date: Some("2020-01-01"),
            start_time: Some("00:00"),
            end_date: Some("2020-01-01"),
            end_time: Some("00:10"),
            last_hours: None,
        };
        let plan = plan(&Catalog::default(), &bounds, "germany", 5, 4, now()).unwrap();
        assert_eq!(plan.start, at("2020-01-01 00:00"));
        assert_eq!(plan.end, at("2020-01-01 00:10"));
        assert_eq!(plan.region, RegionId(2));
        assert_eq!(plan.resolution.minutes(), 5);
        assert_eq!(plan.max_requests, 4);
    }

    #[test]
    fn defaults_are_relative_to_now() {
        let (start, end) = resolve_window(&TimeBounds::default(), now()).unwrap();
        assert_eq!(start, at("2020-01-01 10:00"));
        assert_eq!(end, at("2020-01-01 11:45"));
    }

    #[test]
    fn default_start_crosses_midnight() {
        let now = at("2020-01-02 01:00");
        let (start, _) = resolve_window(&TimeBounds::default(), now).unwrap();
        assert_eq!(start, at("2020-01-01 23:00"));
    }

    #[test]
    fn last_hours_overrides_start() {
        let bounds = TimeBounds {
            start_date: Some("1999-01-01"),
            start_time: Some("00:00"),
            end_time: Some("06:30"),
            last_hours: Some(3),
            ..TimeBounds::default()
        };
        let (start, end) = resolve_window(&bounds, now()).unwrap();
        assert_eq!(end, at("2020-01-01 06:30"));
        assert_eq!(start, at("2020-01-01 03:30"));
    }

    #[test]
    fn huge_last_hours_is_a_config_error() {
        let bounds = TimeBounds {
            last_hours: Some(u32::MAX),
            ..TimeBounds::default()
        };
        let err = resolve_window(&bounds, now()).unwrap_err();
        assert!(matches!(err, ConfigError::LastHours(hours) if hours == u32::MAX));
    }

    #[test]
    fn unknown_region_is_rejected() {
        let err = plan(
            &Catalog::default(),
            &TimeBounds::default(),
            "atlantis",
            5,
            4,
            now(),
        )
        .unwrap_err();
        match err {
            ConfigError::UnknownRegion { name, known } => {
                assert_eq!(name, "atlantis");
                assert_eq!(known, "bavaria, germany");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn resolution_not_multiple_of_five_is_rejected() {
        for res in [0, 3, 7, 12] {
            let err = plan(
                &Catalog::default(),
                &TimeBounds::default(),
                "germany",
                res,
                4,
                now(),
            )
            .unwrap_err();
            assert!(matches!(err, ConfigError::Resolution(value) if value == res));
        }
    }

    #[test]
    fn zero_max_requests_is_rejected() {
        let err = plan(
            &Catalog::default(),
            &TimeBounds::default(),
            "germany",
            5,
            0,
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MaxRequests { value: 0, .. }));
    }

    #[test]
    fn unparseable_time_names_the_flag() {
        let bounds = TimeBounds {
            start_time: Some("25:99"),
            ..TimeBounds::default()
        };
        let err = resolve_window(&bounds, now()).unwrap_err();
        match err {
            ConfigError::Timestamp { field, value, .. } => {
                assert_eq!(field, "start time");
                assert_eq!(value, "25:99");
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
