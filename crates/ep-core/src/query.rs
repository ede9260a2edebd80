//! Resolution of raw list parameters into a `CommentFilter`.
//!
//! Calendar dates are interpreted in the board's local offset, so a
//! `date_to` of 2024-05-03 covers that whole local day.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{CommentFilter, DateRange, MunicipalityId, Period, SortOrder};

/// Query string of the list endpoint. Empty values count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub municipality_id: Option<String>,
    pub period: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub sort: Option<String>,
    pub keyword: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Calendar inputs are limited to four-digit years.
pub const MIN_YEAR: i32 = 1;
pub const MAX_YEAR: i32 = 9999;

pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate> {
    let invalid = || AppError::ValidationError(format!("{field} must be a YYYY-MM-DD date"));
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| invalid())?;
    if !(MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
        return Err(invalid());
    }
    Ok(date)
}

/// First instant of `date` in the given offset, expressed in UTC.
/// `None` when the shift leaves chrono's representable range.
pub fn local_midnight(date: NaiveDate, offset: FixedOffset) -> Option<DateTime<Utc>> {
    date.and_time(NaiveTime::MIN)
        .checked_sub_signed(Duration::seconds(offset.local_minus_utc() as i64))
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

impl Period {
    /// Lower creation-time bound for this period, `None` for `All`.
    pub fn since(self, now: DateTime<Utc>, offset: FixedOffset) -> Option<DateTime<Utc>> {
        let today = now.with_timezone(&offset).date_naive();
        match self {
            Period::All => None,
            Period::Today => local_midnight(today, offset),
            Period::Week => Some(now - Duration::days(7)),
            Period::Month => local_midnight(today.with_day(1).unwrap_or(today), offset),
        }
    }
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>, offset: FixedOffset) -> Result<Option<Self>> {
        if let (Some(f), Some(t)) = (from, to) {
            if f > t {
                return Err(AppError::ValidationError(
                    "date_from must not be after date_to".into(),
                ));
            }
        }
        if from.is_none() && to.is_none() {
            return Ok(None);
        }
        let out_of_range = || AppError::ValidationError("date out of range".into());
        let created_from = from
            .map(|d| local_midnight(d, offset).ok_or_else(out_of_range))
            .transpose()?;
        let created_until = to
            .map(|d| {
                d.succ_opt()
                    .and_then(|next| local_midnight(next, offset))
                    .ok_or_else(out_of_range)
            })
            .transpose()?;
        Ok(Some(Self {
            from,
            to,
            created_from,
            created_until,
        }))
    }
}

impl ListParams {
    pub fn resolve(&self, now: DateTime<Utc>, offset: FixedOffset) -> Result<CommentFilter> {
        let municipality_id = present(&self.municipality_id)
            .map(|raw| {
                raw.parse::<i64>()
                    .map(MunicipalityId)
                    .map_err(|_| AppError::ValidationError("municipality_id must be a number".into()))
            })
            .transpose()?;

        let period = present(&self.period)
            .map(str::parse::<Period>)
            .transpose()?
            .unwrap_or_default();

        let from = present(&self.date_from)
            .map(|d| parse_date("date_from", d))
            .transpose()?;
        let to = present(&self.date_to)
            .map(|d| parse_date("date_to", d))
            .transpose()?;

        let sort = present(&self.sort)
            .map(str::parse::<SortOrder>)
            .transpose()?
            .unwrap_or_default();

        Ok(CommentFilter {
            municipality_id,
            created_since: period.since(now, offset),
            date_range: DateRange::new(from, to, offset)?,
            keyword: present(&self.keyword).map(str::to_string),
            sort,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn jst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    #[test]
    fn empty_params_resolve_to_defaults() {
        let filter = ListParams::default().resolve(Utc::now(), jst()).unwrap();
        assert_eq!(filter, CommentFilter::default());
    }

    #[test]
    fn blank_strings_are_treated_as_absent() {
        let params = ListParams {
            municipality_id: Some("".into()),
            keyword: Some("   ".into()),
            date_from: Some("".into()),
            ..Default::default()
        };
        let filter = params.resolve(Utc::now(), jst()).unwrap();
        assert!(filter.municipality_id.is_none());
        assert!(filter.keyword.is_none());
        assert!(filter.date_range.is_none());
    }

    #[test]
    fn date_to_covers_the_whole_local_day() {
        let params = ListParams {
            date_from: Some("2024-05-01".into()),
            date_to: Some("2024-05-03".into()),
            ..Default::default()
        };
        let range = params.resolve(Utc::now(), jst()).unwrap().date_range.unwrap();
        // 2024-05-01 00:00 JST is 2024-04-30 15:00 UTC
        assert_eq!(range.created_from, Some(Utc.with_ymd_and_hms(2024, 4, 30, 15, 0, 0).unwrap()));
        assert_eq!(range.created_until, Some(Utc.with_ymd_and_hms(2024, 5, 3, 15, 0, 0).unwrap()));
    }

    #[test]
    fn reversed_range_is_rejected() {
        let params = ListParams {
            date_from: Some("2024-05-04".into()),
            date_to: Some("2024-05-03".into()),
            ..Default::default()
        };
        assert!(matches!(
            params.resolve(Utc::now(), jst()),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn bad_values_are_validation_errors() {
        for params in [
            ListParams { sort: Some("popular".into()), ..Default::default() },
            ListParams { period: Some("year".into()), ..Default::default() },
            ListParams { municipality_id: Some("abc".into()), ..Default::default() },
            ListParams { date_to: Some("05/03/2024".into()), ..Default::default() },
        ] {
            assert!(params.resolve(Utc::now(), jst()).is_err());
        }
    }

    #[test]
    fn dates_outside_four_digit_years_are_rejected() {
        for raw in ["-262143-01-01", "+12345-01-01", "0000-12-31"] {
            let params = ListParams {
                date_from: Some(raw.into()),
                ..Default::default()
            };
            assert!(
                matches!(params.resolve(Utc::now(), jst()), Err(AppError::ValidationError(_))),
                "{raw} accepted"
            );
            assert!(parse_date("event_date", raw).is_err());
        }
        assert!(parse_date("event_date", "9999-12-31").is_ok());
    }

    #[test]
    fn midnight_outside_chrono_range_is_none() {
        assert_eq!(local_midnight(NaiveDate::MIN, jst()), None);
        let range = DateRange::new(Some(NaiveDate::MIN), None, jst());
        assert!(matches!(range, Err(AppError::ValidationError(_))));
    }

    #[test]
    fn periods_use_local_calendar() {
        // 2024-05-10 01:00 JST
        let now = Utc.with_ymd_and_hms(2024, 5, 9, 16, 0, 0).unwrap();
        assert_eq!(Period::All.since(now, jst()), None);
        assert_eq!(
            Period::Today.since(now, jst()),
            Some(Utc.with_ymd_and_hms(2024, 5, 9, 15, 0, 0).unwrap())
        );
        assert_eq!(Period::Week.since(now, jst()), Some(now - Duration::days(7)));
        assert_eq!(
            Period::Month.since(now, jst()),
            Some(Utc.with_ymd_and_hms(2024, 4, 30, 15, 0, 0).unwrap())
        );
    }
}
