use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use tracing::warn;

use crate::types::Schedule;

/// Compute the next UTC execution time for `schedule` starting *after* `from`.
///
/// Returns `None` when the schedule is exhausted (e.g. a `Once` job whose
/// time has already passed) or when the schedule type is not yet supported
/// (e.g. `Cron`).
pub fn compute_next_run(schedule: &Schedule, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match schedule {
        Schedule::Once { at } => {
            // Fire only if the instant is still in the future.
            if *at > from {
                Some(*at)
            } else {
                None
            }
        }

        Schedule::Interval { every_secs } => Some(from + Duration::seconds(*every_secs as i64)),

        Schedule::Daily { hour, minute } => {
            // Build today's candidate at HH:MM:00 UTC.
            let candidate = Utc
                .with_ymd_and_hms(
                    from.year(),
                    from.month(),
                    from.day(),
                    *hour as u32,
                    *minute as u32,
                    0,
                )
                .single()?;
            if candidate > from {
                Some(candidate)
            } else {
                // Today's window has passed — advance to tomorrow.
                Some(candidate + Duration::days(1))
            }
        }

        Schedule::Weekly { day, hour, minute } => {
            // `day` follows ISO weekday numbering: 0=Monday … 6=Sunday,
            // which matches chrono's `num_days_from_monday`.
            let today_dow = from.weekday().num_days_from_monday() as i64;
            let target_dow = (*day as i64).clamp(0, 6);
            let mut days_ahead = target_dow - today_dow;

            // Normalise: negative means the target day already passed this week.
            let candidate_day = if days_ahead < 0 {
                from + Duration::days(7 + days_ahead)
            } else {
                from + Duration::days(days_ahead)
            };

            let candidate = Utc
                .with_ymd_and_hms(
                    candidate_day.year(),
                    candidate_day.month(),
                    candidate_day.day(),
                    *hour as u32,
                    *minute as u32,
                    0,
                )
                .single()?;

            if candidate > from {
                Some(candidate)
            } else {
                // The time on the target weekday has already passed — push 7 days.
                days_ahead = if days_ahead <= 0 { 7 } else { 7 - days_ahead };
                Some(candidate + Duration::days(days_ahead))
            }
        }

        Schedule::Cron { expression } => match CronSchedule::parse(expression) {
            Ok(cron) => cron.next_after(from),
            Err(e) => {
                warn!(%expression, error = %e, "invalid cron expression; next_run will not be set");
                None
            }
        },
    }
}

/// Minimal 5-field (`minute hour day-of-month month day-of-week`) cron
/// matcher. Supports `*`, single values, comma lists, `a-b` ranges, and
/// `*/n` / `a-b/n` steps — the common subset every cron implementation
/// agrees on, which covers every schedule this daemon's own config is
/// expected to declare.
pub struct CronSchedule {
    minutes: Vec<u8>,
    hours: Vec<u8>,
    days_of_month: Vec<u8>,
    months: Vec<u8>,
    days_of_week: Vec<u8>,
}

const MAX_LOOKAHEAD_MINUTES: i64 = 4 * 366 * 24 * 60;

impl CronSchedule {
    pub fn parse(expression: &str) -> Result<Self, String> {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(format!(
                "expected 5 fields (minute hour dom month dow), got {}",
                fields.len()
            ));
        }
        Ok(Self {
            minutes: parse_field(fields[0], 0, 59)?,
            hours: parse_field(fields[1], 0, 23)?,
            days_of_month: parse_field(fields[2], 1, 31)?,
            months: parse_field(fields[3], 1, 12)?,
            days_of_week: parse_field(fields[4], 0, 6)?,
        })
    }

    /// The next matching minute strictly after `from`, scanning forward
    /// minute-by-minute up to a four-year horizon before giving up.
    pub fn next_after(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut candidate = Utc
            .with_ymd_and_hms(from.year(), from.month(), from.day(), from.hour(), from.minute(), 0)
            .single()?
            + Duration::minutes(1);

        for _ in 0..MAX_LOOKAHEAD_MINUTES {
            if self.matches(candidate) {
                return Some(candidate);
            }
            candidate += Duration::minutes(1);
        }
        None
    }

    fn matches(&self, at: DateTime<Utc>) -> bool {
        let dow = at.weekday().num_days_from_sunday() as u8;
        self.minutes.contains(&(at.minute() as u8))
            && self.hours.contains(&(at.hour() as u8))
            && self.days_of_month.contains(&(at.day() as u8))
            && self.months.contains(&(at.month() as u8))
            && self.days_of_week.contains(&dow)
    }
}

fn parse_field(field: &str, min: u8, max: u8) -> Result<Vec<u8>, String> {
    let mut values = Vec::new();
    for part in field.split(',') {
        let (range_part, step) = match part.split_once('/') {
            Some((r, s)) => (r, s.parse::<u8>().map_err(|_| format!("bad step in '{part}'"))?),
            None => (part, 1),
        };
        if step == 0 {
            return Err(format!("step cannot be zero in '{part}'"));
        }

        let (lo, hi) = if range_part == "*" {
            (min, max)
        } else if let Some((a, b)) = range_part.split_once('-') {
            let lo = a.parse::<u8>().map_err(|_| format!("bad range start in '{part}'"))?;
            let hi = b.parse::<u8>().map_err(|_| format!("bad range end in '{part}'"))?;
            if lo > hi {
                return Err(format!("range start after end in '{part}'"));
            }
            (lo, hi)
        } else {
            let v = range_part.parse::<u8>().map_err(|_| format!("bad value '{range_part}'"))?;
            (v, v)
        };

        if lo < min || hi > max {
            return Err(format!("'{part}' out of bounds {min}-{max}"));
        }

        let mut v = lo;
        while v <= hi {
            values.push(v);
            v += step;
        }
    }
    values.sort_unstable();
    values.dedup();
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_five_minutes_fires_on_the_boundary() {
        let cron = CronSchedule::parse("*/5 * * * *").unwrap();
        let from = Utc.with_ymd_and_hms(2026, 7, 28, 9, 2, 30).single().unwrap();
        let next = cron.next_after(from).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 7, 28, 9, 5, 0).single().unwrap());
    }

    #[test]
    fn daily_nine_am_rolls_to_tomorrow_when_past() {
        let cron = CronSchedule::parse("0 9 * * *").unwrap();
        let from = Utc.with_ymd_and_hms(2026, 7, 28, 10, 0, 0).single().unwrap();
        let next = cron.next_after(from).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 7, 29, 9, 0, 0).single().unwrap());
    }

    #[test]
    fn weekday_field_restricts_to_matching_days() {
        // Every Monday (1) at 08:00.
        let cron = CronSchedule::parse("0 8 * * 1").unwrap();
        let from = Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 0).single().unwrap(); // a Tuesday
        let next = cron.next_after(from).unwrap();
        assert_eq!(next.weekday(), chrono::Weekday::Mon);
        assert_eq!(next.hour(), 8);
    }

    #[test]
    fn wrong_field_count_is_rejected() {
        assert!(CronSchedule::parse("* * *").is_err());
    }

    #[test]
    fn out_of_range_value_is_rejected() {
        assert!(CronSchedule::parse("60 * * * *").is_err());
    }

    #[test]
    fn compute_next_run_dispatches_to_cron() {
        let schedule = Schedule::Cron { expression: "0 0 1 1 *".into() };
        let from = Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 0).single().unwrap();
        let next = compute_next_run(&schedule, from).unwrap();
        assert_eq!(next.month(), 1);
        assert_eq!(next.day(), 1);
    }

    #[test]
    fn invalid_cron_expression_yields_none() {
        let schedule = Schedule::Cron { expression: "not a cron".into() };
        let from = Utc::now();
        assert!(compute_next_run(&schedule, from).is_none());
    }
}
