//! Five-field cron expressions.
//!
//! Schedules are written the crontab way (`minute hour day month weekday`,
//! weekday `0-7` with Sunday as 0 or 7). The `cron` crate wants a leading
//! seconds field and numbers weekdays 1-7 from Sunday, so weekday numbers are
//! rewritten to names before parsing.

use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use cron::Schedule;

use crate::ConfigError;

const DAY_NAMES: [&str; 8] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

/// Parse a five-field cron expression.
pub fn parse_cron(expr: &str) -> Result<Schedule, ConfigError> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(ConfigError::Invalid(format!(
            "Invalid cron expression '{expr}': expected 5 fields, found {}",
            fields.len()
        )));
    }

    let weekday = translate_weekday(fields[4])
        .map_err(|e| ConfigError::Invalid(format!("Invalid cron expression '{expr}': {e}")))?;
    let full_expr = format!(
        "0 {} {} {} {} {}",
        fields[0], fields[1], fields[2], fields[3], weekday
    );

    Schedule::from_str(&full_expr)
        .map_err(|e| ConfigError::Invalid(format!("Invalid cron expression '{expr}': {e}")))
}

/// Next fire time strictly after `after`, evaluated in `tz`.
pub fn next_fire_after<Tz: TimeZone>(
    schedule: &Schedule,
    tz: &Tz,
    after: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    schedule
        .after(&after.with_timezone(tz))
        .next()
        .map(|t| t.with_timezone(&Utc))
}

fn translate_weekday(field: &str) -> Result<String, String> {
    let parts = field
        .split(',')
        .map(|part| {
            let (base, step) = match part.split_once('/') {
                Some((base, step)) => (base, Some(step)),
                None => (part, None),
            };
            if let Some(days) = expand_sunday_range(base, step)? {
                return Ok(days);
            }
            let base = if base == "*" || base == "?" {
                base.to_string()
            } else {
                base.split('-')
                    .map(translate_day)
                    .collect::<Result<Vec<_>, _>>()?
                    .join("-")
            };
            Ok(match step {
                Some(step) => format!("{base}/{step}"),
                None => base,
            })
        })
        .collect::<Result<Vec<_>, String>>()?;
    Ok(parts.join(","))
}

/// Ranges that end on Sunday written as 7 (or as 0 after a later day) would
/// become wrap-around ranges like `FRI-SUN`, which `cron` rejects. List the
/// days instead: `5-7` becomes `FRI,SAT,SUN`.
fn expand_sunday_range(base: &str, step: Option<&str>) -> Result<Option<String>, String> {
    let Some((start, end)) = base.split_once('-') else {
        return Ok(None);
    };
    let (Ok(start), Ok(end)) = (start.parse::<usize>(), end.parse::<usize>()) else {
        return Ok(None);
    };
    let end = match end {
        7 => 7,
        0 if start > 0 => 7,
        _ => return Ok(None),
    };
    if start > 7 {
        return Err(format!("weekday {start} out of range 0-7"));
    }
    let step = match step {
        Some(step) => step
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| format!("invalid weekday step '{step}'"))?,
        None => 1,
    };

    let mut days: Vec<&str> = Vec::new();
    for n in (start..=end).step_by(step) {
        if !days.contains(&DAY_NAMES[n]) {
            days.push(DAY_NAMES[n]);
        }
    }
    Ok(Some(days.join(",")))
}

fn translate_day(token: &str) -> Result<String, String> {
    if token.is_empty() {
        return Err("empty weekday".to_string());
    }
    if token.chars().all(|c| c.is_ascii_digit()) {
        let n: usize = token
            .parse()
            .map_err(|_| format!("invalid weekday '{token}'"))?;
        DAY_NAMES
            .get(n)
            .map(|name| name.to_string())
            .ok_or_else(|| format!("weekday {n} out of range 0-7"))
    } else {
        Ok(token.to_ascii_uppercase())
    }
}
