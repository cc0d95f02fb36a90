use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use ozycal_core::{DateRange, Orchestrator};

use super::print_json;

pub fn run(orchestrator: &Orchestrator, range: &DateRange) -> Result<()> {
    let datalinks = orchestrator.pull(range)?;

    let total: usize = datalinks.values().map(Vec::len).sum();
    tracing::debug!(datalinks = datalinks.len(), records = total, "pulled event datalinks");

    print_json(&datalinks)
}

/// Week containing `date` (YYYY-MM-DD), or the current week in `tz`.
pub fn week_range(date: Option<&str>, tz: Tz) -> Result<DateRange> {
    let date = match date {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("Invalid date format '{}'. Expected YYYY-MM-DD", s))?,
        None => Utc::now().with_timezone(&tz).date_naive(),
    };

    DateRange::week_of(date, tz).map_err(|e| anyhow::anyhow!(e))
}

/// IANA zone given on the command line, else the system zone, else UTC.
pub fn resolve_timezone(name: Option<&str>) -> Result<Tz> {
    if let Some(name) = name {
        return name
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("Unknown time zone '{}': {}", name, e));
    }

    match iana_time_zone::get_timezone() {
        Ok(system) => Ok(system.parse::<Tz>().unwrap_or_else(|_| {
            tracing::warn!(zone = %system, "system time zone not recognised, using UTC");
            Tz::UTC
        })),
        Err(e) => {
            tracing::warn!(error = %e, "could not detect system time zone, using UTC");
            Ok(Tz::UTC)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ozycal_core::Timestamp;

    #[test]
    fn test_explicit_timezone_is_parsed() {
        assert_eq!(
            resolve_timezone(Some("Europe/Paris")).unwrap(),
            chrono_tz::Europe::Paris
        );
        assert!(resolve_timezone(Some("Mars/Olympus_Mons")).is_err());
    }

    #[test]
    fn test_week_range_is_bounded_in_zone() {
        let range = week_range(Some("2024-03-04"), chrono_tz::Europe::Paris).unwrap();
        assert!(range.contains(&Timestamp::parse("2024-03-04T00:30:00+01:00").unwrap()));

        let range = week_range(Some("2024-03-04"), chrono_tz::America::New_York).unwrap();
        assert!(range.contains(&Timestamp::parse("2024-03-10T20:00:00-05:00").unwrap()));
    }

    #[test]
    fn test_week_range_rejects_bad_date() {
        assert!(week_range(Some("04/03/2024"), Tz::UTC).is_err());
    }
}
