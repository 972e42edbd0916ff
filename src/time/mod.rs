/// Generalized Time codec (RFC 4517 §3.3.13)
///
/// Accepts `YYYYMMDDHHMMSS[(.|,)ffffff](Z|±HH[MM])`. The formatter always
/// emits the 14-digit UTC form followed by `Z`; fractional seconds and
/// differentials present on a parsed value are not written back out.
use crate::error::{DirError, DirResult};
use crate::metrics;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};

/// Characters in the mandatory century..seconds prefix
const BASE_LEN: usize = 14;

/// Most fractional-second digits accepted
const MAX_FRACTION_DIGITS: usize = 6;

/// Parse a generalized time value, preserving any differential as the offset
pub fn parse_generalized_time(raw: &str) -> DirResult<DateTime<FixedOffset>> {
    parse_inner(raw).map_err(|e| {
        metrics::record_codec_error("time", e.kind());
        e
    })
}

/// Parse a generalized time value and normalize it to UTC
pub fn generalized_time_to_time(raw: &str) -> DirResult<DateTime<Utc>> {
    parse_generalized_time(raw).map(|t| t.with_timezone(&Utc))
}

/// Render a timestamp as `YYYYMMDDHHMMSSZ` in UTC
pub fn time_to_generalized_time<Tz: TimeZone>(t: &DateTime<Tz>) -> String {
    t.with_timezone(&Utc).format("%Y%m%d%H%M%SZ").to_string()
}

fn parse_inner(raw: &str) -> DirResult<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.len() < BASE_LEN + 1 {
        return Err(DirError::TimeFormat(format!(
            "Generalized time too short ({} chars): {}",
            raw.len(),
            raw
        )));
    }
    if !raw.is_ascii() {
        return Err(DirError::TimeFormat(format!("Non-ASCII generalized time: {}", raw)));
    }

    let (body, zulu) = match raw.strip_suffix('Z') {
        Some(stripped) => (stripped, true),
        None => (raw, false),
    };
    if body.len() < BASE_LEN {
        return Err(DirError::TimeFormat(format!(
            "Generalized time missing seconds: {}",
            raw
        )));
    }

    let (base, mut rest) = body.split_at(BASE_LEN);
    if !base.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DirError::TimeFormat(format!(
            "Non-digit in date/time fields: {}",
            base
        )));
    }

    let mut nanos = 0u32;
    if rest.starts_with('.') || rest.starts_with(',') {
        let after = &rest[1..];
        let digits_len = after.bytes().take_while(|b| b.is_ascii_digit()).count();
        if digits_len == 0 {
            return Err(DirError::TimeFormat(format!(
                "Fraction separator without digits: {}",
                raw
            )));
        }
        if digits_len > MAX_FRACTION_DIGITS {
            return Err(DirError::TimeFormat(format!(
                "Fraction overflow ({} digits, max {}): {}",
                digits_len, MAX_FRACTION_DIGITS, raw
            )));
        }
        let digits = &after[..digits_len];
        nanos = format!("{:0<9}", digits)
            .parse()
            .map_err(|_| DirError::TimeFormat(format!("Bad fraction: {}", digits)))?;
        rest = &after[digits_len..];
    }

    let offset = if rest.is_empty() {
        utc_offset()?
    } else {
        if zulu {
            return Err(DirError::TimeFormat(format!(
                "Both Z and a differential present: {}",
                raw
            )));
        }
        parse_differential(rest)?
    };

    let field = |from: usize, to: usize| -> u32 {
        // base is all ASCII digits, so this cannot fail
        base[from..to].parse().unwrap_or(0)
    };
    let year = field(0, 4) as i32;
    let (month, day) = (field(4, 6), field(6, 8));
    let (hour, minute, second) = (field(8, 10), field(10, 12), field(12, 14));

    let naive = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_nano_opt(hour, minute, second, nanos))
        .ok_or_else(|| {
            DirError::TimeFormat(format!("Date/time fields out of range: {}", base))
        })?;

    offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| DirError::TimeFormat(format!("Ambiguous local time: {}", raw)))
}

/// `±HH` or `±HHMM`
fn parse_differential(raw: &str) -> DirResult<FixedOffset> {
    let sign = match raw.as_bytes().first() {
        Some(b'+') => 1,
        Some(b'-') => -1,
        _ => {
            return Err(DirError::TimeFormat(format!(
                "Unrecognized trailing component: {}",
                raw
            )))
        }
    };
    let digits = &raw[1..];
    if !(digits.len() == 2 || digits.len() == 4) || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DirError::TimeFormat(format!("Bad differential: {}", raw)));
    }

    let hours: i32 = digits[..2]
        .parse()
        .map_err(|_| DirError::TimeFormat(format!("Bad differential hours: {}", raw)))?;
    let minutes: i32 = if digits.len() == 4 {
        digits[2..]
            .parse()
            .map_err(|_| DirError::TimeFormat(format!("Bad differential minutes: {}", raw)))?
    } else {
        0
    };
    if hours > 23 || minutes > 59 {
        return Err(DirError::TimeFormat(format!("Differential out of range: {}", raw)));
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| DirError::TimeFormat(format!("Differential out of range: {}", raw)))
}

fn utc_offset() -> DirResult<FixedOffset> {
    FixedOffset::east_opt(0).ok_or_else(|| DirError::TimeFormat("UTC offset".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_zulu() {
        let t = generalized_time_to_time("20080114154613Z").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2008, 1, 14, 15, 46, 13).unwrap());
    }

    #[test]
    fn test_parse_negative_differential() {
        let t = generalized_time_to_time("20080114154613-0600").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2008, 1, 14, 21, 46, 13).unwrap());

        let local = parse_generalized_time("20080114154613-0600").unwrap();
        assert_eq!(local.offset().local_minus_utc(), -6 * 3600);
        assert_eq!(local.hour(), 15);
    }

    #[test]
    fn test_parse_hour_only_differential() {
        let t = generalized_time_to_time("20080114154613+02").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2008, 1, 14, 13, 46, 13).unwrap());
    }

    #[test]
    fn test_parse_fraction() {
        let t = generalized_time_to_time("20080114154613.25Z").unwrap();
        assert_eq!(t.nanosecond(), 250_000_000);

        let comma = generalized_time_to_time("20080114154613,123456Z").unwrap();
        assert_eq!(comma.nanosecond(), 123_456_000);
    }

    #[test]
    fn test_parse_fraction_with_differential() {
        let t = generalized_time_to_time("20080114154613.5+0130").unwrap();
        assert_eq!(t.hour(), 14);
        assert_eq!(t.minute(), 16);
        assert_eq!(t.nanosecond(), 500_000_000);
    }

    #[test]
    fn test_fraction_overflow() {
        let err = generalized_time_to_time("20080114154613.1234567Z").unwrap_err();
        assert!(matches!(err, DirError::TimeFormat(_)));
        assert!(err.to_string().contains("overflow"));
    }

    #[test]
    fn test_rejects_short_and_malformed() {
        assert!(generalized_time_to_time("2008011415461").is_err());
        assert!(generalized_time_to_time("20080114154613").is_err());
        assert!(generalized_time_to_time("2008011415461XZ").is_err());
        assert!(generalized_time_to_time("20081314154613Z").is_err());
        assert!(generalized_time_to_time("20080114154613.Z").is_err());
        assert!(generalized_time_to_time("20080114154613*0600").is_err());
        assert!(generalized_time_to_time("20080114154613-06000").is_err());
        assert!(generalized_time_to_time("20080114154613-2500").is_err());
    }

    #[test]
    fn test_format_is_bare_utc() {
        let t = parse_generalized_time("20080114154613.5-0600").unwrap();
        assert_eq!(time_to_generalized_time(&t), "20080114214613Z");
    }

    #[test]
    fn test_format_round_trip_for_zulu_values() {
        let raw = "19991231235959Z";
        let t = generalized_time_to_time(raw).unwrap();
        assert_eq!(time_to_generalized_time(&t), raw);
        assert_eq!(t.year(), 1999);
    }
}
