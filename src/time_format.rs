use crate::error::DateParseError;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use lambda_http::tracing::error;

/// Wire format the provider expects for meeting start times.
pub const PROVIDER_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
/// Format used when handing meeting times back for display.
pub const DISPLAY_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

const LOCAL_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M", // <input type="datetime-local">
    "%Y/%m/%d %H:%M:%S",
];

enum ParsedDateTime {
    Local(NaiveDateTime),
    WithOffset(DateTime<FixedOffset>),
}

impl ParsedDateTime {
    fn wall_clock(&self) -> NaiveDateTime {
        match self {
            ParsedDateTime::Local(date_time) => *date_time,
            ParsedDateTime::WithOffset(date_time) => date_time.naive_local(),
        }
    }
}

fn parse(input: &str) -> Result<ParsedDateTime, DateParseError> {
    let input = input.trim();
    if let Ok(date_time) = DateTime::parse_from_rfc3339(input) {
        return Ok(ParsedDateTime::WithOffset(date_time));
    }
    for format in LOCAL_FORMATS {
        if let Ok(date_time) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(ParsedDateTime::Local(date_time));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(ParsedDateTime::Local(date.and_time(NaiveTime::MIN)));
    }
    Err(DateParseError::InvalidDateTime(input.to_string()))
}

/// Whether `input` is in one of the accepted date-time layouts. Does not log.
pub fn is_date_time(input: &str) -> bool {
    parse(input).is_ok()
}

/// Renders a date-time as `YYYY-MM-DDThh:mm:ss`, keeping its wall-clock time.
///
/// Failures are logged and returned; callers leave the field out of the
/// request instead of aborting.
pub fn to_provider_time_format(date_time: &str) -> Result<String, DateParseError> {
    parse(date_time)
        .map(|parsed| parsed.wall_clock().format(PROVIDER_TIME_FORMAT).to_string())
        .inspect_err(|e| error!(input = date_time, error = %e, "to_provider_time_format failed"))
}

/// Returns the epoch seconds of `date_time` read as local time in `timezone`.
///
/// An explicit offset in the input takes precedence over `timezone`.
pub fn to_unix_timestamp(date_time: &str, timezone: &str) -> Result<i64, DateParseError> {
    unix_timestamp(date_time, timezone)
        .inspect_err(|e| error!(input = date_time, timezone, error = %e, "to_unix_timestamp failed"))
}

fn unix_timestamp(date_time: &str, timezone: &str) -> Result<i64, DateParseError> {
    let tz: Tz = timezone
        .parse()
        .map_err(|_| DateParseError::UnknownTimezone(timezone.to_string()))?;

    match parse(date_time)? {
        ParsedDateTime::WithOffset(date_time) => Ok(date_time.timestamp()),
        ParsedDateTime::Local(local) => tz
            .from_local_datetime(&local)
            .earliest()
            .map(|date_time| date_time.timestamp())
            .ok_or_else(|| DateParseError::NonexistentLocalTime(date_time.to_string())),
    }
}

/// Renders a provider timestamp as `YYYY/MM/DD hh:mm:ss` for display.
pub(crate) fn to_display_format(date_time: &str) -> Result<String, DateParseError> {
    parse(date_time).map(|parsed| parsed.wall_clock().format(DISPLAY_TIME_FORMAT).to_string())
}
