use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{QuakeLinkError, Result};

/// Time format used in request clauses (`FROM`/`TO`), microsecond precision.
pub const REQUEST_TIME_FORMAT: &str = "%Y,%m,%d,%H,%M,%S,%6f";

/// `Content-Timestamp` header format: ISO-8601 with fractional seconds.
pub const CONTENT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Render a request time value, e.g. `2024,3,1,12,30,5,000000`.
pub fn format_request_time(time: DateTime<Utc>) -> String {
    time.format(REQUEST_TIME_FORMAT).to_string()
}

/// Parse a request time value back from its comma-separated form.
pub fn parse_request_time(s: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, REQUEST_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| QuakeLinkError::InvalidTime(s.to_owned()))
}

/// Parse a `Content-Timestamp` header value.
pub fn parse_content_timestamp(s: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, CONTENT_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| QuakeLinkError::InvalidTime(s.to_owned()))
}
