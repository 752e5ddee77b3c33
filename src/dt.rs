//! RFC 3501 date-time formatting, used by the pop3-show-after, special-use
//! mtime and lastupdate/lastpop computed handlers (spec §4.4).

use chrono::{DateTime, TimeZone, Utc};

const RFC3501_FORMAT: &str = "%d-%b-%Y %H:%M:%S %z";

pub fn format_rfc3501(epoch_secs: i64) -> Option<String> {
    Utc.timestamp_opt(epoch_secs, 0)
        .single()
        .map(|dt: DateTime<Utc>| dt.format(RFC3501_FORMAT).to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidDateTime;

impl std::fmt::Display for InvalidDateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "not a valid RFC 3501 date-time")
    }
}
impl std::error::Error for InvalidDateTime {}

pub fn parse_rfc3501(input: &str) -> Result<i64, InvalidDateTime> {
    DateTime::parse_from_str(input, RFC3501_FORMAT)
        .map(|dt| dt.timestamp())
        .map_err(|_| InvalidDateTime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let formatted = format_rfc3501(0).unwrap();
        assert_eq!(parse_rfc3501(&formatted).unwrap(), 0);
    }
}
