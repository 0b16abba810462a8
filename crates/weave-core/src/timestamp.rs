use time::UtcDateTime;

/// Current unix time in whole seconds, UTC
pub fn unix_now_secs() -> i64 {
    UtcDateTime::now().unix_timestamp()
}

/// Parse a chain timestamp (`2024-01-31T12:00:00`, implicitly UTC) into unix
/// seconds
pub fn parse_chain_time(s: &str) -> Option<i64> {
    let format = time::macros::format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    time::PrimitiveDateTime::parse(s.trim_end_matches('Z'), &format)
        .ok()
        .map(|dt| dt.assume_utc().unix_timestamp())
}

#[test]
fn parses_chain_timestamps() {
    assert_eq!(parse_chain_time("1970-01-01T00:01:40"), Some(100));
    assert_eq!(parse_chain_time("1970-01-01T00:01:40Z"), Some(100));
    assert_eq!(parse_chain_time("yesterday"), None);
}
