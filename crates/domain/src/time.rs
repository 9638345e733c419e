use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parses the timestamp shapes the backend has been seen to emit.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    // 丢弃时区偏移，客户端只显示本地时间
    let raw = raw.strip_suffix('Z').unwrap_or(raw);
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Unknown formats degrade to `None` instead of failing the whole payload.
pub fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

/// `mm:ss` rendering for the verification countdown.
pub fn format_countdown(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_shapes() {
        assert!(parse_timestamp("2025-08-12T10:20:30.123").is_some());
        assert!(parse_timestamp("2025-08-12T10:20:30Z").is_some());
        assert!(parse_timestamp("2025-08-12 10:20").is_some());
        assert!(parse_timestamp("2025-08-12").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn countdown_is_zero_padded() {
        assert_eq!(format_countdown(600), "10:00");
        assert_eq!(format_countdown(65), "01:05");
        assert_eq!(format_countdown(0), "00:00");
    }
}
