use chrono::{DateTime, SecondsFormat, Utc};

/// RFC-3339 in UTC with millisecond precision, e.g. `2025-01-31T08:00:00.123Z`.
pub fn rfc3339_millis(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now_rfc3339_millis() -> String {
    rfc3339_millis(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_millisecond_precision_with_z_suffix() {
        let at = Utc.with_ymd_and_hms(2025, 1, 31, 8, 0, 0).unwrap();
        assert_eq!(rfc3339_millis(at), "2025-01-31T08:00:00.000Z");
    }

    #[test]
    fn test_now_parses_back() {
        let s = now_rfc3339_millis();
        assert!(DateTime::parse_from_rfc3339(&s).is_ok());
    }
}
