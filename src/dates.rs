use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

/// Timestamps cross the record-store boundary as strings and arrive in more
/// than one shape (RFC 3339 from the store, bare dates from operator input).
/// Parse leniently; `None` means "no usable date".
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

pub fn day_of_month(raw: &str) -> Option<u32> {
    parse_date(raw).map(|date| date.day())
}

pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339() {
        let date = parse_date("2026-03-14T09:26:53.589+03:00").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2026, 3, 14));
    }

    #[test]
    fn parses_naive_and_bare_dates() {
        assert_eq!(parse_date("2026-03-14T09:26:53").unwrap().day(), 14);
        assert_eq!(parse_date("2026-03-14 09:26:53").unwrap().day(), 14);
        assert_eq!(parse_date("2026-03-14").unwrap().day(), 14);
    }

    #[test]
    fn garbage_yields_none() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("  "), None);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("14/03/2026"), None);
    }

    #[test]
    fn month_key_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(month_key(date), "2026-03");
    }
}
