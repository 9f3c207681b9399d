use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Parse a clock time such as `7:05` or `07:05` and return it as zero padded `HH:MM`.
pub fn normalize_time(raw: &str) -> Option<String> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .ok()
        .map(|t| t.format("%H:%M").to_string())
}

/// Current wall-clock time in the service's local offset
pub fn service_now(offset: FixedOffset) -> NaiveDateTime {
    Utc::now().with_timezone(&offset).naive_local()
}

/// True when the ride's departure is at or before `now`. Unparseable times count as departed.
pub fn has_departed(date: NaiveDate, departure_time: &str, now: NaiveDateTime) -> bool {
    if date != now.date() {
        return date < now.date();
    }

    match NaiveTime::parse_from_str(departure_time, "%H:%M") {
        Ok(time) => time <= now.time(),
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{} {}", date, time), "%Y-%m-%d %H:%M").unwrap()
    }

    fn day(date: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_normalize_time() {
        assert_eq!(normalize_time("7:05").as_deref(), Some("07:05"));
        assert_eq!(normalize_time(" 18:30 ").as_deref(), Some("18:30"));
        assert_eq!(normalize_time("25:00"), None);
        assert_eq!(normalize_time("noon"), None);
    }

    #[test]
    fn test_departure_today() {
        let now = at("2024-03-10", "09:30");
        assert!(has_departed(day("2024-03-10"), "07:00", now));
        assert!(has_departed(day("2024-03-10"), "09:30", now));
        assert!(!has_departed(day("2024-03-10"), "13:00", now));
    }

    #[test]
    fn test_departure_other_days() {
        let now = at("2024-03-10", "09:30");
        assert!(has_departed(day("2024-03-09"), "23:00", now));
        assert!(!has_departed(day("2024-03-11"), "06:00", now));
    }
}
