//! Time built-ins (§4.9): `systime`, `mktime`, `strftime`.

use chrono::{Local, NaiveDate, TimeZone};

pub fn systime() -> f64 {
    Local::now().timestamp() as f64
}

/// `mktime("YYYY MM DD HH MM SS")`: builds a local-time timestamp from
/// a space-separated spec. Returns `-1` on a malformed spec or a date
/// mktime(3) cannot represent, per gawk.
pub fn mktime(spec: &str) -> f64 {
    let parts: Vec<&str> = spec.split_whitespace().collect();
    if parts.len() < 6 {
        return -1.0;
    }
    let nums: Option<Vec<i32>> = parts[..6].iter().map(|p| p.parse::<i32>().ok()).collect();
    let Some(nums) = nums else { return -1.0 };
    let (year, month, day, hour, min, sec) = (nums[0], nums[1], nums[2], nums[3], nums[4], nums[5]);
    let Some(date) = NaiveDate::from_ymd_opt(year, month as u32, day as u32) else {
        return -1.0;
    };
    let Some(naive) = date.and_hms_opt(hour as u32, min as u32, sec as u32) else {
        return -1.0;
    };
    match Local.from_local_datetime(&naive).single() {
        Some(dt) => dt.timestamp() as f64,
        None => -1.0,
    }
}

/// `strftime(fmt[, timestamp])`: formats a Unix timestamp in local
/// time using a C-`strftime`-style format string (chrono implements the
/// same directive set gawk documents).
pub fn strftime(fmt: &str, timestamp: f64) -> String {
    match Local.timestamp_opt(timestamp as i64, 0).single() {
        Some(dt) => dt.format(fmt).to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mktime_roundtrips_through_strftime() {
        let ts = mktime("2024 01 15 12 30 00");
        assert!(ts > 0.0);
        let s = strftime("%Y-%m-%d %H:%M:%S", ts);
        assert_eq!(s, "2024-01-15 12:30:00");
    }

    #[test]
    fn mktime_rejects_malformed_spec() {
        assert_eq!(mktime("not a date"), -1.0);
        assert_eq!(mktime("2024 13 40 99 99 99"), -1.0);
    }
}
