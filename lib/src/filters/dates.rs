use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

/// `January 5, 2021`, in UTC.
pub fn pretty_date(date: &DateTime<Utc>) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// RFC 3339 in UTC with second precision: `2021-01-05T10:30:00Z`.
pub fn html_date_string(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parses an RFC 3339 date-time, a `YYYY-MM-DD[ HH:MM:SS]` date (taken as
/// UTC midnight when there's no time), or Unix seconds.
pub fn parse_date(string: &str) -> Option<DateTime<Utc>> {
    let string = string.trim();
    if let Ok(datetime) = DateTime::parse_from_rfc3339(string) {
        return Some(datetime.with_timezone(&Utc));
    }

    if let Ok(datetime) = NaiveDateTime::parse_from_str(string, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(string, "%Y-%m-%dT%H:%M:%S"))
    {
        return Some(Utc.from_utc_datetime(&datetime));
    }

    if let Ok(date) = string.parse::<NaiveDate>() {
        return date.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt));
    }

    string.parse::<i64>().ok().and_then(timestamp)
}

/// The UTC date-time `secs` seconds after the Unix epoch.
pub fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats() {
        let date = Utc.with_ymd_and_hms(2021, 1, 5, 23, 59, 1).unwrap();
        assert_eq!(pretty_date(&date), "January 5, 2021");
        assert_eq!(html_date_string(&date), "2021-01-05T23:59:01Z");
    }

    #[test]
    fn converts_to_utc() {
        let date = parse_date("2021-01-05T23:30:00-05:00").unwrap();
        assert_eq!(pretty_date(&date), "January 6, 2021");
        assert_eq!(html_date_string(&date), "2021-01-06T04:30:00Z");
    }

    #[test]
    fn parses() {
        let midnight = Utc.with_ymd_and_hms(2020, 2, 29, 0, 0, 0).unwrap();
        assert_eq!(parse_date("2020-02-29"), Some(midnight));
        assert_eq!(parse_date("2020-02-29 00:00:00"), Some(midnight));
        assert_eq!(parse_date(&midnight.timestamp().to_string()), Some(midnight));
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("2021-02-30"), None);
    }
}
