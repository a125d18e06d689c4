//! Local time for the kiosk. The zone comes from the browser through the
//! `tzname_from_user` cookie and defaults to UTC.

use axum::http::HeaderMap;
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::warn;

pub const TZ_COOKIE: &str = "tzname_from_user";

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

pub fn zone_from_name(name: &str) -> Tz {
    // Browsers URL-encode the zone name when writing the cookie.
    let decoded = urlencoding::decode(name).map(|s| s.into_owned()).unwrap_or_else(|_| name.to_string());
    decoded.parse::<Tz>().unwrap_or_else(|_| {
        warn!("Unknown time zone {:?}, falling back to UTC", decoded);
        Tz::UTC
    })
}

pub fn zone_from_headers(headers: &HeaderMap) -> Tz {
    CookieJar::from_headers(headers)
        .get(TZ_COOKIE)
        .map(|cookie| zone_from_name(cookie.value()))
        .unwrap_or(Tz::UTC)
}

pub fn local_today(zone: Tz, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&zone).date_naive()
}

/// Parses a call-in timestamp. RFC 3339 values carry their own offset; naive values
/// are read as wall-clock time in `zone`.
pub fn parse_local_datetime(raw: &str, zone: Tz) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .ok_or_else(|| format!("Invalid date time: {}", raw))?;

    zone.from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| format!("Date time {} does not exist in {}", raw, zone))
}
