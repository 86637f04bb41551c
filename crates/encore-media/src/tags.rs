//! Container tag parsing.
//!
//! GPS comes from two well-known tag keys (Android `location`, iOS ISO 6709
//! quicktime tag); the recording timestamp from `creation_time`. A missing
//! tag is simply absent; a present-but-unparsable tag is an error the
//! caller logs, then treats as absent.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use encore_core::models::GpsCoordinates;

const ANDROID_LOCATION_KEY: &str = "location";
const IOS_LOCATION_KEY: &str = "com.apple.quicktime.location.ISO6709";
const CREATION_TIME_KEY: &str = "creation_time";

/// GPS coordinates from known tag keys, or None when no GPS tag exists.
pub fn extract_gps(tags: &HashMap<String, String>) -> Result<Option<GpsCoordinates>, anyhow::Error> {
    for key in [ANDROID_LOCATION_KEY, IOS_LOCATION_KEY] {
        if let Some(raw) = tags.get(key) {
            return match parse_iso6709(raw) {
                Some(gps) => Ok(Some(gps)),
                None => Err(anyhow::anyhow!(
                    "failed to parse GPS from tag {}: {:?}",
                    key,
                    raw
                )),
            };
        }
    }
    Ok(None)
}

/// Recording timestamp from `creation_time`, or None when absent.
pub fn extract_timestamp(
    tags: &HashMap<String, String>,
) -> Result<Option<DateTime<Utc>>, anyhow::Error> {
    match tags.get(CREATION_TIME_KEY) {
        Some(raw) => {
            let parsed = DateTime::parse_from_rfc3339(raw)
                .map_err(|e| anyhow::anyhow!("failed to parse creation_time {:?}: {}", raw, e))?;
            Ok(Some(parsed.with_timezone(&Utc)))
        }
        None => Ok(None),
    }
}

/// Parse an ISO 6709 coordinate string like `+40.7128-074.0060/`.
///
/// The longitude starts at the second sign character; the scan starts at
/// index 1 so the latitude's own leading sign is skipped. Both halves must
/// parse as floats.
fn parse_iso6709(tag: &str) -> Option<GpsCoordinates> {
    let tag = tag.trim_end_matches('/');
    if tag.is_empty() {
        return None;
    }

    let bytes = tag.as_bytes();
    let second_sign = (1..bytes.len()).find(|&i| bytes[i] == b'+' || bytes[i] == b'-')?;

    let latitude: f64 = tag[..second_sign].parse().ok()?;
    let longitude: f64 = tag[second_sign..].parse().ok()?;

    // A (0, 0) pair is the tag format's way of saying "no fix".
    if latitude == 0.0 && longitude == 0.0 {
        return None;
    }

    Some(GpsCoordinates {
        latitude,
        longitude,
    })
}
