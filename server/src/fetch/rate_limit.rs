use std::time::Duration;

use reqwest::header::HeaderMap;

pub const RATE_LIMIT_LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RETRY_AFTER_HEADER: &str = "retry-after";

/// Rate-limit state reported by the upstream on one response.
///
/// `None` means the header was absent or unreadable, not zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RateLimitInfo {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    pub retry_after_secs: Option<f64>,
}

impl RateLimitInfo {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            limit: header_str(headers, RATE_LIMIT_LIMIT_HEADER).and_then(parse_count),
            remaining: header_str(headers, RATE_LIMIT_REMAINING_HEADER).and_then(parse_count),
            retry_after_secs: header_str(headers, RETRY_AFTER_HEADER)
                .and_then(|value| value.trim().parse::<f64>().ok()),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    /// Seconds to wait before the retry; an unknown `Retry-After` retries immediately.
    pub fn retry_after_or_zero(&self) -> f64 {
        self.retry_after_secs
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .unwrap_or(0.0)
    }
}

/// `secs * 1000`, truncated to whole milliseconds.
pub fn retry_delay(retry_after_secs: f64) -> Duration {
    if !retry_after_secs.is_finite() || retry_after_secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_millis((retry_after_secs * 1000.0) as u64)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn parse_count(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if let Ok(count) = raw.parse::<u64>() {
        return Some(count);
    }
    // Whole numbers written as floats, e.g. "0.0". Fractions are unreadable.
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0 && value.fract() == 0.0)
        .map(|value| value as u64)
}
