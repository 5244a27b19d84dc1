use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.helldivers2.dev/api/v1";
pub const DEFAULT_SUPER_CLIENT: &str = "helldivers-hub";
pub const DEFAULT_SUPER_CONTACT: &str = "NA@gmail.com";

pub const SUPER_CLIENT_HEADER: &str = "X-Super-Client";
pub const SUPER_CONTACT_HEADER: &str = "X-Super-Contact";

pub const WAR_ENDPOINT: &str = "war";
pub const PLANETS_ENDPOINT: &str = "planets";

pub const DEFAULT_WAR_POLL_INTERVAL_SECS: u64 = 6;
pub const DEFAULT_PLANET_POLL_INTERVAL_SECS: u64 = 6;
pub const DEFAULT_PLANET_COUNT: usize = 50;
pub const DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS: u64 = 3;
pub const DEFAULT_BROADCAST_BUFFER: usize = 64;
pub const SSE_KEEPALIVE_SECS: u64 = 15;
pub const SERVER_PORT: u16 = 3000;

/// Identity sent with every upstream request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub client: String,
    pub contact: String,
}

impl ClientIdentity {
    pub fn from_env() -> Self {
        Self {
            client: non_empty_env("SUPER_CLIENT")
                .unwrap_or_else(|| DEFAULT_SUPER_CLIENT.to_string()),
            contact: non_empty_env("SUPER_CONTACT")
                .unwrap_or_else(|| DEFAULT_SUPER_CONTACT.to_string()),
        }
    }
}

impl Default for ClientIdentity {
    fn default() -> Self {
        Self {
            client: DEFAULT_SUPER_CLIENT.to_string(),
            contact: DEFAULT_SUPER_CONTACT.to_string(),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn api_base_url() -> String {
    non_empty_env("HELLDIVERS_API_BASE_URL")
        .map(|value| value.trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
}

pub fn war_poll_interval() -> Duration {
    std::env::var("WAR_POLL_INTERVAL_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_WAR_POLL_INTERVAL_SECS))
}

pub fn planet_poll_interval() -> Duration {
    std::env::var("PLANET_POLL_INTERVAL_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_PLANET_POLL_INTERVAL_SECS))
}

pub fn planet_count() -> usize {
    std::env::var("PLANET_COUNT")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_PLANET_COUNT)
}

pub fn sse_broadcast_buffer() -> usize {
    std::env::var("SSE_BROADCAST_BUFFER")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_BROADCAST_BUFFER)
}

pub fn upstream_http_timeout() -> Duration {
    std::env::var("UPSTREAM_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS))
}

pub fn upstream_connect_timeout() -> Duration {
    std::env::var("UPSTREAM_CONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_env_is_unset() {
        temp_env::with_vars_unset(
            [
                "HELLDIVERS_API_BASE_URL",
                "SUPER_CLIENT",
                "SUPER_CONTACT",
                "PLANET_COUNT",
                "WAR_POLL_INTERVAL_SECS",
            ],
            || {
                assert_eq!(api_base_url(), DEFAULT_API_BASE_URL);
                assert_eq!(ClientIdentity::from_env(), ClientIdentity::default());
                assert_eq!(planet_count(), DEFAULT_PLANET_COUNT);
                assert_eq!(
                    war_poll_interval(),
                    Duration::from_secs(DEFAULT_WAR_POLL_INTERVAL_SECS)
                );
            },
        );
    }

    #[test]
    fn env_overrides_are_trimmed_and_validated() {
        temp_env::with_vars(
            [
                ("HELLDIVERS_API_BASE_URL", Some("http://127.0.0.1:9000/api/v1/")),
                ("SUPER_CLIENT", Some("  my-client ")),
                ("SUPER_CONTACT", Some("   ")),
                ("PLANET_COUNT", Some("0")),
                ("PLANET_POLL_INTERVAL_SECS", Some("12")),
                ("UPSTREAM_HTTP_TIMEOUT_SECS", Some("not-a-number")),
            ],
            || {
                assert_eq!(api_base_url(), "http://127.0.0.1:9000/api/v1");
                let identity = ClientIdentity::from_env();
                assert_eq!(identity.client, "my-client");
                assert_eq!(identity.contact, DEFAULT_SUPER_CONTACT);
                assert_eq!(planet_count(), DEFAULT_PLANET_COUNT);
                assert_eq!(planet_poll_interval(), Duration::from_secs(12));
                assert_eq!(
                    upstream_http_timeout(),
                    Duration::from_secs(DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS)
                );
            },
        );
    }
}
