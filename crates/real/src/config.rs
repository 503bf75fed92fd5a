use std::{env, time::Duration};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// DynamoDB table name (default: "real")
    /// Note: Only used when the `dynamodb` feature is enabled.
    #[allow(dead_code)]
    pub dynamodb_table_name: String,
    /// Base URL of the dating service; dating sync is disabled when unset
    pub dating_endpoint: Option<String>,
    /// Prefix of the dating service's function names (default: "real-dating")
    pub dating_function_prefix: String,
    /// Usernames whose flags remove content immediately (default: "real")
    pub flag_admin_usernames: Vec<String>,
    /// How often the in-memory change log is drained (default: 100ms)
    pub stream_poll_interval_ms: u64,
    /// How often expired posts are archived (default: 60s)
    pub expiry_sweep_interval_seconds: u64,
    /// Per-user buffer of the card notification channel (default: 64)
    pub card_channel_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `DYNAMODB_TABLE_NAME` - DynamoDB table name (default: "real")
    /// - `REAL_DATING_ENDPOINT` - Dating service base URL (default: unset)
    /// - `REAL_DATING_FUNCTION_PREFIX` - Dating function prefix (default: "real-dating")
    /// - `FLAG_ADMIN_USERNAMES` - Comma separated admin usernames (default: "real")
    /// - `STREAM_POLL_INTERVAL_MS` - Change log poll interval (default: 100)
    /// - `EXPIRY_SWEEP_INTERVAL_SECONDS` - Expired post sweep interval (default: 60)
    /// - `CARD_CHANNEL_CAPACITY` - Card notification buffer per user (default: 64)
    pub fn from_env() -> Self {
        Self {
            dynamodb_table_name: env::var("DYNAMODB_TABLE_NAME")
                .unwrap_or_else(|_| "real".to_string()),
            dating_endpoint: env::var("REAL_DATING_ENDPOINT")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            dating_function_prefix: env::var("REAL_DATING_FUNCTION_PREFIX")
                .unwrap_or_else(|_| "real-dating".to_string()),
            flag_admin_usernames: parse_list(
                &env::var("FLAG_ADMIN_USERNAMES").unwrap_or_else(|_| "real".to_string()),
            ),
            stream_poll_interval_ms: env::var("STREAM_POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
            expiry_sweep_interval_seconds: env::var("EXPIRY_SWEEP_INTERVAL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            card_channel_capacity: env::var("CARD_CHANNEL_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(64),
        }
    }

    /// Get the stream poll interval as a Duration.
    pub fn stream_poll_interval(&self) -> Duration {
        Duration::from_millis(self.stream_poll_interval_ms)
    }

    /// Get the expired post sweep interval as a Duration.
    pub fn expiry_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.expiry_sweep_interval_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_conversion() {
        let config = Config {
            dynamodb_table_name: "real".to_string(),
            dating_endpoint: None,
            dating_function_prefix: "real-dating".to_string(),
            flag_admin_usernames: vec![],
            stream_poll_interval_ms: 250,
            expiry_sweep_interval_seconds: 30,
            card_channel_capacity: 64,
        };

        assert_eq!(config.stream_poll_interval(), Duration::from_millis(250));
        assert_eq!(config.expiry_sweep_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list("real, moderator ,,"), vec!["real", "moderator"]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_default_values() {
        // Clear environment variables to test defaults
        env::remove_var("DYNAMODB_TABLE_NAME");
        env::remove_var("REAL_DATING_ENDPOINT");
        env::remove_var("REAL_DATING_FUNCTION_PREFIX");
        env::remove_var("FLAG_ADMIN_USERNAMES");
        env::remove_var("STREAM_POLL_INTERVAL_MS");
        env::remove_var("EXPIRY_SWEEP_INTERVAL_SECONDS");
        env::remove_var("CARD_CHANNEL_CAPACITY");

        let config = Config::from_env();

        assert_eq!(config.dynamodb_table_name, "real");
        assert_eq!(config.dating_endpoint, None);
        assert_eq!(config.dating_function_prefix, "real-dating");
        assert_eq!(config.flag_admin_usernames, vec!["real"]);
        assert_eq!(config.stream_poll_interval_ms, 100);
        assert_eq!(config.expiry_sweep_interval_seconds, 60);
        assert_eq!(config.card_channel_capacity, 64);
    }
}
