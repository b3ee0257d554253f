use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::SourceName;
use crate::infrastructure::gate::MaintenanceWindow;
use crate::modules::integrations::catalog::EndpointCatalog;

const DEFAULT_CACHE_URL: &str = "sqlite://rvk_cache.db?mode=rwc";

/// Settings for the resilient query executor, passed in at construction.
#[derive(Clone, Debug)]
pub struct ExecutorConfig {
    /// Contact-identifying header sent with every request
    pub user_agent: String,
    pub timeout: Duration,
    /// Retries after the first timed-out attempt
    pub max_retries: u32,
    /// Doubled after each timed-out attempt
    pub initial_backoff: Duration,
    /// Pause after every network round-trip, per service
    pub pacing: HashMap<SourceName, Duration>,
}

impl ExecutorConfig {
    pub fn pacing_for(&self, source: SourceName) -> Duration {
        self.pacing.get(&source).copied().unwrap_or(Duration::ZERO)
    }

    /// Delay before retry number `retry` (0-based): 1s, 2s, 4s, ...
    pub fn backoff_for(&self, retry: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(retry))
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(None),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            pacing: default_pacing(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub cache_database_url: String,
    pub cache_ttl: chrono::Duration,
    /// Pause after each ISBN, on top of per-request pacing
    pub record_pause: Duration,
    pub executor: ExecutorConfig,
    pub catalog: EndpointCatalog,
    pub maintenance_windows: Vec<(SourceName, MaintenanceWindow)>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_database_url: DEFAULT_CACHE_URL.to_string(),
            cache_ttl: chrono::Duration::days(30),
            record_pause: Duration::from_secs(1),
            executor: ExecutorConfig::default(),
            catalog: EndpointCatalog::default(),
            maintenance_windows: default_maintenance_windows(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();

        let user_agent = resolve_user_agent(
            env::var("USER_AGENT").ok().as_deref(),
            env::var("CONTACT_EMAIL").ok().as_deref(),
        );
        if !has_contact(&user_agent) {
            tracing::warn!(
                "No CONTACT_EMAIL or USER_AGENT set, sending '{}' without contact information",
                user_agent
            );
        }

        let mut pacing = default_pacing();
        for source in SourceName::ALL {
            let key = format!("{}_PACING_MS", source.as_str().to_uppercase());
            if let Some(ms) = env_parse::<u64>(&key) {
                pacing.insert(source, Duration::from_millis(ms));
            }
        }

        let executor = ExecutorConfig {
            user_agent,
            timeout: env_parse("REQUEST_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.executor.timeout),
            max_retries: env_parse("MAX_RETRIES").unwrap_or(defaults.executor.max_retries),
            initial_backoff: env_parse("INITIAL_BACKOFF_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.executor.initial_backoff),
            pacing,
        };

        Self {
            cache_database_url: env::var("CACHE_DATABASE_URL")
                .unwrap_or(defaults.cache_database_url),
            cache_ttl: env_parse("CACHE_TTL_DAYS")
                .map(chrono::Duration::days)
                .unwrap_or(defaults.cache_ttl),
            record_pause: env_parse("RECORD_PAUSE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.record_pause),
            executor,
            catalog: defaults.catalog,
            maintenance_windows: defaults.maintenance_windows,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// An explicit `USER_AGENT` wins; otherwise the contact address is embedded.
fn resolve_user_agent(user_agent: Option<&str>, contact: Option<&str>) -> String {
    match user_agent.map(str::trim).filter(|ua| !ua.is_empty()) {
        Some(ua) => ua.to_string(),
        None => default_user_agent(contact),
    }
}

/// The header names a way to reach the operator of this client.
fn has_contact(user_agent: &str) -> bool {
    user_agent != default_user_agent(None)
}

fn default_user_agent(contact: Option<&str>) -> String {
    match contact.map(str::trim).filter(|c| !c.is_empty()) {
        Some(email) => format!(
            "rvk-shelfmark/{} (mailto:{})",
            env!("CARGO_PKG_VERSION"),
            email
        ),
        None => format!("rvk-shelfmark/{}", env!("CARGO_PKG_VERSION")),
    }
}

fn default_pacing() -> HashMap<SourceName, Duration> {
    HashMap::from([
        (SourceName::Dnb, Duration::from_millis(1000)),
        (SourceName::B3Kat, Duration::from_millis(1000)),
        (SourceName::Slsp, Duration::from_millis(1000)),
        (SourceName::Rvk, Duration::from_millis(500)),
    ])
}

/// B3Kat's nightly maintenance, in Central European standard time.
fn default_maintenance_windows() -> Vec<(SourceName, MaintenanceWindow)> {
    vec![(
        SourceName::B3Kat,
        MaintenanceWindow::daily(5 * 60, 6 * 60, 60),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_email_is_embedded_in_user_agent() {
        let ua = resolve_user_agent(None, Some(" library@example.org "));
        assert!(ua.starts_with("rvk-shelfmark/"));
        assert!(ua.ends_with("(mailto:library@example.org)"));
        assert!(has_contact(&ua));
    }

    #[test]
    fn test_explicit_user_agent_wins() {
        let ua = resolve_user_agent(Some("MyLibrary/1.0 (+https://lib.example.org)"), Some("x@y"));
        assert_eq!(ua, "MyLibrary/1.0 (+https://lib.example.org)");
        assert!(has_contact(&ua));
    }

    #[test]
    fn test_missing_contact_is_detected() {
        let ua = resolve_user_agent(Some("  "), None);
        assert_eq!(ua, default_user_agent(None));
        assert!(!has_contact(&ua));
        assert!(!has_contact(&resolve_user_agent(None, Some(""))));
    }

    #[test]
    fn test_backoff_doubles() {
        let config = ExecutorConfig::default();
        assert_eq!(config.backoff_for(0), Duration::from_secs(1));
        assert_eq!(config.backoff_for(1), Duration::from_secs(2));
        assert_eq!(config.backoff_for(2), Duration::from_secs(4));
    }
}
