//! Server configuration, loaded from the environment at startup and passed
//! into each component at construction.

use std::str::FromStr;
use std::time::Duration;

use ratevault_core::{CacheConfig, CircuitBreakerConfig, FixerConfig};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub database_url: String,
    pub fixer: FixerConfig,
    pub cache: CacheConfig,
    pub breaker: CircuitBreakerConfig,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let fixer_defaults = FixerConfig::default();
        let cache_defaults = CacheConfig::default();
        let breaker_defaults = CircuitBreakerConfig::default();

        Self {
            listen_addr: env_or("RATEVAULT_LISTEN_ADDR", "0.0.0.0:8080"),
            database_url: env_or("RATEVAULT_DATABASE_URL", "sqlite:ratevault.db"),
            fixer: FixerConfig {
                base_url: env_or("RATEVAULT_FIXER_BASE_URL", &fixer_defaults.base_url),
                api_key: env_or("RATEVAULT_FIXER_API_KEY", ""),
                base_currency: env_or("RATEVAULT_BASE_CURRENCY", &fixer_defaults.base_currency),
                request_timeout: Duration::from_secs(env_parse(
                    "RATEVAULT_FIXER_TIMEOUT_SECS",
                    fixer_defaults.request_timeout.as_secs(),
                )),
            },
            cache: CacheConfig {
                capacity: env_parse("RATEVAULT_CACHE_CAPACITY", cache_defaults.capacity),
                ttl: Duration::from_secs(env_parse(
                    "RATEVAULT_CACHE_TTL_SECS",
                    cache_defaults.ttl.as_secs(),
                )),
            },
            breaker: CircuitBreakerConfig {
                window_size: env_parse("RATEVAULT_BREAKER_WINDOW", breaker_defaults.window_size),
                min_calls: env_parse("RATEVAULT_BREAKER_MIN_CALLS", breaker_defaults.min_calls),
                failure_rate_threshold: env_parse(
                    "RATEVAULT_BREAKER_FAILURE_RATE",
                    breaker_defaults.failure_rate_threshold,
                ),
                slow_call_rate_threshold: env_parse(
                    "RATEVAULT_BREAKER_SLOW_RATE",
                    breaker_defaults.slow_call_rate_threshold,
                ),
                slow_call_duration: Duration::from_millis(env_parse(
                    "RATEVAULT_BREAKER_SLOW_CALL_MS",
                    breaker_defaults.slow_call_duration.as_millis() as u64,
                )),
                open_wait: Duration::from_secs(env_parse(
                    "RATEVAULT_BREAKER_OPEN_WAIT_SECS",
                    breaker_defaults.open_wait.as_secs(),
                )),
                half_open_permits: env_parse(
                    "RATEVAULT_BREAKER_HALF_OPEN_PERMITS",
                    breaker_defaults.half_open_permits,
                ),
            },
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.fixer.api_key.is_empty() {
            return Err(String::from("RATEVAULT_FIXER_API_KEY must be set"));
        }
        if self.fixer.base_currency.is_empty() {
            return Err(String::from("base currency must not be empty"));
        }
        if self.cache.capacity == 0 {
            return Err(String::from("cache capacity must be greater than zero"));
        }
        Ok(())
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_owned())
}

fn env_parse<T: FromStr + Copy>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
