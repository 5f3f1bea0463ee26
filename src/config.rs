use std::env;
use std::time::Duration;

pub struct AppConfig {
    pub http_bind: String,
    pub backend_url: String,
    pub default_range_days: i64,
    /// Pages not heard from for this long lose their state.
    pub session_idle: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            http_bind: env_var("HTTP_BIND", "0.0.0.0:8080"),
            backend_url: env_var("BACKEND_URL", "http://127.0.0.1:5000")
                .trim_end_matches('/')
                .to_string(),
            default_range_days: env_var("DEFAULT_RANGE_DAYS", "1").parse().unwrap_or(1),
            session_idle: Duration::from_secs(
                env_var("SESSION_IDLE_MINUTES", "30")
                    .parse::<u64>()
                    .unwrap_or(30)
                    .saturating_mul(60),
            ),
        }
    }
}

fn env_var(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
