use std::env;
use std::net::SocketAddr;

#[derive(Clone)]
pub struct Config {
    // Shared admin secret. `None` means every protected operation fails closed.
    pub admin_token: Option<String>,

    // Forces `Secure` on the session cookie even over plain HTTP.
    pub production: bool,

    // Server
    pub bind_addr: SocketAddr,

    // Login rate limiting
    pub login_max_attempts: u32,
    pub login_window_secs: u64,
    pub rate_limit_max_entries: usize,
    pub rate_limit_sweep_secs: u64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field(
                "admin_token",
                &self.admin_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("production", &self.production)
            .field("bind_addr", &self.bind_addr)
            .field("login_max_attempts", &self.login_max_attempts)
            .field("login_window_secs", &self.login_window_secs)
            .field("rate_limit_max_entries", &self.rate_limit_max_entries)
            .field("rate_limit_sweep_secs", &self.rate_limit_sweep_secs)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to parse {0}: {1}")]
    ParseError(String, String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Attempt to load .env file, but don't fail if it doesn't exist
        // (env vars may be set directly in production)
        let _ = dotenvy::dotenv();

        // An empty ADMIN_TOKEN is the same as no token at all.
        let admin_token = env::var("ADMIN_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let production = env::var("APP_ENV")
            .map(|v| v.trim().eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        // Server
        let bind_addr_str = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_addr = bind_addr_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::ParseError("BIND_ADDR".to_string(), e.to_string()))?;

        // Rate limiting
        let login_max_attempts = parse_env_or_default("LOGIN_MAX_ATTEMPTS", 10)?;
        let login_window_secs = parse_env_or_default("LOGIN_WINDOW_SECS", 600)?;
        let rate_limit_max_entries = parse_env_or_default("RATE_LIMIT_MAX_ENTRIES", 10_000)?;
        let rate_limit_sweep_secs = parse_env_or_default("RATE_LIMIT_SWEEP_SECS", 60)?;

        if login_window_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "LOGIN_WINDOW_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        if rate_limit_max_entries == 0 {
            return Err(ConfigError::InvalidValue(
                "RATE_LIMIT_MAX_ENTRIES".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        if rate_limit_sweep_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "RATE_LIMIT_SWEEP_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Config {
            admin_token,
            production,
            bind_addr,
            login_max_attempts,
            login_window_secs,
            rate_limit_max_entries,
            rate_limit_sweep_secs,
        })
    }
}

/// Helper function to parse environment variable with a default value
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(key.to_string(), format!("{}: {}", e, val))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Use a mutex to ensure tests run serially since they modify global env vars.
    // unwrap_or_else handles poison from prior panics.
    static TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn lock_test() -> std::sync::MutexGuard<'static, ()> {
        TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner())
    }

    // Values are set explicitly (never removed) where a stray .env file could
    // otherwise fill them in, since dotenvy doesn't override existing vars.
    fn reset_test_env() {
        env::set_var("ADMIN_TOKEN", "");
        env::set_var("APP_ENV", "development");
        env::set_var("BIND_ADDR", "0.0.0.0:3000");
        env::remove_var("LOGIN_MAX_ATTEMPTS");
        env::remove_var("LOGIN_WINDOW_SECS");
        env::remove_var("RATE_LIMIT_MAX_ENTRIES");
        env::remove_var("RATE_LIMIT_SWEEP_SECS");
    }

    #[test]
    fn test_parse_env_or_default() {
        let _guard = lock_test();

        env::set_var("TEST_U64", "12345");
        let result: Result<u64, ConfigError> = parse_env_or_default("TEST_U64", 100);
        assert_eq!(result.unwrap(), 12345);

        env::remove_var("TEST_U64");
        let result: Result<u64, ConfigError> = parse_env_or_default("TEST_U64", 100);
        assert_eq!(result.unwrap(), 100);
    }

    #[test]
    fn test_config_defaults() {
        let _guard = lock_test();
        reset_test_env();

        let config = Config::from_env().unwrap();

        assert!(config.admin_token.is_none());
        assert!(!config.production);
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:3000");
        assert_eq!(config.login_max_attempts, 10);
        assert_eq!(config.login_window_secs, 600);
        assert_eq!(config.rate_limit_max_entries, 10_000);
        assert_eq!(config.rate_limit_sweep_secs, 60);

        reset_test_env();
    }

    #[test]
    fn test_admin_token_is_trimmed() {
        let _guard = lock_test();
        reset_test_env();

        env::set_var("ADMIN_TOKEN", "  s3cret \n");
        let config = Config::from_env().unwrap();
        assert_eq!(config.admin_token.as_deref(), Some("s3cret"));

        reset_test_env();
    }

    #[test]
    fn test_blank_admin_token_is_unset() {
        let _guard = lock_test();
        reset_test_env();

        env::set_var("ADMIN_TOKEN", "   ");
        let config = Config::from_env().unwrap();
        assert!(config.admin_token.is_none());

        reset_test_env();
    }

    #[test]
    fn test_production_flag() {
        let _guard = lock_test();
        reset_test_env();

        env::set_var("APP_ENV", "Production");
        assert!(Config::from_env().unwrap().production);

        env::set_var("APP_ENV", "staging");
        assert!(!Config::from_env().unwrap().production);

        reset_test_env();
    }

    #[test]
    fn test_invalid_socket_addr() {
        let _guard = lock_test();
        reset_test_env();

        env::set_var("BIND_ADDR", "invalid_address");

        let result = Config::from_env();
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_, _)));

        reset_test_env();
    }

    #[test]
    fn test_invalid_max_attempts() {
        let _guard = lock_test();
        reset_test_env();

        env::set_var("LOGIN_MAX_ATTEMPTS", "ten");

        let result = Config::from_env();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ParseError(ref s, _) if s == "LOGIN_MAX_ATTEMPTS"
        ));

        reset_test_env();
    }

    #[test]
    fn test_zero_window_rejected() {
        let _guard = lock_test();
        reset_test_env();

        env::set_var("LOGIN_WINDOW_SECS", "0");

        let result = Config::from_env();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue(ref s, _) if s == "LOGIN_WINDOW_SECS"
        ));

        reset_test_env();
    }

    #[test]
    fn test_debug_redacts_admin_token() {
        let _guard = lock_test();
        reset_test_env();

        env::set_var("ADMIN_TOKEN", "hunter2");
        let config = Config::from_env().unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[REDACTED]"));

        reset_test_env();
    }
}
