/*!
Runtime configuration, read from the environment (and `.env`).
*/
use std::env;

use crate::errors::AppError;

pub const MIN_SECRET_LEN: usize = 32;
/// One year.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub token_secret: String,
    pub token_ttl_hours: i64,
    pub teacher_invite_code: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &self.database_url)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("token_secret", &"<redacted>")
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("teacher_invite_code", &self.teacher_invite_code.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes `std::env`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .unwrap_or_else(|| "sqlite://permission_slips.db".to_owned());
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_owned());
        let port = match lookup("PORT") {
            Some(p) => p
                .parse::<u16>()
                .map_err(|e| AppError::ConfigError(format!("PORT {:?}: {}", p, e)))?,
            None => 8080,
        };

        let token_secret = lookup("TOKEN_SECRET")
            .ok_or_else(|| AppError::ConfigError("TOKEN_SECRET is not set".to_owned()))?;
        if token_secret.len() < MIN_SECRET_LEN {
            return Err(AppError::ConfigError(format!(
                "TOKEN_SECRET must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }

        let token_ttl_hours = match lookup("TOKEN_TTL_HOURS") {
            Some(h) => h
                .parse::<i64>()
                .ok()
                .filter(|h| (1..=MAX_TOKEN_TTL_HOURS).contains(h))
                .ok_or_else(|| {
                    AppError::ConfigError(format!(
                        "TOKEN_TTL_HOURS {:?} must be a whole number of hours between 1 and {}",
                        h, MAX_TOKEN_TTL_HOURS
                    ))
                })?,
            None => 24,
        };

        let teacher_invite_code = lookup("TEACHER_INVITE_CODE").filter(|c| !c.is_empty());

        Ok(Config {
            database_url,
            host,
            port,
            token_secret,
            token_ttl_hours,
            teacher_invite_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply() {
        let cfg = Config::from_lookup(lookup_from(&[("TOKEN_SECRET", SECRET)])).unwrap();
        assert_eq!(cfg.database_url, "sqlite://permission_slips.db");
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.token_ttl_hours, 24);
        assert!(cfg.teacher_invite_code.is_none());
    }

    #[test]
    fn secret_is_required_and_long_enough() {
        assert!(Config::from_lookup(lookup_from(&[])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("TOKEN_SECRET", "short")])).is_err());
    }

    #[test]
    fn bad_numbers_are_rejected() {
        assert!(Config::from_lookup(lookup_from(&[("TOKEN_SECRET", SECRET), ("PORT", "http")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("TOKEN_SECRET", SECRET), ("TOKEN_TTL_HOURS", "0")])).is_err());
    }

    #[test]
    fn token_ttl_is_capped_at_a_year() {
        let ttl = |hours: &str| {
            Config::from_lookup(lookup_from(&[("TOKEN_SECRET", SECRET), ("TOKEN_TTL_HOURS", hours)]))
                .map(|cfg| cfg.token_ttl_hours)
        };
        assert_eq!(ttl("8760").unwrap(), MAX_TOKEN_TTL_HOURS);
        for hours in ["8761", "3000000000", "9223372036854775807"] {
            assert!(matches!(ttl(hours), Err(AppError::ConfigError(_))), "{}", hours);
        }
    }

    #[test]
    fn debug_redacts_secrets() {
        let cfg = Config::from_lookup(lookup_from(&[
            ("TOKEN_SECRET", SECRET),
            ("TEACHER_INVITE_CODE", "staff-only"),
        ]))
        .unwrap();
        let printed = format!("{:?}", cfg);
        assert!(!printed.contains(SECRET));
        assert!(!printed.contains("staff-only"));
    }
}
