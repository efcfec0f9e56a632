use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::errors::AppError;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let pwd_hash = Argon2::default()
        .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))
        .map_err(|e| {
            log::error!("Failed to hash password: {}", e);
            AppError::PasswordError(e.to_string())
        })?
        .to_string();
    Ok(pwd_hash)
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash cannot be parsed.
pub fn verify_password(provided: &str, stored_hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| {
        log::error!("Stored password hash is malformed: {}", e);
        AppError::PasswordError(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(provided.as_bytes(), &parsed)
        .is_ok())
}

/// Fixed-width RFC 3339 so that text order in the database is time order.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn hash_round_trips_and_rejects_wrong_password() {
        let hash = hash_password("correct horse battery").unwrap();
        assert_ne!(hash, "correct horse battery");
        assert!(verify_password("correct horse battery", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("anything", "plaintext").is_err());
    }

    #[test]
    fn timestamps_sort_as_text() {
        let early = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let late = early + chrono::Duration::nanoseconds(1_500);
        let (a, b) = (format_timestamp(early), format_timestamp(late));
        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert!(a.ends_with('Z'));
    }
}
