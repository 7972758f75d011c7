//! Password hashing and opaque token handling.

use rand::{distributions::Alphanumeric, thread_rng, Rng};
use scrypt::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Params, Scrypt,
};
use subtle::ConstantTimeEq;
use tokio::task::spawn_blocking;

use crate::errors::AppError;

/// Length of generated session tokens and token secrets.
pub const TOKEN_LENGTH: usize = 32;

/// Hash a password with scrypt at the given cost (log2 of N).
pub async fn hash_password(password: &str, cost: u8) -> Result<String, AppError> {
    let password = password.to_string();
    spawn_blocking(move || {
        let params = Params::new(cost, Params::RECOMMENDED_R, Params::RECOMMENDED_P, Params::RECOMMENDED_LEN)
            .map_err(|e| AppError::Internal(format!("Invalid scrypt parameters: {}", e)))?;
        let salt = SaltString::generate(&mut OsRng);
        Scrypt
            .hash_password_customized(password.as_bytes(), None, None, params, &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
    })
    .await
    .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
}

/// Check a password against a stored PHC hash string.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let password = password.to_string();
    let hash = hash.to_string();
    spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash)
            .map_err(|e| AppError::Internal(format!("Corrupt password hash: {}", e)))?;
        Ok(Scrypt.verify_password(password.as_bytes(), &parsed).is_ok())
    })
    .await
    .map_err(|e| AppError::Internal(format!("Verification task failed: {}", e)))?
}

/// Generate a random alphanumeric token.
pub fn generate_token() -> String {
    let mut rng = thread_rng();
    std::iter::repeat(())
        .map(|_| rng.sample(Alphanumeric) as char)
        .take(TOKEN_LENGTH)
        .collect()
}

/// Split a `<id>.<secret>` one-time token.
pub fn split_token(token: &str) -> Option<(&str, &str)> {
    let (id, secret) = token.split_once('.')?;
    if id.is_empty() || secret.is_empty() {
        return None;
    }
    Some((id, secret))
}

/// Perform constant-time string comparison.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password("Segura123", 4).await.unwrap();
        assert!(hash.starts_with("$scrypt$"));
        assert!(verify_password("Segura123", &hash).await.unwrap());
        assert!(!verify_password("segura123", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_hash_is_an_error() {
        assert!(verify_password("x", "not-a-phc-string").await.is_err());
    }

    #[test]
    fn test_generate_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_split_token() {
        assert_eq!(split_token("abc.def"), Some(("abc", "def")));
        assert_eq!(split_token("abcdef"), None);
        assert_eq!(split_token(".def"), None);
        assert_eq!(split_token("abc."), None);
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("test-key-123", "test-key-123"));
        assert!(!constant_time_compare("test-key-123", "test-key-124"));
        assert!(!constant_time_compare("short", "much-longer-key"));
        assert!(constant_time_compare("", ""));
    }
}
