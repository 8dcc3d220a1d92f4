use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use rand_core::OsRng;

// Argon2 parameters for 50-150ms target latency
const ARGON2_M_COST: u32 = 19456; // 19 MB
const ARGON2_T_COST: u32 = 2; // 2 iterations
const ARGON2_P_COST: u32 = 1; // 1 parallelism

fn argon2() -> Result<Argon2<'static>, argon2::password_hash::Error> {
    Ok(Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon2::Params::new(ARGON2_M_COST, ARGON2_T_COST, ARGON2_P_COST, None)
            .map_err(argon2::password_hash::Error::from)?,
    ))
}

/// One-way hash with a fresh random salt, PHC string output.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = argon2()?.hash_password(password.as_bytes(), &salt)?;
    Ok(password_hash.to_string())
}

/// Constant-time verification against a stored PHC string. A mismatch is
/// `Ok(false)`; only a malformed stored hash is an error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    match argon2()?.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(_) => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_produces_argon2id_phc_string() {
        let hash = hash_password("Abc123!").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert_ne!(hash, "Abc123!");
    }

    #[test]
    fn test_same_password_hashes_differently_per_salt() {
        let first = hash_password("Abc123!").unwrap();
        let second = hash_password("Abc123!").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_password_round_trip() {
        let hash = hash_password("Abc123!").unwrap();
        assert!(verify_password("Abc123!", &hash).unwrap());
        assert!(!verify_password("Abc124!", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_with_korean_password() {
        let hash = hash_password("비밀번호A1!").unwrap();
        assert!(verify_password("비밀번호A1!", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_rejects_malformed_hash() {
        assert!(verify_password("Abc123!", "not-a-phc-string").is_err());
    }
}
