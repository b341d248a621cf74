//! Password hashing and session tokens

use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use newsdesk_domain::{CredentialError, PasswordHasher, SessionClaims, TokenIssuer};
use secrecy::{ExposeSecret, SecretString};

/// Argon2id with a random salt, stored as a PHC string
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2PasswordHasher;

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, password: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CredentialError::Hashing(e.to_string()))
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

/// HS256 JSON Web Tokens signed with a shared secret
pub struct JwtTokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtTokenIssuer {
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            validation,
        }
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn issue(&self, claims: &SessionClaims) -> Result<String, CredentialError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| CredentialError::Signing(e.to_string()))
    }

    fn verify(&self, token: &str) -> Result<SessionClaims, CredentialError> {
        decode::<SessionClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => CredentialError::Expired,
                _ => CredentialError::Invalid(e.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsdesk_domain::Role;
    use time::OffsetDateTime;

    fn issuer(secret: &str) -> JwtTokenIssuer {
        JwtTokenIssuer::new(&SecretString::new(secret.into()))
    }

    fn claims(exp_offset_secs: i64) -> SessionClaims {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        SessionClaims {
            uid: 7,
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            role: Role::User,
            profile_pic: None,
            iat: now,
            exp: now + exp_offset_secs,
            jti: "8b0f6c1e-0000-4000-8000-000000000001".to_string(),
        }
    }

    #[test]
    fn test_password_hash_verifies() {
        let hasher = Argon2PasswordHasher;
        let hash = hasher.hash("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(hasher.verify("correct horse", &hash));
        assert!(!hasher.verify("battery staple", &hash));
        assert!(!hasher.verify("correct horse", "not-a-phc-string"));
    }

    #[test]
    fn test_salts_differ() {
        let hasher = Argon2PasswordHasher;
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn test_token_roundtrip() {
        let issuer = issuer("test-secret");
        let claims = claims(3600);
        let token = issuer.issue(&claims).unwrap();
        assert_eq!(issuer.verify(&token).unwrap(), claims);
    }

    #[test]
    fn test_expired_token() {
        let issuer = issuer("test-secret");
        let token = issuer.issue(&claims(-60)).unwrap();
        assert!(matches!(issuer.verify(&token), Err(CredentialError::Expired)));
    }

    #[test]
    fn test_foreign_or_garbled_tokens_are_invalid() {
        let token = issuer("other-secret").issue(&claims(3600)).unwrap();
        assert!(matches!(
            issuer("test-secret").verify(&token),
            Err(CredentialError::Invalid(_))
        ));
        assert!(matches!(
            issuer("test-secret").verify("not.a.token"),
            Err(CredentialError::Invalid(_))
        ));
    }
}
