//! Authentication and authorization
//!
//! Bearer tokens carry the caller's party id as `sub`. Roles gate routes;
//! ownership of an individual claim is checked by the workflow.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use core_kernel::PartyId;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the caller's party id
    pub sub: String,
    /// User's roles
    pub roles: Vec<String>,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

impl Claims {
    /// The party this token speaks for
    pub fn party_id(&self) -> Result<PartyId, AuthError> {
        self.sub
            .parse::<PartyId>()
            .map_err(|_| AuthError::InvalidSubject(self.sub.clone()))
    }
}

/// Auth errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Token subject '{0}' is not a party id")]
    InvalidSubject(String),
    #[error("Missing permission: {0}")]
    MissingPermission(String),
}

/// Creates a new JWT token
///
/// # Arguments
///
/// * `party_id` - Party the token is issued to
/// * `roles` - Caller's roles
/// * `secret` - JWT secret key
/// * `expiration_secs` - Token validity in seconds
pub fn create_token(
    party_id: PartyId,
    roles: Vec<String>,
    secret: &str,
    expiration_secs: u64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(expiration_secs as i64);

    let claims = Claims {
        sub: party_id.as_uuid().to_string(),
        roles,
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::InvalidToken)
}

/// Validates a JWT token
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// Checks if user has required role
pub fn has_role(claims: &Claims, required_role: &str) -> bool {
    claims.roles.iter().any(|r| r == required_role || r == roles::ADMIN)
}

/// Fails with [`AuthError::MissingPermission`] unless the caller holds `role`
pub fn require_role(claims: &Claims, role: &str) -> Result<(), AuthError> {
    if has_role(claims, role) {
        Ok(())
    } else {
        Err(AuthError::MissingPermission(role.to_string()))
    }
}

/// Role names
pub mod roles {
    /// Policy holders filing claims
    pub const CLAIMANT: &str = "claimant";
    /// Insurers reviewing and paying claims
    pub const PROVIDER: &str = "provider";
    pub const ADMIN: &str = "admin";
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_token_round_trip_keeps_party() {
        let party = PartyId::new_v7();
        let token = create_token(party, vec![roles::CLAIMANT.to_string()], SECRET, 60).unwrap();
        let claims = validate_token(&token, SECRET).unwrap();
        assert_eq!(claims.party_id().unwrap(), party);
        assert!(has_role(&claims, roles::CLAIMANT));
        assert!(!has_role(&claims, roles::PROVIDER));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = create_token(PartyId::new_v7(), vec![], SECRET, 60).unwrap();
        assert!(matches!(validate_token(&token, "other"), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_admin_passes_every_role_check() {
        let claims = Claims {
            sub: Uuid::now_v7().to_string(),
            roles: vec![roles::ADMIN.to_string()],
            exp: 0,
            iat: 0,
        };
        assert!(require_role(&claims, roles::PROVIDER).is_ok());
    }

    #[test]
    fn test_non_uuid_subject_is_rejected() {
        let claims = Claims {
            sub: "alice".to_string(),
            roles: vec![],
            exp: 0,
            iat: 0,
        };
        assert!(matches!(claims.party_id(), Err(AuthError::InvalidSubject(_))));
    }
}
