use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::Role;

pub const ACCESS_TTL_SECS: i64 = 60 * 60;
pub const REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Distinguishes the short-lived access token from the refresh token so a
/// refresh token can never be replayed against protected routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub kind: TokenKind,
    pub iat: usize,
    pub exp: usize,
}

pub fn issue_token(
    secret: &str,
    user_id: Uuid,
    role: Role,
    kind: TokenKind,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let ttl = match kind {
        TokenKind::Access => ACCESS_TTL_SECS,
        TokenKind::Refresh => REFRESH_TTL_SECS,
    };
    let claims = Claims {
        sub: user_id,
        role,
        kind,
        iat: now as usize,
        exp: (now + ttl) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_access_token() {
        let user_id = Uuid::new_v4();
        let token = issue_token("secret", user_id, Role::Organizer, TokenKind::Access).unwrap();
        let claims = decode_token("secret", &token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, Role::Organizer);
        assert_eq!(claims.kind, TokenKind::Access);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token("secret", Uuid::new_v4(), Role::Student, TokenKind::Access).unwrap();
        assert!(decode_token("other-secret", &token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        // exp far enough in the past to clear the default decode leeway.
        let claims = Claims {
            sub: Uuid::new_v4(),
            role: Role::Student,
            kind: TokenKind::Access,
            iat: 1_000_000,
            exp: 1_000_060,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(decode_token("secret", &token).is_err());
    }

    #[test]
    fn refresh_kind_survives_the_round_trip() {
        let token = issue_token("secret", Uuid::new_v4(), Role::Student, TokenKind::Refresh).unwrap();
        let claims = decode_token("secret", &token).unwrap();
        assert_eq!(claims.kind, TokenKind::Refresh);
    }
}
