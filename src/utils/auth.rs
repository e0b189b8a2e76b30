use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::{User, UserRole};

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub username: String,
    pub role: UserRole,
    pub shop_id: Option<Uuid>,
    pub kind: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub kind: String,
    pub exp: i64,
    pub iat: i64,
}

pub fn create_access_token(
    user: &User,
    secret: &str,
    expires_in_hours: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = AccessClaims {
        sub: user.id,
        username: user.username.clone(),
        role: user.role,
        shop_id: user.shop_id,
        kind: "access".to_string(),
        exp: (now + Duration::hours(expires_in_hours)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
}

pub fn verify_access_token(
    token: &str,
    secret: &str,
) -> Result<AccessClaims, jsonwebtoken::errors::Error> {
    let token_data = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;

    if token_data.claims.kind != "access" {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidToken.into());
    }

    Ok(token_data.claims)
}

pub fn create_refresh_token(
    user_id: Uuid,
    secret: &str,
    expires_in_days: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = RefreshClaims {
        sub: user_id,
        kind: "refresh".to_string(),
        exp: (now + Duration::days(expires_in_days)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
}

pub fn verify_refresh_token(
    token: &str,
    secret: &str,
) -> Result<RefreshClaims, jsonwebtoken::errors::Error> {
    let token_data = decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;

    if token_data.claims.kind != "refresh" {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidToken.into());
    }

    Ok(token_data.claims)
}

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    bcrypt::verify(password, hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const SECRET: &str = "test-secret";

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "manager1".into(),
            password_hash: String::new(),
            email: "manager@example.com".into(),
            phone: "0170000000".into(),
            first_name: "Test".into(),
            last_name: "Manager".into(),
            role: UserRole::Manager,
            shop_id: Some(Uuid::new_v4()),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn access_token_round_trip() {
        let user = user();
        let token = create_access_token(&user, SECRET, 24).unwrap();
        let claims = verify_access_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.username, user.username);
        assert_eq!(claims.role, UserRole::Manager);
        assert_eq!(claims.shop_id, user.shop_id);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = create_access_token(&user(), SECRET, 24).unwrap();
        assert!(verify_access_token(&token, "other-secret").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = create_access_token(&user(), SECRET, -1).unwrap();
        assert!(verify_access_token(&token, SECRET).is_err());
    }

    #[test]
    fn refresh_token_cannot_be_used_as_access_token() {
        let refresh = create_refresh_token(Uuid::new_v4(), SECRET, 7).unwrap();
        assert!(verify_access_token(&refresh, SECRET).is_err());
    }

    #[test]
    fn refresh_token_round_trip() {
        let user_id = Uuid::new_v4();
        let token = create_refresh_token(user_id, SECRET, 7).unwrap();
        let claims = verify_refresh_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, user_id);
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("hunter2hunter2").unwrap();
        assert!(verify_password("hunter2hunter2", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }
}
