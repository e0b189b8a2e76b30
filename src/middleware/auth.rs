use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::user::UserRole;
use crate::utils::verify_access_token;
use crate::AppState;

/// The acting user, extracted from the `Authorization: Bearer` header.
/// Every protected handler takes this as an argument; attribution fields
/// (`transferred_by`, `changed_by`, `entry_by_id`, ...) come from here.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    pub role: UserRole,
    pub shop_id: Option<Uuid>,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(Error::Forbidden)
        }
    }

    /// Manager-level actions: transfer approval, rejection, deletion.
    pub fn require_manager(&self) -> Result<()> {
        match self.role {
            UserRole::Admin | UserRole::Manager => Ok(()),
            UserRole::Staff => Err(Error::Forbidden),
        }
    }

    /// Admins see every shop; managers and staff only their assigned one.
    pub fn ensure_shop_access(&self, shop_id: Uuid) -> Result<()> {
        if self.is_admin() || self.shop_id == Some(shop_id) {
            Ok(())
        } else {
            Err(Error::Forbidden)
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let state = AppState::from_ref(state);

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(Error::Unauthorized)?;

        let token = header.strip_prefix("Bearer ").ok_or(Error::Unauthorized)?;

        let claims =
            verify_access_token(token, &state.config.jwt_secret).map_err(|_| Error::InvalidToken)?;

        Ok(CurrentUser {
            id: claims.sub,
            username: claims.username,
            role: claims.role,
            shop_id: claims.shop_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole, shop_id: Option<Uuid>) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            username: "u".into(),
            role,
            shop_id,
        }
    }

    #[test]
    fn role_checks() {
        assert!(user(UserRole::Admin, None).require_admin().is_ok());
        assert!(user(UserRole::Manager, None).require_admin().is_err());
        assert!(user(UserRole::Manager, None).require_manager().is_ok());
        assert!(user(UserRole::Staff, None).require_manager().is_err());
    }

    #[test]
    fn shop_scoping() {
        let shop = Uuid::new_v4();
        let other = Uuid::new_v4();

        assert!(user(UserRole::Admin, None).ensure_shop_access(shop).is_ok());
        assert!(user(UserRole::Staff, Some(shop))
            .ensure_shop_access(shop)
            .is_ok());
        assert!(user(UserRole::Staff, Some(shop))
            .ensure_shop_access(other)
            .is_err());
        assert!(user(UserRole::Staff, None).ensure_shop_access(shop).is_err());
    }
}
