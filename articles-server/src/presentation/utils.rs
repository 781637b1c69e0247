use actix_web::dev::Payload;
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures_util::future::{Ready, ready};

use crate::application::auth_service::AuthService;
use crate::domain::error::DomainError;
use crate::domain::user::Role;
use crate::infrastructure::security::JwtKeys;

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(DomainError::Unauthorized(
                "missing authenticated user".into(),
            )
            .into())),
        }
    }
}

pub async fn extract_user_from_token(
    token: &str,
    keys: &JwtKeys,
    auth_service: &AuthService,
) -> Result<AuthenticatedUser, DomainError> {
    let invalid = || DomainError::Unauthorized("invalid token".into());
    let claims = keys.verify_token(token).map_err(|_| invalid())?;
    let user_id = claims.user_id().ok_or_else(invalid)?;

    let user = auth_service
        .get_user(user_id)
        .await
        .map_err(|err| match err {
            DomainError::NotFound { .. } => DomainError::Unauthorized("user not found".into()),
            other => other,
        })?;

    Ok(AuthenticatedUser {
        id: user_id,
        username: user.username,
        role: user.role,
    })
}
