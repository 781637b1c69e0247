use actix_web::{HttpResponse, Responder, Scope, post, web};
use tracing::info;

use crate::application::auth_service::AuthService;
use crate::domain::error::DomainError;
use crate::presentation::dto::{AuthResponse, LoginRequest, RegisterRequest};

pub fn scope() -> Scope {
    web::scope("/auth").service(register).service(login)
}

#[post("/register")]
async fn register(
    service: web::Data<AuthService>,
    payload: web::Json<RegisterRequest>,
) -> Result<impl Responder, DomainError> {
    let RegisterRequest {
        username,
        email,
        password,
    } = payload.into_inner();
    let session = service.register(username, email, password).await?;

    info!(user_id = ?session.user.id, email = %session.user.email, "user registered");

    let expires_in = service.keys().ttl_secs();
    Ok(HttpResponse::Ok().json(AuthResponse::new(session, expires_in)))
}

#[post("/login")]
async fn login(
    service: web::Data<AuthService>,
    payload: web::Json<LoginRequest>,
) -> Result<impl Responder, DomainError> {
    let session = service.login(&payload.email, &payload.password).await?;

    info!(email = %session.user.email, "user logged in");

    let expires_in = service.keys().ttl_secs();
    Ok(HttpResponse::Ok().json(AuthResponse::new(session, expires_in)))
}
