use actix_web::{HttpResponse, Scope, delete, get, post, put, web};
use tracing::info;

use crate::application::user_service::UserService;
use crate::domain::error::DomainError;
use crate::presentation::dto::{Envelope, UserRequest};
use crate::presentation::utils::AuthenticatedUser;

pub fn scope() -> Scope {
    web::scope("/users")
        .service(list_users)
        .service(get_user)
        .service(create_user)
        .service(update_user)
        .service(delete_user)
}

#[get("")]
async fn list_users(users: web::Data<UserService>) -> Result<HttpResponse, DomainError> {
    let list = users.find_all().await?;
    Ok(HttpResponse::Ok().json(Envelope::success(list)))
}

#[get("/{id}")]
async fn get_user(
    users: web::Data<UserService>,
    path: web::Path<i64>,
) -> Result<HttpResponse, DomainError> {
    let user = users.find_by_id(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(Envelope::success(user)))
}

#[post("")]
async fn create_user(
    caller: AuthenticatedUser,
    users: web::Data<UserService>,
    payload: web::Json<UserRequest>,
) -> Result<HttpResponse, DomainError> {
    let payload = payload.into_inner();
    payload.validate()?;

    let user = users.create(payload.into()).await?;

    info!(
        caller_id = caller.id,
        caller_role = %caller.role,
        user_id = ?user.id,
        "user created"
    );

    Ok(HttpResponse::Ok().json(Envelope::success(user)))
}

#[put("/{id}")]
async fn update_user(
    caller: AuthenticatedUser,
    users: web::Data<UserService>,
    path: web::Path<i64>,
    payload: web::Json<UserRequest>,
) -> Result<HttpResponse, DomainError> {
    let id = path.into_inner();
    let payload = payload.into_inner();
    payload.validate()?;

    let user = users.update(id, payload.into()).await?;

    info!(
        caller_id = caller.id,
        caller_role = %caller.role,
        user_id = id,
        "user updated"
    );

    Ok(HttpResponse::Ok().json(Envelope::success(user)))
}

#[delete("/{id}")]
async fn delete_user(
    caller: AuthenticatedUser,
    users: web::Data<UserService>,
    path: web::Path<i64>,
) -> Result<HttpResponse, DomainError> {
    let id = path.into_inner();
    users.delete(id).await?;

    info!(
        caller_id = caller.id,
        caller_role = %caller.role,
        user_id = id,
        "user deleted"
    );

    Ok(HttpResponse::Ok().json(Envelope::<()>::empty()))
}
