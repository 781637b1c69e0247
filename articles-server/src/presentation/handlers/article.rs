use actix_web::{HttpResponse, Scope, delete, get, post, put, web};
use tracing::info;

use crate::application::article_service::ArticleService;
use crate::domain::error::DomainError;
use crate::presentation::dto::{ArticleRequest, Envelope};
use crate::presentation::utils::AuthenticatedUser;

/// Mutating routes; mounted behind the JWT middleware.
pub fn scope() -> Scope {
    web::scope("/articles")
        .service(create_article)
        .service(update_article)
        .service(delete_article)
}

#[get("/articles")]
pub async fn get_articles(
    articles: web::Data<ArticleService>,
) -> Result<HttpResponse, DomainError> {
    let list = articles.list_all().await?;
    Ok(HttpResponse::Ok().json(Envelope::success(list)))
}

#[get("/articles/{id}")]
pub async fn get_article(
    articles: web::Data<ArticleService>,
    path: web::Path<i64>,
) -> Result<HttpResponse, DomainError> {
    let article = articles.get_by_id(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(Envelope::success(article)))
}

#[post("")]
async fn create_article(
    user: AuthenticatedUser,
    articles: web::Data<ArticleService>,
    payload: web::Json<ArticleRequest>,
) -> Result<HttpResponse, DomainError> {
    let payload = payload.into_inner();
    payload.validate()?;

    let article = articles.create(payload.into()).await?;

    info!(
        user_id = user.id,
        role = %user.role,
        article_id = ?article.id,
        "article created"
    );

    Ok(HttpResponse::Ok().json(Envelope::success(article)))
}

#[put("/{id}")]
async fn update_article(
    user: AuthenticatedUser,
    articles: web::Data<ArticleService>,
    path: web::Path<i64>,
    payload: web::Json<ArticleRequest>,
) -> Result<HttpResponse, DomainError> {
    let id = path.into_inner();
    let payload = payload.into_inner();
    payload.validate()?;

    let article = articles.update(id, payload.into()).await?;

    info!(
        user_id = user.id,
        role = %user.role,
        article_id = id,
        "article updated"
    );

    Ok(HttpResponse::Ok().json(Envelope::success(article)))
}

#[delete("/{id}")]
async fn delete_article(
    user: AuthenticatedUser,
    articles: web::Data<ArticleService>,
    path: web::Path<i64>,
) -> Result<HttpResponse, DomainError> {
    let id = path.into_inner();
    articles.delete(id).await?;

    info!(
        user_id = user.id,
        role = %user.role,
        article_id = id,
        "article deleted"
    );

    Ok(HttpResponse::Ok().json(Envelope::<()>::empty()))
}
