use actix_cors::Cors;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{App, HttpResponse, HttpServer, Responder, web};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::application::article_service::ArticleService;
use crate::application::auth_service::AuthService;
use crate::application::file_service::FileService;
use crate::application::notification_service::NotificationService;
use crate::application::user_service::UserService;
use crate::domain::error::DomainError;
use crate::infrastructure::config::AppConfig;
use crate::presentation::dto::Envelope;
use crate::presentation::handlers;
use crate::presentation::middleware::{JwtAuthMiddleware, RequestTracing};

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub articles: ArticleService,
    pub users: UserService,
    pub auth: AuthService,
    pub notifications: NotificationService,
    pub files: FileService,
}

/// Registers shared services, extractor error mapping and the `/api/v1` routes.
pub fn configure(cfg: &mut web::ServiceConfig, state: &AppState) {
    let keys = state.auth.keys().clone();

    cfg.app_data(web::Data::new(state.articles.clone()))
        .app_data(web::Data::new(state.users.clone()))
        .app_data(web::Data::new(state.auth.clone()))
        .app_data(web::Data::new(state.notifications.clone()))
        .app_data(web::Data::new(state.files.clone()))
        .app_data(web::JsonConfig::default().error_handler(|err, _| {
            DomainError::SchemaInvalid(err.to_string()).into()
        }))
        .app_data(web::PathConfig::default().error_handler(|err, _| {
            DomainError::SchemaInvalid(format!("invalid path parameter: {}", err)).into()
        }))
        .app_data(web::QueryConfig::default().error_handler(|err, _| {
            DomainError::SchemaInvalid(err.to_string()).into()
        }))
        .app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES))
        .service(
            web::scope("/api/v1")
                .route("/health", web::get().to(health))
                .service(handlers::auth::scope())
                .service(handlers::article::get_articles)
                .service(handlers::article::get_article)
                .service(
                    handlers::article::scope().wrap(JwtAuthMiddleware::new(keys.clone())),
                )
                .service(handlers::user::scope().wrap(JwtAuthMiddleware::new(keys.clone())))
                .service(
                    handlers::notification::scope().wrap(JwtAuthMiddleware::new(keys.clone())),
                )
                .service(handlers::file::scope().wrap(JwtAuthMiddleware::new(keys))),
        );
}

pub async fn start_rest_server(config: &AppConfig, state: AppState) -> anyhow::Result<()> {
    let bind_address = (config.host.clone(), config.port);
    let cors_origins = config.cors_origins.clone();

    info!(host = %bind_address.0, port = bind_address.1, "HTTP server starting");

    HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(Logger::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("Referrer-Policy", "no-referrer"))
                    .add(("Permissions-Policy", "geolocation=()"))
                    .add(("Cross-Origin-Opener-Policy", "same-origin")),
            )
            .wrap(build_cors(&cors_origins))
            .wrap(RequestTracing)
            .configure(move |cfg| configure(cfg, &state))
            .default_service(web::to(not_found))
    })
    .bind(bind_address)?
    .run()
    .await?;

    info!("HTTP server stopped");
    Ok(())
}

fn build_cors(origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allowed_headers(vec![
            actix_web::http::header::CONTENT_TYPE,
            actix_web::http::header::AUTHORIZATION,
        ])
        .max_age(3600);

    // credentials cannot be combined with a wildcard origin
    if origins.iter().any(|origin| origin == "*") {
        return cors.allow_any_origin();
    }

    origins
        .iter()
        .fold(cors.supports_credentials(), |cors, origin| {
            cors.allowed_origin(origin)
        })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
    })
}

pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(Envelope::<()>::error("Route not found"))
}
