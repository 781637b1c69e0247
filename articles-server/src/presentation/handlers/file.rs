use actix_web::http::header::CONTENT_TYPE;
use actix_web::{HttpRequest, HttpResponse, Scope, post, web};
use tracing::info;

use crate::application::file_service::FileService;
use crate::domain::error::DomainError;
use crate::presentation::dto::{Envelope, UploadQuery};
use crate::presentation::utils::AuthenticatedUser;

pub fn scope() -> Scope {
    web::scope("/files").service(upload_file)
}

#[post("/upload")]
async fn upload_file(
    req: HttpRequest,
    caller: AuthenticatedUser,
    files: web::Data<FileService>,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> Result<HttpResponse, DomainError> {
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());

    let uploaded = files.upload(&query.filename, content_type, &body).await?;

    info!(
        caller_id = caller.id,
        caller_role = %caller.role,
        object = %uploaded.object,
        "file stored"
    );

    Ok(HttpResponse::Ok().json(Envelope::success(uploaded)))
}
