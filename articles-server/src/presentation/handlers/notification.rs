use actix_web::{HttpResponse, Scope, post, web};
use tracing::info;

use crate::application::notification_service::NotificationService;
use crate::domain::error::DomainError;
use crate::presentation::dto::{EmailNotificationQuery, Envelope};
use crate::presentation::utils::AuthenticatedUser;

pub fn scope() -> Scope {
    web::scope("/notifications").service(send_email)
}

/// Responds as soon as delivery is queued.
#[post("/email")]
async fn send_email(
    caller: AuthenticatedUser,
    notifications: web::Data<NotificationService>,
    query: web::Query<EmailNotificationQuery>,
) -> Result<HttpResponse, DomainError> {
    let EmailNotificationQuery { to, subject, body } = query.into_inner();
    notifications.send_email(to, subject, body)?;

    info!(
        caller_id = caller.id,
        caller_role = %caller.role,
        "email notification accepted"
    );

    Ok(HttpResponse::Ok().json(Envelope::<()>::notice(
        "Email sent successfully processed on background",
    )))
}
