use std::future::{Ready, ready};
use std::rc::Rc;
use std::task::{Context, Poll};
use std::time::Instant;

use actix_service::{Service, Transform};
use actix_web::body::EitherBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header::{AUTHORIZATION, HeaderName, HeaderValue};
use actix_web::{Error, HttpMessage, web};
use futures_util::future::LocalBoxFuture;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::application::auth_service::AuthService;
use crate::domain::error::DomainError;
use crate::infrastructure::security::JwtKeys;
use crate::presentation::utils::{AuthenticatedUser, extract_user_from_token};

static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
static TIMING_HEADER: HeaderName = HeaderName::from_static("server-timing");

const MAX_REQUEST_ID_LEN: usize = 64;

/// Outermost request wrapper.
///
/// Assigns the request id (reusing a sane incoming `x-request-id`), runs the
/// rest of the chain inside a `request` span carrying it, and turns errors
/// raised by inner middleware into responses so every reply gets the
/// `x-request-id` and `server-timing` headers plus one "request completed" log.
pub struct RequestTracing;

impl<S, B> Transform<S, ServiceRequest> for RequestTracing
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestTracingService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestTracingService { service }))
    }
}

pub struct RequestTracingService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestTracingService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let started = Instant::now();
        let request_id = incoming_request_id(&req).unwrap_or_else(|| Uuid::new_v4().to_string());
        let span = info_span!(
            "request",
            request_id = %request_id,
            method = %req.method(),
            path = %req.path(),
        );

        let http_req = req.request().clone();
        let fut = span.in_scope(|| self.service.call(req));

        Box::pin(
            async move {
                let mut res = match fut.await {
                    Ok(res) => res.map_into_left_body(),
                    Err(err) => ServiceResponse::from_err(err, http_req).map_into_right_body(),
                };

                let elapsed_ms = started.elapsed().as_millis() as u64;
                info!(status = res.status().as_u16(), elapsed_ms, "request completed");

                let headers = res.response_mut().headers_mut();
                if let Ok(value) = HeaderValue::from_str(&request_id) {
                    headers.insert(REQUEST_ID_HEADER.clone(), value);
                }
                if let Ok(value) = HeaderValue::from_str(&format!("app;dur={}", elapsed_ms)) {
                    headers.insert(TIMING_HEADER.clone(), value);
                }
                Ok(res)
            }
            .instrument(span),
        )
    }
}

fn incoming_request_id(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_owned)
}

/// Requires `Authorization: Bearer <token>` and stores the resolved
/// [`AuthenticatedUser`] in the request extensions. Rejections are answered
/// here with a 401 envelope.
pub struct JwtAuthMiddleware {
    keys: JwtKeys,
}

impl JwtAuthMiddleware {
    pub fn new(keys: JwtKeys) -> Self {
        Self { keys }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtAuthService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthService {
            service: Rc::new(service),
            keys: self.keys.clone(),
        }))
    }
}

pub struct JwtAuthService<S> {
    service: Rc<S>,
    keys: JwtKeys,
}

impl<S, B> Service<ServiceRequest> for JwtAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let keys = self.keys.clone();
        let service = Rc::clone(&self.service);
        let auth_service = req.app_data::<web::Data<AuthService>>().cloned();
        let auth_header = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        Box::pin(async move {
            match authenticate(&keys, auth_service, auth_header).await {
                Ok(user) => {
                    req.extensions_mut().insert(user);
                    service
                        .call(req)
                        .await
                        .map(|res| res.map_into_left_body())
                }
                Err(err) => {
                    warn!(error = %err, "rejected request");
                    Ok(req.error_response(err).map_into_right_body())
                }
            }
        })
    }
}

async fn authenticate(
    keys: &JwtKeys,
    auth_service: Option<web::Data<AuthService>>,
    auth_header: Option<String>,
) -> Result<AuthenticatedUser, DomainError> {
    let auth_service =
        auth_service.ok_or_else(|| DomainError::Internal("AuthService missing".into()))?;

    let header = auth_header.ok_or_else(|| {
        DomainError::Unauthorized("Full authentication is required to access this resource".into())
    })?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| DomainError::Unauthorized("invalid authorization header".into()))?;

    extract_user_from_token(token, keys, auth_service.get_ref()).await
}
