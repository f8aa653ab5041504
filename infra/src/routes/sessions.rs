use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use secrecy::ExposeSecret as _;
use serde::Serialize;
use time::OffsetDateTime;

use domain::DomainResult;
use use_cases::auth::{authenticate_user, SessionView};
use use_cases::jwt::issue_session_token;

use crate::routes::extractors::Authenticated;
use crate::routes::{respond, ApiResponse, ProcessRequestResult};
use crate::RequestContext;

/// 認証スコープを返却する。
pub fn auth_scope() -> actix_web::Scope {
    web::scope("/auth")
        .service(web::resource("/sessions").route(web::post().to(create_session)))
        .service(web::resource("/session").route(web::get().to(current_session)))
}

/// セッション作成レスポンス・ボディ
#[derive(Debug, Clone, Serialize)]
pub struct CreatedSession {
    /// セッション
    pub session: SessionView,
    /// セッション・トークン
    pub token: String,
}

/// セッション作成
///
/// ```json
/// {"email": "admin@example.com", "password": "admin-password"}
/// ```
#[tracing::instrument(name = "create session", skip_all)]
pub async fn create_session(
    context: web::Data<RequestContext>,
    body: web::Bytes,
) -> ProcessRequestResult<HttpResponse> {
    let result = issue(&context, &body).await;

    respond(result, StatusCode::CREATED, "create_session")
}

async fn issue(context: &RequestContext, body: &[u8]) -> DomainResult<CreatedSession> {
    let auth = authenticate_user(body, context.credential_repository()).await?;
    let token = issue_session_token(
        auth.user(),
        OffsetDateTime::now_utc(),
        &context.authorization.jwt_token_secret,
    )?;

    Ok(CreatedSession {
        session: SessionView::from(&auth),
        token: token.expose_secret().to_string(),
    })
}

/// 現在のセッション
#[tracing::instrument(name = "current session", skip_all)]
pub async fn current_session(Authenticated(auth): Authenticated) -> ApiResponse<SessionView> {
    ApiResponse::new(SessionView::from(&auth))
}
