use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;

use domain::models::session::Role;
use domain::models::{TenantId, UserId};
use use_cases::auth::{validate_tenant_access, with_auth, AuthOptions};

use crate::routes::extractors::{request_context, request_credentials};
use crate::routes::{respond, ProcessRequestResult};

/// テナントの閲覧に必要な権限
pub const TENANTS_READ: &str = "tenants:read";

/// テナント・スコープを返却する。
pub fn tenants_scope() -> actix_web::Scope {
    web::scope("/tenants")
        .service(web::resource("/{tenant_id}/access").route(web::get().to(tenant_access)))
}

/// テナント・アクセス・レスポンス・ボディ
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantAccess {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub role: Role,
    pub granted: bool,
}

/// テナント・アクセス確認
///
/// 認証したユーザーが`tenants:read`権限を持ち、パスで指定されたテナントに所属しているか確認する。
#[tracing::instrument(name = "tenant access", skip(request))]
pub async fn tenant_access(
    request: HttpRequest,
    path: web::Path<String>,
) -> ProcessRequestResult<HttpResponse> {
    let context = request_context(&request)?;
    let options = AuthOptions {
        allow_api_key: true,
        required_permissions: vec![String::from(TENANTS_READ)],
    };
    let tenant_id = path.into_inner();
    let result = with_auth(
        &request_credentials(&request),
        &options,
        &context.auth_services(),
        |auth| async move {
            let requested = TenantId::try_from(tenant_id.as_str())?;
            let user = auth.user();
            validate_tenant_access(&user.tenant_id, &requested)?;

            Ok(TenantAccess {
                tenant_id: requested,
                user_id: user.user_id,
                role: user.role,
                granted: true,
            })
        },
    )
    .await;

    respond(result, StatusCode::OK, "tenant_access")
}
