use std::future::Future;

use secrecy::SecretString;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use domain::error::FieldIssue;
use domain::models::credentials::{Credentials, CredentialsPayload};
use domain::models::session::{AuthContext, Role, UserSession};
use domain::models::token::{AuthToken, TokenType};
use domain::models::{TenantId, UserId};
use domain::repositories::credential::CredentialRepository;
use domain::repositories::session::{ApiKeyRepository, SessionRepository};
use domain::validation::validate;
use domain::{AuthenticationFailure, DomainError, DomainResult};

/// 認証情報でログインしたセッションのセッションIDの接頭辞
pub const SESSION_PREFIX: &str = "sess";
/// APIキーで認証したセッションのセッションIDの接頭辞
pub const API_KEY_PREFIX: &str = "api";
/// トークンで認証したセッションのセッションIDの接頭辞
pub const TOKEN_PREFIX: &str = "token";

/// 要求に含まれていた認証情報
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestCredentials<'a> {
    /// `Authorization`ヘッダの値
    pub authorization: Option<&'a str>,
    /// `x-api-key`ヘッダの値
    pub api_key: Option<&'a str>,
}

/// 認証オプション
#[derive(Debug, Clone, Default)]
pub struct AuthOptions {
    /// APIキーによる認証を許可するか
    pub allow_api_key: bool,
    /// 要求する権限
    pub required_permissions: Vec<String>,
}

/// 認証に使用するリポジトリ
#[derive(Clone, Copy, Default)]
pub struct AuthServices<'a> {
    /// セッション・リポジトリ
    pub sessions: Option<&'a dyn SessionRepository>,
    /// APIキー・リポジトリ
    pub api_keys: Option<&'a dyn ApiKeyRepository>,
}

/// `Authorization`ヘッダの値から認証トークンを取り出す。
///
/// ヘッダの値は、認証スキームとトークンを1つの空白で区切った形式でなければならない。
/// 認証スキームは`bearer`、`session`または`api`で、大文字と小文字を区別しない。
///
/// # 引数
///
/// * `header` - `Authorization`ヘッダの値
///
/// # 戻り値
///
/// 認証トークン
pub fn extract_auth_token(header: Option<&str>) -> DomainResult<AuthToken> {
    let header = header.ok_or_else(|| {
        DomainError::authentication_with_message(
            AuthenticationFailure::MissingToken,
            AUTHORIZATION_HEADER_REQUIRED,
        )
    })?;
    // "<scheme> <token>"の形式で、空白は1つのみ
    let parts: Vec<&str> = header.split(' ').collect();
    let (scheme, token) = match parts.as_slice() {
        [scheme, token] if !scheme.is_empty() && !token.is_empty() => (*scheme, *token),
        _ => {
            return Err(DomainError::authentication_with_message(
                AuthenticationFailure::InvalidToken,
                INVALID_AUTHORIZATION_HEADER,
            ))
        }
    };

    Ok(AuthToken {
        token: SecretString::new(token.to_string()),
        token_type: TokenType::try_from(scheme)?,
    })
}

/// 要求の本体から認証情報を取り出して検証する。
///
/// # 引数
///
/// * `body` - 要求の本体
///
/// # 戻り値
///
/// 認証情報
pub fn parse_credentials(body: &[u8]) -> DomainResult<Credentials> {
    let payload = serde_json::from_slice::<CredentialsPayload>(body).map_err(|e| {
        tracing::warn!("{} ({}:{})", e, file!(), line!());
        DomainError::validation_with_details(
            CREDENTIALS_UNPARSABLE,
            None,
            vec![FieldIssue::new(vec![], e.to_string(), "invalid_json")],
        )
    })?;
    let payload = validate(payload).map_err(|e| match e {
        DomainError::Validation { field, details, .. } => {
            DomainError::validation_with_details(INVALID_CREDENTIALS_FORMAT, field, details)
        }
        other => other,
    })?;

    Ok(Credentials::from(payload))
}

/// ユーザー・セッションの有効期限が切れていないか確認する。
pub fn validate_session(session: UserSession) -> DomainResult<UserSession> {
    validate_session_at(session, OffsetDateTime::now_utc())
}

/// 指定した日時で、ユーザー・セッションの有効期限が切れていないか確認する。
///
/// 有効期限と同じ日時は有効とする。
///
/// # 引数
///
/// * `session` - ユーザー・セッション
/// * `now` - 確認する日時
///
/// # 戻り値
///
/// 有効なユーザー・セッション
pub fn validate_session_at(session: UserSession, now: OffsetDateTime) -> DomainResult<UserSession> {
    if session.expires_at < now {
        return Err(DomainError::authentication_with_message(
            AuthenticationFailure::Expired,
            SESSION_EXPIRED,
        ));
    }

    Ok(session)
}

/// 要求する権限をすべて持っているか確認する。
///
/// 持っていない場合は、不足している権限のみを記録した認可エラーを返す。
///
/// # 引数
///
/// * `granted` - ユーザーが持っている権限
/// * `required` - 要求する権限
pub fn check_permissions<S: AsRef<str>>(granted: &[String], required: &[S]) -> DomainResult<()> {
    let missing: Vec<String> = required
        .iter()
        .map(|p| p.as_ref())
        .filter(|p| !granted.iter().any(|g| g.as_str() == *p))
        .map(String::from)
        .collect();
    if missing.is_empty() {
        return Ok(());
    }

    Err(DomainError::authorization(
        format!("Insufficient permissions. Missing: {}", missing.join(", ")),
        missing,
    ))
}

/// ユーザーが所属するテナントと、要求されたテナントが一致するか確認する。
pub fn validate_tenant_access(user_tenant: &TenantId, requested_tenant: &TenantId) -> DomainResult<()> {
    if user_tenant != requested_tenant {
        return Err(DomainError::authorization(
            "Cannot access different tenant",
            vec![String::from("tenant_access")],
        ));
    }

    Ok(())
}

/// ユーザーのロールが、許可されたロールに含まれるか確認する。
pub fn check_role(session: &UserSession, allowed_roles: &[Role]) -> DomainResult<()> {
    if allowed_roles.contains(&session.role) {
        return Ok(());
    }

    Err(DomainError::authorization_for_user(
        format!(
            "User role '{}' is not authorized for this operation",
            session.role
        ),
        allowed_roles.iter().map(|r| r.to_string()).collect(),
        session.user_id.to_string(),
    ))
}

/// ユーザーがリソースの所有者であるか確認する。
pub fn check_resource_ownership(session: &UserSession, owner_id: &UserId) -> DomainResult<()> {
    if session.user_id != *owner_id {
        return Err(DomainError::authorization_for_user(
            "User does not have permission to access this resource",
            vec![String::from("resource_access")],
            session.user_id.to_string(),
        ));
    }

    Ok(())
}

/// 接頭辞を付けたセッションIDを生成する。
pub fn new_session_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

/// 認証情報でユーザーを認証する。
///
/// # 引数
///
/// * `body` - 認証情報を含む要求の本体
/// * `repository` - 認証情報リポジトリ
///
/// # 戻り値
///
/// 認証コンテキスト
#[tracing::instrument(name = "authenticate user use case", skip_all)]
pub async fn authenticate_user(
    body: &[u8],
    repository: &dyn CredentialRepository,
) -> DomainResult<AuthContext> {
    let credentials = parse_credentials(body)?;
    let session = repository.verify(&credentials).await?;
    let session = validate_session(session)?;

    Ok(AuthContext::new(session, new_session_id(SESSION_PREFIX)))
}

/// APIキーでユーザーを認証する。
///
/// # 引数
///
/// * `api_key` - `x-api-key`ヘッダの値
/// * `repository` - APIキー・リポジトリ
///
/// # 戻り値
///
/// 認証コンテキスト
#[tracing::instrument(name = "validate api key use case", skip_all)]
pub async fn validate_api_key(
    api_key: Option<&str>,
    repository: &dyn ApiKeyRepository,
) -> DomainResult<AuthContext> {
    let api_key = api_key.ok_or_else(|| {
        DomainError::authentication_with_message(
            AuthenticationFailure::MissingToken,
            API_KEY_REQUIRED,
        )
    })?;
    let session = repository
        .find_by_api_key(&SecretString::new(api_key.to_string()))
        .await?;

    Ok(AuthContext::new(session, new_session_id(API_KEY_PREFIX)))
}

/// 要求に含まれていた認証情報から、認証コンテキストを取得する。
///
/// APIキーによる認証が許可されていて、APIキーが送信されている場合は、APIキーで認証する。
/// それ以外の場合は、`Authorization`ヘッダのトークンで認証する。
///
/// # 引数
///
/// * `credentials` - 要求に含まれていた認証情報
/// * `options` - 認証オプション
/// * `services` - 認証に使用するリポジトリ
///
/// # 戻り値
///
/// 認証コンテキスト
#[tracing::instrument(
    name = "get user context use case",
    skip_all,
    fields(allow_api_key = options.allow_api_key)
)]
pub async fn get_user_context(
    credentials: &RequestCredentials<'_>,
    options: &AuthOptions,
    services: &AuthServices<'_>,
) -> DomainResult<AuthContext> {
    if options.allow_api_key {
        if let (Some(api_keys), Some(api_key)) = (services.api_keys, credentials.api_key) {
            return validate_api_key(Some(api_key), api_keys).await;
        }
    }

    let sessions = services.sessions.ok_or_else(|| {
        tracing::error!("{} ({}:{})", TOKEN_VERIFIER_REQUIRED, file!(), line!());
        DomainError::configuration("validate_token", TOKEN_VERIFIER_REQUIRED)
    })?;
    let token = extract_auth_token(credentials.authorization)?;
    let session = sessions.find_session(&token.token).await?;
    let session = validate_session(session)?;
    tracing::debug!(token_type = %token.token_type, "session token accepted");

    Ok(AuthContext::new(session, new_session_id(TOKEN_PREFIX)))
}

/// 認証して、要求する権限を持っている場合のみハンドラを呼び出す。
///
/// # 引数
///
/// * `credentials` - 要求に含まれていた認証情報
/// * `options` - 認証オプション
/// * `services` - 認証に使用するリポジトリ
/// * `handler` - 認証コンテキストを受け取るハンドラ
///
/// # 戻り値
///
/// ハンドラの結果
pub async fn with_auth<T, F, Fut>(
    credentials: &RequestCredentials<'_>,
    options: &AuthOptions,
    services: &AuthServices<'_>,
    handler: F,
) -> DomainResult<T>
where
    F: FnOnce(AuthContext) -> Fut,
    Fut: Future<Output = DomainResult<T>>,
{
    let context = get_user_context(credentials, options, services).await?;
    if !options.required_permissions.is_empty() {
        check_permissions(&context.user().permissions, &options.required_permissions)?;
    }

    handler(context).await
}

/// セッションの応答
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    /// セッションID
    pub session_id: String,
    /// ユーザー
    pub user: SessionUserView,
    /// 有効期限
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

/// セッションの応答に含めるユーザー
#[derive(Debug, Clone, Serialize)]
pub struct SessionUserView {
    /// ユーザーID
    pub id: UserId,
    /// Eメール・アドレス
    pub email: String,
    /// ロール
    pub role: Role,
    /// 権限
    pub permissions: Vec<String>,
}

impl From<&AuthContext> for SessionView {
    fn from(context: &AuthContext) -> Self {
        let user = context.user();
        Self {
            session_id: context.session_id().to_string(),
            user: SessionUserView {
                id: user.user_id,
                email: user.email.clone(),
                role: user.role,
                permissions: user.permissions.clone(),
            },
            expires_at: user.expires_at,
        }
    }
}

const AUTHORIZATION_HEADER_REQUIRED: &str = "Authorization header is required";
const INVALID_AUTHORIZATION_HEADER: &str = "Invalid authorization header format";
const CREDENTIALS_UNPARSABLE: &str = "Failed to parse credentials";
const INVALID_CREDENTIALS_FORMAT: &str = "Invalid credentials format";
const SESSION_EXPIRED: &str = "Session has expired";
const API_KEY_REQUIRED: &str = "API key is required";
const TOKEN_VERIFIER_REQUIRED: &str = "Token validation function is required";
