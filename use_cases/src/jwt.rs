use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use jwt::{SignWithKey as _, VerifyWithKey as _};
use secrecy::{ExposeSecret as _, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use time::OffsetDateTime;
use validator::Validate;

use domain::models::session::{Role, UserSession};
use domain::models::{TenantId, UserId};
use domain::validation::validate_field;
use domain::{AuthenticationFailure, DomainError, DomainResult};

type HmacKey = Hmac<Sha256>;

/// セッション・トークンのペイロード
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SessionClaims {
    /// ユーザーID
    pub sub: UserId,
    /// Eメール・アドレス
    #[validate(email)]
    pub email: String,
    /// テナントID
    pub tenant_id: TenantId,
    /// ロール
    pub role: Role,
    /// 権限
    pub permissions: Vec<String>,
    /// 発行日時を示すUNIXエポック秒
    pub iat: i64,
    /// 有効期限を示すUNIXエポック秒
    pub exp: i64,
}

impl SessionClaims {
    /// ユーザー・セッションからペイロードを構築する。
    pub fn new(session: &UserSession, issued_at: OffsetDateTime) -> Self {
        Self {
            sub: session.user_id,
            email: session.email.clone(),
            tenant_id: session.tenant_id,
            role: session.role,
            permissions: session.permissions.clone(),
            iat: issued_at.unix_timestamp(),
            exp: session.expires_at.unix_timestamp(),
        }
    }
}

/// ユーザー・セッションを記録したセッション・トークンを発行する。
///
/// # 引数
///
/// * `session` - ユーザー・セッション
/// * `issued_at` - 発行日時
/// * `secret_key` - JWTを生成するときの秘密鍵
///
/// # 戻り値
///
/// セッション・トークン
pub fn issue_session_token(
    session: &UserSession,
    issued_at: OffsetDateTime,
    secret_key: &SecretString,
) -> DomainResult<SecretString> {
    let key = generate_hmac_key(secret_key)?;
    let token = SessionClaims::new(session, issued_at)
        .sign_with_key(&key)
        .map_err(|e| {
            tracing::error!("{} ({}:{})", e, file!(), line!());
            DomainError::configuration(JWT_COMPONENT, e.to_string())
        })?;

    Ok(SecretString::new(token))
}

/// セッション・トークンを検証して、ユーザー・セッションを取り出す。
///
/// 署名を検証できない場合と、トークンを解析できない場合は、理由が`invalid_token`の認証エラーを返す。
/// 署名を検証した後で、ペイロードの構造が誤っている場合は、検証エラーを返す。
/// 発行日時が有効期限以降の場合は、理由が`expired`の認証エラーを返す。
/// 有効期限が現在の日時より前であるかは確認しない。
///
/// # 引数
///
/// * `token` - セッション・トークン
/// * `secret_key` - JWTを生成するときの秘密鍵
///
/// # 戻り値
///
/// ユーザー・セッション
pub fn decode_session_token(
    token: &SecretString,
    secret_key: &SecretString,
) -> DomainResult<UserSession> {
    let key = generate_hmac_key(secret_key)?;
    // 署名を検証するまで、ペイロードの構造を解釈しない
    let claims: BTreeMap<String, serde_json::Value> = token
        .expose_secret()
        .as_str()
        .verify_with_key(&key)
        .map_err(|e| {
            tracing::warn!("{} ({}:{})", e, file!(), line!());
            DomainError::authentication_with_message(
                AuthenticationFailure::InvalidToken,
                INVALID_TOKEN,
            )
        })?;
    let claims: SessionClaims =
        serde_json::from_value(serde_json::Value::Object(claims.into_iter().collect())).map_err(
            |e| {
                tracing::warn!("{} ({}:{})", e, file!(), line!());
                invalid_payload_error()
            },
        )?;
    let claims = validate_field(claims, Some(PAYLOAD_FIELD))?;
    if claims.exp <= claims.iat {
        tracing::warn!("{} ({}:{})", TOKEN_EXPIRED, file!(), line!());
        return Err(DomainError::authentication_with_message(
            AuthenticationFailure::Expired,
            TOKEN_EXPIRED,
        ));
    }
    let expires_at = OffsetDateTime::from_unix_timestamp(claims.exp).map_err(|e| {
        tracing::warn!("{} ({}:{})", e, file!(), line!());
        invalid_payload_error()
    })?;

    Ok(UserSession {
        user_id: claims.sub,
        email: claims.email,
        tenant_id: claims.tenant_id,
        role: claims.role,
        permissions: claims.permissions,
        expires_at,
    })
}

fn generate_hmac_key(secret_key: &SecretString) -> DomainResult<HmacKey> {
    Hmac::new_from_slice(secret_key.expose_secret().as_bytes()).map_err(|e| {
        tracing::error!("{} ({}:{})", e, file!(), line!());
        DomainError::configuration(JWT_COMPONENT, "HMAC key could not be built from the secret")
    })
}

fn invalid_payload_error() -> DomainError {
    DomainError::validation_with_details(
        INVALID_PAYLOAD,
        Some(String::from(PAYLOAD_FIELD)),
        vec![],
    )
}

const JWT_COMPONENT: &str = "jwt";
const PAYLOAD_FIELD: &str = "payload";
const INVALID_TOKEN: &str = "Invalid or malformed authentication token";
const INVALID_PAYLOAD: &str = "Invalid JWT payload structure";
const TOKEN_EXPIRED: &str = "JWT token has expired";
