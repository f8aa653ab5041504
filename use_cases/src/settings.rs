use secrecy::{ExposeSecret as _, SecretString};

use domain::{DomainError, DomainResult};

/// パスワード設定
#[derive(Debug, Clone, serde::Deserialize)]
pub struct PasswordSettings {
    /// ペッパー
    pub pepper: SecretString,
    /// パスワードをハッシュ化するときのメモリサイズ
    pub hash_memory: u32,
    /// パスワードをハッシュ化するときの反復回数
    pub hash_iterations: u32,
    /// パスワードをハッシュ化するときの並列度
    pub hash_parallelism: u32,
}

/// 認証設定
#[derive(Debug, Clone, serde::Deserialize)]
pub struct AuthorizationSettings {
    /// JWTを生成するときの秘密鍵
    pub jwt_token_secret: SecretString,
    /// セッションの有効期限（秒）
    pub session_seconds: u64,
}

impl AuthorizationSettings {
    /// 認証設定を検証する。
    pub fn validate(&self) -> DomainResult<()> {
        if self.jwt_token_secret.expose_secret().is_empty() {
            tracing::error!("{} ({}:{})", EMPTY_JWT_TOKEN_SECRET, file!(), line!());
            return Err(DomainError::configuration(
                AUTHORIZATION_COMPONENT,
                EMPTY_JWT_TOKEN_SECRET,
            ));
        }
        if self.session_seconds == 0 {
            tracing::error!("{} ({}:{})", ZERO_SESSION_SECONDS, file!(), line!());
            return Err(DomainError::configuration(
                AUTHORIZATION_COMPONENT,
                ZERO_SESSION_SECONDS,
            ));
        }

        Ok(())
    }
}

const AUTHORIZATION_COMPONENT: &str = "authorization";
const EMPTY_JWT_TOKEN_SECRET: &str = "JWT token secret must not be empty";
const ZERO_SESSION_SECONDS: &str = "session seconds must be greater than zero";
