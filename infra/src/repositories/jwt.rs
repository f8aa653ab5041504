use async_trait::async_trait;
use secrecy::SecretString;

use domain::models::session::UserSession;
use domain::repositories::session::SessionRepository;
use domain::DomainResult;
use use_cases::jwt::decode_session_token;

/// JWTセッション・リポジトリ
///
/// セッション・トークンに記録されたユーザー・セッションを、署名を検証して取り出す。
pub struct JwtSessionRepository {
    /// JWTを生成するときの秘密鍵
    secret_key: SecretString,
}

impl JwtSessionRepository {
    /// JWTセッション・リポジトリを構築する。
    ///
    /// # 引数
    ///
    /// * `secret_key` - JWTを生成するときの秘密鍵
    ///
    /// # 戻り値
    ///
    /// JWTセッション・リポジトリ
    pub fn new(secret_key: SecretString) -> Self {
        Self { secret_key }
    }
}

#[async_trait]
impl SessionRepository for JwtSessionRepository {
    async fn find_session(&self, token: &SecretString) -> DomainResult<UserSession> {
        decode_session_token(token, &self.secret_key)
    }
}
