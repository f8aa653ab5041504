use async_trait::async_trait;
use secrecy::SecretString;

use crate::models::session::UserSession;
use crate::outcome::DomainResult;

/// セッション・リポジトリ
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// トークンからユーザー・セッションを取得する。
    ///
    /// トークンを検証できない場合は、理由が`invalid_token`の認証エラーを返す。
    /// ユーザー・セッションの有効期限は確認しない。
    ///
    /// # 引数
    ///
    /// * `token` - トークン
    ///
    /// # 戻り値
    ///
    /// ユーザー・セッション
    async fn find_session(&self, token: &SecretString) -> DomainResult<UserSession>;
}

/// APIキー・リポジトリ
#[async_trait]
pub trait ApiKeyRepository: Send + Sync {
    /// APIキーからユーザー・セッションを取得する。
    ///
    /// # 引数
    ///
    /// * `api_key` - APIキー
    ///
    /// # 戻り値
    ///
    /// ユーザー・セッション
    async fn find_by_api_key(&self, api_key: &SecretString) -> DomainResult<UserSession>;
}
