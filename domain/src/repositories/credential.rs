use async_trait::async_trait;

use crate::models::credentials::Credentials;
use crate::models::session::UserSession;
use crate::outcome::DomainResult;

/// 認証情報リポジトリ
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// 認証情報を検証して、新しいユーザー・セッションを返す。
    ///
    /// Eメール・アドレスが登録されていない場合とパスワードが一致しない場合は、区別せずに
    /// 理由が`invalid_credentials`の認証エラーを返す。
    ///
    /// # 引数
    ///
    /// * `credentials` - 認証情報
    ///
    /// # 戻り値
    ///
    /// ユーザー・セッション
    async fn verify(&self, credentials: &Credentials) -> DomainResult<UserSession>;
}
