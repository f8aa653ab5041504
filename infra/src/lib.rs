pub mod repositories;
pub mod routes;

use std::sync::Arc;

use configurations::settings::AppSettings;
use domain::repositories::credential::CredentialRepository;
use domain::DomainResult;
use repositories::jwt::JwtSessionRepository;
use repositories::memory::{InMemoryApiKeyRepository, InMemoryCredentialRepository};
use use_cases::auth::AuthServices;
use use_cases::settings::AuthorizationSettings;

/// リクエスト・コンテキスト
#[derive(Clone)]
pub struct RequestContext {
    /// 認証設定
    pub authorization: AuthorizationSettings,
    /// セッション・リポジトリ
    sessions: Arc<JwtSessionRepository>,
    /// APIキー・リポジトリ
    api_keys: Arc<InMemoryApiKeyRepository>,
    /// 認証情報リポジトリ
    credentials: Arc<InMemoryCredentialRepository>,
}

impl RequestContext {
    /// アプリケーション設定からリクエスト・コンテキストを構築する。
    ///
    /// # 引数
    ///
    /// * `settings` - アプリケーション設定
    ///
    /// # 戻り値
    ///
    /// リクエスト・コンテキスト
    pub fn from_settings(settings: &AppSettings) -> DomainResult<Self> {
        let authorization = settings.authorization.clone();
        authorization.validate()?;
        let session_seconds = authorization.session_seconds;
        let sessions = JwtSessionRepository::new(authorization.jwt_token_secret.clone());
        let api_keys = InMemoryApiKeyRepository::new(&settings.api_keys, session_seconds);
        let credentials = InMemoryCredentialRepository::new(
            &settings.accounts,
            &settings.password,
            session_seconds,
        )?;

        Ok(Self {
            authorization,
            sessions: Arc::new(sessions),
            api_keys: Arc::new(api_keys),
            credentials: Arc::new(credentials),
        })
    }

    /// 認証に使用するリポジトリを返す。
    pub fn auth_services(&self) -> AuthServices<'_> {
        AuthServices {
            sessions: Some(self.sessions.as_ref()),
            api_keys: Some(self.api_keys.as_ref()),
        }
    }

    /// 認証情報リポジトリを返す。
    pub fn credential_repository(&self) -> &dyn CredentialRepository {
        self.credentials.as_ref()
    }
}
