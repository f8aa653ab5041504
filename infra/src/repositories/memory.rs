use std::collections::HashMap;

use async_trait::async_trait;
use secrecy::{ExposeSecret as _, SecretString};
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

use configurations::settings::{AccountSettings, ApiKeySettings, IdentitySettings};
use domain::models::credentials::Credentials;
use domain::models::session::UserSession;
use domain::repositories::credential::CredentialRepository;
use domain::repositories::session::ApiKeyRepository;
use domain::{AuthenticationFailure, DomainError, DomainResult};
use use_cases::passwords::{hash_password, verify_password};
use use_cases::settings::PasswordSettings;

/// メモリAPIキー・リポジトリ
///
/// APIキーをハッシュ化した文字列をキーにして、APIキーに紐付いたユーザーを記憶する。
pub struct InMemoryApiKeyRepository {
    /// APIキーをハッシュ化した文字列と、APIキーに紐付いたユーザー
    keys: HashMap<String, (String, IdentitySettings)>,
    /// セッションの有効期間
    session_duration: Duration,
}

impl InMemoryApiKeyRepository {
    /// メモリAPIキー・リポジトリを構築する。
    ///
    /// # 引数
    ///
    /// * `api_keys` - APIキー設定
    /// * `session_seconds` - セッションの有効期限（秒）
    ///
    /// # 戻り値
    ///
    /// メモリAPIキー・リポジトリ
    pub fn new(api_keys: &[ApiKeySettings], session_seconds: u64) -> Self {
        let keys = api_keys
            .iter()
            .map(|k| {
                let email = k.email.clone().unwrap_or_default();
                (generate_key(&k.key), (email, k.identity.clone()))
            })
            .collect();

        Self {
            keys,
            session_duration: session_duration(session_seconds),
        }
    }
}

#[async_trait]
impl ApiKeyRepository for InMemoryApiKeyRepository {
    async fn find_by_api_key(&self, api_key: &SecretString) -> DomainResult<UserSession> {
        let (email, identity) = self.keys.get(&generate_key(api_key)).ok_or_else(|| {
            tracing::warn!("{} ({}:{})", INVALID_API_KEY, file!(), line!());
            DomainError::authentication_with_message(
                AuthenticationFailure::InvalidToken,
                INVALID_API_KEY,
            )
        })?;

        Ok(identity.session(email, OffsetDateTime::now_utc() + self.session_duration))
    }
}

/// 登録されたアカウント
struct StoredAccount {
    /// パスワードをハッシュ化したPHC文字列
    phc: SecretString,
    /// ユーザーの属性
    identity: IdentitySettings,
}

/// メモリ認証情報リポジトリ
pub struct InMemoryCredentialRepository {
    /// Eメール・アドレスを小文字にした文字列と、登録されたアカウント
    accounts: HashMap<String, StoredAccount>,
    /// パスワードに振りかけるペッパー
    pepper: SecretString,
    /// セッションの有効期間
    session_duration: Duration,
}

impl InMemoryCredentialRepository {
    /// メモリ認証情報リポジトリを構築する。
    ///
    /// アカウント設定に記録されたパスワードは、ハッシュ化して記憶する。
    ///
    /// # 引数
    ///
    /// * `accounts` - アカウント設定
    /// * `password_settings` - パスワード設定
    /// * `session_seconds` - セッションの有効期限（秒）
    ///
    /// # 戻り値
    ///
    /// メモリ認証情報リポジトリ
    pub fn new(
        accounts: &[AccountSettings],
        password_settings: &PasswordSettings,
        session_seconds: u64,
    ) -> DomainResult<Self> {
        let mut stored = HashMap::new();
        for account in accounts {
            let phc = hash_password(&account.password, password_settings)?;
            stored.insert(
                account.email.to_lowercase(),
                StoredAccount {
                    phc,
                    identity: account.identity.clone(),
                },
            );
        }

        Ok(Self {
            accounts: stored,
            pepper: password_settings.pepper.clone(),
            session_duration: session_duration(session_seconds),
        })
    }
}

#[async_trait]
impl CredentialRepository for InMemoryCredentialRepository {
    async fn verify(&self, credentials: &Credentials) -> DomainResult<UserSession> {
        let account = self
            .accounts
            .get(&credentials.email.to_lowercase())
            .ok_or_else(invalid_credentials)?;
        if !verify_password(&credentials.password, &self.pepper, &account.phc)? {
            return Err(invalid_credentials());
        }

        Ok(account.identity.session(
            &credentials.email,
            OffsetDateTime::now_utc() + self.session_duration,
        ))
    }
}

/// キーを生成する。
///
/// # 引数
///
/// * `token` - APIキー
///
/// # 戻り値
///
/// APIキーをハッシュ化した文字列
fn generate_key(token: &SecretString) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.expose_secret().as_bytes());

    format!("{:x}", hasher.finalize())
}

fn session_duration(session_seconds: u64) -> Duration {
    Duration::seconds(i64::try_from(session_seconds).unwrap_or(i64::MAX))
}

fn invalid_credentials() -> DomainError {
    tracing::warn!("{} ({}:{})", INVALID_CREDENTIALS, file!(), line!());
    DomainError::authentication_with_message(
        AuthenticationFailure::InvalidCredentials,
        INVALID_CREDENTIALS,
    )
}

const INVALID_API_KEY: &str = "Invalid API key";
const INVALID_CREDENTIALS: &str = "Invalid email or password";
