use std::net::TcpListener;

use anyhow::Context as _;
use once_cell::sync::Lazy;
use reqwest::header::HeaderMap;
use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::SecretString;

use configurations::settings::{
    AccountSettings, ApiKeySettings, AppSettings, HttpServerSettings, IdentitySettings,
    LoggingSettings,
};
use domain::models::session::Role;
use domain::models::{TenantId, UserId};
use infra::routes::extractors::API_KEY_HEADER;
use infra::RequestContext;
use server::startup::build_http_server;
use server::telemetry::{generate_log_subscriber, init_log_subscriber};
use use_cases::settings::{AuthorizationSettings, PasswordSettings};

/// Content-Typeヘッダに設定されるJSONのメディア・タイプ
pub const CONTENT_TYPE_APPLICATION_JSON: &str = "application/json";

/// 管理者アカウントのEメール・アドレスとパスワード
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password";

/// 権限を持たないアカウントのEメール・アドレスとパスワード
pub const READER_EMAIL: &str = "reader@example.com";
pub const READER_PASSWORD: &str = "reader-password";

/// 発行済みのAPIキー
pub const API_KEY: &str = "integration-test-api-key";

/// ログ・サブスクライバ
static TRACING: Lazy<()> = Lazy::new(|| {
    let default_level = log::Level::Info;
    let subscriber_name = String::from("test");

    let result = if std::env::var("TEST_LOG").is_ok() {
        let subscriber = generate_log_subscriber(subscriber_name, default_level, std::io::stdout);
        init_log_subscriber(subscriber)
    } else {
        let subscriber = generate_log_subscriber(subscriber_name, default_level, std::io::sink);
        init_log_subscriber(subscriber)
    };
    result.expect("failed to initialize the log subscriber");
});

/// 統合テスト用アプリ
pub struct TestApp {
    /// アプリのルートURI
    pub root_uri: String,
    /// 管理者が所属するテナントのID
    pub tenant_id: TenantId,
    /// 管理者のユーザーID
    pub admin_id: UserId,
    /// HTTPクライアント
    client: reqwest::Client,
}

impl TestApp {
    /// セッションを作成する。
    pub async fn create_session(&self, body: impl Into<String>) -> anyhow::Result<Response> {
        Ok(self
            .client
            .post(format!("{}/auth/sessions", self.root_uri))
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE_APPLICATION_JSON)
            .body(body.into())
            .send()
            .await?)
    }

    /// Eメール・アドレスとパスワードでセッションを作成して、セッション・トークンを返す。
    pub async fn sign_in(&self, email: &str, password: &str) -> anyhow::Result<String> {
        let body = serde_json::json!({ "email": email, "password": password }).to_string();
        let parts = split_response(self.create_session(body).await?).await?;
        anyhow::ensure!(
            parts.status_code == StatusCode::CREATED,
            "sign in failed: {}",
            parts.body
        );
        let body: serde_json::Value = serde_json::from_str(&parts.body)?;
        let token = body["data"]["token"]
            .as_str()
            .context("token is missing in the response body")?;

        Ok(token.to_string())
    }

    /// GETリクエストを構築する。
    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(format!("{}{}", self.root_uri, path))
    }

    /// セッション・トークンを`Authorization`ヘッダに設定したGETリクエストを構築する。
    pub fn get_with_token(&self, path: &str, token: &str) -> RequestBuilder {
        self.get(path)
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {}", token))
    }

    /// APIキーを`x-api-key`ヘッダに設定したGETリクエストを構築する。
    pub fn get_with_api_key(&self, path: &str, api_key: &str) -> RequestBuilder {
        self.get(path).header(API_KEY_HEADER, api_key)
    }
}

/// 統合テスト用のアプリケーション設定を構築する。
fn app_settings(tenant_id: TenantId, admin_id: UserId) -> AppSettings {
    let identity = |user_id, role, permissions: &[&str]| IdentitySettings {
        user_id,
        tenant_id,
        role,
        permissions: permissions.iter().map(|p| p.to_string()).collect(),
    };

    AppSettings {
        http_server: HttpServerSettings { port: 0 },
        password: PasswordSettings {
            pepper: SecretString::new(String::from("integration-test-pepper")),
            hash_memory: 12288,
            hash_iterations: 3,
            hash_parallelism: 1,
        },
        authorization: AuthorizationSettings {
            jwt_token_secret: SecretString::new(String::from("integration-test-jwt-secret")),
            session_seconds: 3600,
        },
        logging: LoggingSettings {
            level: log::Level::Info,
        },
        accounts: vec![
            AccountSettings {
                email: String::from(ADMIN_EMAIL),
                password: SecretString::new(String::from(ADMIN_PASSWORD)),
                identity: identity(admin_id, Role::Admin, &["tenants:read", "tenants:write"]),
            },
            AccountSettings {
                email: String::from(READER_EMAIL),
                password: SecretString::new(String::from(READER_PASSWORD)),
                identity: identity(UserId::default(), Role::Readonly, &[]),
            },
        ],
        api_keys: vec![ApiKeySettings {
            key: SecretString::new(String::from(API_KEY)),
            email: Some(String::from("bot@example.com")),
            identity: identity(UserId::default(), Role::User, &["tenants:read"]),
        }],
    }
}

/// 統合テスト用のHTTPサーバーを起動する。
///
/// # 戻り値
///
/// 統合テスト用アプリ
pub async fn spawn_test_app() -> anyhow::Result<TestApp> {
    Lazy::force(&TRACING);

    let tenant_id = TenantId::default();
    let admin_id = UserId::default();
    let settings = app_settings(tenant_id, admin_id);
    let context = RequestContext::from_settings(&settings)?;

    let listener = TcpListener::bind("localhost:0").context("failed to bind random port")?;
    let port = listener.local_addr()?.port();
    let server = build_http_server(listener, context)?;
    tokio::spawn(server);

    Ok(TestApp {
        root_uri: format!("http://localhost:{}", port),
        tenant_id,
        admin_id,
        client: reqwest::Client::new(),
    })
}

/// レスポンスを分解した結果
pub struct ResponseParts {
    pub status_code: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

/// レスポンスをステータス・コード、ヘッダ及びボディに分解する。
pub async fn split_response(response: Response) -> anyhow::Result<ResponseParts> {
    let status_code = response.status();
    let headers = response.headers().clone();
    let body = response.text().await?;

    Ok(ResponseParts {
        status_code,
        headers,
        body,
    })
}

/// レスポンスのContent-Typeが`application/json`であるか確認する。
pub fn assert_json_content_type(headers: &HeaderMap) -> anyhow::Result<()> {
    let content_type = headers
        .get(reqwest::header::CONTENT_TYPE)
        .context("content type is missing")?;
    assert_eq!(CONTENT_TYPE_APPLICATION_JSON, content_type.to_str()?);

    Ok(())
}
