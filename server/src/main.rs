use std::net::TcpListener;
use std::path::Path;

use configurations::settings::{
    retrieve_app_settings, AppEnvironment, ENV_APP_ENVIRONMENT, ENV_APP_ENVIRONMENT_DEFAULT,
    SETTINGS_DIR_NAME,
};
use infra::RequestContext;
use server::startup::build_http_server;
use server::telemetry::{generate_log_subscriber, init_log_subscriber, LOG_SUBSCRIBER_NAME};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 環境変数を設定
    dotenvx::dotenv().ok();

    // 環境変数からアプリケーションの動作環境を取得
    let app_env: AppEnvironment = std::env::var(ENV_APP_ENVIRONMENT)
        .unwrap_or_else(|_| String::from(ENV_APP_ENVIRONMENT_DEFAULT))
        .into();
    // アプリケーション設定を取得
    let app_settings = retrieve_app_settings(app_env, Path::new(SETTINGS_DIR_NAME))?;

    // サブスクライバを初期化
    let subscriber = generate_log_subscriber(
        LOG_SUBSCRIBER_NAME.into(),
        app_settings.logging.level,
        std::io::stdout,
    );
    init_log_subscriber(subscriber)?;

    // リクエスト・コンテキストを構築
    let context = RequestContext::from_settings(&app_settings)?;
    tracing::info!(
        environment = %app_env,
        accounts = app_settings.accounts.len(),
        api_keys = app_settings.api_keys.len(),
        "request context is ready"
    );

    // HttpServerを起動
    let listener = TcpListener::bind(("127.0.0.1", app_settings.http_server.port))?;
    let server = build_http_server(listener, context)?;
    server.await.map_err(|e| e.into())
}
