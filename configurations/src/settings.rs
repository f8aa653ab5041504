use std::path::Path;

use config::{Config, FileFormat, FileSourceFile};
use enum_display::EnumDisplay;
use secrecy::SecretString;

use domain::models::session::{Role, UserSession};
use domain::models::{TenantId, UserId};
use use_cases::settings::{AuthorizationSettings, PasswordSettings};

/// 設定ファイルディレクトリ・パス
pub const SETTINGS_DIR_NAME: &str = "settings";

/// 動作環境を表現する環境変数とそのデフォルト値
pub const ENV_APP_ENVIRONMENT: &str = "APP_ENVIRONMENT";
pub const ENV_APP_ENVIRONMENT_DEFAULT: &str = "development";

/// アプリの動作環境
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumDisplay)]
#[enum_display(case = "Lower")]
pub enum AppEnvironment {
    /// 開発環境
    Development,
    /// 運用環境
    Production,
}

impl From<String> for AppEnvironment {
    /// アプリの動作環境を表現する文字列から、アプリの動作環境を判定する。
    ///
    /// アプリの動作環境を表現する文字列が`production`の場合は運用環境と判定する。
    /// それ以外の場合は、開発環境と判定する。
    /// なお、大文字と小文字は無視する。
    ///
    /// # 引数
    ///
    /// * `value` - アプリの動作環境を表現する文字列
    ///
    /// # 戻り値
    ///
    /// アプリの動作環境
    fn from(value: String) -> Self {
        match value.to_lowercase().as_str() {
            "production" => Self::Production,
            _ => Self::Development,
        }
    }
}

/// アプリケーション設定
#[derive(Debug, Clone, serde::Deserialize)]
pub struct AppSettings {
    /// HTTPサーバー設定
    pub http_server: HttpServerSettings,
    /// パスワード設定
    pub password: PasswordSettings,
    /// 認証設定
    pub authorization: AuthorizationSettings,
    /// ロギング設定
    pub logging: LoggingSettings,
    /// 認証情報でログインできるアカウント
    #[serde(default)]
    pub accounts: Vec<AccountSettings>,
    /// 発行済みのAPIキー
    #[serde(default)]
    pub api_keys: Vec<ApiKeySettings>,
}

/// HTTPサーバー設定
#[derive(Debug, Clone, serde::Deserialize)]
pub struct HttpServerSettings {
    /// リスニングポート番号
    pub port: u16,
}

/// ロギング設定
#[derive(Debug, Clone, serde::Deserialize)]
pub struct LoggingSettings {
    /// ログレベル
    pub level: log::Level,
}

/// セッションを発行するときに使用するユーザーの属性
#[derive(Debug, Clone, serde::Deserialize)]
pub struct IdentitySettings {
    /// ユーザーID
    pub user_id: UserId,
    /// テナントID
    pub tenant_id: TenantId,
    /// ロール
    pub role: Role,
    /// 権限
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl IdentitySettings {
    /// 有効期限を指定して、ユーザー・セッションを構築する。
    pub fn session(&self, email: &str, expires_at: time::OffsetDateTime) -> UserSession {
        UserSession {
            user_id: self.user_id,
            email: email.to_string(),
            tenant_id: self.tenant_id,
            role: self.role,
            permissions: self.permissions.clone(),
            expires_at,
        }
    }
}

/// アカウント設定
///
/// パスワードは平文で記録して、起動時にハッシュ化する。
#[derive(Debug, Clone, serde::Deserialize)]
pub struct AccountSettings {
    /// Eメール・アドレス
    pub email: String,
    /// パスワード
    pub password: SecretString,
    /// ユーザーの属性
    pub identity: IdentitySettings,
}

/// APIキー設定
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiKeySettings {
    /// APIキー
    pub key: SecretString,
    /// Eメール・アドレス
    #[serde(default)]
    pub email: Option<String>,
    /// ユーザーの属性
    pub identity: IdentitySettings,
}

/// アプリケーション設定を取得する。
///
/// # 引数
///
/// * `app_env` - アプリケーションの動作環境
/// * `settings_dir` - アプリケーション設定ファイルを格納しているディレクトリのパス
///
/// # 戻り値
///
/// アプリケーション設定
pub fn retrieve_app_settings<P: AsRef<Path>>(
    app_env: AppEnvironment,
    settings_dir: P,
) -> anyhow::Result<AppSettings> {
    // デフォルト及び動作環境別設定ファイルのパスを生成
    let settings_dir = settings_dir.as_ref();
    let default_settings_file = config_file_source(settings_dir, "default.yml");
    let env_settings_file = config_file_source(settings_dir, &format!("{app_env}.yml"));

    // アプリケーション設定のビルダーを構築
    let settings = Config::builder()
        // デフォルトの設定ファイルをロード
        .add_source(default_settings_file)
        // 環境別の設定ファイルをロード
        .add_source(env_settings_file)
        // 環境変数に記録された設定をロード
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    // アプリケーション設定を読み込み
    let app_settings = settings.try_deserialize::<AppSettings>()?;
    app_settings.authorization.validate()?;

    Ok(app_settings)
}

/// `Config`がロードする設定ファイルのパスを構築する。
///
/// # 引数
///
/// * `settings_dir` - 設定ファイルディレクトリ・パス
/// * `file_name` - 設定ファイルの名前
///
/// # 戻り値
///
/// 設定ファイルのパス
fn config_file_source(
    settings_dir: &Path,
    file_name: &str,
) -> config::File<FileSourceFile, FileFormat> {
    config::File::from(settings_dir.join(file_name))
}
