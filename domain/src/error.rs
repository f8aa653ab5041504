use serde::{Deserialize, Serialize};

/// ドメイン・エラー分類
///
/// `DomainError`のバリアントと1対1で対応する判別子で、シリアライズしたときの`type`の値と一致する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 検証エラー
    Validation,
    /// リソースが存在しないエラー
    NotFound,
    /// 認証エラー
    Authentication,
    /// 認可エラー
    Authorization,
    /// データベース・エラー
    Database,
    /// ビジネス・ルール・エラー
    BusinessRule,
    /// 設定エラー
    Configuration,
}

impl ErrorKind {
    /// すべてのドメイン・エラー分類
    pub const ALL: [ErrorKind; 7] = [
        ErrorKind::Validation,
        ErrorKind::NotFound,
        ErrorKind::Authentication,
        ErrorKind::Authorization,
        ErrorKind::Database,
        ErrorKind::BusinessRule,
        ErrorKind::Configuration,
    ];

    /// ドメイン・エラー分類を文字列で返す。
    pub fn as_str(&self) -> &'static str {
        match *self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::Authentication => "AuthenticationError",
            ErrorKind::Authorization => "AuthorizationError",
            ErrorKind::Database => "DatabaseError",
            ErrorKind::BusinessRule => "BusinessRuleError",
            ErrorKind::Configuration => "ConfigurationError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 認証に失敗した理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationFailure {
    /// 認証情報が送信されていない
    MissingToken,
    /// 認証情報の形式が誤っている、または検証できない
    InvalidToken,
    /// セッションの有効期限が切れている
    Expired,
    /// Eメール・アドレスまたはパスワードが誤っている
    InvalidCredentials,
}

impl AuthenticationFailure {
    pub fn as_str(&self) -> &'static str {
        match *self {
            AuthenticationFailure::MissingToken => "missing_token",
            AuthenticationFailure::InvalidToken => "invalid_token",
            AuthenticationFailure::Expired => "expired",
            AuthenticationFailure::InvalidCredentials => "invalid_credentials",
        }
    }
}

impl std::fmt::Display for AuthenticationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// ビジネス・ルール違反の分類
///
/// 同じビジネス・ルール・エラーでも、既存の状態と衝突した場合と、要求そのものを処理できない
/// 場合を区別する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RuleViolation {
    /// 要求を処理できない
    #[default]
    Unprocessable,
    /// 既存の状態と衝突した
    Conflict,
}

/// 検証で見つかった項目ごとの問題
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldIssue {
    /// 問題が見つかった項目のパス
    ///
    /// ネストした構造体はフィールド名、リストは要素のインデックスをセグメントとする。
    pub path: Vec<String>,
    /// メッセージ
    pub message: String,
    /// 検証規則を示すコード
    pub code: String,
}

impl FieldIssue {
    pub fn new(path: Vec<String>, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
            code: code.into(),
        }
    }
}

/// ドメイン・エラー
///
/// 想定される失敗を、例外ではなく値として表現する。
/// バリアントは閉じており、バリアント固有の項目はそのバリアントのみが保有する。
/// 新しい種類の失敗は、既存のバリアントに項目を追加せずに、バリアントを追加して表現する。
///
/// シリアライズすると、`type`に判別子、`message`にメッセージを持つJSONオブジェクトになる。
/// `DatabaseError`の`query`と`cause`は内部情報であるため、シリアライズしない。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(tag = "type")]
pub enum DomainError {
    /// 検証エラー
    ///
    /// すべての項目の問題を`details`にまとめて保有する。
    #[error("{message}")]
    #[serde(rename = "ValidationError", rename_all = "camelCase")]
    Validation {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        details: Vec<FieldIssue>,
    },

    /// リソースが存在しないエラー
    #[error("{message}")]
    #[serde(rename = "NotFoundError", rename_all = "camelCase")]
    NotFound {
        message: String,
        resource: String,
        resource_id: String,
    },

    /// 認証エラー
    #[error("{message}")]
    #[serde(rename = "AuthenticationError", rename_all = "camelCase")]
    Authentication {
        message: String,
        reason: AuthenticationFailure,
    },

    /// 認可エラー
    ///
    /// `required`には、不足している権限の名前のみを記録する。
    #[error("{message}")]
    #[serde(rename = "AuthorizationError", rename_all = "camelCase")]
    Authorization {
        message: String,
        required: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
    },

    /// データベース・エラー
    ///
    /// 永続化層や外部の処理から返された予期しない失敗も、このバリアントで表現する。
    #[error("{message}")]
    #[serde(rename = "DatabaseError", rename_all = "camelCase")]
    Database {
        message: String,
        operation: String,
        #[serde(skip)]
        query: Option<String>,
        #[serde(skip)]
        cause: Option<String>,
    },

    /// ビジネス・ルール・エラー
    #[error("{message}")]
    #[serde(rename = "BusinessRuleError", rename_all = "camelCase")]
    BusinessRule {
        message: String,
        rule: String,
        code: String,
        #[serde(skip)]
        violation: RuleViolation,
    },

    /// 設定エラー
    #[error("{message}")]
    #[serde(rename = "ConfigurationError", rename_all = "camelCase")]
    Configuration { message: String, component: String },
}

impl DomainError {
    /// 検証エラーを構築する。
    ///
    /// # 引数
    ///
    /// * `message` - メッセージ
    ///
    /// # 戻り値
    ///
    /// 検証エラー
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
            details: vec![],
        }
    }

    /// 項目と問題の一覧を指定して、検証エラーを構築する。
    ///
    /// # 引数
    ///
    /// * `message` - メッセージ
    /// * `field` - 検証した項目の名前
    /// * `details` - 項目ごとの問題
    ///
    /// # 戻り値
    ///
    /// 検証エラー
    pub fn validation_with_details(
        message: impl Into<String>,
        field: Option<String>,
        details: Vec<FieldIssue>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            field,
            details,
        }
    }

    /// リソースが存在しないエラーを構築する。
    ///
    /// # 引数
    ///
    /// * `resource` - リソースの名前
    /// * `resource_id` - リソースのID
    ///
    /// # 戻り値
    ///
    /// リソースが存在しないエラー
    pub fn not_found(resource: impl Into<String>, resource_id: impl Into<String>) -> Self {
        let resource = resource.into();
        let resource_id = resource_id.into();
        Self::NotFound {
            message: format!("{} with ID {} not found", resource, resource_id),
            resource,
            resource_id,
        }
    }

    /// 理由からメッセージを生成して、認証エラーを構築する。
    pub fn authentication(reason: AuthenticationFailure) -> Self {
        Self::Authentication {
            message: format!("Authentication failed: {}", reason),
            reason,
        }
    }

    /// メッセージを指定して、認証エラーを構築する。
    pub fn authentication_with_message(
        reason: AuthenticationFailure,
        message: impl Into<String>,
    ) -> Self {
        Self::Authentication {
            message: message.into(),
            reason,
        }
    }

    /// 認可エラーを構築する。
    ///
    /// # 引数
    ///
    /// * `message` - メッセージ
    /// * `required` - 不足している権限
    ///
    /// # 戻り値
    ///
    /// 認可エラー
    pub fn authorization(message: impl Into<String>, required: Vec<String>) -> Self {
        Self::Authorization {
            message: message.into(),
            required,
            user_id: None,
        }
    }

    /// 認可されなかったユーザーを指定して、認可エラーを構築する。
    pub fn authorization_for_user(
        message: impl Into<String>,
        required: Vec<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self::Authorization {
            message: message.into(),
            required,
            user_id: Some(user_id.into()),
        }
    }

    /// データベース・エラーを構築する。
    ///
    /// # 引数
    ///
    /// * `operation` - 失敗した操作
    /// * `message` - メッセージ
    ///
    /// # 戻り値
    ///
    /// データベース・エラー
    pub fn database(operation: impl Into<String>, message: impl Into<String>) -> Self {
        let operation = operation.into();
        Self::Database {
            message: format!("Database error during {}: {}", operation, message.into()),
            operation,
            query: None,
            cause: None,
        }
    }

    /// 実行したクエリと原因を指定して、データベース・エラーを構築する。
    pub fn database_with_cause(
        operation: impl Into<String>,
        message: impl Into<String>,
        query: Option<String>,
        cause: &(dyn std::error::Error + 'static),
    ) -> Self {
        let operation = operation.into();
        Self::Database {
            message: format!("Database error during {}: {}", operation, message.into()),
            operation,
            query,
            cause: Some(cause.to_string()),
        }
    }

    /// ドメイン・エラーでないエラーを、データベース・エラーに変換する。
    ///
    /// # 引数
    ///
    /// * `operation` - 失敗した操作
    /// * `source` - 変換するエラー
    ///
    /// # 戻り値
    ///
    /// データベース・エラー
    pub fn unexpected(
        operation: impl Into<String>,
        source: &(dyn std::error::Error + 'static),
    ) -> Self {
        Self::database_with_cause(operation, source.to_string(), None, source)
    }

    /// 処理できない要求を表現するビジネス・ルール・エラーを構築する。
    ///
    /// # 引数
    ///
    /// * `rule` - 違反したビジネス・ルール
    /// * `message` - メッセージ
    /// * `code` - アプリケーション・エラー・コード
    ///
    /// # 戻り値
    ///
    /// ビジネス・ルール・エラー
    pub fn business_rule(
        rule: impl Into<String>,
        message: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self::BusinessRule {
            message: message.into(),
            rule: rule.into(),
            code: code.into(),
            violation: RuleViolation::Unprocessable,
        }
    }

    /// 既存の状態との衝突を表現するビジネス・ルール・エラーを構築する。
    pub fn conflict(
        rule: impl Into<String>,
        message: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self::BusinessRule {
            message: message.into(),
            rule: rule.into(),
            code: code.into(),
            violation: RuleViolation::Conflict,
        }
    }

    /// 設定エラーを構築する。
    ///
    /// # 引数
    ///
    /// * `component` - 設定が誤っているコンポーネント
    /// * `message` - メッセージ
    ///
    /// # 戻り値
    ///
    /// 設定エラー
    pub fn configuration(component: impl Into<String>, message: impl Into<String>) -> Self {
        let component = component.into();
        Self::Configuration {
            message: format!("Configuration error for {}: {}", component, message.into()),
            component,
        }
    }

    /// ドメイン・エラー分類を返す。
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::Authorization { .. } => ErrorKind::Authorization,
            Self::Database { .. } => ErrorKind::Database,
            Self::BusinessRule { .. } => ErrorKind::BusinessRule,
            Self::Configuration { .. } => ErrorKind::Configuration,
        }
    }

    /// メッセージを返す。
    pub fn message(&self) -> &str {
        match self {
            Self::Validation { message, .. }
            | Self::NotFound { message, .. }
            | Self::Authentication { message, .. }
            | Self::Authorization { message, .. }
            | Self::Database { message, .. }
            | Self::BusinessRule { message, .. }
            | Self::Configuration { message, .. } => message,
        }
    }
}
