pub mod extractors;
pub mod sessions;
pub mod tenants;

use std::str::FromStr as _;

use actix_web::body::BoxBody;
use actix_web::dev::ServiceResponse;
use actix_web::http::header::{self, HeaderMap, HeaderValue};
use actix_web::http::StatusCode;
use actix_web::middleware::ErrorHandlerResponse;
use actix_web::{web, HttpRequest, HttpResponse, Responder, ResponseError};
use mime::Mime;
use serde::de::DeserializeOwned;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use domain::validation::validate;
use domain::{DomainError, DomainResult, RuleViolation};

/// リクエスト処理結果
pub type ProcessRequestResult<T> = Result<T, ProcessRequestError>;

/// 応答のメタ情報に記録するAPIのバージョン
pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

/// 内部エラーの応答に記録するメッセージ
const INTERNAL_SERVER_ERROR_MESSAGE: &str = "Internal server error";

/// 応答のメタ情報
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    /// リクエストID
    pub request_id: Uuid,
    /// 応答した日時
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// APIのバージョン
    pub version: &'static str,
}

impl Default for ResponseMeta {
    fn default() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            timestamp: OffsetDateTime::now_utc(),
            version: API_VERSION,
        }
    }
}

/// 成功した応答のボディ
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    /// 常に`true`
    pub success: bool,
    /// データ
    pub data: T,
    /// メタ情報
    pub meta: ResponseMeta,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            meta: ResponseMeta::default(),
        }
    }

    /// HTTPステータス・コードを指定して、JSONで応答する。
    pub fn into_response(self, status_code: StatusCode) -> HttpResponse {
        HttpResponse::build(status_code).json(self)
    }
}

impl<T: Serialize> Responder for ApiResponse<T> {
    type Body = BoxBody;

    fn respond_to(self, _: &HttpRequest) -> HttpResponse<Self::Body> {
        self.into_response(StatusCode::OK)
    }
}

/// 失敗した応答のボディ
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponseBody {
    /// 常に`false`
    pub success: bool,
    /// ドメイン・エラー
    pub error: DomainError,
    /// メタ情報
    pub meta: ResponseMeta,
}

impl ErrorResponseBody {
    pub fn new(error: DomainError) -> Self {
        Self {
            success: false,
            error,
            meta: ResponseMeta::default(),
        }
    }
}

impl std::fmt::Display for ErrorResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            r#"type={}, message="{}""#,
            self.error.kind(),
            self.error.message()
        )
    }
}

/// リクエスト処理エラー
///
/// ドメイン・エラーをHTTPステータス・コードと応答のボディに変換する。
/// HTTPステータス・コードを扱うのはこのモジュールのみとする。
#[derive(Debug, Clone, thiserror::Error)]
pub struct ProcessRequestError {
    /// HTTPステータスコード
    pub status_code: StatusCode,
    /// レスポンスボディ
    pub body: ErrorResponseBody,
}

impl ProcessRequestError {
    /// HTTPステータス・コードを指定して、リクエスト処理エラーを構築する。
    pub fn with_status(status_code: StatusCode, error: DomainError) -> Self {
        Self {
            status_code,
            body: ErrorResponseBody::new(error),
        }
    }
}

/// リクエスト処理エラーを、`actix-web`のエラーレスポンスとして扱えるように`ResponseError`を実装する。
impl ResponseError for ProcessRequestError {
    fn status_code(&self) -> StatusCode {
        self.status_code
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code).json(&self.body)
    }
}

impl std::fmt::Display for ProcessRequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status_code.canonical_reason() {
            Some(reason) => {
                write!(
                    f,
                    "status_code={}, reason={}, {}",
                    self.status_code, reason, self.body
                )
            }
            None => {
                write!(f, "status_code={}, {}", self.status_code, self.body)
            }
        }
    }
}

impl From<DomainError> for ProcessRequestError {
    fn from(value: DomainError) -> Self {
        let status_code = status_code_of(&value);
        log_error(status_code, &value);

        Self::with_status(status_code, value)
    }
}

/// HTTPステータス・コードに対応するログ・レベルを返す。
///
/// サーバー・エラーは`ERROR`、それ以外は`WARN`とする。
pub fn log_level_of(status_code: StatusCode) -> tracing::Level {
    if status_code.is_server_error() {
        tracing::Level::ERROR
    } else {
        tracing::Level::WARN
    }
}

/// HTTPステータス・コードに対応するログ・レベルで、ドメイン・エラーを記録する。
fn log_error(status_code: StatusCode, error: &DomainError) {
    if log_level_of(status_code) == tracing::Level::ERROR {
        tracing::error!(
            status = %status_code,
            error_type = %error.kind(),
            "{} ({}:{})",
            error,
            file!(),
            line!()
        );
    } else {
        tracing::warn!(
            status = %status_code,
            error_type = %error.kind(),
            "{} ({}:{})",
            error,
            file!(),
            line!()
        );
    }
}

/// ドメイン・エラーに対応するHTTPステータス・コードを返す。
///
/// # 引数
///
/// * `error` - ドメイン・エラー
///
/// # 戻り値
///
/// HTTPステータス・コード
pub fn status_code_of(error: &DomainError) -> StatusCode {
    match error {
        DomainError::Validation { .. } => StatusCode::BAD_REQUEST,
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::Authentication { .. } => StatusCode::UNAUTHORIZED,
        DomainError::Authorization { .. } => StatusCode::FORBIDDEN,
        DomainError::BusinessRule { violation, .. } => match violation {
            RuleViolation::Conflict => StatusCode::CONFLICT,
            RuleViolation::Unprocessable => StatusCode::UNPROCESSABLE_ENTITY,
        },
        DomainError::Database { .. } | DomainError::Configuration { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// ドメイン結果を、HTTP応答に変換する。
///
/// 成功した場合はここで記録し、失敗した場合はリクエスト処理エラーへの変換で1度だけ記録する。
///
/// # 引数
///
/// * `result` - ドメイン結果
/// * `status_code` - 成功した場合のHTTPステータス・コード
/// * `operation` - ドメイン結果を返した操作の名前
///
/// # 戻り値
///
/// HTTP応答
pub fn respond<T: Serialize>(
    result: DomainResult<T>,
    status_code: StatusCode,
    operation: &str,
) -> ProcessRequestResult<HttpResponse> {
    let data = result.map_err(ProcessRequestError::from)?;
    tracing::info!(operation, "operation succeeded");

    Ok(ApiResponse::new(data).into_response(status_code))
}

/// クエリ文字列をデシリアライズして検証する。
///
/// # 引数
///
/// * `query_string` - クエリ文字列
///
/// # 戻り値
///
/// 検証に成功した値
pub fn parse_query<T>(query_string: &str) -> DomainResult<T>
where
    T: DeserializeOwned + Validate,
{
    let query = web::Query::<T>::from_query(query_string).map_err(|e| {
        tracing::warn!("{} ({}:{})", e, file!(), line!());
        DomainError::validation_with_details(
            "Failed to parse query parameters",
            Some(String::from("query")),
            vec![],
        )
    })?;

    validate(query.into_inner())
}

/// HTTPヘッダからContent-Typeを取得する。
///
/// # 引数
///
/// * `headers` - HTTPヘッダ
///
/// # 戻り値
///
/// * `Mime`
/// * Content-Typeが設定されていない場合は`None`
fn retrieve_content_type(headers: &HeaderMap) -> Option<Mime> {
    let content_type = headers.get(header::CONTENT_TYPE)?;
    let content_type = content_type.to_str().ok()?;
    Mime::from_str(content_type).ok()
}

/// フレームワークが返したエラー応答を、ドメイン・エラーに変換する。
fn framework_error(status_code: StatusCode, path: &str) -> DomainError {
    if status_code == StatusCode::NOT_FOUND {
        return DomainError::not_found("Route", path);
    }
    if status_code.is_client_error() {
        let reason = status_code.canonical_reason().unwrap_or("Bad request");
        return DomainError::validation(reason);
    }

    DomainError::Database {
        message: String::from(INTERNAL_SERVER_ERROR_MESSAGE),
        operation: String::from("handle_request"),
        query: None,
        cause: None,
    }
}

/// カスタムデフォルト・エラー・ハンドラ
///
/// 本体がJSONでないエラー応答を、ドメイン・エラーを含む応答に置き換える。
/// HTTPステータス・コードは変更しない。
pub fn default_error_handler<B>(
    res: ServiceResponse<B>,
) -> actix_web::Result<ErrorHandlerResponse<B>> {
    // コンテンツタイプがapplication/jsonの場合はそのまま返す
    if retrieve_content_type(res.headers()).is_some_and(|mime| mime == mime::APPLICATION_JSON) {
        return Ok(ErrorHandlerResponse::Response(res.map_into_left_body()));
    }
    // レスポンスボディを生成
    let status_code = res.status();
    let error = framework_error(status_code, res.request().path());
    log_error(status_code, &error);
    let body = serde_json::to_string(&ErrorResponseBody::new(error))?;
    let (req, res) = res.into_parts();
    let mut res = res.set_body(body);
    // レスポンスのヘッダを`application/json`に設定
    res.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    // レスポンスを構築
    let res = ServiceResponse::new(req, res)
        .map_into_boxed_body()
        .map_into_right_body();

    Ok(ErrorHandlerResponse::Response(res))
}

/// ヘルス・チェックの応答
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
}

/// ヘルスチェック
#[tracing::instrument(name = "health check")]
pub async fn health_check() -> ApiResponse<HealthStatus> {
    ApiResponse::new(HealthStatus { status: "healthy" })
}
