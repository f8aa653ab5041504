use std::future::Future;
use std::pin::Pin;

use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};

use domain::models::session::AuthContext;
use domain::DomainError;
use use_cases::auth::{get_user_context, AuthOptions, RequestCredentials};

use crate::routes::ProcessRequestError;
use crate::RequestContext;

/// APIキーを送信するヘッダの名前
pub const API_KEY_HEADER: &str = "x-api-key";

/// 認証済みユーザーのみがアクセス可能なコンテキスト
///
/// `Authorization`ヘッダのセッション・トークン、または`x-api-key`ヘッダのAPIキーで認証する。
pub struct Authenticated(pub AuthContext);

impl FromRequest for Authenticated {
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &actix_web::HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let request = req.clone();

        Box::pin(async move {
            let context = request_context(&request)?;
            let options = AuthOptions {
                allow_api_key: true,
                required_permissions: vec![],
            };
            let auth = get_user_context(
                &request_credentials(&request),
                &options,
                &context.auth_services(),
            )
            .await
            .map_err(ProcessRequestError::from)?;

            Ok(Self(auth))
        })
    }
}

/// リクエストヘッダから認証情報を取得する。
///
/// 値を文字列として扱えないヘッダは、送信されていないものとして扱う。
///
/// # 引数
///
/// * `request` - HTTPリクエスト
///
/// # 戻り値
///
/// 要求に含まれていた認証情報
pub fn request_credentials(request: &HttpRequest) -> RequestCredentials<'_> {
    let headers = request.headers();

    RequestCredentials {
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok()),
        api_key: headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok()),
    }
}

/// アプリケーション・データからリクエスト・コンテキストを取得する。
pub fn request_context(
    request: &HttpRequest,
) -> Result<web::Data<RequestContext>, ProcessRequestError> {
    request
        .app_data::<web::Data<RequestContext>>()
        .cloned()
        .ok_or_else(|| {
            DomainError::configuration("request_context", "Request context is not registered")
                .into()
        })
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    /// リクエストヘッダから認証情報を取得できることを確認
    #[test]
    fn credentials_are_read_from_headers() {
        let request = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer abc"))
            .insert_header((API_KEY_HEADER, "key-1"))
            .to_http_request();
        let credentials = request_credentials(&request);
        assert_eq!(Some("Bearer abc"), credentials.authorization);
        assert_eq!(Some("key-1"), credentials.api_key);

        let request = TestRequest::default().to_http_request();
        let credentials = request_credentials(&request);
        assert!(credentials.authorization.is_none());
        assert!(credentials.api_key.is_none());
    }

    /// リクエスト・コンテキストが登録されていない場合に、内部エラーになることを確認
    #[test]
    fn missing_request_context_is_server_error() {
        let request = TestRequest::default().to_http_request();
        let error = request_context(&request).err().unwrap();
        assert!(error.status_code.is_server_error());
    }
}
