use crate::helpers::{assert_json_content_type, spawn_test_app, split_response, ResponseParts};

/// ヘルスチェック・ハンドラが、成功した応答を返すことを確認
#[tokio::test]
async fn health_check_works() -> anyhow::Result<()> {
    // 準備
    let app = spawn_test_app().await?;

    // 実行
    let response = app.get("/health-check").send().await?;
    let ResponseParts {
        status_code,
        headers,
        body,
    } = split_response(response).await?;
    let body: serde_json::Value = serde_json::from_str(&body)?;

    // 検証
    assert_eq!(reqwest::StatusCode::OK, status_code);
    assert_json_content_type(&headers)?;
    assert_eq!(true, body["success"]);
    assert_eq!("healthy", body["data"]["status"]);
    assert!(body["meta"]["requestId"].is_string());
    assert!(body["meta"]["timestamp"].is_string());

    Ok(())
}

/// 存在しないルートへのリクエストが、リソースが存在しないエラーで応答されることを確認
#[tokio::test]
async fn unknown_route_responds_not_found_error() -> anyhow::Result<()> {
    // 準備
    let app = spawn_test_app().await?;

    // 実行
    let response = app.get("/no-such-route").send().await?;
    let ResponseParts {
        status_code,
        headers,
        body,
    } = split_response(response).await?;
    let body: serde_json::Value = serde_json::from_str(&body)?;

    // 検証
    assert_eq!(reqwest::StatusCode::NOT_FOUND, status_code);
    assert_json_content_type(&headers)?;
    assert_eq!(false, body["success"]);
    assert_eq!("NotFoundError", body["error"]["type"]);
    assert_eq!("/no-such-route", body["error"]["resourceId"]);

    Ok(())
}
