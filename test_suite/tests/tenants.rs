use reqwest::StatusCode;

use domain::models::TenantId;

use crate::helpers::{
    spawn_test_app, split_response, ResponseParts, ADMIN_EMAIL, ADMIN_PASSWORD, API_KEY,
    READER_EMAIL, READER_PASSWORD,
};

/// 所属するテナントへのアクセスが許可されることを確認
#[tokio::test]
async fn user_can_access_own_tenant() -> anyhow::Result<()> {
    // 準備
    let app = spawn_test_app().await?;
    let token = app.sign_in(ADMIN_EMAIL, ADMIN_PASSWORD).await?;
    let path = format!("/tenants/{}/access", app.tenant_id);

    // 実行
    let response = app.get_with_token(&path, &token).send().await?;
    let ResponseParts {
        status_code, body, ..
    } = split_response(response).await?;
    let body: serde_json::Value = serde_json::from_str(&body)?;

    // 検証
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!(true, body["data"]["granted"]);
    assert_eq!(app.tenant_id.to_string(), body["data"]["tenantId"]);
    assert_eq!(app.admin_id.to_string(), body["data"]["userId"]);

    Ok(())
}

/// APIキーで、所属するテナントへのアクセスが許可されることを確認
#[tokio::test]
async fn api_key_can_access_own_tenant() -> anyhow::Result<()> {
    // 準備
    let app = spawn_test_app().await?;
    let path = format!("/tenants/{}/access", app.tenant_id);

    // 実行
    let response = app.get_with_api_key(&path, API_KEY).send().await?;
    let ResponseParts {
        status_code, body, ..
    } = split_response(response).await?;
    let body: serde_json::Value = serde_json::from_str(&body)?;

    // 検証
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!("user", body["data"]["role"]);

    Ok(())
}

/// 異なるテナントへのアクセスが、認可エラーで応答されることを確認
#[tokio::test]
async fn user_can_not_access_different_tenant() -> anyhow::Result<()> {
    // 準備
    let app = spawn_test_app().await?;
    let token = app.sign_in(ADMIN_EMAIL, ADMIN_PASSWORD).await?;
    let path = format!("/tenants/{}/access", TenantId::default());

    // 実行
    let response = app.get_with_token(&path, &token).send().await?;
    let ResponseParts {
        status_code, body, ..
    } = split_response(response).await?;
    let body: serde_json::Value = serde_json::from_str(&body)?;

    // 検証
    assert_eq!(StatusCode::FORBIDDEN, status_code);
    assert_eq!("AuthorizationError", body["error"]["type"]);
    assert_eq!("Cannot access different tenant", body["error"]["message"]);
    assert_eq!(serde_json::json!(["tenant_access"]), body["error"]["required"]);

    Ok(())
}

/// 権限を持たないユーザーのアクセスが、不足している権限を含む認可エラーで応答されることを確認
#[tokio::test]
async fn user_without_permission_can_not_access_tenant() -> anyhow::Result<()> {
    // 準備
    let app = spawn_test_app().await?;
    let token = app.sign_in(READER_EMAIL, READER_PASSWORD).await?;
    let path = format!("/tenants/{}/access", app.tenant_id);

    // 実行
    let response = app.get_with_token(&path, &token).send().await?;
    let ResponseParts {
        status_code, body, ..
    } = split_response(response).await?;
    let body: serde_json::Value = serde_json::from_str(&body)?;

    // 検証
    assert_eq!(StatusCode::FORBIDDEN, status_code);
    assert_eq!(
        "Insufficient permissions. Missing: tenants:read",
        body["error"]["message"]
    );
    assert_eq!(serde_json::json!(["tenants:read"]), body["error"]["required"]);

    Ok(())
}

/// UUIDでないテナントIDが、検証エラーで応答されることを確認
#[tokio::test]
async fn malformed_tenant_id_responds_validation_error() -> anyhow::Result<()> {
    // 準備
    let app = spawn_test_app().await?;
    let token = app.sign_in(ADMIN_EMAIL, ADMIN_PASSWORD).await?;

    // 実行
    let response = app
        .get_with_token("/tenants/not-a-uuid/access", &token)
        .send()
        .await?;
    let ResponseParts {
        status_code, body, ..
    } = split_response(response).await?;
    let body: serde_json::Value = serde_json::from_str(&body)?;

    // 検証
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!("ValidationError", body["error"]["type"]);
    assert_eq!(
        "not-a-uuid is not a UUID formatted string",
        body["error"]["message"]
    );

    Ok(())
}
