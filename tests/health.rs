mod common;

use anyhow::Result;
use axum::http::StatusCode;

use common::TestApp;

#[tokio::test]
async fn health_endpoint_reports_db_ok() -> Result<()> {
    let t = TestApp::new().await?;

    let (status, body) = t.send("GET", "/api/health", None, None).await?;
    assert_eq!(status, StatusCode::OK, "health endpoint did not return 200");
    assert_eq!(body["db_ok"], true, "expected db_ok: true, got: {}", body);

    Ok(())
}

#[tokio::test]
async fn me_requires_a_known_actor() -> Result<()> {
    let t = TestApp::new().await?;

    let (status, _) = t.send("GET", "/me", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let ghost = t.token(uuid::Uuid::new_v4())?;
    let (status, _) = t.send("GET", "/me", Some(&ghost), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = t.send("GET", "/me", Some("not-a-jwt"), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let actor = t.actor("Owner@Example.com ", hoa_portal::authz::Role::User).await?;
    let token = t.token(actor.id)?;
    let (status, body) = t.send("GET", "/me", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "owner@example.com");
    assert_eq!(body["role"], "user");
    assert_eq!(body["permissions"], serde_json::json!([]));

    Ok(())
}
