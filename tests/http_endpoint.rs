//! HTTP surface tests against a live listener.

mod common;

use std::sync::Arc;

use common::{spawn_server, Fixture};
use serde_json::Value;

#[tokio::test]
async fn test_client_config_endpoint() {
    let fixture = Fixture::new();
    fixture.write_provider("corp.json", "corp", "Corp SSO", true);
    fixture.write_config("Acme Chat", "");
    let service = Arc::new(fixture.load().unwrap());

    let (addr, shutdown) = spawn_server(Arc::clone(&service)).await;

    let res = reqwest::get(format!("http://{addr}/api/v1/config/client"))
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let json: Value = res.json().await.unwrap();
    assert_eq!(json["SiteName"], "Acme Chat");
    assert_eq!(json["EnableSignUpWithOAuth"], "true");
    assert_eq!(json["OAuthProviderDisplayNames"][0], "Corp SSO");

    shutdown.trigger();
}

#[tokio::test]
async fn test_status_endpoint_follows_reload() {
    let fixture = Fixture::new();
    let path = fixture.write_config("Before", "");
    let service = Arc::new(fixture.load().unwrap());
    let (addr, shutdown) = spawn_server(Arc::clone(&service)).await;

    let status: Value = reqwest::get(format!("http://{addr}/api/v1/config/client/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["path"], path.display().to_string());
    assert_eq!(status["last_modified"], service.last_modified());

    fixture.write_config("After", "");
    service.reload().unwrap();

    let client: Value = reqwest::get(format!("http://{addr}/api/v1/config/client"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(client["SiteName"], "After");

    shutdown.trigger();
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let fixture = Fixture::new();
    fixture.write_config("Acme Chat", "");
    let service = Arc::new(fixture.load().unwrap());
    let (addr, shutdown) = spawn_server(service).await;

    let res = reqwest::get(format!("http://{addr}/api/v1/config"))
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    shutdown.trigger();
}
