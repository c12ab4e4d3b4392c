//! End-to-end routing tests for the gateway.

use std::sync::Arc;

use boondock::config::DiscoveryKind;
use boondock::discovery::StaticBackend;
use boondock::lifecycle::Gateway;

mod common;

use common::{client, service, start_echo_backend, test_config, TestGateway};

#[tokio::test]
async fn test_routed_request_keeps_host_and_query() {
    let users = start_echo_backend("users").await;

    let backend = Arc::new(StaticBackend::new());
    backend.put("route/https/api.test/users|:id", r#"{"service":"users"}"#);
    backend.register_service("users", service(users));

    let gateway = TestGateway::start(test_config(), backend).await;
    let (status, body) = gateway.get(&client(), "api.test", "/users/42?x=1").await;

    assert_eq!(status, 200);
    assert_eq!(body, "users api.test /users/42?x=1");
}

#[tokio::test]
async fn test_wildcard_host_and_suffix_path() {
    let files = start_echo_backend("files").await;

    let backend = Arc::new(StaticBackend::new());
    backend.put("route/https/*.cdn.test/static*", r#"{"service":"files"}"#);
    backend.register_service("files", service(files));

    let gateway = TestGateway::start(test_config(), backend).await;
    let (status, body) = gateway.get(&client(), "eu.cdn.test", "/static-v2/app.js").await;

    assert_eq!(status, 200);
    assert_eq!(body, "files eu.cdn.test /static-v2/app.js");
}

#[tokio::test]
async fn test_unknown_host_goes_to_fallback_destination() {
    let fallback = start_echo_backend("fallback").await;

    let backend = Arc::new(StaticBackend::new());
    backend.put("route/https/api.test/users", r#"{"service":"users"}"#);

    let mut config = test_config();
    config.fallback.host = fallback.to_string();
    config.fallback.query = "src=gw".to_string();

    let gateway = TestGateway::start(config, backend).await;
    let client = client();

    let (status, body) = gateway.get(&client, "elsewhere.test", "/some/page?q=1").await;
    assert_eq!(status, 200);
    assert_eq!(body, "fallback elsewhere.test /some/page?src=gw&q=1");

    // A known host at the bare root path also goes to the fallback destination.
    let (status, body) = gateway.get(&client, "api.test", "/").await;
    assert_eq!(status, 200);
    assert_eq!(body, "fallback api.test /?src=gw");
}

#[tokio::test]
async fn test_unmatched_path_goes_to_fallback_service() {
    let webapp = start_echo_backend("webapp").await;

    let backend = Arc::new(StaticBackend::new());
    backend.put("route/https/api.test/users", r#"{"service":"users"}"#);
    backend.register_service("webapp", service(webapp));

    let gateway = TestGateway::start(test_config(), backend).await;
    let (status, body) = gateway.get(&client(), "api.test", "/settings/profile").await;

    assert_eq!(status, 200);
    assert_eq!(body, "webapp api.test /settings/profile");
}

#[tokio::test]
async fn test_unresolvable_service_is_bad_gateway() {
    let backend = Arc::new(StaticBackend::new());
    backend.put("route/https/api.test/ghost", r#"{"service":"ghost"}"#);

    let gateway = TestGateway::start(test_config(), backend).await;
    let (status, body) = gateway.get(&client(), "api.test", "/ghost").await;

    assert_eq!(status, 502);
    assert_eq!(body, "Bad Gateway");
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let down = common::closed_port().await;

    let backend = Arc::new(StaticBackend::new());
    backend.put("route/https/api.test/down", r#"{"service":"down"}"#);
    backend.register_service("down", service(down));

    let gateway = TestGateway::start(test_config(), backend).await;
    let (status, _) = gateway.get(&client(), "api.test", "/down").await;

    assert_eq!(status, 502);
}

#[tokio::test]
async fn test_malformed_entries_are_skipped() {
    let users = start_echo_backend("users").await;

    let backend = Arc::new(StaticBackend::new());
    backend.put("route/https/api.test/users", r#"{"service":"users"}"#);
    backend.put("route/https/api.test/broken", "not json");
    backend.put("route/https", r#"{"service":"users"}"#);
    backend.register_service("users", service(users));

    let gateway = TestGateway::start(test_config(), backend).await;
    assert_eq!(gateway.table.snapshot().route_count(), 1);

    let (status, body) = gateway.get(&client(), "api.test", "/users").await;
    assert_eq!(status, 200);
    assert_eq!(body, "users api.test /users");
}

#[tokio::test]
async fn test_reload_swaps_table() {
    let v1 = start_echo_backend("v1").await;
    let v2 = start_echo_backend("v2").await;

    let backend = Arc::new(StaticBackend::new());
    backend.put("route/https/api.test/orders", r#"{"service":"orders-v1"}"#);
    backend.register_service("orders-v1", service(v1));
    backend.register_service("orders-v2", service(v2));

    let gateway = TestGateway::start(test_config(), backend.clone()).await;
    let client = client();

    let (_, body) = gateway.get(&client, "api.test", "/orders").await;
    assert_eq!(body, "v1 api.test /orders");

    backend.put("route/https/api.test/orders", r#"{"service":"orders-v2"}"#);
    // Not visible until the next rebuild publishes.
    let (_, body) = gateway.get(&client, "api.test", "/orders").await;
    assert_eq!(body, "v1 api.test /orders");

    let before = gateway.table.version();
    gateway.reloader.reload().await.unwrap();
    assert!(gateway.table.version() > before);

    let (_, body) = gateway.get(&client, "api.test", "/orders").await;
    assert_eq!(body, "v2 api.test /orders");
}

#[tokio::test]
async fn test_file_discovery_backend() {
    let users = start_echo_backend("users").await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.toml");
    std::fs::write(
        &path,
        format!(
            r#"
[[entries]]
key = "route/https/api.test/users|:id"
value = '{{"service": "users"}}'

[services.users]
address = "{}"
port = {}
"#,
            users.ip(),
            users.port()
        ),
    )
    .unwrap();

    let mut config = test_config();
    config.discovery.kind = DiscoveryKind::File;
    config.discovery.path = Some(path.to_string_lossy().into_owned());
    config.discovery.watch = false;

    let gateway = TestGateway::start_gateway(Gateway::new(config).unwrap()).await;
    let (status, body) = gateway.get(&client(), "api.test", "/users/7").await;

    assert_eq!(status, 200);
    assert_eq!(body, "users api.test /users/7");
}
