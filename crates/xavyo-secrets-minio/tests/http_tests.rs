//! End-to-end tests of the sanitized plugin against a mock MinIO admin API.

use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use xavyo_secrets_minio::{
    build_plugin, Database, DeleteUserRequest, InitializeRequest, LifecycleStep, NewUserRequest,
    PluginError, UsernameMetadata,
};

fn init_request(server: &MockServer) -> InitializeRequest {
    let config = json!({
        "url": server.uri(),
        "username": "root",
        "password": "rootpw-very-secret"
    });
    InitializeRequest {
        config: serde_json::from_value(config).unwrap(),
        verify_connection: true,
    }
}

#[tokio::test]
async fn test_create_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/minio/admin/v3/add-user"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/minio/admin/v3/set-user-or-group-policy"))
        .and(query_param("policyName", "readonly"))
        .and(query_param("isGroup", "false"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let plugin = build_plugin();
    plugin.initialize(init_request(&server)).await.unwrap();

    let response = plugin
        .new_user(
            NewUserRequest {
                username_config: UsernameMetadata::new("alice", "ro"),
                statements: vec![r#"{"SetPolicy":["readonly"]}"#.to_string()],
                password: "alice-pw".to_string(),
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let bound_user = requests[1]
        .url
        .query_pairs()
        .find(|(k, _)| k == "userOrGroup")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    assert_eq!(bound_user, response.username);
}

#[tokio::test]
async fn test_bind_failure_over_http_removes_user() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/minio/admin/v3/add-user"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/minio/admin/v3/set-user-or-group-policy"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "Code": "XMinioAdminNoSuchPolicy",
            "Message": "The canned policy does not exist."
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/minio/admin/v3/remove-user"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let plugin = build_plugin();
    plugin.initialize(init_request(&server)).await.unwrap();

    let err = plugin
        .new_user(
            NewUserRequest {
                username_config: UsernameMetadata::new("alice", "ro"),
                statements: vec![r#"{"SetPolicy":["missing"]}"#.to_string()],
                password: "alice-pw".to_string(),
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(err.to_string().contains("The canned policy does not exist."));
}

#[tokio::test]
async fn test_errors_never_leak_admin_password() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/minio/admin/v3/remove-user"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "Code": "SignatureDoesNotMatch",
            "Message": "signature computed with rootpw-very-secret does not match"
        })))
        .mount(&server)
        .await;

    let plugin = build_plugin();
    plugin.initialize(init_request(&server)).await.unwrap();

    let err = plugin
        .delete_user(
            DeleteUserRequest {
                username: "v-alice".to_string(),
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(!message.contains("rootpw-very-secret"), "leaked: {message}");
    assert!(message.contains("[Password]"));
    assert!(matches!(err, PluginError::Redacted { code: "BACKEND_ERROR", .. }));
    assert_eq!(err.step(), Some(LifecycleStep::RemoveUser));
}
