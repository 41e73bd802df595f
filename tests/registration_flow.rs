//! Full-stack registration flow against a real listener.
//!
//! Orchestration mirrors production startup: bind the app on an ephemeral
//! port, block on the readiness prober until the status endpoint answers,
//! then drive the flow over the wire.

use cadastro::config::{Config, SecurityConfig};
use cadastro::probe;

async fn spawn_server() -> String {
    let mut config = Config::default();
    config.general.database_url = "sqlite::memory:".to_string();
    config.observability.metrics_enabled = false;
    config.security = SecurityConfig {
        argon2_memory_cost_kib: 1024,
        argon2_time_cost: 1,
        argon2_parallelism: 1,
    };

    let state = cadastro::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    let app = cadastro::api::router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind ephemeral port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn registration_flow() {
    let base_url = spawn_server().await;

    probe::wait_for_http_ok(&format!("{base_url}/api/v1/status"), 100)
        .await
        .expect("service never became ready");

    let client = reqwest::Client::new();

    // Create the account
    let response = client
        .post(format!("{base_url}/api/v1/users"))
        .json(&serde_json::json!({
            "username": "RegistrationFlow",
            "email": "registration.flow@example.com",
            "password": "RegistrationFlowPassword",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["username"], "RegistrationFlow");
    assert_eq!(body["email"], "registration.flow@example.com");
    assert_ne!(body["password"], "RegistrationFlowPassword");
    assert_eq!(body["features"], serde_json::json!(["read:activation_token"]));

    let id = uuid::Uuid::parse_str(body["id"].as_str().unwrap()).unwrap();
    assert_eq!(id.get_version_num(), 4);

    // Activate the account (stub: acknowledges with an empty body)
    let response = client
        .post(format!("{base_url}/api/v1/activation/some-token"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // The account is visible under any casing of its username
    let response = client
        .get(format!("{base_url}/api/v1/users/registrationflow"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["username"], "RegistrationFlow");
}

#[tokio::test]
async fn prober_gives_up_when_the_service_never_answers() {
    // Port 9 (discard) is about as dead as it gets.
    let err = probe::wait_for_http_ok("http://127.0.0.1:9/api/v1/status", 2)
        .await
        .unwrap_err();

    assert_eq!(err.attempts, 2);
}
