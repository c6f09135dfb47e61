use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use studypass_access::{
    InMemoryAccessStore, InMemoryTenantDirectory, Institution, RefreshConfig, SessionRefresher,
    UserIdentity,
};
use studypass_auth::{Feature, PermissionSet, SecretKey, SubscriptionRecord};
use studypass_core::{PermissionId, PlanId, TenantId, UserId};

const SECRET: &str = "black-box-secret";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(directory: InMemoryTenantDirectory, config: RefreshConfig) -> Self {
        // Same router as prod, backed by in-memory partitions on an ephemeral port.
        let refresher = SessionRefresher::new(directory, config);
        let app = studypass_api::app::build_app(refresher, SecretKey::new(SECRET));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn directory() -> InMemoryTenantDirectory {
    let user = UserId::new(7);
    let store = InMemoryAccessStore::new()
        .with_user(UserIdentity {
            id: user,
            full_name: Some("Ana Souza".to_string()),
            email: Some("ana@example.com".to_string()),
            course: None,
            plan_id: Some(PlanId::new(2)),
            exams_id: Some(11),
        })
        .with_subscription(
            user,
            SubscriptionRecord {
                subscription_id: 1,
                plan_id: PlanId::new(2),
                permission_id: Some(PermissionId::new(3)),
                expiry_date: Some(Utc::now() + ChronoDuration::days(30)),
                canceled_at: None,
                latest_payment: None,
            },
        )
        .with_permission_set(PermissionId::NO_ACCESS, PermissionSet::none())
        .with_permission_set(
            PermissionId::new(3),
            PermissionSet::from_features([Feature::UserExams, Feature::StudyPlan]),
        )
        .with_institution(Institution {
            institution_type: Some("school".to_string()),
            admin_user_id: Some(user),
        })
        .arc();

    InMemoryTenantDirectory::new().with_partition(TenantId::parse("public").unwrap(), store)
}

fn mint_token(secret: &str, claims: Value) -> String {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn decode_claims(token: &str) -> Value {
    let mut validation = jsonwebtoken::Validation::new(Algorithm::HS256);
    validation.required_spec_claims.clear();
    jsonwebtoken::decode::<Value>(
        token,
        &jsonwebtoken::DecodingKey::from_secret(SECRET.as_bytes()),
        &validation,
    )
    .expect("refreshed token should verify")
    .claims
}

async fn post_refresh(server: &TestServer, authorization: Option<String>) -> reqwest::Response {
    let client = reqwest::Client::new();
    let mut req = client.post(format!("{}/token/refresh", server.base_url));
    if let Some(value) = authorization {
        req = req.header("Authorization", value);
    }
    req.send().await.unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let server = TestServer::spawn(directory(), RefreshConfig::default()).await;

    let res = reqwest::get(format!("{}/health", server.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn refresh_requires_a_valid_token() {
    let server = TestServer::spawn(directory(), RefreshConfig::default()).await;

    let res = post_refresh(&server, None).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "message": "Unauthorized" }));

    let forged = mint_token("wrong-secret", json!({ "id": 7, "tenant_id": "public" }));
    let res = post_refresh(&server, Some(format!("Bearer {forged}"))).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_returns_new_token_and_pendency() {
    let server = TestServer::spawn(directory(), RefreshConfig::default()).await;

    let token = mint_token(
        SECRET,
        json!({ "id": 7, "tenant_id": "portal", "full_name": "stale name", "roles": ["x"] }),
    );
    let res = post_refresh(&server, Some(format!("Bearer {token}"))).await;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["pending_profile_survey"], json!(true));
    assert_eq!(body["pending_user_exams"], json!(true));

    let claims = decode_claims(body["token"].as_str().unwrap());
    assert_eq!(claims["id"], json!(7));
    assert_eq!(claims["tenant_id"], json!("public"));
    assert_eq!(claims["full_name"], json!("Ana Souza"));
    assert_eq!(claims["exams_id"], json!([11]));
    assert_eq!(claims["referral_code"], json!(944_234_761_407u64));
    assert_eq!(claims["is_admin"], json!(true));
    assert_eq!(claims["institution_type"], json!("school"));
    assert_eq!(claims["permissions"]["user_exams"], json!(true));
    assert_eq!(claims["permissions"]["study_plan"], json!(true));
    assert_eq!(claims["permissions"]["essay"], json!(false));
    assert!(claims.get("roles").is_none());
}

#[tokio::test]
async fn token_issued_from_null_permission_columns_refreshes() {
    let server = TestServer::spawn(directory(), RefreshConfig::default()).await;

    let token = mint_token(
        SECRET,
        json!({
            "id": 7,
            "tenant_id": "public",
            "permissions": { "availability": true, "performance": null },
            "exams_id": [null]
        }),
    );
    let res = post_refresh(&server, Some(format!("Bearer {token}"))).await;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await.unwrap();
    let claims = decode_claims(body["token"].as_str().unwrap());
    assert_eq!(claims["permissions"]["performance"], json!(false));
    assert_eq!(claims["permissions"]["user_exams"], json!(true));
}

#[tokio::test]
async fn raw_token_without_bearer_prefix_is_accepted() {
    let server = TestServer::spawn(directory(), RefreshConfig::default()).await;

    let token = mint_token(SECRET, json!({ "id": 7, "tenant_id": "public" }));
    let res = post_refresh(&server, Some(token)).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn pipeline_errors_map_to_status_and_message() {
    let server = TestServer::spawn(directory(), RefreshConfig::default()).await;

    let no_tenant = mint_token(SECRET, json!({ "id": 7 }));
    let res = post_refresh(&server, Some(format!("Bearer {no_tenant}"))).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "message": "Missing tenant_id" }));

    let unknown_tenant = mint_token(SECRET, json!({ "id": 7, "tenant_id": "x" }));
    let res = post_refresh(&server, Some(format!("Bearer {unknown_tenant}"))).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "message": "Invalid schema: x" }));

    let unknown_user = mint_token(SECRET, json!({ "id": 99, "tenant_id": "public" }));
    let res = post_refresh(&server, Some(format!("Bearer {unknown_user}"))).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "message": "Invalid username or password" }));
}

#[tokio::test]
async fn default_tenant_applies_when_configured() {
    let config = RefreshConfig::default().with_default_tenant(TenantId::parse("portal").unwrap());
    let server = TestServer::spawn(directory(), config).await;

    let token = mint_token(SECRET, json!({ "id": 7 }));
    let res = post_refresh(&server, Some(format!("Bearer {token}"))).await;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await.unwrap();
    let claims = decode_claims(body["token"].as_str().unwrap());
    assert_eq!(claims["tenant_id"], json!("public"));
}

#[tokio::test]
async fn configuration_failures_render_generic_message() {
    let store = InMemoryAccessStore::new()
        .with_user(UserIdentity {
            id: UserId::new(7),
            full_name: None,
            email: None,
            course: None,
            plan_id: None,
            exams_id: None,
        })
        .with_permission_set(PermissionId::NO_ACCESS, PermissionSet::none())
        .arc();
    let directory =
        InMemoryTenantDirectory::new().with_partition(TenantId::parse("public").unwrap(), store);
    let server = TestServer::spawn(directory, RefreshConfig::default()).await;

    let token = mint_token(SECRET, json!({ "id": 7, "tenant_id": "public" }));
    let res = post_refresh(&server, Some(format!("Bearer {token}"))).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "message": "Internal server error" }));
}
