#![allow(dead_code)]

use secvis_sync::ApiConfig;
use serde_json::{Value, json};
use wiremock::matchers::{basic_auth, body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CUSTOMER: &str = "cust-1";
pub const TOKEN: &str = "test-token";

pub fn mock_config(server: &MockServer) -> ApiConfig {
    ApiConfig {
        client_id: "test_client".to_string(),
        client_secret: "test_secret".to_string(),
        customer_id: CUSTOMER.to_string(),
        api_base_url: server.uri(),
        token_base_url: server.uri(),
        ..Default::default()
    }
}

pub fn token_body(token: &str, expires_in: i64) -> Value {
    json!({
        "access_token": token,
        "token_type": "bearer",
        "expires_in": expires_in
    })
}

/// Token endpoint handing out `TOKEN` for an hour.
pub async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/iroh/oauth2/token"))
        .and(basic_auth("test_client", "test_secret"))
        .and(body_string("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(TOKEN, 3600)))
        .mount(server)
        .await;
}

pub fn page(items: Value, has_next: bool, next: Option<&str>, end_cursor: Option<&str>) -> Value {
    json!({
        "items": items,
        "pageInfo": {
            "hasNextPage": has_next,
            "next": next,
            "endCursor": end_cursor
        }
    })
}

pub fn last_page(items: Value, end_cursor: Option<&str>) -> Value {
    page(items, false, None, end_cursor)
}

pub fn ids(records: &[secvis_types::Record]) -> Vec<String> {
    records.iter().map(|r| r.id().to_string()).collect()
}
