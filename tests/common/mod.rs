#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use axum::response::Response;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use venuedesk::auth::{NewAccount, create_account};
use venuedesk::config::ServiceConfig;
use venuedesk::server::{AppState, create_router};
use venuedesk::store::{SqliteStore, Store};
use venuedesk::types::{Role, Tenant, User};

pub const TENANT: &str = "project-a";
pub const ADMIN_PASSWORD: &str = "admin-pass";

pub struct TestApp {
    pub temp_dir: TempDir,
    pub state: Arc<AppState>,
    pub router: Router,
}

impl TestApp {
    /// Fresh database with a default admin (`admin` / [`ADMIN_PASSWORD`]) in [`TENANT`].
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = SqliteStore::new(temp_dir.path().join("venuedesk.db")).expect("open store");
        store.initialize().expect("initialize schema");

        let state = Arc::new(AppState::new(Arc::new(store), ServiceConfig::default()));
        let router = create_router(state.clone());

        let app = Self {
            temp_dir,
            state,
            router,
        };
        app.add_user_in(TENANT, "admin", ADMIN_PASSWORD, Role::Admin, true);
        app
    }

    pub fn tenant(&self) -> Tenant {
        Tenant::new(TENANT).expect("tenant")
    }

    pub fn add_user(&self, username: &str, password: &str, role: Role) -> User {
        self.add_user_in(TENANT, username, password, role, false)
    }

    pub fn add_user_in(
        &self,
        tenant: &str,
        username: &str,
        password: &str,
        role: Role,
        is_default_admin: bool,
    ) -> User {
        let tenant = Tenant::new(tenant).expect("tenant");
        create_account(
            self.state.store.as_ref(),
            &self.state.config,
            &tenant,
            NewAccount {
                username,
                password,
                role,
                first_name: "Test",
                last_name: username,
                phone: "",
                email: "",
                is_default_admin,
            },
        )
        .expect("create account")
    }

    pub async fn send(
        &self,
        tenant: Option<&str>,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(tenant) = tenant {
            builder = builder
                .header("X-Project-Id", tenant)
                .header("X-Encrypted-Yw-ID", "identity-123");
        }
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// Sends a request in [`TENANT`] and decodes the JSON body (`Null` when empty).
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.send(Some(TENANT), method, uri, token, body).await;
        decode(response).await
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        self.login_in(TENANT, username, password).await
    }

    pub async fn login_in(&self, tenant: &str, username: &str, password: &str) -> String {
        let response = self
            .send(
                Some(tenant),
                Method::POST,
                "/api/auth/login",
                None,
                Some(serde_json::json!({ "username": username, "password": password })),
            )
            .await;
        let (status, body) = decode(response).await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().expect("token").to_string()
    }
}

pub async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub async fn decode(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let text = body_text(response).await;
    let value = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    (status, value)
}
