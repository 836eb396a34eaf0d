#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Body,
    http::{header, request, Method, Request, StatusCode},
    Router,
};
use club_directory::{
    config::Config,
    lifecycle,
    store::{MemoryStore, Store},
    AppState,
};
use envconfig::Envconfig;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

pub const API_KEY: &str = "test-api-key";
pub const JWT_SECRET: &str = "Y2x1Yi1kaXJlY3RvcnktdGVzdC1zaWduaW5nLWtleS0wMTIzNDU2Nzg5";
pub const ADMIN_EMAIL: &str = "admin@uni.edu";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const PASSWORD: &str = "club-password";

/// The full router on a fresh in-memory store, with an administrator account.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub assets: TempDir,
    pub admin_token: String,
}

/// A request builder that already carries the API key.
pub fn builder(method: Method, uri: &str) -> request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-api-key", API_KEY)
}

impl TestApp {
    pub async fn new() -> TestApp {
        TestApp::with_env(&[]).await
    }

    /// `overrides` replace or extend the default test environment.
    pub async fn with_env(overrides: &[(&str, &str)]) -> TestApp {
        let assets = tempfile::tempdir().unwrap();

        let mut env = HashMap::from([
            ("JWT_SECRET".to_string(), JWT_SECRET.to_string()),
            ("API_KEY".to_string(), API_KEY.to_string()),
            ("PUBLIC_URL".to_string(), "http://clubs.test".to_string()),
            (
                "ASSETS_DIR".to_string(),
                assets.path().to_string_lossy().into_owned(),
            ),
        ]);
        for (key, value) in overrides {
            env.insert(key.to_string(), value.to_string());
        }
        let config = Config::init_from_hashmap(&env).unwrap();

        let store = Arc::new(MemoryStore::new());
        lifecycle::bootstrap_admin(store.as_ref(), ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .unwrap();

        let state = AppState::new(&config, store.clone() as Arc<dyn Store>).unwrap();
        let mut app = TestApp {
            router: club_directory::app(state),
            store,
            assets,
            admin_token: String::new(),
        };
        app.admin_token = app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        app
    }

    pub async fn call(&self, req: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut req = builder(Method::GET, uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.call(req.body(Body::empty()).unwrap()).await
    }

    pub async fn send_json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        let mut req = builder(method, uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.call(req.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .send_json(
                Method::POST,
                "/login",
                None,
                json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Signs a club up and returns its read-model.
    pub async fn signup(&self, email: &str, club_name: &str) -> Value {
        let (status, body) = self
            .send_json(
                Method::POST,
                "/signup",
                None,
                json!({
                    "email": email,
                    "password": PASSWORD,
                    "club_name": club_name,
                    "description": format!("{club_name} meets weekly"),
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");
        body["data"].clone()
    }

    pub async fn verify(&self, club_id: &str) {
        let (status, body) = self
            .send_json(
                Method::PATCH,
                &format!("/admin/clubs/{club_id}/status"),
                Some(&self.admin_token),
                json!({ "is_verified": true }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "verification failed: {body}");
    }

    /// A verified club: `(id, token)`.
    pub async fn verified_club(&self, email: &str, club_name: &str) -> (String, String) {
        let club = self.signup(email, club_name).await;
        let id = club["id"].as_str().unwrap().to_string();
        self.verify(&id).await;
        (id, self.login(email, PASSWORD).await)
    }

    pub async fn create_event(
        &self,
        token: &str,
        club_id: &str,
        title: &str,
        date: &str,
    ) -> (StatusCode, Value) {
        self.send_json(
            Method::POST,
            "/events",
            Some(token),
            event_body(club_id, title, date),
        )
        .await
    }
}

pub fn event_body(club_id: &str, title: &str, date: &str) -> Value {
    json!({
        "title": title,
        "description": "Everyone is welcome",
        "clubId": club_id,
        "date": date,
        "startTime": "18:00",
        "endTime": "20:00",
        "duration": 2,
        "locationType": "on-campus",
        "location": "Student Union, Room 4",
        "tags": ["social", "food"],
        "capacity": 40
    })
}
