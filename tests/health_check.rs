//! Integration tests for the public and admin endpoints

use chirpy::auth::{InMemoryRefreshTokenStore, RefreshTokenStore};
use chirpy::chirps::{ChirpStore, InMemoryChirpStore};
use chirpy::configuration::{
    ApplicationSettings, DatabaseSettings, JwtSettings, PolkaSettings, Settings,
};
use chirpy::startup::{run, Stores};
use chirpy::users::{InMemoryUserStore, User};
use std::net::TcpListener;
use std::sync::Arc;

pub struct TestApp {
    pub address: String,
    pub users: Arc<InMemoryUserStore>,
    pub refresh_tokens: Arc<InMemoryRefreshTokenStore>,
    pub chirps: Arc<InMemoryChirpStore>,
}

fn spawn_app(platform: &str) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let settings = Settings {
        database: DatabaseSettings {
            username: "postgres".to_string(),
            password: "password".to_string(),
            port: 5432,
            host: "localhost".to_string(),
            database_name: "chirpy".to_string(),
        },
        application: ApplicationSettings {
            host: "127.0.0.1".to_string(),
            port,
            platform: platform.to_string(),
        },
        jwt: JwtSettings {
            secret: "integration-test-secret".to_string(),
            refresh_token_expiry: 3600,
        },
        polka: PolkaSettings {
            api_key: "polka-key".to_string(),
        },
    };

    let users = Arc::new(InMemoryUserStore::new());
    let refresh_tokens = Arc::new(InMemoryRefreshTokenStore::new(
        settings.jwt.refresh_token_lifetime(),
    ));

    let chirps = Arc::new(InMemoryChirpStore::new());
    let stores = Stores {
        users: users.clone(),
        refresh_tokens: refresh_tokens.clone(),
        chirps: chirps.clone(),
    };

    let server = run(listener, &settings, stores).expect("Failed to create server");

    let _ = tokio::spawn(async move {
        let _ = server.await;
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        users,
        refresh_tokens,
        chirps,
    }
}

impl TestApp {
    async fn hits(&self) -> String {
        reqwest::Client::new()
            .get(&format!("{}/admin/metrics", self.address))
            .send()
            .await
            .expect("Failed to execute request")
            .text()
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn health_check_works() {
    let app = spawn_app("dev");

    let response = reqwest::Client::new()
        .get(&format!("{}/api/healthz", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert_eq!(
        response.headers()["content-type"],
        "text/plain; charset=utf-8"
    );
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn app_serves_static_index() {
    let app = spawn_app("dev");

    let response = reqwest::Client::new()
        .get(&format!("{}/app/", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert!(response.text().await.unwrap().contains("Welcome to Chirpy"));
}

#[tokio::test]
async fn metrics_count_only_app_requests() {
    let app = spawn_app("dev");
    let client = reqwest::Client::new();

    assert_eq!(app.hits().await, "Hits: 0\n");

    for _ in 0..3 {
        client
            .get(&format!("{}/app/", app.address))
            .send()
            .await
            .expect("Failed to execute request");
    }
    client
        .get(&format!("{}/api/healthz", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    let response = client
        .get(&format!("{}/admin/metrics", app.address))
        .send()
        .await
        .expect("Failed to execute request");
    assert!(response.status().is_success());
    assert_eq!(
        response.headers()["content-type"],
        "text/plain; charset=utf-8"
    );
    assert_eq!(response.text().await.unwrap(), "Hits: 3\n");
}

#[tokio::test]
async fn reset_wipes_users_and_sessions_in_dev() {
    let app = spawn_app("dev");
    let user = User::new("walt@breakingbad.com", "$argon2id$unused");
    let user_id = user.id;
    app.users.insert(user).await;
    let token = app.refresh_tokens.issue(user_id).await.unwrap();
    let chirp = app.chirps.create(user_id, "hello").await.unwrap();
    reqwest::get(&format!("{}/app/", app.address))
        .await
        .expect("Failed to execute request");
    assert_eq!(app.hits().await, "Hits: 1\n");

    let response = reqwest::Client::new()
        .post(&format!("{}/admin/reset", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(200, response.status().as_u16());
    assert_eq!(response.text().await.unwrap(), "Users reset to 0");
    assert!(app.users.get(user_id).await.is_none());
    assert!(app.refresh_tokens.lookup(&token).await.is_err());
    assert!(app.chirps.get(chirp.id).await.is_err());
    assert_eq!(app.hits().await, "Hits: 0\n");
}

#[tokio::test]
async fn reset_is_forbidden_outside_dev() {
    let app = spawn_app("production");
    let user = User::new("walt@breakingbad.com", "$argon2id$unused");
    let user_id = user.id;
    app.users.insert(user).await;

    let response = reqwest::Client::new()
        .post(&format!("{}/admin/reset", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(403, response.status().as_u16());
    assert!(app.users.get(user_id).await.is_some());
}
