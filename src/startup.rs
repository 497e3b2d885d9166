use actix_files as fs;
use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::PgPool;
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{AuthService, PgRefreshTokenStore, RefreshTokenStore};
use crate::chirps::{ChirpStore, PgChirpStore};
use crate::configuration::Settings;
use crate::logger::LoggerMiddleware;
use crate::metrics::{HitCounter, MetricsMiddleware};
use crate::middleware::JwtMiddleware;
use crate::routes::{
    create_chirp, create_user, delete_chirp, get_chirp, get_current_user, health_check,
    list_chirps, login, metrics, polka_webhook, refresh, reset, revoke, revoke_all,
};
use crate::users::{PgUserStore, UserStore};

/// Storage backends shared by every worker
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub refresh_tokens: Arc<dyn RefreshTokenStore>,
    pub chirps: Arc<dyn ChirpStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool, refresh_token_lifetime: chrono::Duration) -> Self {
        Self {
            users: Arc::new(PgUserStore::new(pool.clone())),
            refresh_tokens: Arc::new(PgRefreshTokenStore::new(
                pool.clone(),
                refresh_token_lifetime,
            )),
            chirps: Arc::new(PgChirpStore::new(pool)),
        }
    }
}

pub fn run(
    listener: TcpListener,
    settings: &Settings,
    stores: Stores,
) -> Result<Server, std::io::Error> {
    let auth = AuthService::new(
        stores.users.clone(),
        stores.refresh_tokens.clone(),
        &settings.jwt,
        &settings.polka,
    );
    let hit_counter = Arc::new(HitCounter::new());

    let auth_data = web::Data::new(auth.clone());
    let users_data: web::Data<dyn UserStore> = web::Data::from(stores.users);
    let refresh_tokens_data: web::Data<dyn RefreshTokenStore> =
        web::Data::from(stores.refresh_tokens);
    let chirps_data: web::Data<dyn ChirpStore> = web::Data::from(stores.chirps);
    let hit_counter_data = web::Data::from(hit_counter.clone());
    let application_data = web::Data::new(settings.application.clone());

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(auth_data.clone())
            .app_data(users_data.clone())
            .app_data(refresh_tokens_data.clone())
            .app_data(chirps_data.clone())
            .app_data(hit_counter_data.clone())
            .app_data(application_data.clone())

            // Public routes
            .route("/api/healthz", web::get().to(health_check))
            .route("/api/users", web::post().to(create_user))
            .route("/api/login", web::post().to(login))
            .route("/api/refresh", web::post().to(refresh))
            .route("/api/revoke", web::post().to(revoke))
            .route("/api/polka/webhooks", web::post().to(polka_webhook))

            // Chirps (create and delete check the access token themselves)
            .route("/api/chirps", web::get().to(list_chirps))
            .route("/api/chirps", web::post().to(create_chirp))
            .route("/api/chirps/{chirp_id}", web::get().to(get_chirp))
            .route("/api/chirps/{chirp_id}", web::delete().to(delete_chirp))

            // Admin
            .route("/admin/metrics", web::get().to(metrics))
            .route("/admin/reset", web::post().to(reset))

            // Protected routes (require JWT authentication)
            .service(
                web::resource("/api/me")
                    .wrap(JwtMiddleware::new(auth.clone()))
                    .route(web::get().to(get_current_user)),
            )
            .service(
                web::resource("/api/revoke_all")
                    .wrap(JwtMiddleware::new(auth.clone()))
                    .route(web::post().to(revoke_all)),
            )

            // Static file serving, counted
            .service(
                web::scope("/app")
                    .wrap(MetricsMiddleware::new(hit_counter.clone()))
                    .service(fs::Files::new("/", "./public").index_file("index.html")),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
