use std::env;
use std::net::SocketAddr;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEV_JWT_SECRET: &str = "tessera-dev-secret-change-me";

pub struct Config {
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
}

impl Config {
    pub fn from_env() -> Self {
        let database_url = env::var("DATABASE_URL").ok();

        let bind_addr = env::var("BIND_ADDR")
            .ok()
            .and_then(|addr| addr.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8000)));

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) => secret,
            Err(_) => {
                if env::var("RUST_ENV").as_deref() == Ok("production") {
                    panic!("JWT_SECRET must be set in production");
                }
                tracing::warn!("JWT_SECRET not set, using the development fallback");
                DEV_JWT_SECRET.to_string()
            }
        };

        Self {
            database_url,
            bind_addr,
            jwt_secret,
        }
    }
}
