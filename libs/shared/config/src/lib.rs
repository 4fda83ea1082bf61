use std::env;
use std::net::SocketAddr;
use tracing::warn;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub server_host: String,
    pub server_port: u16,
    pub seed_demo_data: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| {
                    warn!("SERVER_HOST not set, using default");
                    DEFAULT_HOST.to_string()
                }),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|port| match port.parse::<u16>() {
                    Ok(port) => Some(port),
                    Err(_) => {
                        warn!("SERVER_PORT '{}' is not a valid port, using default", port);
                        None
                    }
                })
                .unwrap_or(DEFAULT_PORT),
            seed_demo_data: env::var("SEED_DEMO_DATA")
                .map(|value| parse_flag(&value))
                .unwrap_or(false),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.jwt_secret.is_empty()
    }

    /// Socket address the HTTP server binds to. Falls back to all interfaces
    /// when the configured host is not an IP literal.
    pub fn bind_address(&self) -> SocketAddr {
        format!("{}:{}", self.server_host, self.server_port)
            .parse()
            .unwrap_or_else(|_| {
                warn!("SERVER_HOST '{}' is not an IP address, binding to {}", self.server_host, DEFAULT_HOST);
                SocketAddr::from(([0, 0, 0, 0], self.server_port))
            })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            server_host: DEFAULT_HOST.to_string(),
            server_port: DEFAULT_PORT,
            seed_demo_data: false,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
