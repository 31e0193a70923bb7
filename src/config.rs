use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Upper bound for request bodies, spreadsheet uploads included.
    pub max_bytes: usize,
}

impl Config {
    pub fn load() -> Self {
        dotenvy::dotenv().ok();

        Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(5000),
                environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            },
            database: DatabaseConfig {
                path: env::var("DB_PATH").unwrap_or_else(|_| "database.db".to_string()),
                max_connections: env::var("DB_MAX_CONNS")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(5),
            },
            upload: UploadConfig {
                max_bytes: env::var("MAX_UPLOAD_BYTES")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(10 * 1024 * 1024), // 10 MiB
            },
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
