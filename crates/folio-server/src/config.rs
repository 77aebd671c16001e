//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use folio_content::countries::DEFAULT_COUNTRIES_URL;
use folio_content::TokenIdentityProvider;
use folio_shared::constants::{APP_NAME, DEFAULT_HTTP_PORT, MAX_UPLOAD_SIZE};

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite file holding the content tree.
    /// Env: `DATABASE_PATH`
    /// Default: the platform data directory.
    pub database_path: Option<PathBuf>,

    /// Filesystem path where uploaded files are stored.
    /// Env: `BLOB_STORAGE_PATH`
    /// Default: `./blobs`
    pub blob_storage_path: PathBuf,

    /// Base URL under which `/blobs/...` links are handed out.
    /// Env: `PUBLIC_BASE_URL`
    /// Default: `http://localhost:8080`
    pub public_base_url: String,

    /// Maximum upload size in bytes.
    /// Env: `MAX_BLOB_SIZE`
    /// Default: 20 MiB
    pub max_blob_size: usize,

    /// Hosted image service for the profile and home hero images.
    /// Env: `IMAGE_HOST_URL`
    /// Default: none (everything goes to the local blob store).
    pub image_host_url: Option<String>,

    /// Unsigned upload preset for the image host.
    /// Env: `IMAGE_HOST_PRESET`
    pub image_host_preset: String,

    /// Env: `COUNTRIES_API_URL`
    pub countries_api_url: String,

    /// Bearer tokens accepted as identities, `token=uid:email` separated by
    /// commas.
    /// Env: `AUTH_TOKENS`
    pub auth_tokens: Vec<String>,

    /// Uids that get the admin role.
    /// Env: `ADMIN_UIDS` (comma separated)
    pub admin_uids: Vec<String>,

    /// Env: `SITE_NAME`
    /// Default: [`APP_NAME`]
    pub site_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: None,
            blob_storage_path: PathBuf::from("./blobs"),
            public_base_url: format!("http://localhost:{DEFAULT_HTTP_PORT}"),
            max_blob_size: MAX_UPLOAD_SIZE,
            image_host_url: None,
            image_host_preset: String::new(),
            countries_api_url: DEFAULT_COUNTRIES_URL.to_string(),
            auth_tokens: Vec::new(),
            admin_uids: Vec::new(),
            site_name: APP_NAME.to_string(),
        }
    }
}

// Tokens stay out of logs.
impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_addr", &self.http_addr)
            .field("database_path", &self.database_path)
            .field("blob_storage_path", &self.blob_storage_path)
            .field("public_base_url", &self.public_base_url)
            .field("max_blob_size", &self.max_blob_size)
            .field("image_host_url", &self.image_host_url)
            .field("countries_api_url", &self.countries_api_url)
            .field("auth_tokens", &self.auth_tokens.len())
            .field("admin_uids", &self.admin_uids)
            .field("site_name", &self.site_name)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Ok(path) = std::env::var("DATABASE_PATH") {
            if !path.is_empty() {
                config.database_path = Some(PathBuf::from(path));
            }
        }

        if let Ok(path) = std::env::var("BLOB_STORAGE_PATH") {
            config.blob_storage_path = PathBuf::from(path);
        }

        if let Ok(url) = std::env::var("PUBLIC_BASE_URL") {
            config.public_base_url = url.trim_end_matches('/').to_string();
        }

        if let Ok(val) = std::env::var("MAX_BLOB_SIZE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_blob_size = n,
                _ => tracing::warn!(value = %val, "Invalid MAX_BLOB_SIZE, using default"),
            }
        }

        if let Ok(url) = std::env::var("IMAGE_HOST_URL") {
            if !url.is_empty() {
                config.image_host_url = Some(url);
            }
        }

        if let Ok(preset) = std::env::var("IMAGE_HOST_PRESET") {
            config.image_host_preset = preset;
        }

        if let Ok(url) = std::env::var("COUNTRIES_API_URL") {
            config.countries_api_url = url;
        }

        if let Ok(raw) = std::env::var("AUTH_TOKENS") {
            config.auth_tokens = parse_auth_tokens(&raw);
        }

        if let Ok(raw) = std::env::var("ADMIN_UIDS") {
            config.admin_uids = parse_list(&raw);
        }

        if let Ok(name) = std::env::var("SITE_NAME") {
            config.site_name = name;
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }

    pub fn identity_provider(&self) -> TokenIdentityProvider {
        // Entries were validated in `from_env`.
        TokenIdentityProvider::parse(&self.auth_tokens.join(","))
            .unwrap_or_else(|_| TokenIdentityProvider::new(Vec::new()))
    }
}

/// Valid entries are kept, invalid ones are logged and skipped.
fn parse_auth_tokens(raw: &str) -> Vec<String> {
    parse_list(raw)
        .into_iter()
        .filter(|entry| {
            let valid = TokenIdentityProvider::parse(entry).is_ok();
            if !valid {
                tracing::warn!("Ignoring malformed AUTH_TOKENS entry");
            }
            valid
        })
        .collect()
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
