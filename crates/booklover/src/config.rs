use std::env;

/// Environment-supplied configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    /// Secret used to sign session tokens.
    pub session_secret: String,
    /// Base URL of the external book catalog.
    pub catalog_base_url: String,
}

/// Strip surrounding quotes some deployment UIs add around values.
pub fn normalize_env_value(raw: String) -> String {
    let trimmed = raw.trim();

    if let Some(inner) = trimmed.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        return inner.trim().to_string();
    }
    if let Some(inner) = trimmed.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        return inner.trim().to_string();
    }

    trimmed.to_string()
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(normalize_env_value)
        .filter(|s| !s.is_empty())
}

impl Config {
    pub fn from_env() -> Self {
        let session_secret = env_string("SECRET_KEY").unwrap_or_else(|| {
            tracing::warn!("SECRET_KEY is unset; using the development fallback");
            "it's a secret".to_string()
        });

        Self {
            database_url: env_string("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://booklover.db?mode=rwc".to_string()),
            bind_addr: env_string("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            session_secret,
            catalog_base_url: env_string("CATALOG_BASE_URL")
                .unwrap_or_else(|| "https://openlibrary.org".to_string()),
        }
    }
}
