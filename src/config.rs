use std::env;
use std::str::FromStr;

const DEFAULT_JWT_SECRET: &str = "default-secret-change-me";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Session token settings
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_hours: i64,
}

/// Cloudinary credentials used by the image store
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub maps_api_key: String,
    /// Expected audience of ID tokens posted to /oauth. OAuth login is disabled when unset.
    pub client_id: Option<String>,
}

/// Application configuration, built once at startup and injected everywhere it is needed.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt: JwtConfig,
    pub cookie_secure: bool,
    pub cloudinary: CloudinaryConfig,
    pub google: GoogleConfig,
    /// Whether an empty search query returns every attraction instead of none
    pub search_empty_returns_all: bool,
    pub page_size: i64,
    pub max_upload_bytes: usize,
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup (the process environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| get(key).ok_or_else(|| format!("{} must be set", key));

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            log::warn!("⚠️  JWT_SECRET not set, using the development default");
            DEFAULT_JWT_SECRET.to_string()
        });

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&get, "PORT", 3000)?,
            database_url: required("DATABASE_URL")?,
            jwt: JwtConfig {
                secret: jwt_secret,
                issuer: get("JWT_ISSUER").unwrap_or_else(|| "attractions-service".to_string()),
                audience: get("JWT_AUDIENCE").unwrap_or_else(|| "attractions-api".to_string()),
                ttl_hours: parse_or(&get, "SESSION_TTL_HOURS", 24)?,
            },
            cookie_secure: parse_bool_or(&get, "COOKIE_SECURE", false)?,
            cloudinary: CloudinaryConfig {
                cloud_name: required("CLOUD_NAME")?,
                api_key: required("API_KEY")?,
                api_secret: required("API_SECRET")?,
                folder: get("IMAGE_FOLDER").unwrap_or_else(|| "arcane-london".to_string()),
            },
            google: GoogleConfig {
                maps_api_key: required("GOOGLE_MAPS_API_KEY")?,
                client_id: get("GOOGLE_CLIENT_ID"),
            },
            search_empty_returns_all: parse_bool_or(&get, "SEARCH_EMPTY_RETURNS_ALL", false)?,
            page_size: parse_or(&get, "ATTRACTIONS_PAGE_SIZE", 20)?,
            max_upload_bytes: parse_or(&get, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            allowed_origins: get("ALLOWED_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_else(|| vec!["http://localhost:3000".to_string()]),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| format!("{} is not valid ({}): {}", key, raw, e)),
        None => Ok(default),
    }
}

fn parse_bool_or<G>(get: &G, key: &str, default: bool) -> Result<bool, String>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(format!("{} must be a boolean, got '{}'", key, v)),
        None => Ok(default),
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        host: "127.0.0.1".to_string(),
        port: 3000,
        database_url: "mongodb://localhost:27017/attractions_test".to_string(),
        jwt: JwtConfig {
            secret: "test-secret".to_string(),
            issuer: "attractions-service".to_string(),
            audience: "attractions-api".to_string(),
            ttl_hours: 1,
        },
        cookie_secure: false,
        cloudinary: CloudinaryConfig {
            cloud_name: "demo".to_string(),
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
            folder: "arcane-london".to_string(),
        },
        google: GoogleConfig {
            maps_api_key: "maps-key".to_string(),
            client_id: None,
        },
        search_empty_returns_all: false,
        page_size: 20,
        max_upload_bytes: 1024,
        allowed_origins: vec!["http://localhost:3000".to_string()],
    }
}
