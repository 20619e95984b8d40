//! Server configuration
//!
//! Every field can be overridden through an environment variable:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | WORK_DIR | /var/lib/dao/server | Working directory (db, logs) |
//! | HTTP_PORT | 8008 | HTTP API port |
//! | ENVIRONMENT | development | development / staging / production |
//! | SESSION_TTL_SECS | 604800 | Session token lifetime |
//! | REDPACKET_TTL_SECS | 86400 | Red-packet claim window before refund |
//! | PIN_TTL_SECS | 604800 | Sticky-post auto-unpin window |
//! | MAX_COMMENT_COUNT | 500 | Comment ceiling per post |
//! | SEARCH_BACKEND | zinc | zinc / meili |
//! | SEARCH_ENDPOINT | http://localhost:4080 | Search engine base URL |
//! | SEARCH_INDEX | dao-posts | Index / collection name |
//! | SEARCH_API_KEY | (empty) | Basic credential or API key |
//! | SEARCH_WORKERS | 10 | Bridge worker count, clamped [5,1000] |
//! | SEARCH_BUFFER | 1000 | Bridge channel capacity, clamped [10,10000] |
//! | CACHE_INDEX_MODE | big | none / big / simple |
//! | CACHE_PREVENT_SECS | 10 | Min interval between full cache resets |
//! | CACHE_MAX_ENTRIES | 2048 | Big-cache entry ceiling |
//! | CACHE_CHECK_SECS | 60 | Simple-mode snapshot check interval |
//! | CACHE_EXPIRE_SECS | 300 | Simple-mode snapshot expiry |
//! | PAY_GATEWAY_URL | http://localhost:9010 | Payment gateway base URL |
//! | PAY_RETURN_URL | http://localhost:8008 | Webhook re-entry base URL |
//! | PLATFORM_ADDRESS | (empty) | Platform escrow wallet |
//! | CHAT_APP_ID / CHAT_REGION / CHAT_API_KEY | (empty) | Chat gateway |
//! | BLOB_BACKEND | local | local / s3 |
//! | BLOB_DIR | <work_dir>/blobs | Local blob directory |
//! | S3_ENDPOINT / S3_BUCKET / S3_ACCESS_KEY / S3_SECRET_KEY | (empty) | S3-compatible store |

/// Which search backend to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchBackendKind {
    Zinc,
    Meili,
}

/// Home-timeline cache mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheIndexMode {
    None,
    Big,
    Simple,
}

/// Blob store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobBackendKind {
    Local,
    S3,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory for database, blobs and logs
    pub work_dir: String,
    /// HTTP API port
    pub http_port: u16,
    /// development | staging | production
    pub environment: String,

    // === Sessions & auth ===
    /// Session token lifetime (seconds)
    pub session_ttl_secs: u64,
    /// Failed-login throttle window (seconds)
    pub login_err_window_secs: u64,
    /// Failed-login attempts allowed inside the window
    pub login_err_max: i64,

    // === Domain policy ===
    /// Red-packet claim window before the timeout refund
    pub redpacket_ttl_secs: i64,
    /// Sticky posts older than this are auto-unpinned
    pub pin_ttl_secs: i64,
    /// Comment ceiling per post
    pub max_comment_count: i64,

    // === Search ===
    pub search_backend: SearchBackendKind,
    pub search_endpoint: String,
    pub search_index: String,
    pub search_api_key: String,
    /// Bridge worker count, clamped into [5, 1000]
    pub search_workers: usize,
    /// Bridge channel capacity, clamped into [10, 10000]
    pub search_buffer: usize,
    /// Periodic re-index interval (seconds)
    pub reindex_interval_secs: u64,

    // === Cache-Index ===
    pub cache_index_mode: CacheIndexMode,
    /// Minimum interval between two full cache resets (seconds)
    pub cache_prevent_secs: i64,
    /// Big-cache entry ceiling
    pub cache_max_entries: usize,
    /// Simple-mode snapshot check interval (seconds)
    pub cache_check_secs: u64,
    /// Simple-mode snapshot expiry (seconds)
    pub cache_expire_secs: u64,

    // === Gateways ===
    pub pay_gateway_url: String,
    /// Base URL the payment gateway calls back into (`/v1/pay/notify`)
    pub pay_return_url: String,
    /// Platform escrow wallet holding red-packet funds in flight
    pub platform_address: String,
    pub chat_app_id: String,
    pub chat_region: String,
    pub chat_api_key: String,

    // === Blob store ===
    pub blob_backend: BlobBackendKind,
    pub blob_dir: String,
    pub s3_endpoint: String,
    pub s3_bucket: String,
    pub s3_access_key: String,
    pub s3_secret_key: String,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let work_dir = env_or("WORK_DIR", "/var/lib/dao/server");
        let blob_dir_default = format!("{}/blobs", work_dir);

        Self {
            http_port: env_parse("HTTP_PORT", 8008),
            environment: env_or("ENVIRONMENT", "development"),

            session_ttl_secs: env_parse("SESSION_TTL_SECS", 604_800),
            login_err_window_secs: env_parse("LOGIN_ERR_WINDOW_SECS", 3600),
            login_err_max: env_parse("LOGIN_ERR_MAX", 10),

            redpacket_ttl_secs: env_parse("REDPACKET_TTL_SECS", 86_400),
            pin_ttl_secs: env_parse("PIN_TTL_SECS", 604_800),
            max_comment_count: env_parse("MAX_COMMENT_COUNT", 500),

            search_backend: match env_or("SEARCH_BACKEND", "zinc").as_str() {
                "meili" => SearchBackendKind::Meili,
                _ => SearchBackendKind::Zinc,
            },
            search_endpoint: env_or("SEARCH_ENDPOINT", "http://localhost:4080"),
            search_index: env_or("SEARCH_INDEX", "dao-posts"),
            search_api_key: env_or("SEARCH_API_KEY", ""),
            search_workers: env_parse("SEARCH_WORKERS", 10usize).clamp(5, 1000),
            search_buffer: env_parse("SEARCH_BUFFER", 1000usize).clamp(10, 10_000),
            reindex_interval_secs: env_parse("REINDEX_INTERVAL_SECS", 600),

            cache_index_mode: match env_or("CACHE_INDEX_MODE", "big").as_str() {
                "none" => CacheIndexMode::None,
                "simple" => CacheIndexMode::Simple,
                _ => CacheIndexMode::Big,
            },
            cache_prevent_secs: env_parse("CACHE_PREVENT_SECS", 10),
            cache_max_entries: env_parse("CACHE_MAX_ENTRIES", 2048usize),
            cache_check_secs: env_parse("CACHE_CHECK_SECS", 60),
            cache_expire_secs: env_parse("CACHE_EXPIRE_SECS", 300),

            pay_gateway_url: env_or("PAY_GATEWAY_URL", "http://localhost:9010"),
            pay_return_url: env_or("PAY_RETURN_URL", "http://localhost:8008"),
            platform_address: env_or("PLATFORM_ADDRESS", ""),
            chat_app_id: env_or("CHAT_APP_ID", ""),
            chat_region: env_or("CHAT_REGION", ""),
            chat_api_key: env_or("CHAT_API_KEY", ""),

            blob_backend: match env_or("BLOB_BACKEND", "local").as_str() {
                "s3" => BlobBackendKind::S3,
                _ => BlobBackendKind::Local,
            },
            blob_dir: env_or("BLOB_DIR", &blob_dir_default),
            s3_endpoint: env_or("S3_ENDPOINT", ""),
            s3_bucket: env_or("S3_BUCKET", ""),
            s3_access_key: env_or("S3_ACCESS_KEY", ""),
            s3_secret_key: env_or("S3_SECRET_KEY", ""),

            work_dir,
        }
    }

    /// Override work dir and port; used by tests
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
