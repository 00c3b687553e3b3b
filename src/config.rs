use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::source::SourceKind;

const MIN_INTERVAL_MS: u64 = 1_000;
const MAX_POSTS_LIMIT: u32 = 100;

#[derive(Debug, Clone, Parser)]
#[command(
    author,
    version,
    about = "Watches a public page and alerts on new posts"
)]
pub struct Settings {
    /// Page to monitor (numeric id or vanity name)
    #[arg(long, env = "FACEBOOK_PAGE_ID")]
    pub page_id: String,

    /// Graph API access token; the API source is unavailable without it
    #[arg(long, env = "FACEBOOK_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Milliseconds between scheduled checks
    #[arg(long, env = "CHECK_INTERVAL_MS", default_value_t = 900_000, value_parser = validate_interval_ms)]
    pub check_interval_ms: u64,

    /// Maximum posts requested per check (1-100)
    #[arg(long, env = "POSTS_LIMIT", default_value_t = 10, value_parser = validate_posts_limit)]
    pub posts_limit: u32,

    /// JSON file holding already-seen posts
    #[arg(long, env = "STORAGE_FILE", default_value = "seen_posts.json")]
    pub storage_file: PathBuf,

    /// Source used by headless mode and as the TUI's initial choice
    #[arg(long, env = "POST_SOURCE", value_enum, default_value_t = SourceKind::Api)]
    pub source: SourceKind,

    /// Graph API base URL
    #[arg(long, env = "GRAPH_API_URL", default_value = "https://graph.facebook.com")]
    pub graph_api_url: String,

    /// Base URL of public pages for the scraping source
    #[arg(long, env = "SCRAPE_BASE_URL", default_value = "https://www.facebook.com")]
    pub scrape_base_url: String,

    /// Per-request timeout for sources and notifiers, in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 15)]
    pub request_timeout_secs: u64,

    /// Webhook that receives a JSON payload per new post
    #[arg(long, env = "ALERT_WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Serve the status/control API on this address (e.g. 127.0.0.1:3000)
    #[arg(long, env = "DASHBOARD_ADDR")]
    pub http_addr: Option<SocketAddr>,

    /// Run without the terminal UI and start monitoring immediately
    #[arg(long)]
    pub headless: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log file used while the terminal UI is active
    #[arg(long, env = "LOG_FILE", default_value = "pagewatch.log")]
    pub log_file: PathBuf,
}

impl Settings {
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn validate_interval_ms(value: &str) -> Result<u64, String> {
    let ms: u64 = value
        .parse()
        .map_err(|_| format!("check interval must be a whole number of milliseconds, got '{value}'"))?;
    if ms < MIN_INTERVAL_MS {
        Err(format!("check interval must be at least {MIN_INTERVAL_MS} ms, got {ms}"))
    } else {
        Ok(ms)
    }
}

fn validate_posts_limit(value: &str) -> Result<u32, String> {
    let limit: u32 = value
        .parse()
        .map_err(|_| format!("posts limit must be a whole number, got '{value}'"))?;
    if limit == 0 {
        Err("posts limit must be at least 1".to_string())
    } else if limit > MAX_POSTS_LIMIT {
        Err(format!("posts limit must be at most {MAX_POSTS_LIMIT}, got {limit}"))
    } else {
        Ok(limit)
    }
}

/// Read `.env` (if any), then the command line and environment.
pub fn load_config() -> Settings {
    // A missing .env is normal.
    dotenvy::dotenv().ok();
    Settings::parse()
}
