use config::ConfigError;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

use crate::fetch::{Backoff, RetryPolicy};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub bind_address: String,
    pub database_url: Option<String>,
    pub oms: OmsConfig,
    pub wms: WmsConfig,
    pub fetch: FetchConfig,
    pub notification: NotificationConfig,
    pub schedule: ScheduleConfig,
    /// SKUs left out of every comparison
    pub ignored_skus: Vec<String>,
    pub run_comparison_per_minute: u32,
    pub cors_allowed_origins: Vec<String>,
}

/// Order-management source (A)
#[derive(Debug, Deserialize, Clone)]
pub struct OmsConfig {
    pub base_url: String,
    pub account: Option<String>,
    pub app_ref: Option<String>,
    pub staff_token: Option<String>,
    pub page_size: usize,
    pub max_pages: u32,
    pub availability_batch_size: usize,
    pub page_delay_ms: u64,
    pub batch_delay_ms: u64,
}

/// Warehouse-management source (B)
#[derive(Debug, Deserialize, Clone)]
pub struct WmsConfig {
    pub base_url: String,
    pub api_version: String,
    pub api_key: Option<String>,
    pub lob_id: String,
    pub page_size: usize,
    pub max_pages: u32,
    pub page_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    pub max_retries: u32,
    /// `linear`, `fixed` or `none`
    pub backoff_strategy: String,
    pub backoff_step_ms: u64,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    pub resend_api_key: Option<String>,
    pub resend_api_url: String,
    pub from_email: String,
    pub recipients: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfig {
    pub enabled: bool,
    /// UTC hour (0-23) of the daily run
    pub hour_utc: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let wms_company = env_or("WMS_COMPANY_ID", "demo");

        let schedule = ScheduleConfig {
            enabled: env_parse("SCHEDULE_ENABLED", false)?,
            hour_utc: env_parse("SCHEDULE_HOUR_UTC", 23)?,
        };
        if schedule.hour_utc > 23 {
            return Err(ConfigError::Message(format!(
                "SCHEDULE_HOUR_UTC must be 0-23, got {}",
                schedule.hour_utc
            )));
        }

        Ok(Self {
            bind_address: env_or("BIND_ADDRESS", "0.0.0.0:8080"),
            database_url: env_opt("DATABASE_URL"),
            oms: OmsConfig {
                base_url: env_or("OMS_BASE_URL", "https://use1.brightpearlconnect.com/public-api"),
                account: env_opt("OMS_ACCOUNT"),
                app_ref: env_opt("OMS_APP_REF"),
                staff_token: env_opt("OMS_STAFF_TOKEN"),
                page_size: env_parse("OMS_PAGE_SIZE", 500)?,
                max_pages: env_parse("OMS_MAX_PAGES", 10)?,
                availability_batch_size: env_parse("OMS_AVAILABILITY_BATCH_SIZE", 50)?,
                page_delay_ms: env_parse("OMS_PAGE_DELAY_MS", 200)?,
                batch_delay_ms: env_parse("OMS_BATCH_DELAY_MS", 500)?,
            },
            wms: WmsConfig {
                base_url: env_or(
                    "WMS_BASE_URL",
                    &format!("https://{}.infopluswms.com/infoplus-wms/api", wms_company),
                ),
                api_version: env_or("WMS_API_VERSION", "beta"),
                api_key: env_opt("WMS_API_KEY"),
                lob_id: env_or("WMS_LOB_ID", "1"),
                page_size: env_parse("WMS_PAGE_SIZE", 250)?,
                max_pages: env_parse("WMS_MAX_PAGES", 20)?,
                page_delay_ms: env_parse("WMS_PAGE_DELAY_MS", 200)?,
            },
            fetch: FetchConfig {
                max_retries: env_parse("FETCH_MAX_RETRIES", 2)?,
                backoff_strategy: env_or("FETCH_BACKOFF", "linear").to_ascii_lowercase(),
                backoff_step_ms: env_parse("FETCH_BACKOFF_STEP_MS", 2000)?,
                timeout_secs: env_parse("FETCH_TIMEOUT_SECS", 30)?,
            },
            notification: NotificationConfig {
                resend_api_key: env_opt("RESEND_API_KEY"),
                resend_api_url: env_or("RESEND_API_URL", "https://api.resend.com"),
                from_email: env_or("NOTIFY_FROM_EMAIL", "inventory@localhost"),
                recipients: split_list(&env_or("EMAIL_RECIPIENTS", "")),
            },
            schedule,
            ignored_skus: split_list(&env_or("IGNORED_SKUS", "")),
            run_comparison_per_minute: env_parse("RUN_COMPARISON_PER_MINUTE", 5)?,
            cors_allowed_origins: split_list(&env_or("CORS_ALLOWED_ORIGINS", "http://localhost:3000")),
        })
    }
}

impl OmsConfig {
    pub fn is_configured(&self) -> bool {
        self.account.is_some() && self.app_ref.is_some() && self.staff_token.is_some()
    }
}

impl WmsConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

impl FetchConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        let step = Duration::from_millis(self.backoff_step_ms);
        let backoff = match self.backoff_strategy.as_str() {
            "fixed" => Backoff::Fixed(step),
            "none" => Backoff::None,
            _ => Backoff::Linear(step),
        };
        RetryPolicy::new(self.max_retries, backoff)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env_opt(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Message(format!("{} has an invalid value: {}", key, raw))),
        None => Ok(default),
    }
}

/// Comma-separated list, blanks removed
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
