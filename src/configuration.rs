use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use secrecy::{ExposeSecret, SecretString};
use serde_aux::field_attributes::deserialize_number_from_string;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

#[derive(serde::Deserialize, Debug, Clone)]
pub struct Config {
    pub application: Application,
    pub database: Database,
    pub queue: Queue,
    pub browser: Browser,
    pub pipeline: Pipeline,
    pub storage: Storage,
    #[serde(default)]
    pub notification: Notification,
    pub scheduler: Scheduler,
}

#[derive(serde::Deserialize, Debug, Clone)]
pub struct Application {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    pub run_migration: bool,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "Asia/Bangkok".to_string()
}

impl Application {
    pub fn get_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn timezone(&self) -> Result<Tz, anyhow::Error> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("Invalid timezone {}: {}", self.timezone, e))
    }
}

#[derive(serde::Deserialize, Debug, Clone)]
pub struct Database {
    pub username: String,
    pub password: SecretString,
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub database_name: String,
    #[serde(default)]
    pub require_ssl: bool,
}

impl Database {
    pub fn without_db(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };

        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(self.password.expose_secret())
            .ssl_mode(ssl_mode)
    }

    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.database_name)
    }
}

#[derive(serde::Deserialize, Debug, Clone)]
pub struct Queue {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_attempts: i32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub backoff_base_ms: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_dead_retention_days")]
    pub dead_retention_days: u32,
}

fn default_dead_retention_days() -> u32 {
    7
}

impl Queue {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    /// Dead deliveries last touched before this instant are pruned.
    pub fn dead_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - chrono::Duration::days(i64::from(self.dead_retention_days))
    }
}

#[derive(serde::Deserialize, Debug, Clone)]
pub struct Browser {
    pub headless: bool,
    pub sandbox: bool,
    #[serde(default)]
    pub args: Vec<String>,
    pub executable: Option<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub navigation_timeout_secs: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub idle_timeout_secs: u64,
}

impl Browser {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

#[derive(serde::Deserialize, Debug, Clone)]
pub struct Pipeline {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub upload_concurrency: usize,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            upload_concurrency: 8,
        }
    }
}

#[derive(serde::Deserialize, Debug, Clone)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum Storage {
    Azure(AzureStorage),
    S3(S3Storage),
}

#[derive(serde::Deserialize, Debug, Clone)]
pub struct AzureStorage {
    pub account_url: String,
    pub container: String,
    pub sas_token: SecretString,
}

#[derive(serde::Deserialize, Debug, Clone)]
pub struct S3Storage {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: SecretString,
    pub endpoint: Option<String>,
    pub public_url: Option<String>,
}

#[derive(serde::Deserialize, Debug, Clone, Default)]
pub struct Notification {
    pub telegram: Option<Telegram>,
}

#[derive(serde::Deserialize, Debug, Clone)]
pub struct Telegram {
    pub bot_token: SecretString,
    pub chat_id: String,
    #[serde(default = "default_telegram_api")]
    pub api_base: String,
}

fn default_telegram_api() -> String {
    "https://api.telegram.org".to_string()
}

#[derive(serde::Deserialize, Debug, Clone)]
pub struct Scheduler {
    pub enabled: bool,
    pub run_at: String,
}

impl Scheduler {
    pub fn run_at(&self) -> Result<NaiveTime, anyhow::Error> {
        NaiveTime::parse_from_str(&self.run_at, "%H:%M")
            .map_err(|e| anyhow::anyhow!("Invalid scheduler.run_at {}: {}", self.run_at, e))
    }
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

impl Config {
    pub fn new() -> Result<Self, anyhow::Error> {
        let base_path = std::env::current_dir()?;
        let config_directory = base_path.join("configuration");

        let environment: Environment = std::env::var("APP_ENVIRONMENT")
            .unwrap_or_else(|_| "local".into())
            .try_into()
            .map_err(|e: String| anyhow::anyhow!(e))?;

        let environment_filename = format!("{}.yaml", environment.as_str());

        let config = Figment::new()
            .merge(Yaml::file(config_directory.join("base.yaml")))
            .merge(Yaml::file(config_directory.join(environment_filename)))
            .merge(Env::raw().split("__"))
            .extract()?;

        Ok(config)
    }
}
