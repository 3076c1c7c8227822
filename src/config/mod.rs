//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, num::NonZeroU32, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "menusync";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_CACHE_POOL_SIZE: u32 = 16;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_DISCOUNT_TTL_SECS: u64 = 3600;
const DEFAULT_SYNC_SCHEDULE: &str = "*/15 * * * * *";
const DEFAULT_SHEET_RANGE: &str = "Sheet1!A:G";
const DEFAULT_SHEETS_ENDPOINT: &str = "https://sheets.googleapis.com";

/// Command-line arguments for the menusync binary.
#[derive(Debug, Parser)]
#[command(
    name = "menusync",
    version,
    about = "Menu API with a Redis read-through cache and spreadsheet sync"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "MENUSYNC_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP API and the scheduled synchronizer.
    Serve(Box<ServeArgs>),
    /// Run exactly one reconciliation pass and exit.
    Sync(SyncArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SyncArgs {
    #[command(flatten)]
    pub storage: StorageOverrides,

    /// Read the snapshot from this workbook instead of the configured source.
    #[arg(long = "sync-file", value_name = "PATH")]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct StorageOverrides {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the Redis connection URL.
    #[arg(long = "redis-url", value_name = "URL")]
    pub redis_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub storage: StorageOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Toggle the scheduled synchronizer.
    #[arg(
        long = "sync-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub sync_enabled: Option<bool>,

    /// Override the synchronizer cron expression (with seconds).
    #[arg(long = "sync-schedule", value_name = "CRON")]
    pub sync_schedule: Option<String>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub sync: SyncSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Redis URL; the in-process store is used when unset.
    pub redis_url: Option<String>,
    pub pool_size: NonZeroU32,
    pub default_ttl_seconds: NonZeroU32,
    pub discount_ttl_seconds: NonZeroU32,
    pub flush_on_start: bool,
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub enabled: bool,
    pub schedule: String,
    pub source: SyncSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncSource {
    File {
        path: PathBuf,
    },
    Google {
        spreadsheet_id: String,
        range: String,
        api_key: String,
        endpoint: String,
    },
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("MENUSYNC").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Sync(args)) => raw.apply_sync_overrides(args),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    cache: RawCacheSettings,
    sync: RawSyncSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(enabled) = overrides.sync_enabled {
            self.sync.enabled = Some(enabled);
        }
        if let Some(schedule) = overrides.sync_schedule.as_ref() {
            self.sync.schedule = Some(schedule.clone());
        }

        self.apply_storage_overrides(&overrides.storage);
    }

    fn apply_sync_overrides(&mut self, args: &SyncArgs) {
        self.apply_storage_overrides(&args.storage);
        if let Some(path) = args.file.as_ref() {
            self.sync.source = Some(RawSourceKind::File);
            self.sync.file = Some(path.clone());
        }
    }

    fn apply_storage_overrides(&mut self, overrides: &StorageOverrides) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(url) = overrides.redis_url.as_ref() {
            self.cache.redis_url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            cache,
            sync,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            cache: build_cache_settings(cache)?,
            sync: build_sync_settings(sync)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let max_connections = database
        .max_connections
        .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);

    Ok(DatabaseSettings {
        url: non_blank(database.url),
        max_connections: non_zero_u32(max_connections.into(), "database.max_connections")?,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let pool_size = cache.pool_size.unwrap_or(DEFAULT_CACHE_POOL_SIZE);
    let default_ttl = cache.default_ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS);
    let discount_ttl = cache
        .discount_ttl_seconds
        .unwrap_or(DEFAULT_DISCOUNT_TTL_SECS);

    Ok(CacheSettings {
        redis_url: non_blank(cache.redis_url),
        pool_size: non_zero_u32(pool_size.into(), "cache.pool_size")?,
        default_ttl_seconds: non_zero_u32(default_ttl, "cache.default_ttl_seconds")?,
        discount_ttl_seconds: non_zero_u32(discount_ttl, "cache.discount_ttl_seconds")?,
        flush_on_start: cache.flush_on_start.unwrap_or(false),
    })
}

fn build_sync_settings(sync: RawSyncSettings) -> Result<SyncSettings, LoadError> {
    let enabled = sync.enabled.unwrap_or(true);
    let schedule = non_blank(sync.schedule).unwrap_or_else(|| DEFAULT_SYNC_SCHEDULE.to_string());

    let source = match sync.source.unwrap_or_default() {
        RawSourceKind::File => {
            let path = sync.file.unwrap_or_default();
            if enabled && path.as_os_str().is_empty() {
                return Err(LoadError::invalid("sync.file", "path must not be empty"));
            }
            SyncSource::File { path }
        }
        RawSourceKind::Google => {
            let spreadsheet_id = non_blank(sync.spreadsheet_id).ok_or_else(|| {
                LoadError::invalid("sync.spreadsheet_id", "required for the google source")
            })?;
            let api_key = non_blank(sync.api_key).ok_or_else(|| {
                LoadError::invalid("sync.api_key", "required for the google source")
            })?;
            SyncSource::Google {
                spreadsheet_id,
                range: non_blank(sync.range).unwrap_or_else(|| DEFAULT_SHEET_RANGE.to_string()),
                api_key,
                endpoint: non_blank(sync.endpoint)
                    .map(|value| value.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| DEFAULT_SHEETS_ENDPOINT.to_string()),
            }
        }
    };

    Ok(SyncSettings {
        enabled,
        schedule,
        source,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    redis_url: Option<String>,
    pool_size: Option<u32>,
    default_ttl_seconds: Option<u64>,
    discount_ttl_seconds: Option<u64>,
    flush_on_start: Option<bool>,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum RawSourceKind {
    #[default]
    File,
    Google,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSyncSettings {
    enabled: Option<bool>,
    schedule: Option<String>,
    source: Option<RawSourceKind>,
    file: Option<PathBuf>,
    spreadsheet_id: Option<String>,
    range: Option<String>,
    api_key: Option<String>,
    endpoint: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
