use config::{Config, ConfigError};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::net::SocketAddr;
use tracing::info;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub app: ApplicationSettings,
    pub postgres: Option<PostgresSettings>,
    #[serde(default)]
    pub groups: GroupSettings,
    #[serde(default)]
    pub chat: ChatSettings,
    #[serde(default)]
    pub map: MapSettings,
    #[serde(default)]
    pub events: EventSettings,
}

#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub access_jwt_secret: Secret<String>,
    pub origin: String,
}

impl ApplicationSettings {
    pub fn get_addr(&self) -> SocketAddr {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse::<SocketAddr>()
            .unwrap_or_else(|_| panic!("Failed to parse address: {addr}"))
    }

    pub fn from_env() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: get_env("PORT").parse::<u16>().expect("Invalid port number"),
            access_jwt_secret: get_secret_env("ACCESS_JWT_SECRET"),
            origin: get_env("WEBSITE_URL"),
        }
    }
}

/// Capacity rules for event groups.
#[derive(Deserialize, Clone, Debug)]
pub struct GroupSettings {
    pub default_max_size: usize,
    /// How many times an assignment re-reads the store after losing a write race.
    pub max_assign_attempts: u32,
}

impl Default for GroupSettings {
    fn default() -> Self {
        Self {
            default_max_size: 5,
            max_assign_attempts: 5,
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct ChatSettings {
    pub max_message_length: usize,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            max_message_length: 2000,
        }
    }
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct MapSettings {
    /// Zero keeps exact coordinate comparison for the user marker.
    pub user_move_threshold_meters: f64,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct EventSettings {
    /// JSON array of events upserted into the catalog at startup.
    pub catalog_file: Option<String>,
}

#[derive(Deserialize, Clone)]
pub struct DatabaseFields {
    username: String,
    password: Secret<String>,
    port: u16,
    host: String,
    database_name: String,
}

impl DatabaseFields {
    fn compose(&self, db_name: String) -> String {
        format!(
            "{db_name}://{}:{}@{}:{}/{}",
            self.username,
            self.password.expose_secret(),
            self.host,
            self.port,
            self.database_name
        )
    }
}

pub trait ConnectionPrep {
    fn compose_database_url(&self) -> Option<String>;
    fn get_database_url(&self) -> Option<String>;
    fn env_database_url() -> Option<String>;
    fn get_connection_string(&self) -> String
    where
        Self: ToString,
    {
        let info = format!("url for {}", self.to_string());
        if let Some(url) = self.compose_database_url() {
            info!("Using composed {info}");
            url
        } else if let Some(url) = self.get_database_url() {
            info!("Using field {info}");
            url
        } else {
            let url = Self::env_database_url().expect("No connection info provided");
            info!("Using env {info}");
            url
        }
    }
}

#[derive(Deserialize, Clone)]
pub struct PostgresSettings {
    database_url: Option<String>,
    fields: Option<DatabaseFields>,
    is_migrating: Option<bool>,
    acquire_timeout_secs: Option<u64>,
}

impl PostgresSettings {
    pub fn is_migrating(&self) -> bool {
        self.is_migrating.unwrap_or(false)
    }

    pub fn acquire_timeout_secs(&self) -> u64 {
        self.acquire_timeout_secs.unwrap_or(5)
    }

    /// `None` when the environment names no database; the service then runs on the in-memory store.
    fn from_env() -> Option<Self> {
        Some(Self {
            database_url: Some(Self::env_database_url()?),
            fields: None,
            is_migrating: Some(true),
            acquire_timeout_secs: None,
        })
    }
}

impl ToString for PostgresSettings {
    fn to_string(&self) -> String {
        String::from("postgresql")
    }
}

impl ConnectionPrep for PostgresSettings {
    fn compose_database_url(&self) -> Option<String> {
        Some(self.fields.clone()?.compose(self.to_string()))
    }
    fn get_database_url(&self) -> Option<String> {
        self.database_url.clone()
    }
    fn env_database_url() -> Option<String> {
        try_get_env("DATABASE_URL")
    }
}

impl GroupSettings {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_max_size: try_parse_env("GROUP_MAX_SIZE").unwrap_or(defaults.default_max_size),
            max_assign_attempts: try_parse_env("GROUP_ASSIGN_ATTEMPTS")
                .unwrap_or(defaults.max_assign_attempts),
        }
    }
}

enum Environment {
    Local,
    Production,
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{other} is not supported environment. Use either `local` or `production`"
            )),
        }
    }
}

pub fn get_config() -> Result<Settings, ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");
    let config_dir = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .map_or(Environment::Local, |env| {
            env.try_into().expect("Failed to parse APP_ENVIRONMENT.")
        });

    match environment {
        Environment::Local => {
            let settings = Config::builder()
                .add_source(config::File::from(config_dir.join("settings.toml")))
                .add_source(
                    config::Environment::with_prefix("APP")
                        .prefix_separator("_")
                        .separator("__"),
                );
            settings.build()?.try_deserialize()
        }

        Environment::Production => Ok(Settings {
            app: ApplicationSettings::from_env(),
            postgres: PostgresSettings::from_env(),
            groups: GroupSettings::from_env(),
            chat: ChatSettings {
                max_message_length: try_parse_env("CHAT_MAX_MESSAGE_LENGTH")
                    .unwrap_or(ChatSettings::default().max_message_length),
            },
            map: MapSettings {
                user_move_threshold_meters: try_parse_env("MAP_USER_MOVE_THRESHOLD_METERS")
                    .unwrap_or_default(),
            },
            events: EventSettings {
                catalog_file: try_get_env("EVENTS_CATALOG_FILE"),
            },
        }),
    }
}

fn try_get_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn try_parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    try_get_env(name)?.parse::<T>().ok()
}

fn get_env(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("Missing {name}"))
}

fn get_secret_env(name: &str) -> Secret<String> {
    Secret::from(get_env(name))
}
