//! Configuration for the catalog API

use core_config::{AppInfo, FromEnv, app_info, env_parse, server::ServerConfig};
use database::mongodb::MongoConfig;
use std::fmt;
use std::str::FromStr;

pub use core_config::Environment;

/// Which [`Datastore`](domain_products::Datastore) implementation backs the catalog.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DatastoreBackend {
    #[default]
    MongoDb,
    /// Process-local store; contents are lost on restart
    Memory,
}

impl FromStr for DatastoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(Self::MongoDb),
            "memory" => Ok(Self::Memory),
            other => Err(format!(
                "unknown datastore backend '{}', expected 'mongodb' or 'memory'",
                other
            )),
        }
    }
}

impl DatastoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MongoDb => "mongodb",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for DatastoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub server: ServerConfig,
    pub environment: Environment,
    pub backend: DatastoreBackend,
    /// Present only when `backend` is [`DatastoreBackend::MongoDb`]
    pub mongodb: Option<MongoConfig>,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let server = ServerConfig::from_env()?;
        let backend = env_parse("DATASTORE_BACKEND", DatastoreBackend::default())?;

        let mongodb = match backend {
            DatastoreBackend::MongoDb => Some(
                MongoConfig::from_env()?.with_app_name(env!("CARGO_PKG_NAME")),
            ),
            DatastoreBackend::Memory => None,
        };

        Ok(Self {
            app: app_info!(),
            server,
            environment,
            backend,
            mongodb,
        })
    }
}
