use std::collections::HashMap;
use std::sync::Arc;

use actix_web::http::StatusCode;
use anyhow::{Context, Result};
use log::*;
use serde::{Deserialize, Serialize};

use infra::persistence::PostgresConfig;

use crate::recipes::{MemoryRecipeStore, PgRecipeStore, RecipeStore};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub storage: StorageConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StorageConfig {
    Postgres(PostgresConfig),
    Memory,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpConfig {
    #[serde(default)]
    pub replace_status: ReplaceStatus,
}

/// The status `PUT /recipes/{id}` answers with when it replaced an existing
/// recipe. Creation always answers `201 Created`.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReplaceStatus {
    Created,
    Ok,
}

/// Settings that may be supplied through the environment instead.
#[derive(Deserialize, Debug, Default)]
pub struct EnvOverrides {
    pub postgres_url: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct EnvLogger {
    level: Option<LogLevel>,
    modules: HashMap<String, LogLevel>,
    timestamp_nanos: bool,
}

impl Config {
    pub fn apply_overrides(&mut self, overrides: EnvOverrides) {
        if let Some(url) = overrides.postgres_url {
            match &mut self.storage {
                StorageConfig::Postgres(pg) => {
                    debug!("Using postgres url from environment");
                    pg.url = url;
                }
                StorageConfig::Memory => warn!("Ignoring $POSTGRES_URL for in-memory storage"),
            }
        }
    }
}

impl StorageConfig {
    pub(crate) fn build(&self) -> Result<Arc<dyn RecipeStore>> {
        match self {
            StorageConfig::Postgres(pg) => {
                let pool = pg.build().context("build postgres pool")?;
                Ok(Arc::new(PgRecipeStore::new(pool)))
            }
            StorageConfig::Memory => {
                info!("Using in-memory recipe store; nothing will be persisted");
                Ok(Arc::new(MemoryRecipeStore::new()))
            }
        }
    }
}

impl Default for ReplaceStatus {
    fn default() -> Self {
        ReplaceStatus::Created
    }
}

impl ReplaceStatus {
    pub fn status_code(self) -> StatusCode {
        match self {
            ReplaceStatus::Created => StatusCode::CREATED,
            ReplaceStatus::Ok => StatusCode::OK,
        }
    }
}

impl EnvOverrides {
    pub fn from_env() -> Result<Self> {
        let overrides = envy::from_env::<EnvOverrides>().context("read environment")?;
        Ok(overrides)
    }
}

impl LogLevel {
    fn to_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl EnvLogger {
    pub fn builder(&self) -> env_logger::Builder {
        let mut b = env_logger::Builder::from_default_env();
        if let Some(level) = self.level {
            b.filter_level(level.to_filter());
        }

        for (module, level) in self.modules.iter() {
            b.filter_module(module, level.to_filter());
        }

        if self.timestamp_nanos {
            b.format_timestamp_nanos();
        }

        b
    }
}
