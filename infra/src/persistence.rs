use anyhow::{Context, Result};
use log::*;
use postgres::{Client, NoTls, Transaction};
use r2d2::{Pool, PooledConnection};
use r2d2_postgres::PostgresConnectionManager;
use serde::{Deserialize, Serialize};

pub type PgManager = PostgresConnectionManager<NoTls>;
pub type PgPool = Pool<PgManager>;
pub type PgConnection = PooledConnection<PgManager>;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PostgresConfig {
    pub url: String,
    #[serde(default)]
    pub max_size: Option<u32>,
    /// Schema to place on the `search_path` of every pooled connection.
    #[serde(default)]
    pub schema: Option<String>,
}

/// Pins each new connection to a named schema, creating it if needed.
#[derive(Debug)]
pub struct UseSchema(pub String);

impl r2d2::CustomizeConnection<Client, postgres::Error> for UseSchema {
    fn on_acquire(&self, conn: &mut Client) -> Result<(), postgres::Error> {
        let nschemas: i64 = conn
            .query_one(
                "SELECT count(*) from pg_catalog.pg_namespace n where n.nspname = $1",
                &[&self.0],
            )?
            .get(0);
        debug!("Number of {} schemas:{}", self.0, nschemas);
        if nschemas == 0 {
            conn.batch_execute(&format!("CREATE SCHEMA IF NOT EXISTS \"{}\"", self.0))?;
        }
        conn.batch_execute(&format!("SET search_path TO \"{}\"", self.0))?;
        Ok(())
    }
}

impl PostgresConfig {
    pub fn build(&self) -> Result<PgPool> {
        debug!("Build pool for {:?}", self.schema);
        let config = self
            .url
            .parse::<postgres::Config>()
            .context("parse postgres url")?;
        let manager = PostgresConnectionManager::new(config, NoTls);

        let mut builder = r2d2::Pool::builder();
        if let Some(max_size) = self.max_size {
            builder = builder.max_size(max_size);
        }
        if let Some(schema) = self.schema.as_ref() {
            builder = builder.connection_customizer(Box::new(UseSchema(schema.clone())));
        }

        debug!("Pool builder: {:?}", builder);
        let pool = builder.build(manager).context("build pool")?;

        Ok(pool)
    }
}

/// Runs `f` inside a transaction, committing only if it succeeds.
pub fn transactionally<R, F>(conn: &mut Client, f: F) -> Result<R>
where
    F: FnOnce(&mut Transaction<'_>) -> Result<R>,
{
    let mut t = conn.transaction().context("begin")?;
    let res = f(&mut t)?;
    t.commit().context("commit")?;
    Ok(res)
}
