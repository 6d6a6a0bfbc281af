use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use actix_web::{App, HttpServer};
use anyhow::{Context, Result};
use jemallocator_global as _;
use log::*;
use serde::Deserialize;
use structopt::StructOpt;

use recipebook::config::{EnvLogger, EnvOverrides};

#[derive(Debug, StructOpt)]
#[structopt(name = "serve", about = "Serve recipes.")]
struct Opt {
    /// Input file
    #[structopt(parse(from_os_str))]
    config: PathBuf,
}

#[derive(Deserialize, Debug)]
struct Config {
    #[serde(flatten)]
    recipebook: recipebook::config::Config,
    listener: Listener,
    #[serde(default)]
    env_logger: EnvLogger,
}

#[derive(Deserialize, Debug)]
struct Listener {
    addr: std::net::SocketAddr,
}

#[actix_web::main]
async fn main() -> Result<()> {
    let opt = Opt::from_args();

    let mut config_buf = String::new();
    File::open(&opt.config)
        .with_context(|| format!("open {:?}", opt.config))?
        .read_to_string(&mut config_buf)?;
    let mut config: Config = toml::from_str(&config_buf).context("parse config")?;

    config.env_logger.builder().init();
    debug!("Options: {:?}", opt);

    config
        .recipebook
        .apply_overrides(EnvOverrides::from_env()?);

    let app = recipebook::RecipeBook::new(&config.recipebook)?;
    app.setup()?;

    let srv = HttpServer::new(move || App::new().configure(|cfg| app.configure(cfg)))
        .bind(config.listener.addr)
        .context("bind")?;
    info!("Listening on: {:?}", srv.addrs());
    srv.run().await?;
    Ok(())
}
