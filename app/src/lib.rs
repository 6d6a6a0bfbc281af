use std::sync::Arc;

use actix_web::web;
use anyhow::{Context, Result};
use log::*;

pub mod config;
pub mod hal;
pub mod recipes;
pub mod services;
#[cfg(test)]
mod test;

use crate::config::{Config, HttpConfig};
use crate::recipes::resources::RecipeResources;
use crate::recipes::{RecipeStore, Recipes};

#[derive(Debug, Clone)]
pub struct RecipeBook {
    recipes: Recipes,
    http: HttpConfig,
}

impl RecipeBook {
    pub fn new(config: &Config) -> Result<Self> {
        let store = config.storage.build().context("build recipe store")?;
        Ok(Self::with_store(store, config.http.clone()))
    }

    pub fn with_store(store: Arc<dyn RecipeStore>, http: HttpConfig) -> Self {
        let recipes = Recipes::new(store);
        RecipeBook { recipes, http }
    }

    pub fn setup(&self) -> Result<()> {
        debug!("Init schema");
        self.recipes.setup().context("Setup persistence")?;
        Ok(())
    }

    pub fn recipes(&self) -> &Recipes {
        &self.recipes
    }

    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        info!("Booting recipebook");
        RecipeResources::new(self.recipes.clone(), self.http.replace_status).configure(cfg);
    }
}
