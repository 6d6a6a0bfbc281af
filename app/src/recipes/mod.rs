use std::sync::Arc;

use anyhow::Result;
use log::*;

use infra::ids::Id;

use crate::services::{Commandable, Queryable, Request};

mod filter;
mod models;
mod pg;
pub(crate) mod resources;
mod store;

pub use self::filter::{FilterError, RecipeFilter, RecipeQuery};
pub use self::models::{InvalidRecipe, Recipe, RecipeNotFound};
pub use self::pg::PgRecipeStore;
pub use self::store::{MemoryRecipeStore, RecipeStore};

/// Recipe operations over an injected store.
#[derive(Debug, Clone)]
pub struct Recipes {
    store: Arc<dyn RecipeStore>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRecipes(pub RecipeFilter);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetRecipe(pub Id<Recipe>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRecipe(pub Recipe);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertRecipe {
    pub id: Id<Recipe>,
    pub recipe: Recipe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteRecipe(pub Id<Recipe>);

/// How an upsert was satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upserted {
    Replaced(Recipe),
    Created(Recipe),
}

impl Recipes {
    pub fn new(store: Arc<dyn RecipeStore>) -> Self {
        Recipes { store }
    }

    pub fn setup(&self) -> Result<()> {
        info!("Setting up recipe store");
        self.store.setup()
    }

    /// Round-trips the store with a lookup that never matches.
    pub fn ping(&self) -> Result<()> {
        self.store.find_by_id(Id::new(0))?;
        Ok(())
    }
}

impl Upserted {
    pub fn into_recipe(self) -> Recipe {
        match self {
            Upserted::Replaced(r) | Upserted::Created(r) => r,
        }
    }
}

impl Request for ListRecipes {
    type Resp = Vec<Recipe>;
}

impl Queryable<ListRecipes> for Recipes {
    fn query(&self, ListRecipes(filter): ListRecipes) -> Result<Vec<Recipe>> {
        debug!("List recipes matching {:?}", filter);
        self.store.find_filtered(&filter.to_query())
    }
}

impl Request for GetRecipe {
    type Resp = Recipe;
}

impl Queryable<GetRecipe> for Recipes {
    fn query(&self, GetRecipe(id): GetRecipe) -> Result<Recipe> {
        let recipe = self.store.find_by_id(id)?.ok_or(RecipeNotFound(id))?;
        Ok(recipe)
    }
}

impl Request for CreateRecipe {
    type Resp = Recipe;
}

impl Commandable<CreateRecipe> for Recipes {
    fn execute(&self, CreateRecipe(recipe): CreateRecipe) -> Result<Recipe> {
        recipe.validate()?;
        let stored = self.store.insert(recipe)?;
        info!("Created recipe {:?}", stored.id);
        Ok(stored)
    }
}

impl Request for UpsertRecipe {
    type Resp = Upserted;
}

impl Commandable<UpsertRecipe> for Recipes {
    fn execute(&self, UpsertRecipe { id, recipe }: UpsertRecipe) -> Result<Upserted> {
        recipe.validate()?;
        if let Some(replaced) = self.store.replace(id, recipe.clone())? {
            info!("Replaced recipe {}", id);
            return Ok(Upserted::Replaced(replaced));
        }
        let created = self.store.insert(recipe)?;
        info!("No recipe {}; created {:?} instead", id, created.id);
        Ok(Upserted::Created(created))
    }
}

impl Request for DeleteRecipe {
    type Resp = ();
}

impl Commandable<DeleteRecipe> for Recipes {
    fn execute(&self, DeleteRecipe(id): DeleteRecipe) -> Result<()> {
        self.store.delete_by_id(id)?;
        info!("Deleted recipe {}", id);
        Ok(())
    }
}
