use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use log::*;

use infra::ids::Id;

use super::filter::RecipeQuery;
use super::models::Recipe;

/// Durable record keeping for recipes.
///
/// Implementations are responsible for making each individual call atomic;
/// callers hold no locks across calls.
pub trait RecipeStore: fmt::Debug + Send + Sync {
    /// Create whatever the store needs to operate. Idempotent.
    fn setup(&self) -> Result<()>;
    /// Always creates a new record; any id on `recipe` is ignored.
    fn insert(&self, recipe: Recipe) -> Result<Recipe>;
    fn find_by_id(&self, id: Id<Recipe>) -> Result<Option<Recipe>>;
    fn find_filtered(&self, query: &RecipeQuery) -> Result<Vec<Recipe>>;
    /// Overwrites every mutable field of the record `id`. Returns `None` if
    /// there is no such record.
    fn replace(&self, id: Id<Recipe>, recipe: Recipe) -> Result<Option<Recipe>>;
    /// Succeeds whether or not the record existed.
    fn delete_by_id(&self, id: Id<Recipe>) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryRecipeStore {
    inner: Mutex<Table>,
}

#[derive(Debug, Default)]
struct Table {
    last_id: i64,
    rows: BTreeMap<Id<Recipe>, Recipe>,
}

impl MemoryRecipeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> Result<MutexGuard<'_, Table>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("in-memory recipe table poisoned"))
    }
}

impl RecipeStore for MemoryRecipeStore {
    fn setup(&self) -> Result<()> {
        Ok(())
    }

    fn insert(&self, recipe: Recipe) -> Result<Recipe> {
        let mut table = self.table()?;
        table.last_id += 1;
        let id = Id::new(table.last_id);
        let recipe = recipe.with_id(id);
        table.rows.insert(id, recipe.clone());
        debug!("Inserted {:?}", recipe);
        Ok(recipe)
    }

    fn find_by_id(&self, id: Id<Recipe>) -> Result<Option<Recipe>> {
        Ok(self.table()?.rows.get(&id).cloned())
    }

    fn find_filtered(&self, query: &RecipeQuery) -> Result<Vec<Recipe>> {
        let table = self.table()?;
        let found = table
            .rows
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        Ok(found)
    }

    fn replace(&self, id: Id<Recipe>, recipe: Recipe) -> Result<Option<Recipe>> {
        let mut table = self.table()?;
        Ok(table.rows.get_mut(&id).map(|stored| {
            stored.overwrite_with(recipe);
            stored.clone()
        }))
    }

    fn delete_by_id(&self, id: Id<Recipe>) -> Result<()> {
        let prev = self.table()?.rows.remove(&id);
        debug!("Delete {} -> {:?}", id, prev);
        Ok(())
    }
}
