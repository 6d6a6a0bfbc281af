use std::collections::BTreeSet;

use anyhow::{Context, Result};
use fallible_iterator::FallibleIterator;
use log::*;
use postgres::types::ToSql;
use postgres::{Row, Transaction};

use infra::ids::Id;
use infra::persistence::{transactionally, PgConnection, PgPool};

use super::filter::RecipeQuery;
use super::models::Recipe;
use super::store::RecipeStore;

const SETUP_SQL: &str = include_str!("schema.sql");
const SELECT_SQL: &str = "SELECT r.id, r.title, r.vegetarian, r.servings, r.instruction, \
                          ARRAY(SELECT i.ingredient FROM ingredient i WHERE i.recipe_id = r.id) \
                          AS ingredients \
                          FROM recipe r";
const INSERT_SQL: &str = "INSERT INTO recipe (title, vegetarian, servings, instruction) \
                          VALUES ($1, $2, $3, $4) RETURNING id";
const UPDATE_SQL: &str = "UPDATE recipe \
                          SET title = $1, vegetarian = $2, servings = $3, instruction = $4 \
                          WHERE id = $5";
const INSERT_INGREDIENTS_SQL: &str = "INSERT INTO ingredient (recipe_id, ingredient) \
                                      SELECT $1::bigint, unnest($2::text[])";
const CLEAR_INGREDIENTS_SQL: &str = "DELETE FROM ingredient WHERE recipe_id = $1";
const DELETE_SQL: &str = "DELETE FROM recipe WHERE id = $1";

/// Recipes in a `recipe` table, with ingredients in a side table.
#[derive(Debug, Clone)]
pub struct PgRecipeStore {
    db: PgPool,
}

impl PgRecipeStore {
    pub fn new(db: PgPool) -> Self {
        PgRecipeStore { db }
    }

    fn conn(&self) -> Result<PgConnection> {
        let conn = self.db.get().context("get connection")?;
        Ok(conn)
    }
}

fn recipe_from_row(row: &Row) -> Result<Recipe, postgres::Error> {
    let ingredients: Vec<String> = row.try_get("ingredients")?;
    Ok(Recipe {
        id: Some(Id::new(row.try_get("id")?)),
        title: row.try_get("title")?,
        vegetarian: row.try_get("vegetarian")?,
        servings: row.try_get("servings")?,
        ingredients: ingredients.into_iter().collect(),
        instruction: row.try_get("instruction")?,
    })
}

fn save_ingredients(
    t: &mut Transaction<'_>,
    id: Id<Recipe>,
    ingredients: &BTreeSet<String>,
) -> Result<()> {
    if ingredients.is_empty() {
        return Ok(());
    }
    let items = ingredients.iter().map(String::as_str).collect::<Vec<_>>();
    let nrows = t
        .execute(INSERT_INGREDIENTS_SQL, &[&id.get(), &items])
        .context("insert ingredients")?;
    trace!("Inserted {} ingredients for {}", nrows, id);
    Ok(())
}

impl RecipeStore for PgRecipeStore {
    fn setup(&self) -> Result<()> {
        self.conn()?
            .batch_execute(SETUP_SQL)
            .context("create recipe tables")?;
        Ok(())
    }

    fn insert(&self, recipe: Recipe) -> Result<Recipe> {
        let mut conn = self.conn()?;
        let stored = transactionally(&mut conn, |t| {
            let row = t
                .query_one(
                    INSERT_SQL,
                    &[
                        &recipe.title,
                        &recipe.vegetarian,
                        &recipe.servings,
                        &recipe.instruction,
                    ],
                )
                .context("insert recipe")?;
            let id = Id::new(row.try_get(0)?);
            save_ingredients(t, id, &recipe.ingredients)?;
            Ok(recipe.with_id(id))
        })?;
        debug!("Inserted {:?}", stored);
        Ok(stored)
    }

    fn find_by_id(&self, id: Id<Recipe>) -> Result<Option<Recipe>> {
        let sql = format!("{} WHERE r.id = $1", SELECT_SQL);
        let row = self
            .conn()?
            .query_opt(sql.as_str(), &[&id.get()])
            .context("load recipe")?;
        let res = row.as_ref().map(recipe_from_row).transpose()?;
        debug!("Load {} -> {:?}", id, res);
        Ok(res)
    }

    fn find_filtered(&self, query: &RecipeQuery) -> Result<Vec<Recipe>> {
        let (clause, params) = query.to_sql();
        let sql = format!("{} WHERE {}", SELECT_SQL, clause);
        trace!("Filter query: {}", sql);

        let mut conn = self.conn()?;
        let rows = conn
            .query_raw(sql.as_str(), params.iter().map(|p| *p as &dyn ToSql))
            .context("query recipes")?;
        let found = rows
            .map(|row| recipe_from_row(&row))
            .collect::<Vec<_>>()
            .context("read recipes")?;
        debug!("Filter {:?} matched {} recipes", query, found.len());
        Ok(found)
    }

    fn replace(&self, id: Id<Recipe>, recipe: Recipe) -> Result<Option<Recipe>> {
        let mut conn = self.conn()?;
        transactionally(&mut conn, |t| {
            let nrows = t
                .execute(
                    UPDATE_SQL,
                    &[
                        &recipe.title,
                        &recipe.vegetarian,
                        &recipe.servings,
                        &recipe.instruction,
                        &id.get(),
                    ],
                )
                .context("update recipe")?;
            if nrows == 0 {
                debug!("No recipe {} to replace", id);
                return Ok(None);
            }
            t.execute(CLEAR_INGREDIENTS_SQL, &[&id.get()])
                .context("clear ingredients")?;
            save_ingredients(t, id, &recipe.ingredients)?;
            Ok(Some(recipe.with_id(id)))
        })
    }

    fn delete_by_id(&self, id: Id<Recipe>) -> Result<()> {
        let nrows = self
            .conn()?
            .execute(DELETE_SQL, &[&id.get()])
            .context("delete recipe")?;
        debug!("Delete {} removed {} rows", id, nrows);
        Ok(())
    }
}
