use std::collections::BTreeSet;

use err_derive::Error;
use serde::{Deserialize, Serialize};

use infra::ids::Id;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Recipe {
    pub id: Option<Id<Recipe>>,
    pub title: String,
    pub vegetarian: bool,
    pub servings: i32,
    pub ingredients: BTreeSet<String>,
    pub instruction: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error(display = "Could not find Recipe {}", _0)]
pub struct RecipeNotFound(pub Id<Recipe>);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRecipe {
    #[error(display = "servings must not be negative, got {}", _0)]
    NegativeServings(i32),
}

impl Recipe {
    pub fn validate(&self) -> Result<(), InvalidRecipe> {
        if self.servings < 0 {
            return Err(InvalidRecipe::NegativeServings(self.servings));
        }
        Ok(())
    }

    /// Copies every mutable field from `other`, keeping our own id.
    pub fn overwrite_with(&mut self, other: Recipe) {
        let Recipe {
            id: _,
            title,
            vegetarian,
            servings,
            ingredients,
            instruction,
        } = other;
        self.title = title;
        self.vegetarian = vegetarian;
        self.servings = servings;
        self.ingredients = ingredients;
        self.instruction = instruction;
    }

    pub(crate) fn with_id(mut self, id: Id<Recipe>) -> Self {
        self.id = Some(id);
        self
    }
}
