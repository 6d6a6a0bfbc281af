use std::collections::BTreeSet;

use err_derive::Error;
use log::*;
use postgres::types::ToSql;
use url::form_urlencoded;

use super::models::Recipe;

const VEGETARIAN: &str = "vegetarian";
const SERVINGS: &str = "servings";
const INCLUDES_INGREDIENTS: &str = "includesIngredients";
const EXCLUDES_INGREDIENTS: &str = "excludesIngredients";
const INSTRUCTION_KEYWORDS: &str = "instructionKeywords";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub vegetarian: Option<bool>,
    pub servings: Option<i32>,
    pub includes_ingredients: Option<BTreeSet<String>>,
    pub excludes_ingredients: Option<BTreeSet<String>>,
    pub instruction_keywords: Option<BTreeSet<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(display = "invalid value for {}: {:?}", name, value)]
pub struct FilterError {
    pub name: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Condition {
    ServingsAtLeast(i32),
    Vegetarian(bool),
    InstructionContains(String),
    HasIngredient(String),
    LacksIngredient(String),
}

/// A conjunction of conditions; matches everything when empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeQuery {
    conditions: Vec<Condition>,
}

impl RecipeFilter {
    /// Parses a URL query string. List parameters may be comma separated,
    /// repeated, or both. Empty values count as absent.
    pub fn from_query(query: &str) -> Result<Self, FilterError> {
        let mut filter = RecipeFilter::default();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim();
            match &*key {
                VEGETARIAN => filter.vegetarian = parse_flag(VEGETARIAN, value)?,
                SERVINGS => filter.servings = parse_scalar(SERVINGS, value)?,
                INCLUDES_INGREDIENTS => extend_list(&mut filter.includes_ingredients, value),
                EXCLUDES_INGREDIENTS => extend_list(&mut filter.excludes_ingredients, value),
                INSTRUCTION_KEYWORDS => extend_list(&mut filter.instruction_keywords, value),
                other => debug!("Ignoring unknown filter parameter {:?}", other),
            }
        }
        Ok(filter)
    }

    pub fn to_query(&self) -> RecipeQuery {
        let mut conditions = vec![Condition::ServingsAtLeast(self.servings.unwrap_or(0))];

        if let Some(veg) = self.vegetarian {
            conditions.push(Condition::Vegetarian(veg));
        }
        for keyword in self.instruction_keywords.iter().flatten() {
            conditions.push(Condition::InstructionContains(keyword.clone()));
        }
        for ingredient in self.includes_ingredients.iter().flatten() {
            conditions.push(Condition::HasIngredient(ingredient.clone()));
        }
        for ingredient in self.excludes_ingredients.iter().flatten() {
            conditions.push(Condition::LacksIngredient(ingredient.clone()));
        }

        RecipeQuery { conditions }
    }
}

fn parse_scalar<T: std::str::FromStr>(
    name: &'static str,
    value: &str,
) -> Result<Option<T>, FilterError> {
    if value.is_empty() {
        return Ok(None);
    }
    value.parse().map(Some).map_err(|_| FilterError {
        name,
        value: value.to_string(),
    })
}

fn parse_flag(name: &'static str, value: &str) -> Result<Option<bool>, FilterError> {
    match &*value.to_ascii_lowercase() {
        "" => Ok(None),
        "true" | "on" | "yes" | "1" => Ok(Some(true)),
        "false" | "off" | "no" | "0" => Ok(Some(false)),
        _ => Err(FilterError {
            name,
            value: value.to_string(),
        }),
    }
}

fn extend_list(list: &mut Option<BTreeSet<String>>, value: &str) {
    let items = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();
    if !items.is_empty() {
        list.get_or_insert_with(BTreeSet::new).extend(items);
    }
}

impl Condition {
    fn matches(&self, recipe: &Recipe) -> bool {
        match self {
            Condition::ServingsAtLeast(n) => recipe.servings >= *n,
            Condition::Vegetarian(veg) => recipe.vegetarian == *veg,
            Condition::InstructionContains(kw) => recipe.instruction.contains(kw.as_str()),
            Condition::HasIngredient(i) => recipe.ingredients.contains(i),
            Condition::LacksIngredient(i) => !recipe.ingredients.contains(i),
        }
    }

    /// Renders this condition against the `recipe` table aliased as `r`,
    /// with its single parameter bound at position `n`.
    fn sql(&self, n: usize) -> String {
        match self {
            Condition::ServingsAtLeast(_) => format!("r.servings >= ${}", n),
            Condition::Vegetarian(_) => format!("r.vegetarian = ${}", n),
            Condition::InstructionContains(_) => format!("strpos(r.instruction, ${}) > 0", n),
            Condition::HasIngredient(_) => format!(
                "EXISTS (SELECT 1 FROM ingredient i WHERE i.recipe_id = r.id AND i.ingredient = ${})",
                n
            ),
            Condition::LacksIngredient(_) => format!(
                "NOT EXISTS (SELECT 1 FROM ingredient i WHERE i.recipe_id = r.id AND i.ingredient = ${})",
                n
            ),
        }
    }

    fn param(&self) -> &(dyn ToSql + Sync) {
        match self {
            Condition::ServingsAtLeast(n) => n,
            Condition::Vegetarian(veg) => veg,
            Condition::InstructionContains(s)
            | Condition::HasIngredient(s)
            | Condition::LacksIngredient(s) => s,
        }
    }
}

impl RecipeQuery {
    pub fn all() -> Self {
        RecipeFilter::default().to_query()
    }

    pub fn matches(&self, recipe: &Recipe) -> bool {
        self.conditions.iter().all(|c| c.matches(recipe))
    }

    /// A `WHERE` clause body and the parameters it binds, in order.
    pub(crate) fn to_sql(&self) -> (String, Vec<&(dyn ToSql + Sync)>) {
        if self.conditions.is_empty() {
            return ("TRUE".to_string(), Vec::new());
        }
        let clause = self
            .conditions
            .iter()
            .enumerate()
            .map(|(i, c)| c.sql(i + 1))
            .collect::<Vec<_>>()
            .join(" AND ");
        let params = self.conditions.iter().map(Condition::param).collect();
        (clause, params)
    }
}
