//! Guarded with `#[cfg(test)]` from `lib.rs`
//!
//! Every scenario runs against the in-memory store, and against Postgres
//! when `$POSTGRES_URL` is set and ignored tests are requested.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Result;
use maplit::btreeset;
use rand::random;

use infra::ids::Id;

use crate::recipes::*;
use crate::services::{Commandable, Queryable};


macro_rules! recipe_store_tests {
    ($($name:ident),* $(,)?) => {
        mod memory {
            $(
                #[test]
                fn $name() -> anyhow::Result<()> {
                    env_logger::try_init().unwrap_or_default();
                    super::$name(std::sync::Arc::new(crate::recipes::MemoryRecipeStore::new()))
                }
            )*
        }

        mod postgres {
            $(
                #[test]
                #[ignore]
                fn $name() -> anyhow::Result<()> {
                    env_logger::try_init().unwrap_or_default();
                    super::$name(super::junk_drawer::pg_store(stringify!($name))?)
                }
            )*
        }
    };
}

recipe_store_tests!(
    inserted_ids_are_assigned_and_unique,
    empty_filter_returns_everything,
    servings_filter_is_inclusive,
    includes_and_excludes_filter_by_ingredients,
    include_and_exclude_of_same_ingredient_is_empty,
    keywords_filter_instructions,
    filter_scenario,
    get_missing_recipe_is_not_found,
    upsert_missing_id_creates_new_record,
    upsert_existing_id_replaces_every_field,
    delete_missing_id_is_harmless,
    full_lifecycle,
    create_rejects_negative_servings,
);

fn recipe(title: &str, servings: i32, vegetarian: bool, ingredients: &[&str]) -> Recipe {
    Recipe {
        title: title.to_string(),
        vegetarian,
        servings,
        ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
        instruction: format!("Combine everything for {}.", title),
        ..Default::default()
    }
}

fn set(items: &[&str]) -> Option<BTreeSet<String>> {
    Some(items.iter().map(|s| s.to_string()).collect())
}

fn create(recipes: &Recipes, recipe: Recipe) -> Result<Recipe> {
    recipes.execute(CreateRecipe(recipe))
}

fn list(recipes: &Recipes, filter: RecipeFilter) -> Result<Vec<Recipe>> {
    recipes.query(ListRecipes(filter))
}

fn titles(found: &[Recipe]) -> BTreeSet<String> {
    found.iter().map(|r| r.title.clone()).collect()
}

fn with_scenario(store: Arc<dyn RecipeStore>) -> Result<Recipes> {
    let recipes = Recipes::new(store);
    for r in vec![
        recipe("Veggie pie", 1, true, &["Flour", "Carrot", "Broccoli"]),
        recipe("Meat pie", 1, false, &["Flour", "Meat"]),
        recipe("Carrot cake", 4, true, &["Flour", "Carrot", "Sugar"]),
        recipe("Stew", 4, false, &["Flour", "Meat", "Onion"]),
        recipe("Mushroom bake", 2, true, &["Flour", "Mushroom"]),
    ] {
        create(&recipes, r)?;
    }
    Ok(recipes)
}

fn inserted_ids_are_assigned_and_unique(store: Arc<dyn RecipeStore>) -> Result<()> {
    let recipes = Recipes::new(store);

    let ids = (0..5)
        .map(|i| create(&recipes, recipe(&format!("Dish {}", i), i, false, &[])))
        .map(|res| res.map(|r| r.id))
        .collect::<Result<Vec<_>>>()?;

    assert!(ids.iter().all(Option::is_some), "ids: {:?}", ids);
    let unique = ids.iter().collect::<BTreeSet<_>>();
    assert_eq!(unique.len(), ids.len(), "ids: {:?}", ids);
    Ok(())
}

fn empty_filter_returns_everything(store: Arc<dyn RecipeStore>) -> Result<()> {
    let recipes = with_scenario(store)?;

    let found = list(&recipes, RecipeFilter::default())?;

    assert_eq!(found.len(), 5, "found: {:?}", found);
    Ok(())
}

fn servings_filter_is_inclusive(store: Arc<dyn RecipeStore>) -> Result<()> {
    let recipes = with_scenario(store)?;

    let found = list(
        &recipes,
        RecipeFilter {
            servings: Some(4),
            ..Default::default()
        },
    )?;

    assert_eq!(titles(&found), btreeset! {"Carrot cake".into(), "Stew".into()});
    Ok(())
}

fn includes_and_excludes_filter_by_ingredients(store: Arc<dyn RecipeStore>) -> Result<()> {
    let recipes = with_scenario(store)?;

    let both = list(
        &recipes,
        RecipeFilter {
            includes_ingredients: set(&["Meat", "Onion"]),
            ..Default::default()
        },
    )?;
    assert_eq!(titles(&both), btreeset! {"Stew".into()});

    let neither = list(
        &recipes,
        RecipeFilter {
            excludes_ingredients: set(&["Meat", "Carrot"]),
            ..Default::default()
        },
    )?;
    assert_eq!(titles(&neither), btreeset! {"Mushroom bake".into()});
    Ok(())
}

fn include_and_exclude_of_same_ingredient_is_empty(store: Arc<dyn RecipeStore>) -> Result<()> {
    let recipes = with_scenario(store)?;

    let found = list(
        &recipes,
        RecipeFilter {
            includes_ingredients: set(&["Flour"]),
            excludes_ingredients: set(&["Flour"]),
            ..Default::default()
        },
    )?;

    assert!(found.is_empty(), "found: {:?}", found);
    Ok(())
}

fn keywords_filter_instructions(store: Arc<dyn RecipeStore>) -> Result<()> {
    let recipes = Recipes::new(store);
    create(
        &recipes,
        Recipe {
            title: "Bread".into(),
            instruction: "Knead, prove at 50% humidity, then bake in the oven.".into(),
            ..Default::default()
        },
    )?;
    create(
        &recipes,
        Recipe {
            title: "Salad".into(),
            instruction: "Toss in a bowl. No Oven needed.".into(),
            ..Default::default()
        },
    )?;

    let oven = list(
        &recipes,
        RecipeFilter {
            instruction_keywords: set(&["oven"]),
            ..Default::default()
        },
    )?;
    assert_eq!(titles(&oven), btreeset! {"Bread".into()});

    let literal = list(
        &recipes,
        RecipeFilter {
            instruction_keywords: set(&["50%", "Knead"]),
            ..Default::default()
        },
    )?;
    assert_eq!(titles(&literal), btreeset! {"Bread".into()});

    let wildcard = list(
        &recipes,
        RecipeFilter {
            instruction_keywords: set(&["%"]),
            ..Default::default()
        },
    )?;
    assert_eq!(titles(&wildcard), btreeset! {"Bread".into()});
    Ok(())
}

fn filter_scenario(store: Arc<dyn RecipeStore>) -> Result<()> {
    let recipes = with_scenario(store)?;
    let count = |filter: RecipeFilter| list(&recipes, filter).map(|found| found.len());

    assert_eq!(
        count(RecipeFilter {
            vegetarian: Some(true),
            ..Default::default()
        })?,
        3
    );
    assert_eq!(
        count(RecipeFilter {
            servings: Some(2),
            ..Default::default()
        })?,
        3
    );
    assert_eq!(
        count(RecipeFilter {
            includes_ingredients: set(&["Flour"]),
            ..Default::default()
        })?,
        5
    );
    assert_eq!(
        count(RecipeFilter {
            includes_ingredients: set(&["Carrot", "Flour"]),
            ..Default::default()
        })?,
        2
    );
    assert_eq!(
        count(RecipeFilter {
            excludes_ingredients: set(&["Carrot", "Broccoli"]),
            ..Default::default()
        })?,
        3
    );
    Ok(())
}

fn get_missing_recipe_is_not_found(store: Arc<dyn RecipeStore>) -> Result<()> {
    let recipes = with_scenario(store)?;
    let id = random::<Id<Recipe>>();

    let err = recipes.query(GetRecipe(id)).expect_err("get should fail");

    assert_eq!(err.downcast_ref::<RecipeNotFound>(), Some(&RecipeNotFound(id)));
    assert_eq!(err.to_string(), format!("Could not find Recipe {}", id));
    Ok(())
}

fn upsert_missing_id_creates_new_record(store: Arc<dyn RecipeStore>) -> Result<()> {
    let recipes = Recipes::new(store);
    let requested = random::<Id<Recipe>>();
    let payload = recipe("Soup", 3, true, &["Leek", "Potato"]);

    let outcome = recipes.execute(UpsertRecipe {
        id: requested,
        recipe: payload.clone(),
    })?;

    let created = match outcome {
        Upserted::Created(r) => r,
        other => panic!("Expected creation, got {:?}", other),
    };
    let id = created.id.expect("assigned id");
    assert_ne!(id, requested);
    assert_eq!(
        created,
        Recipe {
            id: Some(id),
            ..payload
        }
    );
    assert_eq!(recipes.query(GetRecipe(id))?, created);
    Ok(())
}

fn upsert_existing_id_replaces_every_field(store: Arc<dyn RecipeStore>) -> Result<()> {
    let recipes = Recipes::new(store);
    let original = create(&recipes, recipe("Soup", 3, true, &["Leek", "Potato"]))?;
    let id = original.id.expect("id");
    let replacement = Recipe {
        id: None,
        title: "Chowder".into(),
        vegetarian: false,
        servings: 6,
        ingredients: btreeset! {"Clam".into(), "Potato".into()},
        instruction: "Simmer gently.".into(),
    };

    let outcome = recipes.execute(UpsertRecipe {
        id,
        recipe: replacement.clone(),
    })?;

    let expected = Recipe {
        id: Some(id),
        ..replacement
    };
    assert_eq!(outcome, Upserted::Replaced(expected.clone()));
    assert_eq!(recipes.query(GetRecipe(id))?, expected);
    assert_eq!(list(&recipes, RecipeFilter::default())?.len(), 1);
    Ok(())
}

fn delete_missing_id_is_harmless(store: Arc<dyn RecipeStore>) -> Result<()> {
    let recipes = with_scenario(store)?;
    let id = random::<Id<Recipe>>();

    recipes.execute(DeleteRecipe(id))?;

    let err = recipes.query(GetRecipe(id)).expect_err("get should fail");
    assert!(err.downcast_ref::<RecipeNotFound>().is_some(), "{:?}", err);
    assert_eq!(list(&recipes, RecipeFilter::default())?.len(), 5);
    Ok(())
}

fn full_lifecycle(store: Arc<dyn RecipeStore>) -> Result<()> {
    let recipes = Recipes::new(store);

    let created = create(&recipes, recipe("Omelette", 1, true, &["Egg"]))?;
    let id = created.id.expect("id");
    assert_eq!(recipes.query(GetRecipe(id))?, created);

    let replaced = recipes
        .execute(UpsertRecipe {
            id,
            recipe: recipe("Omelette", 2, true, &["Egg", "Cheese"]),
        })?
        .into_recipe();
    assert_eq!(replaced.id, Some(id));
    assert_eq!(replaced.ingredients, btreeset! {"Cheese".into(), "Egg".into()});

    recipes.execute(DeleteRecipe(id))?;
    assert!(recipes.query(GetRecipe(id)).is_err());
    assert!(list(&recipes, RecipeFilter::default())?.is_empty());
    Ok(())
}

fn create_rejects_negative_servings(store: Arc<dyn RecipeStore>) -> Result<()> {
    let recipes = Recipes::new(store);

    let err = create(&recipes, recipe("Nothing", -2, true, &[])).expect_err("should fail");

    assert_eq!(
        err.downcast_ref::<InvalidRecipe>(),
        Some(&InvalidRecipe::NegativeServings(-2))
    );
    assert!(list(&recipes, RecipeFilter::default())?.is_empty());
    Ok(())
}
