use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;
use structopt::StructOpt;

use infra::ids::Id;
use recipebook::config::{EnvLogger, EnvOverrides};
use recipebook::recipes::{DeleteRecipe, GetRecipe, ListRecipes, Recipe, RecipeFilter};
use recipebook::services::{Commandable, Queryable};

#[derive(Debug, StructOpt)]
#[structopt(name = "rb", about = "Recipe book CLI")]
struct Opt {
    /// Input file
    #[structopt(parse(from_os_str))]
    config: PathBuf,
    #[structopt(subcommand)]
    command: Commands,
}

#[derive(Debug, StructOpt)]
enum Commands {
    #[structopt(name = "setup", about = "Initialize")]
    Setup,
    #[structopt(name = "list", about = "List recipes matching filters")]
    List(ListOpts),
    #[structopt(name = "show", about = "Show one recipe")]
    Show { id: Id<Recipe> },
    #[structopt(name = "delete", about = "Delete one recipe")]
    Delete { id: Id<Recipe> },
}

#[derive(Debug, StructOpt)]
struct ListOpts {
    #[structopt(long)]
    vegetarian: Option<bool>,
    #[structopt(long)]
    servings: Option<i32>,
    #[structopt(long = "includes")]
    includes: Vec<String>,
    #[structopt(long = "excludes")]
    excludes: Vec<String>,
    #[structopt(long = "keyword")]
    keywords: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct Config {
    #[serde(flatten)]
    recipebook: recipebook::config::Config,
    #[serde(default)]
    env_logger: EnvLogger,
}

impl ListOpts {
    fn into_filter(self) -> RecipeFilter {
        fn set(items: Vec<String>) -> Option<BTreeSet<String>> {
            if items.is_empty() {
                None
            } else {
                Some(items.into_iter().collect())
            }
        }
        RecipeFilter {
            vegetarian: self.vegetarian,
            servings: self.servings,
            includes_ingredients: set(self.includes),
            excludes_ingredients: set(self.excludes),
            instruction_keywords: set(self.keywords),
        }
    }
}

fn print_recipe(recipe: &Recipe) {
    let id = recipe
        .id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    let ingredients = recipe
        .ingredients
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    println!(
        "{}: {} (serves {}{}) [{}]",
        id,
        recipe.title,
        recipe.servings,
        if recipe.vegetarian { ", vegetarian" } else { "" },
        ingredients
    );
}

fn main() -> Result<()> {
    let opt = Opt::from_args();

    let mut config_buf = String::new();
    File::open(&opt.config)
        .with_context(|| format!("open {:?}", opt.config))?
        .read_to_string(&mut config_buf)?;
    let mut config: Config = toml::from_str(&config_buf).context("parse config")?;

    config.env_logger.builder().init();
    config
        .recipebook
        .apply_overrides(EnvOverrides::from_env()?);

    let rb = recipebook::RecipeBook::new(&config.recipebook)?;

    match opt.command {
        Commands::Setup => {
            rb.setup()?;
        }
        Commands::List(opts) => {
            let list = rb.recipes().query(ListRecipes(opts.into_filter()))?;
            for recipe in list.iter() {
                print_recipe(recipe);
            }
        }
        Commands::Show { id } => {
            let recipe = rb.recipes().query(GetRecipe(id))?;
            print_recipe(&recipe);
            println!("{}", recipe.instruction);
        }
        Commands::Delete { id } => {
            rb.recipes().execute(DeleteRecipe(id))?;
        }
    }

    Ok(())
}
