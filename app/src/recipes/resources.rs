use std::fmt;

use actix_web::http::{header, StatusCode};
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use anyhow::Context;
use log::*;
use serde::Serialize;
use serde_json::json;
use url::Url;

use infra::ids::Id;

use crate::config::ReplaceStatus;
use crate::hal::{CollectionModel, EntityModel, HAL_JSON};
use crate::services::{Commandable, Queryable};

use super::{
    CreateRecipe, DeleteRecipe, FilterError, GetRecipe, InvalidRecipe, ListRecipes, Recipe,
    RecipeFilter, RecipeNotFound, Recipes, UpsertRecipe, Upserted,
};

const PREFIX: &str = "/recipes";
const RECIPES: &str = "recipes";
const RECIPE: &str = "recipe";
const COLLECTION_REL: &str = "recipeList";
const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

#[derive(Debug, Clone)]
pub(crate) struct RecipeResources {
    recipes: Recipes,
    replace_status: ReplaceStatus,
}

/// Any failure on the way to a response; classified by its root cause.
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        ApiError(err.into())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.0)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        if self.0.downcast_ref::<RecipeNotFound>().is_some() {
            StatusCode::NOT_FOUND
        } else if self.0.downcast_ref::<InvalidRecipe>().is_some()
            || self.0.downcast_ref::<FilterError>().is_some()
        {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Handling: {:?}", self.0);
            return HttpResponse::build(status)
                .content_type(TEXT_PLAIN)
                .body("Internal Error");
        }
        debug!("Rejecting with {}: {}", status, self.0);
        HttpResponse::build(status)
            .content_type(TEXT_PLAIN)
            .body(self.0.to_string())
    }
}

impl RecipeResources {
    pub(crate) fn new(recipes: Recipes, replace_status: ReplaceStatus) -> Self {
        RecipeResources {
            recipes,
            replace_status,
        }
    }

    pub(crate) fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.service({
            let list = self.clone();
            let create = self.clone();
            web::resource(PREFIX)
                .name(RECIPES)
                .route(web::get().to(move |req: HttpRequest| list.clone().list(req)))
                .route(web::post().to(move |req: HttpRequest, body: web::Json<Recipe>| {
                    create.clone().create(req, body.into_inner())
                }))
        })
        .service({
            let show = self.clone();
            let upsert = self.clone();
            let delete = self.clone();
            web::resource(format!("{}/{{id}}", PREFIX))
                .name(RECIPE)
                .route(
                    web::get().to(move |req: HttpRequest, id: web::Path<Id<Recipe>>| {
                        show.clone().show(req, id.into_inner())
                    }),
                )
                .route(web::put().to(
                    move |req: HttpRequest, id: web::Path<Id<Recipe>>, body: web::Json<Recipe>| {
                        upsert.clone().upsert(req, id.into_inner(), body.into_inner())
                    },
                ))
                .route(
                    web::delete().to(move |id: web::Path<Id<Recipe>>| {
                        delete.clone().delete(id.into_inner())
                    }),
                )
        })
        .service({
            let me = self.clone();
            web::resource(["/health", "/actuator/health"])
                .route(web::get().to(move || me.clone().health()))
        })
        .route("/", web::get().to(index_redirect));
    }

    async fn list(self, req: HttpRequest) -> Result<HttpResponse, ApiError> {
        let filter = RecipeFilter::from_query(req.query_string())?;
        let found = self
            .in_pool(move |recipes| recipes.query(ListRecipes(filter)))
            .await?;

        let models = found
            .into_iter()
            .map(|recipe| recipe_model(&req, recipe))
            .collect::<Result<Vec<_>, _>>()?;
        let collection = CollectionModel::of(COLLECTION_REL, models)
            .with_link("self", &req.url_for_static(RECIPES)?);

        hal_response(StatusCode::OK, &collection, None)
    }

    async fn create(self, req: HttpRequest, recipe: Recipe) -> Result<HttpResponse, ApiError> {
        debug!("Submit recipe: {:?}", recipe);
        let stored = self
            .in_pool(move |recipes| recipes.execute(CreateRecipe(recipe)))
            .await?;
        let (location, model) = located_model(&req, stored)?;

        hal_response(StatusCode::CREATED, &model, Some(location))
    }

    async fn show(self, req: HttpRequest, id: Id<Recipe>) -> Result<HttpResponse, ApiError> {
        let recipe = self
            .in_pool(move |recipes| recipes.query(GetRecipe(id)))
            .await?;
        let model = recipe_model(&req, recipe)?;

        hal_response(StatusCode::OK, &model, None)
    }

    async fn upsert(
        self,
        req: HttpRequest,
        id: Id<Recipe>,
        recipe: Recipe,
    ) -> Result<HttpResponse, ApiError> {
        let outcome = self
            .in_pool(move |recipes| recipes.execute(UpsertRecipe { id, recipe }))
            .await?;
        let status = match outcome {
            Upserted::Replaced(_) => self.replace_status.status_code(),
            Upserted::Created(_) => StatusCode::CREATED,
        };
        let (location, model) = located_model(&req, outcome.into_recipe())?;

        hal_response(status, &model, Some(location))
    }

    async fn delete(self, id: Id<Recipe>) -> Result<HttpResponse, ApiError> {
        self.in_pool(move |recipes| recipes.execute(DeleteRecipe(id)))
            .await?;
        Ok(HttpResponse::Ok().finish())
    }

    async fn health(self) -> HttpResponse {
        let (mut resp, status) = match self.in_pool(|recipes| recipes.ping()).await {
            Ok(()) => (HttpResponse::Ok(), "UP"),
            Err(e) => {
                warn!("Health check failed: {}", e);
                (HttpResponse::ServiceUnavailable(), "DOWN")
            }
        };
        resp.json(json!({
            "status": status,
            "components": {"db": {"status": status}},
        }))
    }

    /// Runs a store-bound operation on the blocking pool.
    async fn in_pool<R, F>(&self, f: F) -> Result<R, ApiError>
    where
        R: Send + 'static,
        F: FnOnce(&Recipes) -> anyhow::Result<R> + Send + 'static,
    {
        let recipes = self.recipes.clone();
        let res = web::block(move || f(&recipes)).await?;
        Ok(res?)
    }
}

fn recipe_model(req: &HttpRequest, recipe: Recipe) -> Result<EntityModel<Recipe>, ApiError> {
    located_model(req, recipe).map(|(_, model)| model)
}

fn located_model(
    req: &HttpRequest,
    recipe: Recipe,
) -> Result<(Url, EntityModel<Recipe>), ApiError> {
    let id = recipe.id.context("stored recipe without an id")?;
    let location = req.url_for(RECIPE, &[id.to_string()])?;
    let model = EntityModel::of(recipe)
        .with_link("self", &location)
        .with_link(RECIPES, &req.url_for_static(RECIPES)?);
    Ok((location, model))
}

fn hal_response<T: Serialize>(
    status: StatusCode,
    body: &T,
    location: Option<Url>,
) -> Result<HttpResponse, ApiError> {
    let json = serde_json::to_string(body)?;
    let mut resp = HttpResponse::build(status);
    if let Some(location) = location {
        resp.insert_header((header::LOCATION, location.to_string()));
    }
    Ok(resp.content_type(HAL_JSON).body(json))
}

async fn index_redirect(req: HttpRequest) -> HttpResponse {
    debug!("Redirecting from: {}", req.uri());
    info!("Target {} → {}", req.uri(), PREFIX);

    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, PREFIX))
        .finish()
}
