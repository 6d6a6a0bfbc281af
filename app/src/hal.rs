use std::collections::BTreeMap;

use serde::Serialize;
use url::Url;

pub const HAL_JSON: &str = "application/hal+json";

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub href: String,
}

pub type Links = BTreeMap<&'static str, Link>;

#[derive(Serialize, Debug, Clone)]
pub struct EntityModel<T> {
    #[serde(flatten)]
    pub content: T,
    #[serde(rename = "_links")]
    pub links: Links,
}

#[derive(Serialize, Debug, Clone)]
pub struct CollectionModel<T> {
    #[serde(rename = "_embedded", skip_serializing_if = "BTreeMap::is_empty")]
    pub embedded: BTreeMap<&'static str, Vec<EntityModel<T>>>,
    #[serde(rename = "_links")]
    pub links: Links,
}

impl Link {
    pub fn to(url: &Url) -> Self {
        Link {
            href: url.to_string(),
        }
    }
}

impl<T> EntityModel<T> {
    pub fn of(content: T) -> Self {
        EntityModel {
            content,
            links: Links::new(),
        }
    }

    pub fn with_link(mut self, rel: &'static str, url: &Url) -> Self {
        self.links.insert(rel, Link::to(url));
        self
    }
}

impl<T> CollectionModel<T> {
    /// Items are embedded under `rel`, which is left out entirely when there
    /// are none.
    pub fn of(rel: &'static str, items: Vec<EntityModel<T>>) -> Self {
        let mut embedded = BTreeMap::new();
        if !items.is_empty() {
            embedded.insert(rel, items);
        }
        CollectionModel {
            embedded,
            links: Links::new(),
        }
    }

    pub fn with_link(mut self, rel: &'static str, url: &Url) -> Self {
        self.links.insert(rel, Link::to(url));
        self
    }
}
