//! External species data provider
//!
//! Read-only I/O adapter: no business logic lives here. The builder and
//! classifier talk to the provider through [`SpeciesProvider`] so tests can
//! substitute an in-memory implementation.

pub mod pokeapi;

pub use pokeapi::PokeApiClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Provider errors
///
/// Every variant is a per-item, skippable failure from the builder's view.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Item lookup key: native id or source name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemRef {
    Id(u32),
    Name(String),
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemRef::Id(id) => write!(f, "{}", id),
            ItemRef::Name(name) => write!(f, "{}", name),
        }
    }
}

/// Named link to another provider resource
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ResourceRef {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

impl ResourceRef {
    /// Trailing numeric id of the resource URL
    /// (`.../pokemon-species/25/` -> 25)
    pub fn id_from_url(&self) -> Option<u32> {
        self.url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .and_then(|segment| segment.parse().ok())
    }
}

/// One base stat entry (`{"base_stat": 45, "stat": {"name": "hp"}}`)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatEntry {
    pub base_stat: u32,
    pub stat: ResourceRef,
}

/// One type slot (`{"type": {"name": "grass"}}`)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TypeSlot {
    #[serde(rename = "type")]
    pub type_ref: ResourceRef,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Sprites {
    #[serde(default)]
    pub other: OtherSprites,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OtherSprites {
    #[serde(rename = "official-artwork", default)]
    pub official_artwork: Artwork,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Artwork {
    #[serde(default)]
    pub front_default: Option<String>,
}

/// Per-item attributes in provider-native units
///
/// `height` is in decimetres, `weight` in hectograms.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ItemAttrs {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub species: ResourceRef,
    #[serde(default)]
    pub stats: Vec<StatEntry>,
    #[serde(default)]
    pub types: Vec<TypeSlot>,
    #[serde(default)]
    pub height: f32,
    #[serde(default)]
    pub weight: f32,
    #[serde(default)]
    pub sprites: Sprites,
}

impl ItemAttrs {
    pub fn artwork_url(&self) -> String {
        self.sprites
            .other
            .official_artwork
            .front_default
            .clone()
            .unwrap_or_default()
    }
}

/// One localized name (`{"language": {"name": "ja"}, "name": "..."}`)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocalizedName {
    pub language: ResourceRef,
    pub name: String,
}

/// Pick the first name whose language appears earliest in `languages`
pub fn pick_localized<'a>(names: &'a [LocalizedName], languages: &[String]) -> Option<&'a str> {
    languages.iter().find_map(|lang| {
        names
            .iter()
            .find(|n| &n.language.name == lang && !n.name.is_empty())
            .map(|n| n.name.as_str())
    })
}

/// A species variety (form) listed on the naming resource
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Variety {
    pub is_default: bool,
    pub pokemon: ResourceRef,
}

/// Per-species localized naming plus its list of varieties
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SpeciesNaming {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub names: Vec<LocalizedName>,
    #[serde(default)]
    pub varieties: Vec<Variety>,
}

/// Per-type localized naming; `name` is the provider slug (e.g. `grass`)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TypeNaming {
    pub name: String,
    #[serde(default)]
    pub names: Vec<LocalizedName>,
}

/// Read-only species data source
#[async_trait]
pub trait SpeciesProvider: Send + Sync {
    /// Attributes of one item by native id or source name
    async fn fetch_item(&self, item: &ItemRef) -> Result<ItemAttrs, ProviderError>;

    /// Localized naming and varieties of one species
    async fn fetch_naming(&self, species_id: u32) -> Result<SpeciesNaming, ProviderError>;

    /// Localized naming of one type
    async fn fetch_type_naming(&self, type_id: u32) -> Result<TypeNaming, ProviderError>;

    /// Species ids introduced in one generation
    async fn fetch_generation_members(&self, generation_id: u32) -> Result<Vec<u32>, ProviderError>;
}
