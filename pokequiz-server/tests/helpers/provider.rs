//! In-memory species provider

use async_trait::async_trait;
use pokequiz_server::provider::{
    ItemAttrs, ItemRef, ProviderError, SpeciesNaming, SpeciesProvider, TypeNaming,
};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
pub struct FakeProvider {
    items: Vec<ItemAttrs>,
    namings: HashMap<u32, SpeciesNaming>,
    types: HashMap<u32, TypeNaming>,
    generations: HashMap<u32, Vec<u32>>,
    failing: HashSet<u32>,
    offline: bool,
    item_requests: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request fails with a network error
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    pub fn type_name(mut self, type_id: u32, slug: &str, localized: &str) -> Self {
        let naming = json!({
            "name": slug,
            "names": [{"language": {"name": "ja"}, "name": localized}],
        });
        self.types.insert(type_id, decode(naming));
        self
    }

    /// Base species: height 7dm, weight 69hg
    pub fn species(mut self, id: u32, slug: &str, localized: &str, generation: u32, types: &[&str]) -> Self {
        self.items.push(item(id, slug, id, types));
        self.namings.insert(
            id,
            decode(json!({
                "name": slug,
                "names": [
                    {"language": {"name": "en"}, "name": slug},
                    {"language": {"name": "ja"}, "name": localized},
                ],
                "varieties": [{"is_default": true, "pokemon": {"name": slug, "url": ""}}],
            })),
        );
        self.generations.entry(generation).or_default().push(id);
        self
    }

    /// Non-default variety of an existing species
    pub fn variant(mut self, species_id: u32, source_name: &str, provider_id: u32, types: &[&str]) -> Self {
        self.items.push(item(provider_id, source_name, species_id, types));
        if let Some(naming) = self.namings.get_mut(&species_id) {
            naming.varieties.push(decode(json!({
                "is_default": false,
                "pokemon": {"name": source_name, "url": ""},
            })));
        }
        self
    }

    /// Item fetch for `id` fails with a network error
    pub fn failing(mut self, id: u32) -> Self {
        self.failing.insert(id);
        self
    }

    pub fn item_requests(&self) -> usize {
        self.item_requests.load(Ordering::SeqCst)
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> T {
    serde_json::from_value(value).unwrap()
}

fn item(id: u32, name: &str, species_id: u32, types: &[&str]) -> ItemAttrs {
    let types: Vec<_> = types
        .iter()
        .map(|t| json!({"slot": 1, "type": {"name": t, "url": ""}}))
        .collect();

    decode(json!({
        "id": id,
        "name": name,
        "species": {"name": name, "url": format!("https://provider.test/pokemon-species/{}/", species_id)},
        "stats": [
            {"base_stat": 45, "stat": {"name": "hp"}},
            {"base_stat": 49, "stat": {"name": "attack"}},
            {"base_stat": 49, "stat": {"name": "defense"}},
            {"base_stat": 65, "stat": {"name": "special-attack"}},
            {"base_stat": 65, "stat": {"name": "special-defense"}},
            {"base_stat": 45, "stat": {"name": "speed"}},
        ],
        "types": types,
        "height": 7,
        "weight": 69,
        "sprites": {"other": {"official-artwork": {"front_default": format!("https://img.test/{}.png", id)}}},
    }))
}

#[async_trait]
impl SpeciesProvider for FakeProvider {
    async fn fetch_item(&self, item_ref: &ItemRef) -> Result<ItemAttrs, ProviderError> {
        self.item_requests.fetch_add(1, Ordering::SeqCst);

        if self.offline {
            return Err(ProviderError::Network("offline".to_string()));
        }

        match item_ref {
            ItemRef::Id(id) if self.failing.contains(id) => {
                Err(ProviderError::Network(format!("connection reset for {}", id)))
            }
            ItemRef::Id(id) => self
                .items
                .iter()
                .find(|item| item.id == *id && self.namings.contains_key(id))
                .cloned()
                .ok_or_else(|| ProviderError::NotFound(id.to_string())),
            ItemRef::Name(name) => self
                .items
                .iter()
                .find(|item| &item.name == name)
                .cloned()
                .ok_or_else(|| ProviderError::NotFound(name.clone())),
        }
    }

    async fn fetch_naming(&self, species_id: u32) -> Result<SpeciesNaming, ProviderError> {
        if self.offline {
            return Err(ProviderError::Network("offline".to_string()));
        }
        self.namings
            .get(&species_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(species_id.to_string()))
    }

    async fn fetch_type_naming(&self, type_id: u32) -> Result<TypeNaming, ProviderError> {
        if self.offline {
            return Err(ProviderError::Network("offline".to_string()));
        }
        self.types
            .get(&type_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(type_id.to_string()))
    }

    async fn fetch_generation_members(&self, generation_id: u32) -> Result<Vec<u32>, ProviderError> {
        if self.offline {
            return Err(ProviderError::Network("offline".to_string()));
        }
        Ok(self.generations.get(&generation_id).cloned().unwrap_or_default())
    }
}
