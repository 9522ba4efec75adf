//! PokeAPI client
//!
//! Plain HTTPS GETs against the public PokeAPI (`/pokemon`, `/pokemon-species`,
//! `/type`, `/generation`). Each request carries a fixed timeout; expiry
//! surfaces as [`ProviderError::Network`].

use super::{
    ItemAttrs, ItemRef, ProviderError, ResourceRef, SpeciesNaming, SpeciesProvider, TypeNaming,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const USER_AGENT: &str = concat!("pokequiz/", env!("CARGO_PKG_VERSION"));

/// `/generation/{id}` response
#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    pokemon_species: Vec<ResourceRef>,
}

/// PokeAPI client
pub struct PokeApiClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl PokeApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ProviderError> {
        let url = format!("{}/{}", self.base_url, path);
        tracing::debug!(url = %url, "Querying species provider");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(path.to_string()));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(status.as_u16(), error_text));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Parse(format!("{}: {}", path, e)))
    }
}

#[async_trait]
impl SpeciesProvider for PokeApiClient {
    async fn fetch_item(&self, item: &ItemRef) -> Result<ItemAttrs, ProviderError> {
        self.get_json(&format!("pokemon/{}", item)).await
    }

    async fn fetch_naming(&self, species_id: u32) -> Result<SpeciesNaming, ProviderError> {
        self.get_json(&format!("pokemon-species/{}", species_id)).await
    }

    async fn fetch_type_naming(&self, type_id: u32) -> Result<TypeNaming, ProviderError> {
        self.get_json(&format!("type/{}", type_id)).await
    }

    async fn fetch_generation_members(&self, generation_id: u32) -> Result<Vec<u32>, ProviderError> {
        let generation: GenerationResponse =
            self.get_json(&format!("generation/{}", generation_id)).await?;

        Ok(generation
            .pokemon_species
            .iter()
            .filter_map(ResourceRef::id_from_url)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation_trims_base_url() {
        let client = PokeApiClient::new("https://pokeapi.co/api/v2/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "https://pokeapi.co/api/v2");
    }

    #[test]
    fn test_generation_response_decodes_ids() {
        let json = r#"{"pokemon_species": [
            {"name": "bulbasaur", "url": "https://pokeapi.co/api/v2/pokemon-species/1/"},
            {"name": "broken", "url": "https://pokeapi.co/api/v2/pokemon-species/x/"},
            {"name": "mew", "url": "https://pokeapi.co/api/v2/pokemon-species/151/"}
        ]}"#;
        let generation: GenerationResponse = serde_json::from_str(json).unwrap();
        let ids: Vec<u32> = generation
            .pokemon_species
            .iter()
            .filter_map(ResourceRef::id_from_url)
            .collect();
        assert_eq!(ids, vec![1, 151]);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let client = PokeApiClient::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let result = client.fetch_item(&ItemRef::Id(1)).await;
        assert!(matches!(result, Err(ProviderError::Network(_))));
    }
}
