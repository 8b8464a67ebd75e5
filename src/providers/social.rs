use super::{
    http_client, read_success_body, retry_policy, EnrichmentProvider, Metered, SocialLookup,
};
use crate::config::EnrichmentConfig;
use crate::errors::EnrichmentError;
use crate::models::{SocialNetwork, SocialProfiles};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

pub const PROVIDER_NAME: &str = "rapidapi";
const COST_PER_CALL_CENTS: f64 = 1.0;

#[derive(Deserialize)]
struct SocialLinksResponse {
    #[serde(default)]
    data: HashMap<String, Value>,
}

/// RapidAPI "Social Links Search" client.
pub struct SocialLinksProvider {
    client: reqwest::Client,
    base_url: String,
    api_host: String,
    api_key: String,
    retry: RetryPolicy,
}

impl SocialLinksProvider {
    pub fn new(api_key: &str, config: &EnrichmentConfig) -> Result<Self, EnrichmentError> {
        Ok(Self {
            client: http_client(config.request_timeout)?,
            base_url: config
                .endpoints
                .social_base_url
                .trim_end_matches('/')
                .to_string(),
            api_host: config.endpoints.social_api_host.clone(),
            api_key: api_key.to_string(),
            retry: retry_policy(config),
        })
    }

    async fn search_once(&self, email: &str) -> Result<String, EnrichmentError> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/search-social-links", self.base_url),
            &[
                ("query", email),
                ("social_networks", SocialNetwork::query_list().as_str()),
            ],
        )
        .map_err(|e| EnrichmentError::Configuration(format!("Failed to build URL: {}", e)))?;

        tracing::debug!("Social links search for {} via {}", email, self.api_host);

        let response = self
            .client
            .get(url)
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", &self.api_host)
            .send()
            .await?;

        read_success_body(response, "Social links search").await
    }
}

/// Picks the first candidate URL of every known network.
pub fn parse_social_links(body: &str) -> Result<SocialProfiles, EnrichmentError> {
    let parsed: SocialLinksResponse = serde_json::from_str(body)
        .map_err(|e| EnrichmentError::Parse(format!("Invalid social links response: {}", e)))?;

    let mut profiles = SocialProfiles::new();
    for (name, candidates) in parsed.data {
        let Some(network) = SocialNetwork::from_name(&name) else {
            continue;
        };
        let first = candidates
            .as_array()
            .and_then(|urls| urls.iter().filter_map(Value::as_str).find(|u| !u.is_empty()));
        if let Some(url) = first {
            profiles.insert(network, url.to_string());
        }
    }
    Ok(profiles)
}

impl EnrichmentProvider for SocialLinksProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn cost_per_call_cents(&self) -> f64 {
        COST_PER_CALL_CENTS
    }
}

#[async_trait]
impl SocialLookup for SocialLinksProvider {
    async fn find_social_profiles(
        &self,
        email: &str,
    ) -> Result<Metered<SocialProfiles>, EnrichmentError> {
        let body = self
            .retry
            .run("Social links search", move || self.search_once(email))
            .await?;
        let profiles = parse_social_links(&body)?;
        tracing::info!("Found {} social profile(s) for {}", profiles.len(), email);
        Ok(Metered::unmetered(profiles))
    }
}
