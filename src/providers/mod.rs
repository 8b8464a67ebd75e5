//! External research providers.
//!
//! Each provider wraps one HTTP API behind a narrow trait so the orchestrator
//! (and tests) depend on the capability rather than the concrete client.

pub mod chat;
pub mod company;
pub mod persona;
pub mod social;

use crate::config::EnrichmentConfig;
use crate::errors::EnrichmentError;
use crate::models::{CompanyIntel, ContentAnalysis, PersonaBucket, SocialProfiles};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use std::time::Duration;

pub use company::CompanyResearchProvider;
pub use persona::PersonaProvider;
pub use social::SocialLinksProvider;

/// A provider result together with the tokens it consumed, when the API reports them.
#[derive(Debug, Clone, PartialEq)]
pub struct Metered<T> {
    pub value: T,
    pub tokens: Option<u64>,
}

impl<T> Metered<T> {
    pub fn new(value: T, tokens: Option<u64>) -> Self {
        Self { value, tokens }
    }

    pub fn unmetered(value: T) -> Self {
        Self {
            value,
            tokens: None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Metered<U> {
        Metered {
            value: f(self.value),
            tokens: self.tokens,
        }
    }
}

/// Common identity of every provider.
pub trait EnrichmentProvider: Send + Sync {
    /// Name recorded in `providers_used` and the usage counters.
    fn name(&self) -> &str;

    /// Flat cost estimate of one successful call.
    fn cost_per_call_cents(&self) -> f64 {
        0.0
    }
}

/// Email -> social profile URLs.
#[async_trait]
pub trait SocialLookup: EnrichmentProvider {
    async fn find_social_profiles(
        &self,
        email: &str,
    ) -> Result<Metered<SocialProfiles>, EnrichmentError>;
}

/// Company name -> structured company intelligence.
#[async_trait]
pub trait CompanyResearch: EnrichmentProvider {
    async fn enrich_company(
        &self,
        company_name: &str,
    ) -> Result<Metered<CompanyIntel>, EnrichmentError>;

    /// Recent news bullets. Defaults to the news section of a full lookup.
    async fn company_news(
        &self,
        company_name: &str,
    ) -> Result<Metered<Vec<String>>, EnrichmentError> {
        Ok(self
            .enrich_company(company_name)
            .await?
            .map(|intel| intel.recent_news))
    }
}

/// Social + company data -> persona classification.
#[async_trait]
pub trait PersonaClassifier: EnrichmentProvider {
    async fn analyze_persona(
        &self,
        social: &SocialProfiles,
        company: Option<&CompanyIntel>,
    ) -> Result<Metered<PersonaBucket>, EnrichmentError>;

    /// Topic/tone analysis. Providers without this capability return the neutral default.
    async fn analyze_content(
        &self,
        _social: &SocialProfiles,
    ) -> Result<Metered<ContentAnalysis>, EnrichmentError> {
        Ok(Metered::unmetered(ContentAnalysis::default()))
    }
}

/// The providers an orchestrator owns; any of them may be absent.
#[derive(Default)]
pub struct ProviderSet {
    pub social: Option<Box<dyn SocialLookup>>,
    pub company: Option<Box<dyn CompanyResearch>>,
    pub persona: Option<Box<dyn PersonaClassifier>>,
}

impl ProviderSet {
    /// Builds the HTTP adapters for every key present in the configuration.
    pub fn from_config(config: &EnrichmentConfig) -> Result<Self, EnrichmentError> {
        let mut set = Self::default();
        if let Some(ref key) = config.social_api_key {
            set.social = Some(Box::new(SocialLinksProvider::new(key, config)?));
        }
        if let Some(ref key) = config.company_api_key {
            set.company = Some(Box::new(CompanyResearchProvider::new(key, config)?));
        }
        if let Some(ref key) = config.persona_api_key {
            set.persona = Some(Box::new(PersonaProvider::new(key, config)?));
        }
        Ok(set)
    }

    pub fn with_social(mut self, provider: impl SocialLookup + 'static) -> Self {
        self.social = Some(Box::new(provider));
        self
    }

    pub fn with_company(mut self, provider: impl CompanyResearch + 'static) -> Self {
        self.company = Some(Box::new(provider));
        self
    }

    pub fn with_persona(mut self, provider: impl PersonaClassifier + 'static) -> Self {
        self.persona = Some(Box::new(provider));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.social.is_none() && self.company.is_none() && self.persona.is_none()
    }
}

pub(crate) fn retry_policy(config: &EnrichmentConfig) -> RetryPolicy {
    RetryPolicy::new(config.max_retries, config.retry_delay)
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, EnrichmentError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| EnrichmentError::Configuration(format!("Failed to create HTTP client: {}", e)))
}

/// Reads the body of a response, turning non-2xx statuses into errors.
pub(crate) async fn read_success_body(
    response: reqwest::Response,
    label: &str,
) -> Result<String, EnrichmentError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.text().await?);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(EnrichmentError::RateLimited(format!(
            "{} returned {}",
            label, status
        )));
    }
    Err(EnrichmentError::ExternalApi(format!(
        "{} returned {}: {}",
        label, status, error_text
    )))
}
