use crate::errors::EnrichmentError;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SOCIAL_API_HOST: &str = "social-links-search.p.rapidapi.com";
pub const DEFAULT_COMPANY_URL: &str = "https://api.perplexity.ai/chat/completions";
pub const DEFAULT_PERSONA_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Which provider the caller would rather lean on.
///
/// Accepted for compatibility with existing deployments; stage ordering is fixed
/// (social, company, persona) regardless of this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreferredProvider {
    #[default]
    Auto,
    Social,
    Company,
    Persona,
}

impl FromStr for PreferredProvider {
    type Err = EnrichmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "social" | "rapidapi" => Ok(Self::Social),
            "company" | "perplexity" => Ok(Self::Company),
            "persona" | "openai" => Ok(Self::Persona),
            other => Err(EnrichmentError::Configuration(format!(
                "unknown preferred provider '{}'",
                other
            ))),
        }
    }
}

/// Where each adapter sends its requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    /// Base URL of the social links search API (`/search-social-links` is appended).
    pub social_base_url: String,
    /// Value of the `x-rapidapi-host` header.
    pub social_api_host: String,
    /// Chat-completion endpoint used for company research.
    pub company_url: String,
    /// Chat-completion endpoint used for persona classification.
    pub persona_url: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            social_base_url: format!("https://{}", DEFAULT_SOCIAL_API_HOST),
            social_api_host: DEFAULT_SOCIAL_API_HOST.to_string(),
            company_url: DEFAULT_COMPANY_URL.to_string(),
            persona_url: DEFAULT_PERSONA_URL.to_string(),
        }
    }
}

/// Construction parameters for [`crate::enrichment::EnrichmentClient`].
#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    pub social_api_key: Option<String>,
    pub company_api_key: Option<String>,
    pub persona_api_key: Option<String>,
    pub preferred_provider: PreferredProvider,
    pub enable_fallback: bool,
    pub enable_rate_limiting: bool,
    pub requests_per_second: u32,
    /// Total attempts per provider call, the first one included; 0 means the default of 3.
    pub max_retries: u32,
    /// Base unit of the exponential backoff.
    pub retry_delay: Duration,
    pub optimize_for_cost: bool,
    pub request_timeout: Duration,
    pub endpoints: ProviderEndpoints,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            social_api_key: None,
            company_api_key: None,
            persona_api_key: None,
            preferred_provider: PreferredProvider::Auto,
            enable_fallback: true,
            enable_rate_limiting: true,
            requests_per_second: 2,
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            optimize_for_cost: true,
            request_timeout: Duration::from_secs(30),
            endpoints: ProviderEndpoints::default(),
        }
    }
}

impl EnrichmentConfig {
    pub fn has_any_provider(&self) -> bool {
        self.social_api_key.is_some()
            || self.company_api_key.is_some()
            || self.persona_api_key.is_some()
    }

    /// Rejects configurations the client cannot run with.
    pub fn validate(&self) -> Result<(), EnrichmentError> {
        if !self.has_any_provider() {
            return Err(EnrichmentError::Configuration(
                "At least one provider API key is required".to_string(),
            ));
        }
        if self.requests_per_second == 0 {
            return Err(EnrichmentError::Configuration(
                "requests_per_second must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let default_endpoints = defaults.endpoints.clone();

        let social_api_host = env_non_empty("RAPIDAPI_SOCIAL_HOST")
            .unwrap_or(default_endpoints.social_api_host);
        let social_base_url = env_url("RAPIDAPI_SOCIAL_BASE_URL")?
            .unwrap_or_else(|| format!("https://{}", social_api_host));

        let config = Self {
            social_api_key: env_non_empty("RAPIDAPI_KEY"),
            company_api_key: env_non_empty("PERPLEXITY_API_KEY"),
            persona_api_key: env_non_empty("OPENAI_API_KEY"),
            preferred_provider: match env_non_empty("ENRICHMENT_PREFERRED_PROVIDER") {
                Some(value) => value.parse()?,
                None => defaults.preferred_provider,
            },
            enable_fallback: env_parse("ENRICHMENT_ENABLE_FALLBACK", defaults.enable_fallback)?,
            enable_rate_limiting: env_parse(
                "ENRICHMENT_RATE_LIMITING",
                defaults.enable_rate_limiting,
            )?,
            requests_per_second: env_parse(
                "ENRICHMENT_REQUESTS_PER_SECOND",
                defaults.requests_per_second,
            )?,
            max_retries: env_parse("ENRICHMENT_MAX_RETRIES", defaults.max_retries)?,
            retry_delay: Duration::from_millis(env_parse(
                "ENRICHMENT_RETRY_DELAY_MS",
                defaults.retry_delay.as_millis() as u64,
            )?),
            optimize_for_cost: env_parse(
                "ENRICHMENT_OPTIMIZE_FOR_COST",
                defaults.optimize_for_cost,
            )?,
            request_timeout: Duration::from_secs(env_parse(
                "ENRICHMENT_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            endpoints: ProviderEndpoints {
                social_base_url,
                social_api_host,
                company_url: env_url("PERPLEXITY_API_URL")?
                    .unwrap_or(default_endpoints.company_url),
                persona_url: env_url("OPENAI_API_URL")?.unwrap_or(default_endpoints.persona_url),
            },
        };

        config.validate()?;

        // Log successful configuration load (without sensitive values)
        tracing::info!("Enrichment configuration loaded successfully");
        tracing::debug!(
            "Providers: social={} company={} persona={}",
            config.social_api_key.is_some(),
            config.company_api_key.is_some(),
            config.persona_api_key.is_some()
        );
        tracing::debug!(
            "Rate limiting: {} ({} req/s), max attempts: {}, retry delay: {:?}",
            config.enable_rate_limiting,
            config.requests_per_second,
            config.max_retries,
            config.retry_delay
        );

        Ok(config)
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn env_url(name: &str) -> anyhow::Result<Option<String>> {
    match env_non_empty(name) {
        Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => {
            anyhow::bail!("{} must start with http:// or https://", name)
        }
        other => Ok(other),
    }
}

fn env_parse<T: FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match env_non_empty(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: '{}'", name, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = EnrichmentConfig::default();
        assert!(config.enable_rate_limiting);
        assert!(config.enable_fallback);
        assert!(config.optimize_for_cost);
        assert_eq!(config.requests_per_second, 2);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay, Duration::from_millis(1000));
        assert_eq!(config.preferred_provider, PreferredProvider::Auto);
    }

    #[test]
    fn test_validate_requires_a_provider_key() {
        let err = EnrichmentConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("At least one provider"));
    }

    #[test]
    fn test_validate_rejects_zero_rate() {
        let config = EnrichmentConfig {
            social_api_key: Some("key".into()),
            requests_per_second: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EnrichmentError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_accepts_single_key() {
        let config = EnrichmentConfig {
            persona_api_key: Some("key".into()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_preferred_provider_parsing() {
        assert_eq!(
            "OpenAI".parse::<PreferredProvider>().unwrap(),
            PreferredProvider::Persona
        );
        assert_eq!(
            " auto ".parse::<PreferredProvider>().unwrap(),
            PreferredProvider::Auto
        );
        assert!("clay".parse::<PreferredProvider>().is_err());
    }
}
