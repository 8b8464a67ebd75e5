/// Orchestrator tests against in-memory providers
/// Covers stage sequencing, partial degradation, batching and statistics
use async_trait::async_trait;
use lead_enrichment::models::{CompanyIntel, PersonaBucket, SocialNetwork, SocialProfiles};
use lead_enrichment::providers::{
    CompanyResearch, EnrichmentProvider, Metered, PersonaClassifier, ProviderSet, SocialLookup,
};
use lead_enrichment::{
    BatchOptions, ContentAnalysis, EnrichOptions, EnrichmentClient, EnrichmentConfig,
    EnrichmentError, EnrichmentStats,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

// ============================================================================
// Mock providers
// ============================================================================

#[derive(Default)]
struct MockSocial {
    /// Emails that fail, with the error they fail with
    failures: Vec<(String, EnrichmentError)>,
    latency: Duration,
    starts: Arc<Mutex<Vec<(String, Instant)>>>,
}

impl EnrichmentProvider for MockSocial {
    fn name(&self) -> &str {
        "mock-social"
    }

    fn cost_per_call_cents(&self) -> f64 {
        1.0
    }
}

#[async_trait]
impl SocialLookup for MockSocial {
    async fn find_social_profiles(
        &self,
        email: &str,
    ) -> Result<Metered<SocialProfiles>, EnrichmentError> {
        self.starts.lock().push((email.to_string(), Instant::now()));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some((_, err)) = self.failures.iter().find(|(e, _)| e == email) {
            return Err(err.clone());
        }

        let mut profiles = SocialProfiles::new();
        let handle = email.split('@').next().unwrap_or_default();
        profiles.insert(
            SocialNetwork::Linkedin,
            format!("https://linkedin.com/in/{}", handle),
        );
        Ok(Metered::unmetered(profiles))
    }
}

struct MockCompany {
    outcome: Result<CompanyIntel, EnrichmentError>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockCompany {
    fn healthy() -> Self {
        Self {
            outcome: Ok(CompanyIntel {
                overview: Some("Acme makes everything".to_string()),
                industry: Some("Manufacturing".to_string()),
                recent_news: vec!["Acme ships rockets".to_string()],
                ..Default::default()
            }),
            calls: Arc::default(),
        }
    }

    fn failing(err: EnrichmentError) -> Self {
        Self {
            outcome: Err(err),
            calls: Arc::default(),
        }
    }
}

impl EnrichmentProvider for MockCompany {
    fn name(&self) -> &str {
        "mock-company"
    }

    fn cost_per_call_cents(&self) -> f64 {
        0.5
    }
}

#[async_trait]
impl CompanyResearch for MockCompany {
    async fn enrich_company(
        &self,
        company_name: &str,
    ) -> Result<Metered<CompanyIntel>, EnrichmentError> {
        self.calls.lock().push(company_name.to_string());
        self.outcome
            .clone()
            .map(|intel| Metered::new(intel, Some(120)))
    }
}

/// Classifies everyone with a company as bucket 4, everyone else as bucket 2.
struct MockPersona {
    saw_company: Arc<Mutex<Vec<bool>>>,
}

impl MockPersona {
    fn new() -> Self {
        Self {
            saw_company: Arc::default(),
        }
    }
}

impl EnrichmentProvider for MockPersona {
    fn name(&self) -> &str {
        "mock-persona"
    }

    fn cost_per_call_cents(&self) -> f64 {
        0.2
    }
}

#[async_trait]
impl PersonaClassifier for MockPersona {
    async fn analyze_persona(
        &self,
        _social: &SocialProfiles,
        company: Option<&CompanyIntel>,
    ) -> Result<Metered<PersonaBucket>, EnrichmentError> {
        self.saw_company.lock().push(company.is_some());
        let id = if company.is_some() { 4 } else { 2 };
        Ok(Metered::new(
            PersonaBucket {
                id,
                label: "Mock".to_string(),
                confidence: 0.8,
                traits: vec!["mocked".to_string()],
            },
            Some(80),
        ))
    }
}

fn test_config() -> EnrichmentConfig {
    EnrichmentConfig {
        enable_rate_limiting: false,
        ..Default::default()
    }
}

fn full_options() -> EnrichOptions {
    EnrichOptions {
        include_company: true,
        include_persona: true,
        company_name: Some("Acme".to_string()),
    }
}

fn client_with(providers: ProviderSet) -> EnrichmentClient {
    EnrichmentClient::with_providers(test_config(), providers).unwrap()
}

// ============================================================================
// Construction
// ============================================================================

#[cfg(test)]
mod construction_tests {
    use super::*;

    #[test]
    fn test_zero_keys_fails() {
        let err = EnrichmentClient::new(EnrichmentConfig::default())
            .err()
            .expect("construction should fail");
        assert!(matches!(err, EnrichmentError::Configuration(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_empty_provider_set_fails() {
        assert!(EnrichmentClient::with_providers(test_config(), ProviderSet::default()).is_err());
    }

    #[test]
    fn test_zero_requests_per_second_fails() {
        let config = EnrichmentConfig {
            requests_per_second: 0,
            ..Default::default()
        };
        let providers = ProviderSet::default().with_social(MockSocial::default());
        assert!(EnrichmentClient::with_providers(config, providers).is_err());
    }
}

// ============================================================================
// Single lead workflow
// ============================================================================

#[cfg(test)]
mod enrich_lead_tests {
    use super::*;

    #[tokio::test]
    async fn test_end_to_end_with_healthy_providers() {
        let persona = MockPersona::new();
        let saw_company = Arc::clone(&persona.saw_company);
        let client = client_with(
            ProviderSet::default()
                .with_social(MockSocial::default())
                .with_company(MockCompany::healthy())
                .with_persona(persona),
        );

        let profile = client.enrich_lead("a@b.com", &full_options()).await.unwrap();

        assert_eq!(profile.email, "a@b.com");
        assert!(!profile.social_profiles.is_empty());
        assert_eq!(
            profile
                .company_intel
                .as_ref()
                .and_then(|c| c.overview.as_deref()),
            Some("Acme makes everything")
        );
        let bucket = profile.persona_bucket.as_ref().unwrap();
        assert!((1..=6).contains(&bucket.id));
        assert_eq!(
            profile.providers_used,
            vec!["mock-social", "mock-company", "mock-persona"]
        );
        assert_eq!(profile.tokens_used, Some(200));
        assert!((profile.cost_cents.unwrap() - 1.7).abs() < 1e-9);

        // Persona sees the company intel gathered in the previous stage
        assert_eq!(*saw_company.lock(), vec![true]);
    }

    #[tokio::test]
    async fn test_company_failure_degrades_gracefully() {
        let client = client_with(
            ProviderSet::default()
                .with_social(MockSocial::default())
                .with_company(MockCompany::failing(EnrichmentError::ExternalApi(
                    "Company research returned 502 Bad Gateway".to_string(),
                )))
                .with_persona(MockPersona::new()),
        );

        let profile = client.enrich_lead("a@b.com", &full_options()).await.unwrap();

        assert!(profile.company_intel.is_none());
        assert_eq!(profile.providers_used, vec!["mock-social", "mock-persona"]);
        assert_eq!(profile.persona_bucket.map(|b| b.id), Some(2));

        let stats = client.get_stats();
        assert_eq!(stats.successful_requests, 1);
        assert_eq!(stats.failed_requests, 0);
        assert!(!stats.provider_usage.contains_key("mock-company"));
    }

    #[tokio::test]
    async fn test_social_failure_keeps_remaining_stages() {
        let social = MockSocial {
            failures: vec![(
                "a@b.com".to_string(),
                EnrichmentError::Timeout("Social links search timed out".to_string()),
            )],
            ..Default::default()
        };
        let client = client_with(
            ProviderSet::default()
                .with_social(social)
                .with_persona(MockPersona::new()),
        );

        let profile = client.enrich_lead("a@b.com", &full_options()).await.unwrap();

        assert!(profile.social_profiles.is_empty());
        assert_eq!(profile.providers_used, vec!["mock-persona"]);
    }

    #[tokio::test]
    async fn test_company_stage_needs_flag_and_name() {
        let company = MockCompany::healthy();
        let calls = Arc::clone(&company.calls);
        let client = client_with(
            ProviderSet::default()
                .with_social(MockSocial::default())
                .with_company(company),
        );

        let no_name = EnrichOptions {
            include_company: true,
            company_name: None,
            ..Default::default()
        };
        let blank_name = EnrichOptions {
            include_company: true,
            company_name: Some("   ".to_string()),
            ..Default::default()
        };
        let not_requested = EnrichOptions {
            include_company: false,
            company_name: Some("Acme".to_string()),
            ..Default::default()
        };

        for options in [no_name, blank_name, not_requested] {
            let profile = client.enrich_lead("a@b.com", &options).await.unwrap();
            assert!(profile.company_intel.is_none());
            assert_eq!(profile.providers_used, vec!["mock-social"]);
        }
        assert!(calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_persona_stage_runs_only_when_requested() {
        let persona = MockPersona::new();
        let saw_company = Arc::clone(&persona.saw_company);
        let client = client_with(
            ProviderSet::default()
                .with_social(MockSocial::default())
                .with_persona(persona),
        );

        let profile = client
            .enrich_lead("a@b.com", &EnrichOptions::default())
            .await
            .unwrap();

        assert!(profile.persona_bucket.is_none());
        assert!(saw_company.lock().is_empty());
    }

    #[tokio::test]
    async fn test_internal_error_propagates_and_counts_failure() {
        let social = MockSocial {
            failures: vec![(
                "a@b.com".to_string(),
                EnrichmentError::Internal("corrupted state".to_string()),
            )],
            ..Default::default()
        };
        let client = client_with(ProviderSet::default().with_social(social));

        let err = client
            .enrich_lead("a@b.com", &EnrichOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err, EnrichmentError::Internal("corrupted state".to_string()));
        let stats = client.get_stats();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.successful_requests, 0);
        assert_eq!(stats.failed_requests, 1);
    }
}

// ============================================================================
// Batch processing
// ============================================================================

#[cfg(test)]
mod batch_tests {
    use super::*;

    fn emails() -> Vec<String> {
        vec![
            "a@x.com".to_string(),
            "b@x.com".to_string(),
            "c@x.com".to_string(),
        ]
    }

    /// Sizes of the groups of calls that started at the same instant, in order.
    fn start_groups(starts: &[(String, Instant)]) -> Vec<usize> {
        let mut groups: Vec<(Instant, usize)> = Vec::new();
        for (_, at) in starts {
            match groups.last_mut() {
                Some((t, n)) if t == at => *n += 1,
                _ => groups.push((*at, 1)),
            }
        }
        groups.into_iter().map(|(_, n)| n).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_runs_sequential_chunks() {
        let social = MockSocial {
            latency: Duration::from_millis(100),
            ..Default::default()
        };
        let starts = Arc::clone(&social.starts);
        let client = client_with(ProviderSet::default().with_social(social));

        let options = BatchOptions {
            batch_size: 2,
            ..Default::default()
        };
        let results = client.enrich_batch(&emails(), &options).await;

        assert_eq!(results.len(), 3);
        let order: Vec<&str> = results.iter().map(|p| p.email.as_str()).collect();
        assert_eq!(order, vec!["a@x.com", "b@x.com", "c@x.com"]);
        assert_eq!(start_groups(&starts.lock()), vec![2, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_drops_failed_leads() {
        let social = MockSocial {
            failures: vec![(
                "b@x.com".to_string(),
                EnrichmentError::Internal("unexpected".to_string()),
            )],
            latency: Duration::from_millis(100),
            ..Default::default()
        };
        let client = client_with(ProviderSet::default().with_social(social));

        let options = BatchOptions {
            batch_size: 2,
            ..Default::default()
        };
        let results = client.enrich_batch(&emails(), &options).await;

        let order: Vec<&str> = results.iter().map(|p| p.email.as_str()).collect();
        assert_eq!(order, vec!["a@x.com", "c@x.com"]);
        let stats = client.get_stats();
        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.successful_requests, 2);
        assert_eq!(stats.failed_requests, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_batch_size_uses_default_chunk() {
        let social = MockSocial {
            latency: Duration::from_millis(50),
            ..Default::default()
        };
        let starts = Arc::clone(&social.starts);
        let client = client_with(ProviderSet::default().with_social(social));

        let options = BatchOptions {
            batch_size: 0,
            ..Default::default()
        };
        let results = client.enrich_batch(&emails(), &options).await;

        // All three fit in one default-sized chunk
        assert_eq!(results.len(), 3);
        assert_eq!(start_groups(&starts.lock()), vec![3]);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let client = client_with(ProviderSet::default().with_social(MockSocial::default()));
        let results = client
            .enrich_batch::<String>(&[], &BatchOptions::default())
            .await;
        assert!(results.is_empty());
        assert_eq!(client.get_stats().total_requests, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_shares_the_rate_limit() {
        let config = EnrichmentConfig {
            enable_rate_limiting: true,
            requests_per_second: 2,
            ..Default::default()
        };
        let social = MockSocial::default();
        let starts = Arc::clone(&social.starts);
        let client =
            EnrichmentClient::with_providers(config, ProviderSet::default().with_social(social))
                .unwrap();

        let options = BatchOptions {
            batch_size: 3,
            ..Default::default()
        };
        let results = client.enrich_batch(&emails(), &options).await;

        assert_eq!(results.len(), 3);
        assert!(client.get_stats().rate_limit_hits >= 1);
        let starts = starts.lock();
        let first = starts[0].1;
        let last = starts[2].1;
        assert!(last.duration_since(first) >= Duration::from_secs(1));
    }
}

// ============================================================================
// Single-stage calls
// ============================================================================

#[cfg(test)]
mod single_stage_tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_provider_is_configuration_error() {
        let client = client_with(ProviderSet::default().with_company(MockCompany::healthy()));

        assert!(matches!(
            client.find_social_profiles("a@b.com").await,
            Err(EnrichmentError::ProviderNotConfigured(_))
        ));
        assert!(matches!(
            client.analyze_content(&SocialProfiles::new()).await,
            Err(EnrichmentError::ProviderNotConfigured(_))
        ));
        assert_eq!(client.get_stats(), EnrichmentStats::default());
    }

    #[tokio::test]
    async fn test_company_calls() {
        let client = client_with(ProviderSet::default().with_company(MockCompany::healthy()));

        let intel = client.enrich_company("Acme").await.unwrap();
        assert_eq!(intel.industry.as_deref(), Some("Manufacturing"));

        let news = client.company_news("Acme").await.unwrap();
        assert_eq!(news, vec!["Acme ships rockets"]);
    }

    #[tokio::test]
    async fn test_company_errors_surface_from_single_stage_call() {
        let client = client_with(ProviderSet::default().with_company(MockCompany::failing(
            EnrichmentError::RateLimited("Company research returned 429".to_string()),
        )));

        assert!(matches!(
            client.enrich_company("Acme").await,
            Err(EnrichmentError::RateLimited(_))
        ));
    }

    #[tokio::test]
    async fn test_persona_calls() {
        let client = client_with(ProviderSet::default().with_persona(MockPersona::new()));

        let bucket = client
            .analyze_persona(&SocialProfiles::new(), None)
            .await
            .unwrap();
        assert_eq!(bucket.id, 2);

        // Classifiers without content analysis return the neutral default
        let analysis = client
            .analyze_content(&SocialProfiles::new())
            .await
            .unwrap();
        assert_eq!(analysis, ContentAnalysis::default());
    }
}

// ============================================================================
// Statistics
// ============================================================================

#[cfg(test)]
mod stats_tests {
    use super::*;

    #[tokio::test]
    async fn test_stats_snapshot_is_stable_and_resettable() {
        let client = client_with(
            ProviderSet::default()
                .with_social(MockSocial::default())
                .with_company(MockCompany::healthy()),
        );

        client.enrich_lead("a@b.com", &full_options()).await.unwrap();
        client.enrich_lead("c@d.com", &full_options()).await.unwrap();

        let first = client.get_stats();
        let second = client.get_stats();
        assert_eq!(first, second);

        assert_eq!(first.total_requests, 2);
        assert_eq!(first.successful_requests, 2);
        assert_eq!(first.provider_usage.get("mock-social"), Some(&2));
        assert_eq!(first.provider_usage.get("mock-company"), Some(&2));
        assert!((first.total_cost_cents - 3.0).abs() < 1e-9);

        client.reset_stats();
        assert_eq!(client.get_stats(), EnrichmentStats::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_average_response_time_tracks_latency() {
        let social = MockSocial {
            latency: Duration::from_millis(200),
            ..Default::default()
        };
        let client = client_with(ProviderSet::default().with_social(social));

        client
            .enrich_lead("a@b.com", &EnrichOptions::default())
            .await
            .unwrap();

        let avg = client.get_stats().average_response_time_ms;
        assert!((200.0..250.0).contains(&avg), "average was {}", avg);
    }
}
