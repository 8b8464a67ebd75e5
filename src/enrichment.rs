/// Lead enrichment orchestration.
///
/// `EnrichmentClient` owns the providers and the shared request queue and runs
/// the enrichment workflow for a lead:
/// 1. Social profile lookup (cheapest, fastest)
/// 2. Company research (only when asked for and a company name is known)
/// 3. Persona classification (most expensive, fed by the two stages before it)
///
/// A provider failure only removes its own section from the profile; the
/// remaining stages still run and the call still succeeds.
use crate::config::EnrichmentConfig;
use crate::errors::EnrichmentError;
use crate::models::{
    BatchOptions, CompanyIntel, ContentAnalysis, EnrichOptions, EnrichedProfile, EnrichmentStats,
    PersonaBucket, SocialProfiles, DEFAULT_BATCH_SIZE,
};
use crate::providers::{Metered, ProviderSet};
use crate::rate_limiter::RequestQueue;
use crate::stats::StatsRecorder;
use futures::future::join_all;
use std::sync::Arc;
use tokio::time::Instant;

pub struct EnrichmentClient {
    config: EnrichmentConfig,
    providers: ProviderSet,
    queue: RequestQueue,
    stats: Arc<StatsRecorder>,
}

impl EnrichmentClient {
    /// Creates a client with the HTTP providers for every configured key.
    ///
    /// Fails when no provider key is present.
    pub fn new(config: EnrichmentConfig) -> Result<Self, EnrichmentError> {
        config.validate()?;
        let providers = ProviderSet::from_config(&config)?;
        Self::with_providers(config, providers)
    }

    /// Creates a client around already-built providers; keys in `config` are ignored.
    pub fn with_providers(
        config: EnrichmentConfig,
        providers: ProviderSet,
    ) -> Result<Self, EnrichmentError> {
        if providers.is_empty() {
            return Err(EnrichmentError::Configuration(
                "At least one provider is required".to_string(),
            ));
        }
        if config.requests_per_second == 0 {
            return Err(EnrichmentError::Configuration(
                "requests_per_second must be at least 1".to_string(),
            ));
        }

        let stats = Arc::new(StatsRecorder::new());
        let queue = RequestQueue::new(
            config.enable_rate_limiting,
            config.requests_per_second,
            Arc::clone(&stats),
        );

        tracing::info!(
            "Enrichment client ready (social: {}, company: {}, persona: {})",
            providers.social.is_some(),
            providers.company.is_some(),
            providers.persona.is_some()
        );
        tracing::debug!(
            "Preferred provider: {:?}, fallback: {}, cost optimized: {}",
            config.preferred_provider,
            config.enable_fallback,
            config.optimize_for_cost
        );

        Ok(Self {
            config,
            providers,
            queue,
            stats,
        })
    }

    pub fn config(&self) -> &EnrichmentConfig {
        &self.config
    }

    /// Enriches one lead with every enabled stage.
    ///
    /// Provider failures are logged and leave their section empty. Only fatal
    /// errors propagate; they are counted in `failed_requests`.
    pub async fn enrich_lead(
        &self,
        email: &str,
        options: &EnrichOptions,
    ) -> Result<EnrichedProfile, EnrichmentError> {
        let started = Instant::now();
        self.stats.record_request();

        match self.run_stages(email, options).await {
            Ok(profile) => {
                self.stats.record_success(started.elapsed());
                tracing::info!(
                    "✓ Enriched {} using [{}]",
                    email,
                    profile.providers_used.join(", ")
                );
                Ok(profile)
            }
            Err(e) => {
                self.stats.record_failure();
                tracing::error!("✗ Enrichment failed for {}: {}", email, e);
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        email: &str,
        options: &EnrichOptions,
    ) -> Result<EnrichedProfile, EnrichmentError> {
        let mut profile = EnrichedProfile::new(email);

        if let Some(provider) = self.providers.social.as_deref() {
            tracing::info!("Step 1: Social profile lookup for {}", email);
            let outcome = self
                .queue
                .enqueue(provider.find_social_profiles(email))
                .await;
            if let Some(found) = settle("Social lookup", email, outcome)? {
                profile.social_profiles = found.value;
                self.record_use(
                    &mut profile,
                    provider.name(),
                    provider.cost_per_call_cents(),
                    found.tokens,
                );
            }
        }

        let company_name = options
            .company_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());
        if let (true, Some(name), Some(provider)) = (
            options.include_company,
            company_name,
            self.providers.company.as_deref(),
        ) {
            tracing::info!("Step 2: Company research for {}", name);
            let outcome = self.queue.enqueue(provider.enrich_company(name)).await;
            if let Some(found) = settle("Company research", email, outcome)? {
                profile.company_intel = Some(found.value);
                self.record_use(
                    &mut profile,
                    provider.name(),
                    provider.cost_per_call_cents(),
                    found.tokens,
                );
            }
        }

        if let (true, Some(provider)) = (options.include_persona, self.providers.persona.as_deref())
        {
            tracing::info!("Step 3: Persona classification for {}", email);
            let outcome = self
                .queue
                .enqueue(
                    provider.analyze_persona(&profile.social_profiles, profile.company_intel.as_ref()),
                )
                .await;
            if let Some(found) = settle("Persona classification", email, outcome)? {
                profile.persona_bucket = Some(found.value);
                self.record_use(
                    &mut profile,
                    provider.name(),
                    provider.cost_per_call_cents(),
                    found.tokens,
                );
            }
        }

        Ok(profile)
    }

    fn record_use(
        &self,
        profile: &mut EnrichedProfile,
        provider: &str,
        cost_cents: f64,
        tokens: Option<u64>,
    ) {
        profile.providers_used.push(provider.to_string());
        profile.add_tokens(tokens);
        profile.add_cost(cost_cents);
        self.stats.record_provider_use(provider, cost_cents);
    }

    /// Enriches leads in sequential chunks of `batch_size`, each chunk concurrently.
    /// A `batch_size` of 0 means [`DEFAULT_BATCH_SIZE`].
    ///
    /// Leads that fail are logged and left out; the order of the input is kept
    /// for the ones that succeed.
    pub async fn enrich_batch<S: AsRef<str>>(
        &self,
        emails: &[S],
        options: &BatchOptions,
    ) -> Vec<EnrichedProfile> {
        let batch_size = match options.batch_size {
            0 => DEFAULT_BATCH_SIZE,
            n => n,
        };
        let mut results = Vec::with_capacity(emails.len());

        for (index, chunk) in emails.chunks(batch_size).enumerate() {
            tracing::info!(
                "Processing chunk {} ({} lead(s), {} done so far)",
                index + 1,
                chunk.len(),
                results.len()
            );

            let outcomes = join_all(
                chunk
                    .iter()
                    .map(|email| self.enrich_lead(email.as_ref(), &options.lead)),
            )
            .await;

            for (email, outcome) in chunk.iter().zip(outcomes) {
                match outcome {
                    Ok(profile) => results.push(profile),
                    Err(e) => {
                        tracing::error!("Batch enrichment error for {}: {}", email.as_ref(), e)
                    }
                }
            }
        }

        results
    }

    /// Social lookup only.
    pub async fn find_social_profiles(&self, email: &str) -> Result<SocialProfiles, EnrichmentError> {
        let provider = self
            .providers
            .social
            .as_deref()
            .ok_or(EnrichmentError::ProviderNotConfigured("Social lookup"))?;
        let found = self.queue.enqueue(provider.find_social_profiles(email)).await?;
        Ok(found.value)
    }

    /// Company research only.
    pub async fn enrich_company(&self, company_name: &str) -> Result<CompanyIntel, EnrichmentError> {
        let provider = self
            .providers
            .company
            .as_deref()
            .ok_or(EnrichmentError::ProviderNotConfigured("Company research"))?;
        let found = self.queue.enqueue(provider.enrich_company(company_name)).await?;
        Ok(found.value)
    }

    /// Recent news bullets for a company.
    pub async fn company_news(&self, company_name: &str) -> Result<Vec<String>, EnrichmentError> {
        let provider = self
            .providers
            .company
            .as_deref()
            .ok_or(EnrichmentError::ProviderNotConfigured("Company research"))?;
        let found = self.queue.enqueue(provider.company_news(company_name)).await?;
        Ok(found.value)
    }

    /// Persona classification only.
    pub async fn analyze_persona(
        &self,
        social: &SocialProfiles,
        company: Option<&CompanyIntel>,
    ) -> Result<PersonaBucket, EnrichmentError> {
        let provider = self
            .providers
            .persona
            .as_deref()
            .ok_or(EnrichmentError::ProviderNotConfigured("Persona"))?;
        let found = self
            .queue
            .enqueue(provider.analyze_persona(social, company))
            .await?;
        Ok(found.value)
    }

    /// Topic, tone and audience of a lead's public content.
    pub async fn analyze_content(
        &self,
        social: &SocialProfiles,
    ) -> Result<ContentAnalysis, EnrichmentError> {
        let provider = self
            .providers
            .persona
            .as_deref()
            .ok_or(EnrichmentError::ProviderNotConfigured("Persona"))?;
        let found = self.queue.enqueue(provider.analyze_content(social)).await?;
        Ok(found.value)
    }

    pub fn get_stats(&self) -> EnrichmentStats {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }
}

/// Splits a stage outcome into "use it", "skip it" and "abort the lead".
fn settle<T>(
    stage: &str,
    email: &str,
    outcome: Result<Metered<T>, EnrichmentError>,
) -> Result<Option<Metered<T>>, EnrichmentError> {
    match outcome {
        Ok(found) => Ok(Some(found)),
        Err(e) if e.is_recoverable() => {
            tracing::warn!("⚠ {} failed for {}, continuing without it: {}", stage, email, e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
