use super::chat::{ChatClient, ChatSettings};
use super::{retry_policy, EnrichmentProvider, Metered, PersonaClassifier};
use crate::config::EnrichmentConfig;
use crate::errors::EnrichmentError;
use crate::models::{
    bucket_by_slug, bucket_definition, CompanyIntel, ContentAnalysis, PersonaBucket,
    SocialProfiles, CANONICAL_BUCKETS,
};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

pub const PROVIDER_NAME: &str = "openai";
const COST_PER_CALL_CENTS: f64 = 0.2;
const ECONOMY_MODEL: &str = "gpt-4o-mini";
const PREMIUM_MODEL: &str = "gpt-4o";
const DEFAULT_CONFIDENCE: f64 = 0.5;

static JSON_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("json object regex"));

/// OpenAI-backed persona classification and content analysis.
///
/// Classification never fails: any transport, status or parse problem degrades to
/// [`PersonaBucket::fallback`].
pub struct PersonaProvider {
    chat: ChatClient,
}

impl PersonaProvider {
    pub fn new(api_key: &str, config: &EnrichmentConfig) -> Result<Self, EnrichmentError> {
        let model = if config.optimize_for_cost {
            ECONOMY_MODEL
        } else {
            PREMIUM_MODEL
        };
        let settings = ChatSettings {
            endpoint: config.endpoints.persona_url.clone(),
            model: model.to_string(),
            max_tokens: 500,
            temperature: 0.3,
        };
        Ok(Self {
            chat: ChatClient::new(
                "Persona analysis",
                api_key,
                settings,
                retry_policy(config),
                config.request_timeout,
            )?,
        })
    }

    pub fn model(&self) -> &str {
        self.chat.model()
    }
}

fn persona_system_prompt() -> String {
    let mut prompt = String::from(
        "You classify professionals into exactly one of these persona buckets:\n",
    );
    for bucket in CANONICAL_BUCKETS.iter() {
        prompt.push_str(&format!(
            "{}. {} ({}) - traits: {}\n",
            bucket.id,
            bucket.label,
            bucket.slug,
            bucket.traits.join(", ")
        ));
    }
    prompt.push_str(
        "Respond with a JSON object only: \
         {\"bucketId\": <1-6>, \"confidence\": <0-1>, \"traits\": [\"observed trait\", ...], \"reasoning\": \"...\"}",
    );
    prompt
}

fn describe_lead(social: &SocialProfiles, company: Option<&CompanyIntel>) -> String {
    let mut text = String::from("Social profiles:\n");
    if social.is_empty() {
        text.push_str("- none found\n");
    }
    for (network, url) in social {
        text.push_str(&format!("- {}: {}\n", network, url));
    }

    if let Some(intel) = company {
        text.push_str("Company:\n");
        let fields = [
            ("Overview", &intel.overview),
            ("Industry", &intel.industry),
            ("Size", &intel.size),
            ("Headquarters", &intel.headquarters),
        ];
        for (label, value) in fields {
            if let Some(v) = value {
                text.push_str(&format!("- {}: {}\n", label, v));
            }
        }
    }
    text
}

/// First `{...}` span of the text, parsed as JSON.
fn embedded_json(text: &str) -> Option<Value> {
    JSON_OBJECT
        .find(text)
        .and_then(|m| serde_json::from_str(m.as_str()).ok())
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Turns a completion into a bucket, falling back when the answer is unusable.
pub fn classify_completion(content: &str) -> PersonaBucket {
    let Some(json) = embedded_json(content) else {
        tracing::warn!("Persona answer contained no JSON object, using fallback bucket");
        return PersonaBucket::fallback();
    };

    let id = ["bucketId", "bucket_id", "id"]
        .iter()
        .find_map(|key| json.get(*key).and_then(Value::as_u64));
    // Answers that name the bucket instead of numbering it
    let slug = ["bucket", "slug"]
        .iter()
        .find_map(|key| json.get(*key).and_then(Value::as_str));
    let def = match id {
        Some(id) => u8::try_from(id).ok().and_then(bucket_definition),
        None => slug.and_then(bucket_by_slug),
    };
    let Some(def) = def else {
        tracing::warn!(
            "Persona answer had an invalid bucket ({:?} / {:?}), using fallback",
            id,
            slug
        );
        return PersonaBucket::fallback();
    };

    let confidence = json
        .get("confidence")
        .and_then(Value::as_f64)
        .unwrap_or(DEFAULT_CONFIDENCE);
    let mut traits = string_list(json.get("traits"));
    if traits.is_empty() {
        traits = def.traits.iter().map(|t| t.to_string()).collect();
    }

    PersonaBucket::from_definition(def, confidence, traits)
}

/// Parses a content analysis answer; `None` when it is not usable.
pub fn parse_content_analysis(content: &str) -> Option<ContentAnalysis> {
    let json = embedded_json(content)?;
    let defaults = ContentAnalysis::default();
    Some(ContentAnalysis {
        topics: string_list(json.get("topics")),
        tone: json
            .get("tone")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or(defaults.tone),
        audience_type: ["audienceType", "audience_type"]
            .iter()
            .find_map(|key| json.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or(defaults.audience_type),
    })
}

impl EnrichmentProvider for PersonaProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn cost_per_call_cents(&self) -> f64 {
        COST_PER_CALL_CENTS
    }
}

#[async_trait]
impl PersonaClassifier for PersonaProvider {
    async fn analyze_persona(
        &self,
        social: &SocialProfiles,
        company: Option<&CompanyIntel>,
    ) -> Result<Metered<PersonaBucket>, EnrichmentError> {
        let user = describe_lead(social, company);
        match self.chat.complete(&persona_system_prompt(), &user).await {
            Ok(completion) => Ok(Metered::new(
                classify_completion(&completion.content),
                completion.total_tokens,
            )),
            Err(e) => {
                tracing::warn!("Persona analysis failed, using fallback bucket: {}", e);
                Ok(Metered::unmetered(PersonaBucket::fallback()))
            }
        }
    }

    async fn analyze_content(
        &self,
        social: &SocialProfiles,
    ) -> Result<Metered<ContentAnalysis>, EnrichmentError> {
        let system = "You analyse the public content of a professional. Respond with a JSON object only: \
                      {\"topics\": [\"...\"], \"tone\": \"...\", \"audienceType\": \"...\"}";
        match self.chat.complete(system, &describe_lead(social, None)).await {
            Ok(completion) => Ok(Metered::new(
                parse_content_analysis(&completion.content).unwrap_or_default(),
                completion.total_tokens,
            )),
            Err(e) => {
                tracing::warn!("Content analysis failed, using neutral default: {}", e);
                Ok(Metered::unmetered(ContentAnalysis::default()))
            }
        }
    }
}
