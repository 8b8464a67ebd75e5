use super::chat::{ChatClient, ChatSettings};
use super::{retry_policy, CompanyResearch, EnrichmentProvider, Metered};
use crate::config::EnrichmentConfig;
use crate::errors::EnrichmentError;
use crate::models::{CompanyIntel, MAX_RECENT_NEWS};
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

pub const PROVIDER_NAME: &str = "perplexity";
const COST_PER_CALL_CENTS: f64 = 0.5;
const ECONOMY_MODEL: &str = "sonar";
const PREMIUM_MODEL: &str = "sonar-pro";

const SYSTEM_PROMPT: &str = "You are a business research assistant. \
Answer with plain labeled lines in the form `Field: value` and list news as lines starting with `- `. \
Leave out any field you cannot verify.";

static LABELED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-•*]\s*)?\**\s*([A-Za-z][A-Za-z ]{0,30}?)\s*\**\s*:\s*\**\s*(.*?)\s*\**\s*$")
        .expect("labeled line regex")
});

static BULLET_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-•]\s+(.+)$").expect("bullet line regex"));

/// Perplexity-backed company research.
pub struct CompanyResearchProvider {
    chat: ChatClient,
}

impl CompanyResearchProvider {
    pub fn new(api_key: &str, config: &EnrichmentConfig) -> Result<Self, EnrichmentError> {
        let model = if config.optimize_for_cost {
            ECONOMY_MODEL
        } else {
            PREMIUM_MODEL
        };
        let settings = ChatSettings {
            endpoint: config.endpoints.company_url.clone(),
            model: model.to_string(),
            max_tokens: 1000,
            temperature: 0.2,
        };
        Ok(Self {
            chat: ChatClient::new(
                "Company research",
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

fn company_prompt(company_name: &str) -> String {
    format!(
        "Research the company \"{}\" and answer with these lines:\n\
         Overview: <two sentence summary>\n\
         Industry: <primary industry>\n\
         Size: <employee count range>\n\
         Revenue: <latest annual revenue>\n\
         Founded: <year>\n\
         Headquarters: <city, country>\n\
         Website: <url>\n\
         Recent News:\n\
         - <up to {} recent news items, one per line>",
        company_name, MAX_RECENT_NEWS
    )
}

fn news_prompt(company_name: &str) -> String {
    format!(
        "List up to {} notable news items about \"{}\" from the last 3 months. \
         One item per line, each starting with `- `.",
        MAX_RECENT_NEWS, company_name
    )
}

enum CompanyField {
    Overview,
    Industry,
    Size,
    Revenue,
    Founded,
    Headquarters,
    Website,
}

fn field_for_label(label: &str) -> Option<CompanyField> {
    match label.trim().to_ascii_lowercase().as_str() {
        "overview" | "company overview" | "description" | "summary" => Some(CompanyField::Overview),
        "industry" | "sector" => Some(CompanyField::Industry),
        "size" | "company size" | "employees" | "employee count" => Some(CompanyField::Size),
        "revenue" | "annual revenue" => Some(CompanyField::Revenue),
        "founded" | "founded year" | "year founded" => Some(CompanyField::Founded),
        "headquarters" | "hq" | "location" => Some(CompanyField::Headquarters),
        "website" | "url" | "web site" => Some(CompanyField::Website),
        _ => None,
    }
}

fn is_news_header(line: &str) -> bool {
    let heading = line.trim_matches(|c: char| c == '*' || c == ':' || c.is_whitespace());
    matches!(
        heading.to_ascii_lowercase().as_str(),
        "recent news" | "news" | "latest news"
    )
}

/// Extracts labeled fields and news bullets from a free-text answer.
///
/// Unrecognised lines are ignored; the first value seen for a field wins. Below a
/// `Recent News:` heading, bullets are news even when they start with a field label.
pub fn parse_company_intel(text: &str) -> CompanyIntel {
    let mut intel = CompanyIntel::default();
    let mut in_news = false;

    for raw in text.lines() {
        let line = raw.trim().trim_start_matches('#').trim();
        if line.is_empty() {
            continue;
        }

        if is_news_header(line) {
            in_news = true;
            continue;
        }

        if in_news {
            if let Some(item) = bullet_text(line) {
                if intel.recent_news.len() < MAX_RECENT_NEWS {
                    intel.recent_news.push(item);
                }
                continue;
            }
        }

        if let Some(caps) = LABELED_LINE.captures(line) {
            if let Some(field) = field_for_label(&caps[1]) {
                let value = caps[2].trim();
                if !value.is_empty() {
                    let slot = match field {
                        CompanyField::Overview => &mut intel.overview,
                        CompanyField::Industry => &mut intel.industry,
                        CompanyField::Size => &mut intel.size,
                        CompanyField::Revenue => &mut intel.revenue,
                        CompanyField::Founded => &mut intel.founded,
                        CompanyField::Headquarters => &mut intel.headquarters,
                        CompanyField::Website => &mut intel.website,
                    };
                    slot.get_or_insert_with(|| value.to_string());
                }
                continue;
            }
        }

        if let Some(item) = bullet_text(line) {
            if intel.recent_news.len() < MAX_RECENT_NEWS {
                intel.recent_news.push(item);
            }
        }
    }

    intel
}

/// Bullet lines only, capped at [`MAX_RECENT_NEWS`].
pub fn parse_news_bullets(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|l| bullet_text(l.trim()))
        .take(MAX_RECENT_NEWS)
        .collect()
}

fn bullet_text(line: &str) -> Option<String> {
    BULLET_LINE
        .captures(line)
        .map(|caps| caps[1].trim().to_string())
        .filter(|s| !s.is_empty())
}

impl EnrichmentProvider for CompanyResearchProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn cost_per_call_cents(&self) -> f64 {
        COST_PER_CALL_CENTS
    }
}

#[async_trait]
impl CompanyResearch for CompanyResearchProvider {
    async fn enrich_company(
        &self,
        company_name: &str,
    ) -> Result<Metered<CompanyIntel>, EnrichmentError> {
        tracing::info!("Researching company: {}", company_name);
        let completion = match self.chat.complete(SYSTEM_PROMPT, &company_prompt(company_name)).await
        {
            Ok(c) => c,
            Err(EnrichmentError::Parse(msg)) => {
                tracing::warn!("Company research answer unreadable for {}: {}", company_name, msg);
                return Ok(Metered::unmetered(CompanyIntel::default()));
            }
            Err(e) => return Err(e),
        };

        let intel = parse_company_intel(&completion.content);
        if intel.is_empty() {
            tracing::warn!("No company fields recognised for {}", company_name);
        }
        Ok(Metered::new(intel, completion.total_tokens))
    }

    async fn company_news(
        &self,
        company_name: &str,
    ) -> Result<Metered<Vec<String>>, EnrichmentError> {
        let completion = self
            .chat
            .complete(SYSTEM_PROMPT, &news_prompt(company_name))
            .await?;
        Ok(Metered::new(
            parse_news_bullets(&completion.content),
            completion.total_tokens,
        ))
    }
}
