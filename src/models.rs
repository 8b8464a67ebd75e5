use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const MAX_RECENT_NEWS: usize = 5;
pub const FALLBACK_BUCKET_ID: u8 = 6;
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

// ============================================================================
// Social profiles
// ============================================================================

/// Networks the social links search API knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialNetwork {
    Linkedin,
    Twitter,
    Instagram,
    Facebook,
    Tiktok,
    Youtube,
    Github,
    Pinterest,
    Snapchat,
}

impl SocialNetwork {
    pub const ALL: [SocialNetwork; 9] = [
        SocialNetwork::Linkedin,
        SocialNetwork::Twitter,
        SocialNetwork::Instagram,
        SocialNetwork::Facebook,
        SocialNetwork::Tiktok,
        SocialNetwork::Youtube,
        SocialNetwork::Github,
        SocialNetwork::Pinterest,
        SocialNetwork::Snapchat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SocialNetwork::Linkedin => "linkedin",
            SocialNetwork::Twitter => "twitter",
            SocialNetwork::Instagram => "instagram",
            SocialNetwork::Facebook => "facebook",
            SocialNetwork::Tiktok => "tiktok",
            SocialNetwork::Youtube => "youtube",
            SocialNetwork::Github => "github",
            SocialNetwork::Pinterest => "pinterest",
            SocialNetwork::Snapchat => "snapchat",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|network| network.as_str().eq_ignore_ascii_case(name))
    }

    /// Comma-separated list used for the `social_networks` query parameter.
    pub fn query_list() -> String {
        Self::ALL
            .iter()
            .map(|n| n.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for SocialNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network -> profile URL. A network that was not found has no entry.
pub type SocialProfiles = BTreeMap<SocialNetwork, String>;

// ============================================================================
// Company intelligence
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyIntel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub founded: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headquarters: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// At most [`MAX_RECENT_NEWS`] bullets, in the order the provider gave them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recent_news: Vec<String>,
}

impl CompanyIntel {
    pub fn is_empty(&self) -> bool {
        self.overview.is_none()
            && self.industry.is_none()
            && self.size.is_none()
            && self.revenue.is_none()
            && self.founded.is_none()
            && self.headquarters.is_none()
            && self.website.is_none()
            && self.recent_news.is_empty()
    }
}

// ============================================================================
// Persona buckets
// ============================================================================

/// One of the six fixed persona archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketDefinition {
    pub id: u8,
    pub slug: &'static str,
    pub label: &'static str,
    pub traits: &'static [&'static str],
}

pub const CANONICAL_BUCKETS: [BucketDefinition; 6] = [
    BucketDefinition {
        id: 1,
        slug: "automation_pro",
        label: "Automation Pro",
        traits: &[
            "Productivity focused",
            "Early tool adopter",
            "Systems thinker",
            "Values efficiency",
        ],
    },
    BucketDefinition {
        id: 2,
        slug: "tech_entrepreneur",
        label: "Tech Entrepreneur",
        traits: &[
            "Founder or early employee",
            "Startup ecosystem",
            "Growth oriented",
            "Technical background",
        ],
    },
    BucketDefinition {
        id: 3,
        slug: "creative_in_transition",
        label: "Creative in Transition",
        traits: &[
            "Content creator",
            "Exploring new opportunities",
            "Strong personal brand",
            "Visual platforms",
        ],
    },
    BucketDefinition {
        id: 4,
        slug: "corporate_executive",
        label: "Corporate Executive",
        traits: &[
            "Senior leadership",
            "Large organization",
            "Relationship driven",
            "Strategic decision maker",
        ],
    },
    BucketDefinition {
        id: 5,
        slug: "student_early_career",
        label: "Student / Early Career",
        traits: &[
            "Building a network",
            "Learning oriented",
            "Limited professional history",
            "Career exploration",
        ],
    },
    BucketDefinition {
        id: FALLBACK_BUCKET_ID,
        slug: "networking_enthusiast",
        label: "Networking Enthusiast",
        traits: &[
            "Active on social platforms",
            "Relationship builder",
            "Community oriented",
            "Broad interests",
        ],
    },
];

pub fn bucket_definition(id: u8) -> Option<&'static BucketDefinition> {
    CANONICAL_BUCKETS.iter().find(|b| b.id == id)
}

/// Looks a bucket up by its slug (`"tech_entrepreneur"`), ignoring case.
pub fn bucket_by_slug(slug: &str) -> Option<&'static BucketDefinition> {
    let slug = slug.trim();
    CANONICAL_BUCKETS
        .iter()
        .find(|b| b.slug.eq_ignore_ascii_case(slug))
}

/// A classification result: the matched bucket plus what was observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaBucket {
    pub id: u8,
    pub label: String,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub traits: Vec<String>,
}

impl PersonaBucket {
    pub fn from_definition(def: &BucketDefinition, confidence: f64, traits: Vec<String>) -> Self {
        Self {
            id: def.id,
            label: def.label.to_string(),
            confidence: confidence.clamp(0.0, 1.0),
            traits,
        }
    }

    /// Degraded classification used when the provider cannot give a usable answer.
    pub fn fallback() -> Self {
        let def = &CANONICAL_BUCKETS[CANONICAL_BUCKETS.len() - 1];
        Self::from_definition(
            def,
            FALLBACK_CONFIDENCE,
            def.traits.iter().map(|t| t.to_string()).collect(),
        )
    }
}

/// Free-text analysis of the content a person publishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentAnalysis {
    pub topics: Vec<String>,
    pub tone: String,
    pub audience_type: String,
}

impl Default for ContentAnalysis {
    fn default() -> Self {
        Self {
            topics: Vec::new(),
            tone: "professional".to_string(),
            audience_type: "general".to_string(),
        }
    }
}

// ============================================================================
// Orchestrator input/output
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnrichOptions {
    pub include_company: bool,
    pub include_persona: bool,
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchOptions {
    #[serde(flatten)]
    pub lead: EnrichOptions,
    pub batch_size: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            lead: EnrichOptions::default(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Aggregate result of one `enrich_lead` call.
///
/// Every optional section may be missing on its own; a partially filled
/// profile is a normal result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedProfile {
    pub email: String,
    #[serde(default)]
    pub social_profiles: SocialProfiles,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_intel: Option<CompanyIntel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona_bucket: Option<PersonaBucket>,
    pub enriched_at: DateTime<Utc>,
    /// Provider names in the order they contributed.
    pub providers_used: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_cents: Option<f64>,
}

impl EnrichedProfile {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            social_profiles: SocialProfiles::new(),
            company_intel: None,
            persona_bucket: None,
            enriched_at: Utc::now(),
            providers_used: Vec::new(),
            tokens_used: None,
            cost_cents: None,
        }
    }

    pub(crate) fn add_tokens(&mut self, tokens: Option<u64>) {
        if let Some(t) = tokens {
            *self.tokens_used.get_or_insert(0) += t;
        }
    }

    pub(crate) fn add_cost(&mut self, cents: f64) {
        *self.cost_cents.get_or_insert(0.0) += cents;
    }
}

/// Process-lifetime usage counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub rate_limit_hits: u64,
    pub average_response_time_ms: f64,
    pub total_cost_cents: f64,
    pub provider_usage: BTreeMap<String, u64>,
}
