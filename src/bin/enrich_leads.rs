//! Lead enrichment CLI
//!
//! Enriches one or more email addresses with every configured provider and prints
//! the profiles together with the usage statistics as JSON.
//!
//! Usage:
//!   RAPIDAPI_KEY=... OPENAI_API_KEY=... cargo run --bin enrich-leads -- \
//!     --company --persona --company-name "Acme Corp" \
//!     jane@acme.com john@acme.com

use clap::Parser;
use lead_enrichment::models::DEFAULT_BATCH_SIZE;
use lead_enrichment::{BatchOptions, EnrichOptions, EnrichmentClient, EnrichmentConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Enrich leads with social profiles, company intelligence and a persona bucket
#[derive(Parser, Debug)]
#[command(name = "enrich-leads")]
#[command(about = "Enrich lead emails with social, company and persona data")]
struct Args {
    /// Lead email addresses
    #[arg(required = true)]
    emails: Vec<String>,

    /// Run company research (requires --company-name)
    #[arg(long)]
    company: bool,

    /// Run persona classification
    #[arg(long)]
    persona: bool,

    /// Company the leads work for
    #[arg(long)]
    company_name: Option<String>,

    /// Leads enriched concurrently per chunk
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lead_enrichment=info,enrich_leads=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = EnrichmentConfig::from_env()?;
    let client = EnrichmentClient::new(config)?;

    let options = BatchOptions {
        lead: EnrichOptions {
            include_company: args.company,
            include_persona: args.persona,
            company_name: args.company_name,
        },
        batch_size: args.batch_size,
    };

    let profiles = if args.emails.len() == 1 {
        vec![client.enrich_lead(&args.emails[0], &options.lead).await?]
    } else {
        client.enrich_batch(&args.emails, &options).await
    };

    tracing::info!(
        "Enriched {} of {} lead(s)",
        profiles.len(),
        args.emails.len()
    );
    let report = serde_json::json!({
        "profiles": profiles,
        "stats": client.get_stats(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
