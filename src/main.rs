//! LexCerta - citation and quotation verification CLI
//!
//! Prints the tool response envelope as JSON on stdout; logs go to stderr.
//! Exits 0 when the envelope is valid, 1 otherwise.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lexcerta::{
    cache::{CitationCache, OpinionCache},
    client::CourtListenerClient,
    config::{Args, Command, LogFormat},
    resilience::{ExecutionPolicy, TokenBucketRateLimiter},
    verify::parse_citation_tool,
    ToolResponseEnvelope, Verifier,
};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_tracing(&args);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        return Ok(ExitCode::from(2));
    }

    let envelope = match &args.command {
        Command::Parse { citation } => parse_citation_tool(citation),
        Command::VerifyCitation { citation } => {
            build_verifier(&args)?.verify_citation(citation).await
        }
        Command::VerifyQuote { citation, text } => {
            build_verifier(&args)?.verify_quote(citation, text).await
        }
    };

    println!("{}", envelope.to_json()?);
    Ok(exit_code(&envelope))
}

fn init_tracing(args: &Args) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("lexcerta={},info", args.log_level).into());

    let registry = tracing_subscriber::registry().with(filter);
    match args.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn build_verifier(args: &Args) -> anyhow::Result<Verifier> {
    let api_key = args
        .api_key()
        .context("COURTLISTENER_API_KEY is required")?;

    let policy = Arc::new(ExecutionPolicy::new("courtlistener", args.policy_config()));
    let rate_limiter = Arc::new(TokenBucketRateLimiter::new(args.rate_limiter_config()));
    let client = CourtListenerClient::new(api_key, &args.base_url, policy, rate_limiter)
        .context("Failed to build HTTP client")?;

    info!(
        base_url = %args.base_url,
        timeout_ms = args.request_timeout_ms,
        rate_limit_tokens = args.rate_limit_tokens,
        "CourtListener client ready"
    );

    Ok(Verifier::with_caches(
        Arc::new(client),
        Arc::new(CitationCache::new(args.citation_cache_size)),
        Arc::new(OpinionCache::new(args.opinion_cache_size)),
    ))
}

fn exit_code(envelope: &ToolResponseEnvelope) -> ExitCode {
    if envelope.valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
