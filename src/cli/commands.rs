//! Command implementations for the strata CLI.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, bail};
use tracing::info;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::EngineConfig;
use crate::corpus::load_corpus;
use crate::embedding::TextEncoder;
use crate::search::report::{statistics, summarize};
use crate::search::{SearchRequest, Strategy};
use crate::service::SearchService;

/// Execute a CLI command.
pub fn execute_command(args: StrataArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    match &args.command {
        Command::Search(search_args) => search(search_args, config, &args),
        Command::Methods(methods_args) => methods(methods_args, config, &args),
        Command::Embed(embed_args) => embed(embed_args, config, &args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

/// Build a service and fit it on the corpus file.
fn fitted_service(
    corpus: &Path,
    config: EngineConfig,
    with_encoder: bool,
) -> anyhow::Result<SearchService> {
    let records = load_corpus(corpus)
        .with_context(|| format!("failed to read corpus {}", corpus.display()))?;
    info!(records = records.len(), path = %corpus.display(), "Loaded corpus");

    let encoder = if with_encoder {
        build_encoder(&config)?
    } else {
        None
    };
    let mut service = SearchService::new(config).context("invalid configuration")?;
    if let Some(encoder) = encoder {
        service = service.with_encoder(encoder);
    }
    service.fit(records).context("failed to index corpus")?;
    Ok(service)
}

#[cfg(feature = "embeddings-candle")]
fn build_encoder(config: &EngineConfig) -> anyhow::Result<Option<Arc<dyn TextEncoder>>> {
    let encoder = crate::embedding::CandleTextEncoder::new(&config.embeddings.model)
        .with_context(|| format!("failed to load encoder '{}'", config.embeddings.model))?;
    Ok(Some(Arc::new(encoder)))
}

#[cfg(not(feature = "embeddings-candle"))]
fn build_encoder(config: &EngineConfig) -> anyhow::Result<Option<Arc<dyn TextEncoder>>> {
    tracing::warn!(
        model = %config.embeddings.model,
        "Built without the embeddings-candle feature; no text encoder available"
    );
    Ok(None)
}

fn search(args: &SearchArgs, config: EngineConfig, cli_args: &StrataArgs) -> anyhow::Result<()> {
    let k = args.limit.unwrap_or(config.default_results);
    let category_field = config.category_field.clone();
    let wants_embeddings = args.strategy == Strategy::Embedding;

    let service = fitted_service(&args.corpus, config, wants_embeddings)?;
    if wants_embeddings {
        service
            .load_or_create_embeddings()
            .context("failed to initialize embeddings")?;
    }

    let mut request = SearchRequest::new(args.strategy, args.query.clone()).with_k(k);
    request.boost = args.boosts.iter().cloned().collect();
    request.filters = args.filters.iter().cloned().collect();
    request.field = args.field.clone();
    request.rank = args.rank;

    let results = service
        .search(&request)
        .with_context(|| format!("{} search failed", args.strategy))?;

    let output = SearchOutput {
        strategy: results.strategy.to_string(),
        query: results.query.clone(),
        total_results: results.total_results,
        elapsed_ms: results.elapsed.as_secs_f64() * 1000.0,
        hits: summarize(&results),
        statistics: if args.stats {
            statistics(&results, &category_field)
        } else {
            None
        },
    };
    output_result(&output, cli_args)
}

fn methods(args: &MethodsArgs, config: EngineConfig, cli_args: &StrataArgs) -> anyhow::Result<()> {
    let service = fitted_service(&args.corpus, config, args.embeddings)?;
    if args.embeddings {
        service
            .load_or_create_embeddings()
            .context("failed to initialize embeddings")?;
    }

    let output = MethodsOutput {
        methods: service.strategy_infos(),
        categories: service.available_categories(),
    };
    output_result(&output, cli_args)
}

fn embed(args: &EmbedArgs, mut config: EngineConfig, cli_args: &StrataArgs) -> anyhow::Result<()> {
    if let Some(output) = &args.output {
        config.embeddings.cache_path = output.clone();
    }
    let path = config.embeddings.cache_path.clone();
    if args.force && path.exists() {
        std::fs::remove_file(&path)
            .with_context(|| format!("failed to remove {}", path.display()))?;
    }

    let start = Instant::now();
    let service = fitted_service(&args.corpus, config, true)?;
    if !service
        .load_or_create_embeddings()
        .context("failed to initialize embeddings")?
    {
        bail!("no text encoder available; rebuild with --features embeddings-candle");
    }

    let engine = service.engine()?;
    let store = engine
        .embeddings()
        .context("embedding store missing after initialization")?;
    let output = EmbedOutput {
        path,
        records: store.len(),
        dimension: store.dimension(),
        duration_ms: start.elapsed().as_millis() as u64,
    };
    output_result(&output, cli_args)
}
