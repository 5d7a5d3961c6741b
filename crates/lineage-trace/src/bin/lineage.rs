//! CLI driver for the lineage tracer: runs one click analysis against a
//! target project and prints the wire response as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use lineage_ai::{AnalysisEvidence, HttpReasoningProvider, ReasoningFacade};
use lineage_core::{AiAnalysis, AnalyzeRequest, LineageError, Settings};
use lineage_graph::ModuleGraph;
use lineage_trace::{
    build_response, collected_call_sites, final_code, ranked_variables, static_response,
    TraceContext, TraceOrchestrator, TraceOutcome,
};

#[derive(Parser, Debug)]
#[command(name = "lineage", version, about = "Trace where a clicked UI value comes from")]
struct Cli {
    /// Project-relative component file path
    #[arg(long)]
    path: String,

    /// 1-based click line
    #[arg(long)]
    line: u32,

    /// 0-based click column
    #[arg(long)]
    column: u32,

    /// Configuration file (TOML); defaults apply when absent
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit the static evidence only, skipping the reasoning call
    #[arg(long)]
    no_reasoning: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    std::process::exit(run(cli).await);
}

async fn run(cli: Cli) -> i32 {
    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("configuration error: {}", err);
            return 2;
        }
    };

    let graph = Arc::new(ModuleGraph::new());
    if let Err(err) = graph.init(&settings.project, &settings.graph).await {
        // non-fatal: queries degrade to empty result sets
        tracing::warn!(%err, "graph initialization failed");
    }

    let request = AnalyzeRequest {
        path: cli.path,
        line: cli.line,
        column: cli.column,
    };
    let weights = settings.trace.weights.clone();
    let reasoning = settings.reasoning.clone();
    let orchestrator = TraceOrchestrator::new(TraceContext { settings, graph });

    let outcome = match orchestrator.analyze(&request) {
        Ok(outcome) => outcome,
        Err(err) => return report_error(err),
    };

    let response = match outcome {
        TraceOutcome::Static {
            target_element,
            categorized,
        } => static_response(target_element, categorized),
        TraceOutcome::Traced {
            target_element,
            categorized,
            chains,
        } => {
            let evidence = AnalysisEvidence {
                target_element: target_element.clone(),
                evidence_code: final_code(&chains, &weights),
                call_sites: collected_call_sites(&chains, &weights),
            };
            let analysis = if cli.no_reasoning {
                AiAnalysis::degraded("REASONING_SKIPPED", "reasoning call disabled by flag")
            } else {
                match HttpReasoningProvider::new(reasoning.clone()) {
                    Ok(provider) => {
                        ReasoningFacade::new(Arc::new(provider), reasoning)
                            .analyze(&evidence)
                            .await
                    }
                    Err(err) => {
                        tracing::warn!(%err, "reasoning provider unavailable");
                        AiAnalysis::degraded("LLM_CALL_FAILED", &err.to_string())
                    }
                }
            };
            let ranked = ranked_variables(&categorized, &weights);
            let message = format!(
                "traced {} variable(s): {}",
                ranked.len(),
                ranked.join(", ")
            );
            build_response(
                message,
                target_element,
                chains,
                categorized,
                analysis,
                &weights,
            )
        }
    };

    match serde_json::to_string_pretty(&response) {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(err) => {
            eprintln!("response serialization failed: {}", err);
            1
        }
    }
}

/// User-correctable failures exit 2, internal ones exit 1; both print a
/// structured error object so callers can parse either way.
fn report_error(err: LineageError) -> i32 {
    let (code, kind) = match &err {
        LineageError::InvalidRequest(_) => (2, "invalid_request"),
        LineageError::FileNotFound(_) => (2, "file_not_found"),
        LineageError::NodeNotLocated { .. } => (2, "node_not_located"),
        LineageError::UnparsableComponent(_) => (2, "unparsable_component"),
        _ => (1, "internal"),
    };
    let body = serde_json::json!({
        "error": kind,
        "message": err.to_string(),
    });
    println!("{}", body);
    code
}
