//! Scribe CLI
//!
//! # Usage
//!
//! ```bash
//! # Generate, check and deliver a study plan
//! SCRIBE_API_KEYS=key1,key2 scribe-agents generate --kind study-plan \
//!     --topic "Security+ in 6 weeks" --certification "Security+" --focus "network defense"
//!
//! # Run the quality gate on an existing document
//! scribe-agents check --kind quiz --file quiz.md --questions 10
//!
//! # Show how a document would be split for delivery
//! scribe-agents pack --file answer.md --kind explanation --banner
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use composition::{deliver, evaluate, pack, ContentKind, GateContext, GenerationRequest, PackOptions};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use scribe_agents::config::ScribeConfig;
use scribe_agents::orchestrator::RefinementOrchestrator;
use scribe_agents::provider::gemini::GeminiFactory;
use scribe_agents::provider::{ProviderPool, UnavailableModelSet};
use scribe_agents::telemetry::{append_trace, init_tracing, TraceCollector};
use scribe_agents::transport::StdoutDeliverer;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Path to a TOML config file
    #[arg(long, global = true, env = "SCRIBE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a document, then pack and print it
    Generate {
        #[command(flatten)]
        request: RequestArgs,

        /// Topic to write about
        #[arg(long)]
        topic: String,

        /// Prefix each message with (i/n)
        #[arg(long, default_value_t = false)]
        banner: bool,

        /// Append a JSON trace line to this file
        #[arg(long)]
        trace_file: Option<PathBuf>,
    },
    /// Print the quality report for an existing document
    Check {
        #[command(flatten)]
        request: RequestArgs,

        #[arg(long)]
        file: PathBuf,

        /// Topic used for keyword overlap and count inference
        #[arg(long, default_value = "")]
        topic: String,

        /// Print the report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the chunks an existing document would be delivered as
    Pack {
        #[arg(long)]
        file: PathBuf,

        /// Content kind; selects the numbered-section override
        #[arg(long, default_value = "generic")]
        kind: String,

        #[arg(long, default_value_t = false)]
        banner: bool,
    },
}

#[derive(Args, Debug)]
struct RequestArgs {
    /// explanation, roadmap, quiz, study-plan, red-team or generic
    #[arg(long, default_value = "generic")]
    kind: String,

    /// Expected number of quiz questions
    #[arg(long)]
    questions: Option<u32>,

    /// Expected number of weeks
    #[arg(long)]
    weeks: Option<u32>,

    #[arg(long)]
    certification: Option<String>,

    /// Focus area for study plans
    #[arg(long)]
    focus: Option<String>,
}

impl RequestArgs {
    fn into_request(self, topic: String) -> GenerationRequest {
        let mut request = GenerationRequest::new(ContentKind::parse(&self.kind), topic);
        if let Some(n) = self.questions {
            request = request.with_questions(n);
        }
        if let Some(n) = self.weeks {
            request = request.with_weeks(n);
        }
        if let Some(c) = self.certification {
            request = request.with_certification(c);
        }
        if let Some(f) = self.focus {
            request = request.with_focus_area(f);
        }
        request
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match cli.command {
        Command::Generate {
            request,
            topic,
            banner,
            trace_file,
        } => {
            let config = ScribeConfig::load(cli.config.as_deref())?;
            let request = request.into_request(topic);
            generate(&config, &request, banner, trace_file.as_deref()).await
        }
        Command::Check {
            request,
            file,
            topic,
            json,
        } => {
            let doc = read_document(&file)?;
            let request = request.into_request(topic);
            let report = evaluate(request.kind, &doc, &GateContext::from_request(&request));
            if json {
                println!("{}", report.to_json());
            } else {
                println!("{report}");
            }
            Ok(if report.pass {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Pack { file, kind, banner } => {
            let config = match &cli.config {
                Some(path) => ScribeConfig::from_file(path)?,
                None => ScribeConfig::default(),
            };
            let doc = read_document(&file)?;
            let opts = pack_options(ContentKind::parse(&kind), &config.packing, banner);
            let chunks = pack(&doc, &opts)?;
            if chunks.is_empty() {
                warn!(file = %file.display(), "Document is empty; nothing to deliver");
                return Ok(ExitCode::FAILURE);
            }
            deliver(&chunks, &StdoutDeliverer::stdout()).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn generate(
    config: &ScribeConfig,
    request: &GenerationRequest,
    banner: bool,
    trace_file: Option<&Path>,
) -> Result<ExitCode> {
    config.validate()?;
    info!(
        kind = %request.kind,
        models = ?config.provider.models,
        credentials = config.credentials().len(),
        "Starting generation"
    );

    let factory = GeminiFactory::new(
        config.provider.base_url.clone(),
        config.provider.temperature,
        config.provider.call_timeout(),
    )?;
    let pool = Arc::new(ProviderPool::new(
        Arc::new(factory),
        config.credentials(),
        config.provider.models.clone(),
        config.retry.clone(),
        UnavailableModelSet::new(),
    ));
    let orchestrator = RefinementOrchestrator::new(pool.clone());

    let cancel = CancellationToken::new();
    if let Some(timeout) = config.request_timeout() {
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            warn!(timeout_secs = timeout.as_secs(), "Request deadline reached; cancelling");
            token.cancel();
        });
    }
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let trace = TraceCollector::new(request.kind);
    let outcome = match orchestrator.produce(request, &cancel).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(run_id = %trace.run_id(), error = %e, "Generation failed");
            eprintln!("{}", e.user_message());
            return Ok(ExitCode::FAILURE);
        }
    };
    if !outcome.report.pass {
        warn!(issues = ?outcome.report.messages(), "Delivering best available draft");
    }

    let opts = pack_options(request.kind, &config.packing, banner);
    let chunks = pack(&outcome.text, &opts)?;
    let sent = deliver(&chunks, &StdoutDeliverer::stdout())
        .await
        .context("failed to deliver answer")?;

    if let Some(path) = trace_file {
        let trace = trace.finalize(&outcome, pool.call_count(), sent);
        append_trace(&trace, path);
    }
    Ok(ExitCode::SUCCESS)
}

fn pack_options(kind: ContentKind, base: &PackOptions, banner: bool) -> PackOptions {
    let opts = kind.spec().pack_options(base);
    let page_banner = banner || opts.page_banner;
    opts.with_banner(page_banner)
}

fn read_document(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
