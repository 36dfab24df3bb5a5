use anyhow::Context;
use clap::Parser;
use smap_validator::{
    Diagnostic, FetchStrategy, Outcome, Validation, Validator, ValidatorConfig,
    DEFAULT_CONCURRENCY,
};
use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Check that a source map matches its minified script and original sources.
#[derive(Debug, Parser)]
#[command(name = "smap-validator", version, about)]
struct Cli {
    /// URL of the minified script.
    url: Url,

    /// Print the result as JSON.
    #[arg(long)]
    json: bool,

    /// Per-request timeout in seconds.
    #[arg(long, env = "SMAP_VALIDATOR_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Original sources fetched at once.
    #[arg(long, env = "SMAP_VALIDATOR_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Fetch original sources one after another, ignoring `--concurrency`.
    #[arg(long)]
    sequential: bool,

    #[arg(long, env = "SMAP_VALIDATOR_USER_AGENT")]
    user_agent: Option<String>,
}

impl Cli {
    fn config(&self) -> ValidatorConfig {
        let strategy = if self.sequential {
            FetchStrategy::Sequential
        } else {
            FetchStrategy::Concurrent {
                limit: self.concurrency,
            }
        };
        let config = ValidatorConfig::default()
            .with_timeout(Duration::from_secs(self.timeout))
            .with_strategy(strategy);
        match &self.user_agent {
            Some(user_agent) => config.with_user_agent(user_agent),
            None => config,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("smap_validator=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let validator =
        Validator::from_config(&cli.config()).context("failed to build the HTTP client")?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let validation = validator.validate(&cli.url, &cancel).await;

    let mut stdout = io::stdout().lock();
    if cli.json {
        serde_json::to_writer_pretty(&mut stdout, &validation)
            .context("failed to write the JSON report")?;
        writeln!(stdout)?;
    } else {
        render(&mut stdout, &validation).context("failed to write the report")?;
    }

    Ok(match &validation.outcome {
        Outcome::Report(report) if report.is_valid() => ExitCode::SUCCESS,
        Outcome::Report(_) => ExitCode::from(1),
        Outcome::Error(_) => ExitCode::from(2),
    })
}

fn render<W: Write>(w: &mut W, validation: &Validation) -> io::Result<()> {
    writeln!(w, "script:    {}", validation.url)?;
    if let Some(sourcemap_url) = &validation.sourcemap_url {
        writeln!(w, "sourcemap: {sourcemap_url}")?;
    }
    if !validation.sources.sources.is_empty() {
        writeln!(w, "sources:   {}", validation.sources.prefix)?;
        for source in &validation.sources.sources {
            writeln!(w, "    {source}")?;
        }
    }
    writeln!(w)?;

    match &validation.outcome {
        Outcome::Error(err) => {
            writeln!(w, "error [{}]: {err}", err.kind())?;
            if let smap_validator::ValidationError::SourcesUnreachable { failures, .. } = err {
                for failure in failures {
                    writeln!(w, "    {failure}")?;
                }
            }
            for resolution in err.resolutions() {
                writeln!(w, "  hint: {resolution}")?;
            }
        }
        Outcome::Report(report) => {
            writeln!(
                w,
                "{} tokens, {} errors, {} warnings",
                report.tokens.len(),
                report.errors.len(),
                report.warnings.len()
            )?;
            for diagnostic in &report.errors {
                render_diagnostic(w, "error", diagnostic)?;
            }
            for diagnostic in &report.warnings {
                render_diagnostic(w, "warning", diagnostic)?;
            }
        }
    }
    Ok(())
}

fn render_diagnostic<W: Write>(w: &mut W, label: &str, diagnostic: &Diagnostic) -> io::Result<()> {
    let Some(source) = diagnostic.token.source_info() else {
        return Ok(());
    };
    // 1-based, like editors
    writeln!(
        w,
        "\n{label}: expected `{}` at {}:{}:{}, found `{}`",
        diagnostic.expected(),
        diagnostic.source_url,
        source.position.line + 1,
        source.position.column + 1,
        diagnostic.found,
    )?;

    let mut number = diagnostic.context_start_line + 1;
    for line in &diagnostic.pre_context {
        writeln!(w, "  {number:>5} | {line}")?;
        number += 1;
    }
    writeln!(w, "> {number:>5} | {}", diagnostic.line)?;
    for line in &diagnostic.post_context {
        number += 1;
        writeln!(w, "  {number:>5} | {line}")?;
    }
    Ok(())
}
