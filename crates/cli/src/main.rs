//! semrel command line interface.

mod cli;
mod output;
mod tracing;

use crate::tracing::{TracingConfig, TracingFormat};
use ::tracing::Instrument;
use semrel_release::{GitCli, Orchestrator, PluginRegistry, ReleaseContext, ReleaseOptions};

#[tokio::main]
async fn main() {
    // Run the CLI and handle any errors with miette reporting
    if let Err(error) = run_main().await {
        #[allow(clippy::print_stderr)]
        {
            eprintln!("{error:?}");
        }
        std::process::exit(1);
    }
}

async fn run_main() -> miette::Result<()> {
    let cli = cli::parse();

    let tracing_config = TracingConfig {
        format: if cli.json {
            TracingFormat::Json
        } else {
            TracingFormat::Compact
        },
        level: cli.level.into(),
        filter: cli.log_filter.clone(),
    };
    crate::tracing::init_tracing(tracing_config)?;

    let mut options = match &cli.config {
        Some(path) => ReleaseOptions::load(path)?,
        None => ReleaseOptions::discover(&cli.cwd)?,
    };
    cli.apply(&mut options);

    let mut ctx = ReleaseContext::from_process_env(&cli.cwd, options);
    let orchestrator = Orchestrator::new(
        Box::new(GitCli::new(&cli.cwd, ctx.env.clone())),
        PluginRegistry::builtin(&ctx.options.plugins),
    );

    let span = ::tracing::info_span!(
        "release",
        correlation_id = %crate::tracing::correlation_id(),
        cwd = %cli.cwd.display(),
    );
    let outcome = orchestrator.run(&mut ctx).instrument(span).await?;
    print_outcome(outcome.as_ref(), ctx.is_dry_run(), cli.json)
}

#[allow(clippy::print_stdout)]
fn print_outcome(
    outcome: Option<&semrel_release::ReleaseOutcome>,
    dry_run: bool,
    json: bool,
) -> miette::Result<()> {
    if json {
        let document = output::to_json(outcome)
            .map_err(|e| miette::miette!("Failed to serialize the release result: {e}"))?;
        println!("{document}");
        return Ok(());
    }

    if dry_run {
        if let Some(next) = outcome.and_then(|o| o.next_release.as_ref()) {
            if !next.notes.is_empty() {
                println!("{}\n", next.notes);
            }
        }
    }
    println!("{}", output::summary(outcome, dry_run));
    Ok(())
}
