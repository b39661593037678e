//! Pagecheck CLI: element-interaction QA from the command line
//!
//! ## Usage
//!
//! ```bash
//! pagecheck check page.html                  # Check a local file
//! pagecheck check https://example.com -c links --format json
//! pagecheck generate -b broken_link -b empty_button --check
//! pagecheck suggest report.json --limit 3    # Ask a model for fixes
//! pagecheck serve --addr 127.0.0.1:8000      # HTTP surface
//! ```

use clap::Parser;
use pagecheck_cli::{
    handlers, CheckArgs, Cli, CliConfig, CliError, CliResult, ColorChoice, Commands,
    GenerateArgs, OutputFormat, ProgressReporter, Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Defects { count }) => {
            eprintln!("{count} element(s) failed");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    config.init_tracing();

    match cli.command {
        Commands::Check(args) => run_check(&config, &args),
        Commands::Generate(args) => run_generate(&config, &args),
        Commands::Bugs => {
            print!("{}", handlers::render_catalog());
            Ok(())
        }
        #[cfg(feature = "llm")]
        Commands::Suggest(args) => {
            let suggestions = runtime()?.block_on(handlers::execute_suggest(&args))?;
            print!("{}", handlers::render_suggestions(&suggestions));
            Ok(())
        }
        #[cfg(not(feature = "llm"))]
        Commands::Suggest(_) => Err(CliError::config(
            "LLM features not enabled. Rebuild with --features llm",
        )),
        Commands::Serve(args) => runtime()?.block_on(pagecheck_cli::serve(&args)),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let color: ColorChoice = cli.color.into();
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(color)
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::check_execution(format!("Failed to create runtime: {e}")))
}

fn reporter(config: &CliConfig) -> ProgressReporter {
    ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet())
}

fn run_check(config: &CliConfig, args: &CheckArgs) -> CliResult<()> {
    let mut progress = reporter(config);
    progress.start("Checking page");
    let result = runtime()?.block_on(handlers::execute_check(args));
    progress.finish();
    let report = result?;

    handlers::emit(&report, args.format.into(), args.output.as_deref())?;
    if let Some(path) = &args.output {
        progress.success(&format!("Report written to {}", path.display()));
    }
    progress.summary(&report);
    handlers::defect_gate(&report, args.fail_on_defects)
}

fn run_generate(config: &CliConfig, args: &GenerateArgs) -> CliResult<()> {
    let progress = reporter(config);
    let fixture = handlers::build_fixture(args)?;
    for key in &fixture.unknown {
        progress.warning(&format!("Unknown bug family: {key}"));
    }

    match &args.output {
        Some(path) => {
            std::fs::write(path, &fixture.html)?;
            progress.success(&format!(
                "Wrote {} ({})",
                path.display(),
                fixture.bugs.join(", ")
            ));
        }
        None => println!("{}", fixture.html),
    }

    if args.check {
        let report = runtime()?.block_on(handlers::check_fixture(&fixture))?;
        print!("{}", OutputFormat::Text.render(&report)?);
        progress.summary(&report);
    }
    Ok(())
}
