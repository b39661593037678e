//! Handler for `pagecheck check`

use crate::commands::{CheckArgs, DriverArg};
use crate::error::{CliError, CliResult};
use crate::output::OutputFormat;
use pagecheck::{
    run_isolated, run_session, Category, DriverFactory, EngineConfig, PageSource, QaEngine,
    StaticDriver, StaticFactory, TestReport,
};
use std::path::Path;
use tracing::{debug, info};

/// Interpret the SOURCE argument: an existing file is read as inline HTML,
/// anything else goes through [`PageSource::from_input`]
pub fn resolve_source(input: &str) -> CliResult<PageSource> {
    let path = Path::new(input);
    if !input.trim_start().starts_with('<') && path.is_file() {
        debug!(path = %path.display(), "reading source file");
        return Ok(PageSource::Html(std::fs::read_to_string(path)?));
    }
    Ok(PageSource::from_input(input))
}

/// Engine configuration for the arguments.
///
/// Without `--config` the static driver gets the no-wait profile and the
/// Chromium driver the defaults.
pub fn engine_config(args: &CheckArgs) -> CliResult<EngineConfig> {
    let mut config = match (&args.config, args.driver) {
        (Some(path), _) => EngineConfig::from_yaml_file(path)?,
        (None, DriverArg::Static) => EngineConfig::immediate(),
        (None, DriverArg::Chromium) => EngineConfig::default(),
    };
    if !args.categories.is_empty() {
        let categories: Vec<Category> = args.categories.iter().copied().map(Into::into).collect();
        config = config.with_categories(categories);
    }
    if args.no_network {
        config = config.with_check_destinations(false);
    }
    if args.no_click_links {
        config = config.with_click_links(false);
    }
    Ok(config)
}

/// Engine with a network probe unless destination checks are off
#[must_use]
pub fn build_engine(config: EngineConfig) -> QaEngine {
    let probing = config.check_destinations;
    let engine = QaEngine::new(config);
    if probing {
        engine.with_http_probe()
    } else {
        engine
    }
}

async fn run_with<F>(
    factory: &F,
    engine: &QaEngine,
    source: &PageSource,
    isolated: bool,
) -> CliResult<TestReport>
where
    F: DriverFactory,
{
    let report = if isolated {
        run_isolated(factory, engine, source).await?
    } else {
        run_session(factory, engine, source).await?
    };
    Ok(report)
}

/// Run the checks described by `args`
pub async fn execute_check(args: &CheckArgs) -> CliResult<TestReport> {
    let source = resolve_source(&args.source)?;
    let engine = build_engine(engine_config(args)?);
    info!(source = %source.describe(), driver = ?args.driver, "starting check");

    match args.driver {
        DriverArg::Static => {
            let mut template = StaticDriver::new();
            if let Some(base) = &args.base_url {
                template = template.with_base_url(base.clone());
            }
            run_with(&StaticFactory::new(template), &engine, &source, args.isolated).await
        }
        #[cfg(feature = "browser")]
        DriverArg::Chromium => {
            let factory = pagecheck::ChromiumFactory::new(pagecheck::BrowserConfig::default());
            run_with(&factory, &engine, &source, args.isolated).await
        }
        #[cfg(not(feature = "browser"))]
        DriverArg::Chromium => Err(CliError::invalid_argument(
            "Chromium driver not enabled. Rebuild with --features browser",
        )),
    }
}

/// Render the report to `output` or stdout
pub fn emit(report: &TestReport, format: OutputFormat, output: Option<&Path>) -> CliResult<()> {
    let rendered = format.render(report)?;
    match output {
        Some(path) => std::fs::write(path, rendered)?,
        None => print!("{rendered}"),
    }
    Ok(())
}

/// Error when defects should fail the process
pub fn defect_gate(report: &TestReport, fail_on_defects: bool) -> CliResult<()> {
    let count = report.summary().failed();
    if fail_on_defects && count > 0 {
        return Err(CliError::Defects { count });
    }
    Ok(())
}
