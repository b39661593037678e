//! Handlers for `pagecheck generate` and `pagecheck bugs`

use crate::commands::GenerateArgs;
use crate::error::{CliError, CliResult};
use pagecheck::fixtures::{compose, Fixture, CATALOG};
use pagecheck::{run_session, EngineConfig, PageSource, QaEngine, StaticFactory, TestReport};
use std::fmt::Write as _;
use tracing::warn;

/// Catalog listing, one family per line
#[must_use]
pub fn render_catalog() -> String {
    let width = CATALOG.iter().map(|f| f.key.len()).max().unwrap_or(0);
    let mut out = String::new();
    for family in CATALOG {
        let category = family.category.map_or("page", |c| c.as_str());
        let _ = writeln!(
            out,
            "{:<width$}  {:<7}  {} ({} variant{})",
            family.key,
            category,
            family.description,
            family.variants.len(),
            if family.variants.len() == 1 { "" } else { "s" },
        );
    }
    out
}

/// Compose the requested fixture; every key unknown is an error
pub fn build_fixture(args: &GenerateArgs) -> CliResult<Fixture> {
    let fixture = compose(&args.bugs, args.variant);
    for key in &fixture.unknown {
        warn!(key = %key, "unknown bug family skipped");
    }
    if fixture.bugs.is_empty() {
        return Err(CliError::invalid_argument(format!(
            "no known bug families in: {}",
            args.bugs.join(", ")
        )));
    }
    Ok(fixture)
}

/// Static engine run over a generated page, no network
pub async fn check_fixture(fixture: &Fixture) -> CliResult<TestReport> {
    let engine = QaEngine::new(EngineConfig::immediate().with_check_destinations(false));
    let report = run_session(
        &StaticFactory::default(),
        &engine,
        &PageSource::Html(fixture.html.clone()),
    )
    .await?;
    Ok(report)
}
