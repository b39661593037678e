//! Session lifecycle.
//!
//! A [`DriverFactory`] opens fresh sessions. [`run_session`] runs the engine
//! in one session and always closes it; [`run_isolated`] gives every
//! configured category its own session, runs them concurrently and merges
//! the results into one report.

use crate::dom::StaticDriver;
use crate::driver::{PageDriver, PageSource};
use crate::engine::QaEngine;
use crate::report::TestReport;
use crate::result::PagecheckResult;
use async_trait::async_trait;
use futures::future::join_all;
use tracing::{info, warn};

/// Opens new driver sessions
#[async_trait]
pub trait DriverFactory: Send + Sync {
    /// Driver type produced
    type Driver: PageDriver;

    /// Open a fresh session
    async fn open(&self) -> PagecheckResult<Self::Driver>;
}

/// Factory for in-process [`StaticDriver`] sessions.
///
/// Every session starts from a clone of the template, so registered routes
/// and base URL carry over.
#[derive(Debug, Clone, Default)]
pub struct StaticFactory {
    template: StaticDriver,
}

impl StaticFactory {
    /// Factory over a template driver
    #[must_use]
    pub const fn new(template: StaticDriver) -> Self {
        Self { template }
    }
}

#[async_trait]
impl DriverFactory for StaticFactory {
    type Driver = StaticDriver;

    async fn open(&self) -> PagecheckResult<StaticDriver> {
        Ok(self.template.clone())
    }
}

/// Run `engine` against `source` in one session; the session is closed even
/// when the run fails.
pub async fn run_session<F>(
    factory: &F,
    engine: &QaEngine,
    source: &PageSource,
) -> PagecheckResult<TestReport>
where
    F: DriverFactory + ?Sized,
{
    let mut driver = factory.open().await?;
    let result = engine.run(&mut driver, source).await;
    let closed = driver.close().await;
    match (result, closed) {
        (Ok(report), Ok(())) => Ok(report),
        (Err(err), closed) => {
            if let Err(close_err) = closed {
                warn!(error = %close_err, "session close failed after run error");
            }
            Err(err)
        }
        (Ok(_), Err(err)) => Err(err),
    }
}

/// One session per category, run concurrently and merged in category order
pub async fn run_isolated<F>(
    factory: &F,
    engine: &QaEngine,
    source: &PageSource,
) -> PagecheckResult<TestReport>
where
    F: DriverFactory + ?Sized,
{
    let engines: Vec<QaEngine> = engine
        .config()
        .categories
        .iter()
        .map(|category| engine.for_category(*category))
        .collect();
    info!(sessions = engines.len(), "running isolated sessions");
    let runs = engines
        .iter()
        .map(|engine| run_session(factory, engine, source));
    let results = join_all(runs).await;

    let mut merged = TestReport::new(source);
    for result in results {
        merged.merge(result?);
    }
    Ok(merged)
}
