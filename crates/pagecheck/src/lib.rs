//! Pagecheck: element-interaction QA engine for HTML pages
//!
//! Pagecheck loads a page, finds every button, link and form, drives each
//! one the way a user would and records a structured verdict per element.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                    PAGECHECK Architecture                        │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌────────────┐   ┌─────────────┐   ┌──────────┐  │
//! │  │ Locator  │──►│ Classifier │──►│ Interaction │──►│ Verdict  │  │
//! │  │ (roles)  │   │ (kinds)    │   │ (driver)    │   │ (fold)   │  │
//! │  └──────────┘   └────────────┘   └─────────────┘   └──────────┘  │
//! │        ▲                               │                         │
//! │        │        ┌──────────────────────┴──────┐                  │
//! │        └────────│ PageDriver: StaticDriver |  │                  │
//! │                 │ CdpDriver (chromium)        │                  │
//! │                 └─────────────────────────────┘                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use pagecheck::{run_session, EngineConfig, PageSource, QaEngine, StaticFactory};
//!
//! # async fn demo() -> pagecheck::PagecheckResult<()> {
//! let engine = QaEngine::new(EngineConfig::default());
//! let source = PageSource::from_input(r#"<a href="nonexistent.html">Broken Link</a>"#);
//! let report = run_session(&StaticFactory::default(), &engine, &source).await?;
//! assert_eq!(report.links.len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod boundary;
pub mod browser;
pub mod checks;
pub mod classifier;
mod config;
mod dom;
mod driver;
mod engine;
pub mod fixtures;
pub mod interaction;
#[cfg(feature = "llm")]
pub mod llm;
mod locator;
pub mod probe;
mod report;
mod result;
mod session;
pub mod verdict;

pub use boundary::{BoundaryValue, FieldConstraints};
pub use browser::BrowserConfig;
#[cfg(feature = "browser")]
pub use browser::{CdpDriver, ChromiumFactory};
pub use classifier::{classify, ElementKind, NameHint};
pub use config::EngineConfig;
pub use dom::StaticDriver;
pub use driver::{
    ElementHandle, ElementSnapshot, HandleStep, PageDriver, PageSource, ReadyState,
};
pub use engine::QaEngine;
pub use fixtures::{compose, BugFamily, Fixture, CATALOG};
pub use locator::{locate, locate_now, ElementRef, LocatorOptions, Role};
#[cfg(feature = "http")]
pub use probe::HttpProbe;
pub use probe::{LinkProbe, ProbeError, ProbeResponse};
pub use report::{Category, FailureDigest, FormVerdict, ReportSummary, Tally, TestReport};
pub use result::{PagecheckError, PagecheckResult};
pub use session::{run_isolated, run_session, DriverFactory, StaticFactory};
pub use verdict::{Aggregate, CheckEntry, CheckOutcome, CheckResult, ElementVerdict, Verdict};
