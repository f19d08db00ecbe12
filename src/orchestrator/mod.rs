//! Test Orchestrator
//!
//! Runs one suite per fresh client: connect, run the test body, disconnect on
//! every path. The test body runs on its own task, so an error or panic in it
//! becomes a single failing result instead of tearing down the run.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::client::{FailureKind, HarnessClient, TestResult};
use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::report;


/// Boxed future returned by a suite body
pub type SuiteFuture =
    Pin<Box<dyn Future<Output = Result<Vec<TestResult>, HarnessError>> + Send>>;

/// A named, runnable suite
#[derive(Clone, Copy)]
pub struct Suite {
    pub name: &'static str,
    pub title: &'static str,
    pub run: fn(HarnessClient) -> SuiteFuture,
}

impl std::fmt::Debug for Suite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Suite")
            .field("name", &self.name)
            .field("title", &self.title)
            .finish()
    }
}

/// Outcome of one suite
#[derive(Debug, Clone)]
pub struct SuiteReport {
    pub name: String,
    /// Whether the broker connection was established
    pub connected: bool,
    pub results: Vec<TestResult>,
    pub elapsed: Duration,
}

impl SuiteReport {
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// True iff every result passed
    pub fn success(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }
}

/// Outcome of a sequence of suites
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub reports: Vec<SuiteReport>,
}

impl RunSummary {
    pub fn passed_suites(&self) -> usize {
        self.reports.iter().filter(|r| r.success()).count()
    }

    pub fn success(&self) -> bool {
        self.reports.iter().all(SuiteReport::success)
    }
}

/// Run `test_fn` against a freshly connected client.
///
/// If the connection cannot be established the body is not called and the
/// report carries one `Connection` failure.
pub async fn run_suite<F, Fut>(name: &str, config: &HarnessConfig, test_fn: F) -> SuiteReport
where
    F: FnOnce(HarnessClient) -> Fut,
    Fut: Future<Output = Result<Vec<TestResult>, HarnessError>> + Send + 'static,
{
    let start = Instant::now();
    report::header(name);
    report::connecting(config);

    let client = HarnessClient::new(config.clone());

    if !client.connect().await {
        let result = TestResult::fail(
            FailureKind::Connection,
            format!("Failed to connect to {}", config.broker.address()),
        );
        report::result(&result);
        client.disconnect().await;

        let suite = SuiteReport {
            name: name.to_string(),
            connected: false,
            results: vec![result],
            elapsed: start.elapsed(),
        };
        report::suite_summary(&suite);
        return suite;
    }

    report::connected();
    info!("Running suite '{}'", name);

    // A closure may panic while building its future, before anything is spawned
    let body = match panic::catch_unwind(AssertUnwindSafe(|| test_fn(client.clone()))) {
        Ok(body) => tokio::spawn(body).await.map_err(BodyFailure::Join),
        Err(payload) => Err(BodyFailure::Panic(panic_message(payload))),
    };

    let results = match body {
        Ok(Ok(results)) => results,
        Ok(Err(e)) => {
            error!("Suite '{}' aborted: {}", name, e);
            let result = TestResult::fail(FailureKind::Fault, format!("Test error: {}", e));
            report::result(&result);
            vec![result]
        }
        Err(e) => {
            let reason = e.reason();
            error!("Suite '{}' panicked: {}", name, reason);
            let result =
                TestResult::fail(FailureKind::Fault, format!("Test panicked: {}", reason));
            report::result(&result);
            vec![result]
        }
    };

    client.disconnect().await;

    let suite = SuiteReport {
        name: name.to_string(),
        connected: true,
        results,
        elapsed: start.elapsed(),
    };
    report::suite_summary(&suite);
    suite
}

/// Run suites one after another, each on its own connection
pub async fn run_suites(config: &HarnessConfig, suites: &[Suite]) -> RunSummary {
    let mut summary = RunSummary::default();
    for suite in suites {
        summary
            .reports
            .push(run_suite(suite.title, config, suite.run).await);
    }
    report::run_summary(&summary);
    summary
}

/// Why a test body did not produce results
enum BodyFailure {
    Panic(String),
    Join(tokio::task::JoinError),
}

impl BodyFailure {
    fn reason(self) -> String {
        match self {
            BodyFailure::Panic(reason) => reason,
            BodyFailure::Join(e) if e.is_panic() => panic_message(e.into_panic()),
            BodyFailure::Join(e) => e.to_string(),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(msg) => *msg,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".to_string(),
        },
    }
}
