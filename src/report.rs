//! Console reporting
//!
//! Human-facing progress output on stdout. Diagnostics go through `tracing`
//! instead.

use colored::Colorize;
use serde_json::Value;

use crate::client::TestResult;
use crate::config::HarnessConfig;
use crate::orchestrator::{RunSummary, SuiteReport};

const RULE_WIDTH: usize = 70;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

pub fn header(title: &str) {
    println!();
    println!("{}", rule().cyan());
    println!("{}", format!("{:^width$}", title, width = RULE_WIDTH).cyan().bold());
    println!("{}", rule().cyan());
    println!();
}

pub fn connecting(config: &HarnessConfig) {
    println!("{}", "Connecting to broker...".cyan());
    println!("   Host:  {}", config.broker.address());
    println!("   Topic: {}", config.device.topic);
    println!();
}

pub fn connected() {
    println!("{} Connected", "OK".green().bold());
    println!();
}

pub fn step(number: usize, description: &str) {
    println!("{}", format!("Step {}: {}", number, description).yellow());
}

pub fn result(result: &TestResult) {
    if result.passed {
        println!("{} {}", "PASS".green().bold(), result.message);
        if !result.expected.is_null() {
            println!("  Expected: {}", result.expected);
        }
    } else {
        println!("{} {}", "FAIL".red().bold(), result.message.red());
        println!("  Expected: {}", result.expected.to_string().green());
        println!("  Actual:   {}", result.actual.to_string().red());
    }
}

/// Print a config document, highlighting `fields`
pub fn config(body: &Value, fields: &[&str]) {
    println!("{}", "Config State:".cyan());
    let Some(obj) = body.as_object() else {
        println!("  {}", body);
        return;
    };
    for (key, value) in obj {
        let line = format!("  {}: {}", key, value);
        if fields.contains(&key.as_str()) {
            println!("{}", line.yellow());
        } else {
            println!("{}", line);
        }
    }
}

pub fn suite_summary(report: &SuiteReport) {
    let passed = report.passed_count();
    let total = report.total();

    println!();
    println!("{}", rule().cyan());
    if report.success() {
        println!(
            "{}",
            format!("ALL TESTS PASSED: {}/{}", passed, total).green().bold()
        );
    } else {
        println!(
            "{}",
            format!("SOME TESTS FAILED: {}/{} passed", passed, total)
                .red()
                .bold()
        );
    }
    println!("Elapsed: {:.1?}", report.elapsed);
    println!("{}", rule().cyan());
}

pub fn run_summary(summary: &RunSummary) {
    if summary.reports.len() < 2 {
        return;
    }

    header("Summary");
    for report in &summary.reports {
        let status = if report.success() {
            "PASS".green().bold()
        } else {
            "FAIL".red().bold()
        };
        println!(
            "{} {} ({}/{})",
            status,
            report.name,
            report.passed_count(),
            report.total()
        );
    }
    println!();
    println!(
        "{}/{} suites passed",
        summary.passed_suites(),
        summary.reports.len()
    );
}

/// Collects a suite's results, printing each step and result as it goes
#[derive(Debug, Default)]
pub struct Recorder {
    step: usize,
    results: Vec<TestResult>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Announce the next numbered step
    pub fn step(&mut self, description: &str) {
        self.step += 1;
        step(self.step, description);
    }

    pub fn record(&mut self, outcome: TestResult) {
        result(&outcome);
        self.results.push(outcome);
    }

    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    pub fn finish(self) -> Vec<TestResult> {
        self.results
    }
}
