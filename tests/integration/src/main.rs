//! Integration Test Harness
//!
//! Runs every integration test category and prints a summary.
//!
//! # Usage
//!
//! Run all tests:
//! ```text
//! cargo run -p integration-tests
//! ```
//!
//! Run specific test categories:
//! ```text
//! cargo test -p integration-tests --test type_cache_tests
//! cargo test -p integration-tests --test proxy_tests
//! cargo test -p integration-tests --test activation_tests
//! ```
//!
//! Run with increased logging:
//! ```text
//! RUST_LOG=debug cargo run -p integration-tests
//! ```

mod common;

use std::process::Command;
use std::time::{Duration, Instant};
use common::TestSuiteResults;

/// Test category
#[derive(Debug, Clone)]
struct TestCategory {
    name: &'static str,
    description: &'static str,
    test_name: &'static str,
}

const TEST_CATEGORIES: &[TestCategory] = &[
    TestCategory {
        name: "Type Cache Tests",
        description: "Resolution order, single synthesis under contention",
        test_name: "type_cache_tests",
    },
    TestCategory {
        name: "Proxy Tests",
        description: "Outer/dispatch construction, disposal, perimeter checks",
        test_name: "proxy_tests",
    },
    TestCategory {
        name: "Activation Tests",
        description: "Class factory, aggregation, service monikers",
        test_name: "activation_tests",
    },
];

fn print_banner() {
    println!("{}", "=".repeat(80));
    println!("                     COM Bridge Integration Test Suite");
    println!("{}", "=".repeat(80));
    println!();
}

fn print_test_categories() {
    println!("Test Categories:");
    println!("{}", "-".repeat(80));
    for (i, cat) in TEST_CATEGORIES.iter().enumerate() {
        println!("  {}. {} - {}", i + 1, cat.name, cat.description);
    }
    println!("{}", "-".repeat(80));
    println!();
}

fn run_test_category(category: &TestCategory) -> (bool, Duration, String) {
    println!("\n{}", "=".repeat(80));
    println!("Running: {}", category.name);
    println!("{}", "=".repeat(80));

    let start = Instant::now();

    let output = Command::new("cargo")
        .args(["test", "-p", "integration-tests", "--test", category.test_name, "--", "--nocapture"])
        .output();

    let duration = start.elapsed();

    match output {
        Ok(output) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);

            // Print output
            if !stdout.is_empty() {
                println!("{}", stdout);
            }
            if !stderr.is_empty() {
                eprintln!("{}", stderr);
            }

            let success = output.status.success();
            let summary = if success {
                "PASSED".to_string()
            } else {
                format!("FAILED (exit code: {:?})", output.status.code())
            };

            (success, duration, summary)
        }
        Err(e) => {
            (false, duration, format!("Failed to execute: {}", e))
        }
    }
}

fn main() {
    print_banner();
    print_test_categories();

    let mut results = TestSuiteResults::new();
    for category in TEST_CATEGORIES {
        let (success, duration, summary) = run_test_category(category);
        results.record(category.name, success, duration, summary);
    }

    println!("\n{}", "=".repeat(80));
    println!("FINAL SUMMARY");
    println!("{}", "=".repeat(80));
    println!(
        "\nCategories: {} | Passed: {} | Failed: {}",
        results.results.len(),
        results.passed(),
        results.failed()
    );
    println!("Total Duration: {:?}", results.total_duration());
    println!();

    println!("{:<30} {:<10} {:<15} {}", "Category", "Status", "Duration", "Details");
    println!("{}", "-".repeat(80));
    for (name, success, duration, summary) in &results.results {
        let status = if *success { "PASS" } else { "FAIL" };
        println!("{:<30} {:<10} {:<15?} {}", name, status, duration, summary);
    }
    println!("{}", "=".repeat(80));

    if results.failed() > 0 {
        println!("\nSome tests failed!");
        std::process::exit(1);
    }
    println!("\nAll tests passed!");
}
