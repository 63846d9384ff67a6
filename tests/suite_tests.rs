//! Aggregation tests: isolation between cases and the summary report

mod common;

use common::{fake_runner, AddCase, Behaviors, EngineBehavior, NoProgramCase};
use pto_forge::{TestConfig, TestSuite};

#[test]
fn test_failure_does_not_stop_later_cases() {
    let (runner, recorders) = fake_runner(
        TestConfig::new(),
        Behaviors {
            engine: EngineBehavior::FailWhenPathContains("broken_add"),
            ..Default::default()
        },
    );

    let mut suite = TestSuite::new("elementwise");
    suite
        .add_test(AddCase::named("broken_add"))
        .add_test(AddCase::named("good_add"));
    let results = suite.run_all(&runner);

    assert_eq!(recorders.engine.calls(), 2);
    assert_eq!(results.len(), 2);
    assert!(!results.get("broken_add").unwrap().passed);
    assert!(results.get("good_add").unwrap().passed);

    let summary = suite.summary(&results);
    assert_eq!(summary.total, 2);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.failed(), 1);

    let text = summary.to_string();
    assert!(text.contains("Test Suite: elementwise"));
    assert!(text.contains("Passed: 1/2"));
    assert!(text.contains("Failed: 1/2"));
    assert!(text.contains("  - broken_add: Execution: Execution failed for broken_add"));
    assert!(text.contains("output mismatch"));
    assert!(!text.contains("good_add:"));
}

#[test]
fn test_results_follow_insertion_order() {
    let (runner, _recorders) = fake_runner(
        TestConfig::new().with_codegen_only(true),
        Behaviors::default(),
    );

    let mut suite = TestSuite::new("ordering");
    suite
        .add_test(AddCase::named("zeta"))
        .add_test(NoProgramCase)
        .add_test(AddCase::named("alpha"));
    assert_eq!(suite.len(), 3);

    let results = suite.run_all(&runner);
    let names: Vec<_> = results.iter().map(|r| r.test_name.as_str()).collect();
    assert_eq!(names, vec!["zeta", "no_program", "alpha"]);
    assert_eq!(results.passed(), 2);
    assert!(!results.all_passed());
}

#[test]
fn test_panicking_engine_is_isolated() {
    let (runner, recorders) = fake_runner(
        TestConfig::new(),
        Behaviors {
            engine: EngineBehavior::Panic("driver fault"),
            ..Default::default()
        },
    );

    let mut suite = TestSuite::new("panics");
    suite
        .add_test(AddCase::named("first"))
        .add_test(AddCase::named("second"));
    let results = suite.run_all(&runner);

    assert_eq!(recorders.engine.calls(), 2);
    assert_eq!(results.failed(), 2);
    let summary = suite.summary(&results);
    assert!(summary.to_string().contains("driver fault"));
}

#[test]
fn test_results_serialize_to_json() {
    let (runner, _recorders) = fake_runner(
        TestConfig::new().with_codegen_only(true).with_seed(5),
        Behaviors::default(),
    );

    let mut suite = TestSuite::new("json");
    suite.add_test(AddCase::named("only"));
    let results = suite.run_all(&runner);

    let json: serde_json::Value = serde_json::to_value(&results).unwrap();
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["test_name"], "only");
    assert_eq!(entries[0]["passed"], true);
    assert_eq!(entries[0]["seed"], 5);
    assert_eq!(entries[0]["orchestration"], "Fallback");
}
