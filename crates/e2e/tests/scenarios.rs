//! Full scenario catalog against the in-memory bank

use ibank_common::{Fixtures, VerificationCode};
use std::sync::Arc;
use tempfile::TempDir;

use ibank_e2e::config::WaitConfig;
use ibank_e2e::fake::{Defects, FakeBank, FakeBankOptions};
use ibank_e2e::runner::{RunnerConfig, ScenarioStatus};
use ibank_e2e::{catalog, E2eError, HarnessConfig, ScenarioRunner};

fn harness_config(out: &TempDir) -> HarnessConfig {
    HarnessConfig {
        wait: WaitConfig {
            timeout_ms: 300,
            interval_ms: 5,
        },
        output_dir: out.path().to_path_buf(),
        ..Default::default()
    }
}

fn runner_with(bank: &FakeBank, config: HarnessConfig, runner_config: RunnerConfig) -> ScenarioRunner {
    ScenarioRunner::new(Arc::new(bank.clone()), Arc::new(bank.clone()), config, catalog())
        .unwrap()
        .with_runner_config(RunnerConfig {
            seed: Some(42),
            ..runner_config
        })
}

fn runner(bank: &FakeBank, out: &TempDir, runner_config: RunnerConfig) -> ScenarioRunner {
    runner_with(bank, harness_config(out), runner_config)
}

fn allowing_known_issues() -> RunnerConfig {
    RunnerConfig {
        allow_known_issues: true,
        ..Default::default()
    }
}

fn defective_bank() -> FakeBank {
    FakeBank::new(
        &Fixtures::default(),
        FakeBankOptions {
            defects: Defects {
                allow_overdraft: true,
                allow_zero_amount: true,
                allow_same_card: true,
                silent_rejections: false,
            },
            ..Default::default()
        },
    )
}

#[tokio::test]
async fn test_catalog_passes_on_correct_bank() {
    let out = TempDir::new().unwrap();
    let bank = FakeBank::new(&Fixtures::default(), FakeBankOptions::default());
    let suite = runner(&bank, &out, RunnerConfig::default()).run_all().await.unwrap();

    let failures: Vec<_> = suite
        .results
        .iter()
        .filter(|r| r.status != ScenarioStatus::Passed)
        .map(|r| format!("{}: {:?}", r.name, r.error))
        .collect();
    assert!(failures.is_empty(), "{:#?}", failures);
    assert_eq!(suite.total, 15);
    assert_eq!(suite.passed, 15);
    assert_eq!(suite.exit_code(), 0);

    // Every scenario had its own browser, and money was only moved around
    assert_eq!(bank.sessions_opened(), 15);
    assert_eq!(bank.total(), 20_000);
}

#[tokio::test]
async fn test_defects_fail_the_run_by_default() {
    let out = TempDir::new().unwrap();
    let bank = defective_bank();
    let suite = runner(&bank, &out, RunnerConfig::default()).run_all().await.unwrap();

    assert_eq!(suite.failed, 6, "{:#?}", suite.results);
    assert_eq!(suite.known_issues, 0);
    assert_eq!(suite.passed, 9);
    assert!(!suite.success());
    assert_eq!(suite.exit_code(), 1);

    // The documented issue is still attached to the failure
    let zero = suite.result("transfer_zero_first_to_second").unwrap();
    assert_eq!(zero.status, ScenarioStatus::Failed);
    assert!(zero.known_issue.is_some());
    assert!(zero.error.as_deref().unwrap().starts_with("Application defect"));
}

#[tokio::test]
async fn test_defects_are_known_issues_when_allowed() {
    let out = TempDir::new().unwrap();
    let bank = defective_bank();
    let suite = runner(&bank, &out, allowing_known_issues()).run_all().await.unwrap();

    assert_eq!(suite.failed, 0, "{:#?}", suite.results);
    assert_eq!(suite.known_issues, 6);
    assert_eq!(suite.passed, 9);
    assert_eq!(suite.exit_code(), 0);

    let overdraft = suite.result("transfer_over_balance_first_to_second").unwrap();
    assert_eq!(overdraft.status, ScenarioStatus::KnownIssue);
    assert!(overdraft.error.as_deref().unwrap().contains("changed balances"));
    let screenshot = overdraft.screenshot.as_ref().unwrap();
    assert!(screenshot.exists());

    // Accepted transfers still never create or destroy money
    assert_eq!(bank.total(), 20_000);
}

#[tokio::test]
async fn test_harness_errors_are_never_known_issues() {
    let out = TempDir::new().unwrap();
    let bank = FakeBank::new(&Fixtures::default(), FakeBankOptions::default());
    let mut config = harness_config(&out);
    config.fixtures.verification_code = VerificationCode::new("00000");

    let suite = runner_with(&bank, config, allowing_known_issues())
        .run_tagged("negative")
        .await
        .unwrap();

    assert_eq!(suite.total, 6);
    assert_eq!(suite.failed, 6, "{:#?}", suite.results);
    assert_eq!(suite.known_issues, 0);
    assert_eq!(suite.exit_code(), 1);
    for result in &suite.results {
        assert!(result.error.as_deref().unwrap().starts_with("Verification rejected"));
    }
}

#[test]
fn test_runner_rejects_a_single_fixture_card() {
    let out = TempDir::new().unwrap();
    let bank = FakeBank::new(&Fixtures::default(), FakeBankOptions::default());
    let mut config = harness_config(&out);
    config.fixtures.cards.truncate(1);

    let err = ScenarioRunner::new(Arc::new(bank.clone()), Arc::new(bank), config, catalog())
        .err()
        .unwrap();
    assert!(matches!(err, E2eError::Config(_)));
}

#[tokio::test]
async fn test_known_issues_can_be_skipped() {
    let out = TempDir::new().unwrap();
    let bank = defective_bank();
    let suite = runner(
        &bank,
        &out,
        RunnerConfig {
            skip_known_issues: true,
            ..Default::default()
        },
    )
    .run_all()
    .await
    .unwrap();

    assert_eq!(suite.skipped, 6);
    assert_eq!(suite.passed, 9);
    assert_eq!(bank.sessions_opened(), 9);
}

#[tokio::test]
async fn test_silent_rejections_are_known_issues() {
    let out = TempDir::new().unwrap();
    let bank = FakeBank::new(
        &Fixtures::default(),
        FakeBankOptions {
            defects: Defects {
                silent_rejections: true,
                ..Default::default()
            },
            ..Default::default()
        },
    );
    let suite = runner(&bank, &out, allowing_known_issues())
        .run_named("transfer_zero_first_to_second")
        .await
        .unwrap();

    let result = &suite.results[0];
    assert_eq!(result.status, ScenarioStatus::KnownIssue);
    assert!(result.error.as_deref().unwrap().contains("no error notification"));
    assert_eq!(bank.total(), 20_000);
}

#[tokio::test]
async fn test_login_tag_and_results_file() {
    let out = TempDir::new().unwrap();
    let bank = FakeBank::new(&Fixtures::default(), FakeBankOptions::default());
    let runner = runner(&bank, &out, RunnerConfig::default());
    let suite = runner.run_tagged("login").await.unwrap();
    assert_eq!(suite.total, 5);
    assert_eq!(suite.passed, 5);

    let path = runner.write_results(&suite).unwrap();
    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(json["passed"], 5);
    assert_eq!(json["known_issues"], 0);
    assert_eq!(json["results"][0]["status"], "passed");
}

#[tokio::test]
async fn test_unknown_scenario_name() {
    let out = TempDir::new().unwrap();
    let bank = FakeBank::new(&Fixtures::default(), FakeBankOptions::default());
    let err = runner(&bank, &out, RunnerConfig::default())
        .run_named("transfer_to_the_moon")
        .await
        .unwrap_err();
    assert!(matches!(err, E2eError::Config(_)));
}
