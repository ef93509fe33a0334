//! E2E test harness entry point
//!
//! This file is the test binary that runs the scenario catalog against a
//! live ibank application in a real browser.
//! Run with: cargo test --package ibank-e2e --test e2e -- --tag smoke

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ibank_e2e::playwright::{Browser, PlaywrightLauncher};
use ibank_e2e::registration::HttpRegistry;
use ibank_e2e::runner::RunnerConfig;
use ibank_e2e::server::{AppConfig, AppHandle};
use ibank_e2e::{catalog, E2eResult, HarnessConfig, ScenarioRunner};

#[derive(Parser, Debug)]
#[command(name = "ibank-e2e")]
#[command(about = "E2E scenario runner for the ibank web application")]
struct Args {
    /// Harness configuration file
    #[arg(short, long, default_value = "ibank-e2e.yaml")]
    config: PathBuf,

    /// Application URL (overrides the config file)
    #[arg(long, env = "IBANK_BASE_URL")]
    base_url: Option<String>,

    /// Run only scenarios carrying this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only a specific scenario by name
    #[arg(short, long)]
    name: Option<String>,

    /// List scenarios and exit
    #[arg(long)]
    list: bool,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long)]
    browser: Option<Browser>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Output directory for results and screenshots
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report documented application defects as known issues instead of
    /// failing the run
    #[arg(long)]
    allow_known_issues: bool,

    /// Do not run scenarios marked as known issues
    #[arg(long)]
    skip_known_issues: bool,

    /// Seed for generated users and amounts
    #[arg(long)]
    seed: Option<u64>,

    /// Start the application from this jar before running
    #[arg(long)]
    app_jar: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(args)) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> E2eResult<i32> {
    if args.list {
        for scenario in catalog() {
            let marker = if scenario.known_issue.is_some() { " (known issue)" } else { "" };
            println!("{:<40} [{}]{}", scenario.name, scenario.tags.join(", "), marker);
        }
        return Ok(0);
    }

    if !args.config.exists() && args.base_url.is_none() && args.app_jar.is_none() {
        info!(
            "No {} and no --base-url/IBANK_BASE_URL or --app-jar; nothing to run against",
            args.config.display()
        );
        return Ok(0);
    }

    let mut config = HarnessConfig::load(&args.config)?;
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    if let Some(browser) = args.browser {
        config.browser.browser = browser;
    }
    if args.headed {
        config.browser.headless = false;
    }
    if let Some(output) = args.output {
        config.output_dir = output;
    }
    if let Some(jar) = args.app_jar {
        config.app = Some(AppConfig {
            jar,
            ..config.app.unwrap_or_default()
        });
    }
    config.validate()?;

    // Held until the run ends; dropping it stops the application
    let _app = match &config.app {
        Some(app) => Some(AppHandle::spawn(app, &config.base_url).await?),
        None => None,
    };

    let registry = Arc::new(HttpRegistry::new(&config)?);
    let launcher = Arc::new(PlaywrightLauncher::new(config.browser.clone()));
    let runner = ScenarioRunner::new(launcher, registry, config, catalog())?.with_runner_config(RunnerConfig {
        allow_known_issues: args.allow_known_issues,
        skip_known_issues: args.skip_known_issues,
        seed: args.seed,
    });

    let results = if let Some(name) = args.name {
        runner.run_named(&name).await?
    } else if let Some(tag) = args.tag {
        runner.run_tagged(&tag).await?
    } else {
        runner.run_all().await?
    };

    runner.write_results(&results)?;

    Ok(results.exit_code())
}
