use std::sync::Arc;

use {
    anyhow::Result,
    parley_channels::CaptureOutbound,
    parley_common::channels,
    parley_config::{ParleyConfig, StorageStrategy},
    parley_dialogs::{
        scenario::{self, ScenarioReport},
        user_profile_runner,
    },
    parley_sessions::MemoryStorage,
    tracing::info,
};

/// Play every scripted scenario against each strategy and print a report.
pub async fn run_demo(config: &ParleyConfig, strategies: &[StorageStrategy]) -> Result<()> {
    for &strategy in strategies {
        let mut config = config.clone();
        config.dialog.strategy = strategy;

        println!("== {strategy} ==");
        for script in scenario::all() {
            // Fresh runner and storage per script, as if the bot had just started.
            let runner = user_profile_runner(&config, Arc::new(MemoryStorage::new()));
            let outbound = CaptureOutbound::new(channels::TEST);
            let report = scenario::run_scenario(&runner, &outbound, channels::TEST, &script).await;
            info!(strategy = %strategy, scenario = report.name, passed = report.passed(), "scenario finished");
            print_report(&report);
        }
        println!();
    }
    Ok(())
}

fn print_report(report: &ScenarioReport) {
    if report.passed() {
        println!("  PASS  {}", report.name);
        return;
    }

    println!("  FAIL  {}", report.name);
    for turn in report.failures() {
        println!("        {} said {:?}", turn.user, turn.input);
        if let Some(error) = &turn.error {
            println!("          error:    {error}");
            continue;
        }
        println!("          expected: {:?}", turn.expected);
        println!("          got:      {:?}", turn.actual);
        if turn.misaddressed {
            println!("          a reply was addressed to someone else");
        }
    }
}
