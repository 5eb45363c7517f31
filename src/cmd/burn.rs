//! One-shot controlled burn: `aurora burn <persona_id>`.

use anyhow::{Context, Result};
use aurora_common::{BurnReport, BurnStatus};

use aurora_genesis::burn::BurnConfig;
use aurora_genesis::config::Config;
use aurora_genesis::services::{AuroraRuntime, self_analysis_concept};

pub struct BurnArgs {
    pub concept: Option<String>,
    pub checkpoints: Vec<String>,
    pub json: bool,
}

pub async fn cmd_burn(config: &Config, persona_id: &str, args: BurnArgs) -> Result<()> {
    let runtime = AuroraRuntime::from_config(config)?;
    let instance = runtime.personas.rehydrate(persona_id).await?;

    let concept = args
        .concept
        .unwrap_or_else(|| self_analysis_concept(&instance.blueprint_id));
    let mut burn_cfg = BurnConfig::from_section(concept, &config.toml.burn);
    if !args.checkpoints.is_empty() {
        burn_cfg = burn_cfg.with_checkpoints(args.checkpoints);
    }

    let report = runtime
        .burns
        .run_report(&instance.instance_id, Some(burn_cfg))
        .await?;

    if args.json {
        let out = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", out);
    } else {
        print_report(&instance.instance_id, &report);
    }

    if report.outcome.status == BurnStatus::Fail {
        anyhow::bail!("Controlled burn failed: {}", report.outcome.reasons.join("; "));
    }
    Ok(())
}

fn print_report(instance_id: &str, report: &BurnReport) {
    let status = match report.outcome.status {
        BurnStatus::Pass => console::style(report.outcome.status.as_str()).green().bold(),
        BurnStatus::PartialPass => console::style(report.outcome.status.as_str()).yellow().bold(),
        BurnStatus::Fail => console::style(report.outcome.status.as_str()).red().bold(),
    };

    println!();
    println!("{}", console::style("Controlled Burn").bold().cyan());
    println!();
    println!("  Instance:  {}", instance_id);
    println!("  Concept:   {}", report.concept);
    println!("  Status:    {}", status);
    println!(
        "  Backend:   {}",
        report.backend_used.as_deref().unwrap_or("unknown")
    );
    if let Some(event) = report.monitor_log.first() {
        println!("  Handshake: {}", event.signal.as_str());
    }
    if !report.outcome.satisfied_checkpoints.is_empty() {
        println!(
            "  Satisfied: {}",
            report.outcome.satisfied_checkpoints.join(", ")
        );
    }
    for reason in &report.outcome.reasons {
        println!("  {} {}", console::style("⚠").yellow(), reason);
    }
    if let Some(path) = &report.mrj_path {
        println!("  Record:    {}", path.display());
    }
    if let Some(path) = &report.md_path {
        println!("  Summary:   {}", path.display());
    }
    println!();
}
