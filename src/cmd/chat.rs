//! `aurora chat <persona_id> <message>`.

use anyhow::Result;

use aurora_genesis::config::Config;
use aurora_genesis::services::AuroraRuntime;

pub async fn cmd_chat(config: &Config, persona_id: &str, message: &str) -> Result<()> {
    let runtime = AuroraRuntime::from_config(config)?;
    let instance = runtime.personas.rehydrate(persona_id).await?;
    let reply = runtime
        .turns
        .process_turn(&instance.instance_id, message)
        .await?;

    println!(
        "{} {}",
        console::style(format!("{}:", instance.blueprint_id)).bold().cyan(),
        reply
    );
    Ok(())
}
