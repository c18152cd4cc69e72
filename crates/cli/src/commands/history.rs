//! `wingman history` and `wingman reset`: inspect or forget a conversation.

use super::runtime::{self, CliResult};

pub async fn show(identity: Option<String>, json: bool) -> CliResult {
    let config = runtime::load_config()?;
    let identity = runtime::identity(&config, identity);
    let pipeline = runtime::offline_pipeline(&config);

    let turns = pipeline.history(&identity).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&turns)?);
        return Ok(());
    }

    if turns.is_empty() {
        println!("  No stored messages for '{identity}'.");
        return Ok(());
    }

    let labels = pipeline.window().labels();
    println!();
    for turn in &turns {
        println!(
            "  [{}] {}: {}",
            turn.timestamp.format("%Y-%m-%d %H:%M"),
            labels.label(turn.role),
            turn.text
        );
    }
    let stats = pipeline.stats(&identity).await;
    println!();
    println!(
        "  {} messages ({} user, {} assistant)",
        stats.total, stats.user, stats.assistant
    );
    Ok(())
}

pub async fn reset(identity: Option<String>) -> CliResult {
    let config = runtime::load_config()?;
    let identity = runtime::identity(&config, identity);
    let pipeline = runtime::offline_pipeline(&config);

    pipeline.reset(&identity).await?;
    println!("  Conversation '{identity}' cleared.");
    Ok(())
}
