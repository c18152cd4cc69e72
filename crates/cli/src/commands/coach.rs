//! Coaching commands: `ask`, `advise`, `profile`, `analyze`, `examples`, `photo`.
//!
//! Each is a single stateless call; none of them records history.

use std::path::PathBuf;
use wingman_agent::Coach;
use wingman_core::{Attachment, ChatPlatform, MatchProfile, Role};

use super::runtime::{self, CliResult};

pub async fn advise(message: String, identity: Option<String>) -> CliResult {
    let config = runtime::load_config()?;
    let coach = Coach::from_config(&config, runtime::gateway(&config)?);
    let turns = runtime::stored_turns(&config, identity).await;

    let advice = coach.suggest_reply(&turns, &message).await?;
    println!("{advice}");
    Ok(())
}

pub async fn ask(question: String) -> CliResult {
    let config = runtime::load_config()?;
    let coach = Coach::from_config(&config, runtime::gateway(&config)?);

    let answer = coach.ask_question(&question).await?;
    println!("{answer}");
    Ok(())
}

pub async fn profile(text: Option<String>, file: Option<PathBuf>) -> CliResult {
    let profile_text = match (text, file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?,
        (None, None) => return Err("Pass the profile text or --file <path>".into()),
    };

    let config = runtime::load_config()?;
    let coach = Coach::from_config(&config, runtime::gateway(&config)?);

    let review = coach.analyze_profile(&config.user, &profile_text).await?;
    println!("{review}");
    Ok(())
}

pub async fn analyze(
    message: String,
    match_profile: MatchProfile,
    mine: bool,
    identity: Option<String>,
) -> CliResult {
    let config = runtime::load_config()?;
    let coach = Coach::from_config(&config, runtime::gateway(&config)?);
    let turns = runtime::stored_turns(&config, identity).await;
    let sender = if mine { Role::User } else { Role::Assistant };

    let analysis = coach
        .analyze_conversation(&config.user, &match_profile, &turns, &message, sender)
        .await?;
    println!("{analysis}");
    Ok(())
}

pub async fn examples(platform: String) -> CliResult {
    let platform: ChatPlatform = platform.parse()?;
    let config = runtime::load_config()?;
    let coach = Coach::from_config(&config, runtime::gateway(&config)?);

    let examples = coach.generate_examples(&config.user, platform).await?;
    println!("{examples}");
    Ok(())
}

pub async fn photo(path: PathBuf) -> CliResult {
    let attachment = Attachment::image(&path)?;
    if !path.is_file() {
        return Err(format!("No such file: {}", path.display()).into());
    }

    let config = runtime::load_config()?;
    let coach = Coach::from_config(&config, runtime::gateway(&config)?);

    eprint!("  Looking at the photo...");
    let feedback = coach.photo_feedback(&attachment).await;
    eprint!("\r                        \r");
    println!("{}", feedback?);
    Ok(())
}
