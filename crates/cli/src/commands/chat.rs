//! `wingman chat`: Talk to the persona, interactively or with one message.

use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use wingman_agent::{ChatPipeline, Coach, Reply};
use wingman_core::ConversationId;

use super::runtime::{self, CliResult};

/// Words that end an interactive session with a goodbye.
const FAREWELL_WORDS: &[&str] = &["bye", "goodbye", "exit", "quit"];

pub async fn run(message: Option<String>, identity: Option<String>, advise: bool) -> CliResult {
    let config = runtime::load_config()?;
    let gateway = runtime::gateway(&config)?;
    let identity = runtime::identity(&config, identity);
    let coach = advise.then(|| Coach::from_config(&config, gateway.clone()));
    let pipeline = ChatPipeline::from_config(&config, gateway, runtime::history_backend(&config));

    if let Some(msg) = message {
        eprint!("  Thinking...");
        let reply = pipeline.respond(&identity, &msg).await?;
        eprint!("\r              \r");
        report_warnings(&reply);
        println!("{}", reply.text);
        if let Some(coach) = &coach {
            print_advice(coach, &pipeline, &identity, &reply).await;
        }
        return Ok(());
    }

    let persona = pipeline.persona();
    let stats = pipeline.stats(&identity).await;

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║           Wingman — Interactive Chat         ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:      {}", config.default_provider);
    println!("  Model:         {}", config.default_model);
    println!("  Persona:       {}, {}", persona.name, persona.age);
    println!("  Conversation:  {identity} ({} turns stored)", stats.total);
    if coach.is_some() {
        println!("  Coach:         advice after each reply");
    }
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'bye' to say goodbye, or Ctrl+C to quit.");
    println!();

    let name = persona.name.clone();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        let farewell = is_farewell(text);
        eprint!("  ...");
        let result = if farewell {
            pipeline.farewell(&identity, text).await
        } else {
            pipeline.respond(&identity, text).await
        };
        eprint!("\r     \r");

        match result {
            Ok(reply) => {
                report_warnings(&reply);
                println!();
                for line in reply.text.lines() {
                    println!("  {name} > {line}");
                }
                println!();
                if let (Some(coach), false) = (&coach, farewell) {
                    print_advice(coach, &pipeline, &identity, &reply).await;
                }
            }
            Err(e) => {
                eprintln!("  [Error] {e}");
                println!();
            }
        }

        if farewell {
            break;
        }
    }

    print_summary(&pipeline, &identity).await;
    Ok(())
}

fn is_farewell(text: &str) -> bool {
    let word = text
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .to_lowercase();
    FAREWELL_WORDS.contains(&word.as_str())
}

/// Coach advice on answering `reply`, with the conversation it ended as
/// context. `None` for degraded replies, which carry no message to answer.
async fn advice_for(
    coach: &Coach,
    pipeline: &ChatPipeline,
    identity: &ConversationId,
    reply: &Reply,
) -> Option<Result<String, wingman_core::Error>> {
    if reply.is_degraded() {
        return None;
    }
    let turns = pipeline.history(identity).await;
    Some(coach.suggest_reply(&turns, &reply.text).await)
}

/// Advice failures are reported and never end the session.
async fn print_advice(coach: &Coach, pipeline: &ChatPipeline, identity: &ConversationId, reply: &Reply) {
    match advice_for(coach, pipeline, identity, reply).await {
        None => {}
        Some(Ok(advice)) => {
            for line in advice.lines() {
                println!("  Coach > {line}");
            }
            println!();
        }
        Some(Err(e)) => eprintln!("  [Coach unavailable] {e}"),
    }
}

fn report_warnings(reply: &Reply) {
    if let Some(error) = &reply.error {
        tracing::debug!(error = %error, "Reply degraded");
    }
    for warning in &reply.warnings {
        eprintln!("  [Warning] history not saved: {warning}");
    }
}

async fn print_summary(pipeline: &ChatPipeline, identity: &ConversationId) {
    let stats = pipeline.stats(identity).await;
    println!();
    println!(
        "  {} messages in this conversation ({} yours, {} from {}).",
        stats.total,
        stats.user,
        stats.assistant,
        pipeline.persona().name
    );
    println!("  Goodbye! 👋");
    println!();
}
