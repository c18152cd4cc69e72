//! Wingman CLI: the main entry point.
//!
//! Commands:
//! - `onboard`: Write the default config
//! - `chat`: Talk to the persona, interactively or with one message
//! - `advise`: Ask how to answer a message
//! - `ask`: Put a free-form question to the coach
//! - `profile`: Review a dating profile
//! - `analyze`: Read a chat with a match and get reply options
//! - `examples`: Good and bad openers for a platform
//! - `photo`: Feedback on a profile photo
//! - `history`: Print a stored conversation
//! - `reset`: Forget a stored conversation

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "wingman",
    about = "Wingman: dating-coach chat with conversation memory",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the config directory and a default config.toml
    Onboard,

    /// Chat with the persona
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Conversation to continue (default: the persona's name)
        #[arg(short = 'w', long = "with")]
        identity: Option<String>,

        /// After each reply, also ask the coach how to answer it
        #[arg(short, long)]
        advise: bool,
    },

    /// Ask the dating coach a question
    Ask {
        /// The question
        question: String,
    },

    /// Suggest how to answer a message
    Advise {
        /// The message you received
        message: String,

        /// Use this stored conversation as context
        #[arg(short = 'w', long = "with")]
        identity: Option<String>,
    },

    /// Review a dating profile
    Profile {
        /// Profile text (use --file to read it from disk)
        text: Option<String>,

        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,
    },

    /// Analyse a chat with a match and propose replies
    Analyze {
        /// The new message
        message: String,

        /// Name of the match
        #[arg(long = "match", default_value = "Match")]
        match_name: String,

        /// Short description of the match
        #[arg(long, default_value = "")]
        description: String,

        /// Where the chat happens (Tinder, Instagram, ...)
        #[arg(long, default_value = "")]
        platform: String,

        /// The message was written by you, not by the match
        #[arg(long)]
        mine: bool,

        /// Use this stored conversation as chat history
        #[arg(short = 'w', long = "with")]
        identity: Option<String>,
    },

    /// Generate opener examples
    Examples {
        /// general, dating-app, social-media or professional
        #[arg(short, long, default_value = "general")]
        platform: String,
    },

    /// Get feedback on a profile photo
    Photo {
        /// Path to a png, jpg, gif or webp image
        path: PathBuf,
    },

    /// Show a stored conversation
    History {
        /// Conversation to show (default: the persona's name)
        #[arg(short = 'w', long = "with")]
        identity: Option<String>,

        /// Print the raw turns as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a stored conversation
    Reset {
        /// Conversation to delete (default: the persona's name)
        #[arg(short = 'w', long = "with")]
        identity: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Chat {
            message,
            identity,
            advise,
        } => commands::chat::run(message, identity, advise).await?,
        Commands::Ask { question } => commands::coach::ask(question).await?,
        Commands::Advise { message, identity } => {
            commands::coach::advise(message, identity).await?
        }
        Commands::Profile { text, file } => commands::coach::profile(text, file).await?,
        Commands::Analyze {
            message,
            match_name,
            description,
            platform,
            mine,
            identity,
        } => {
            let match_profile = wingman_core::MatchProfile {
                name: match_name,
                description,
                platform,
            };
            commands::coach::analyze(message, match_profile, mine, identity).await?
        }
        Commands::Examples { platform } => commands::coach::examples(platform).await?,
        Commands::Photo { path } => commands::coach::photo(path).await?,
        Commands::History { identity, json } => commands::history::show(identity, json).await?,
        Commands::Reset { identity } => commands::history::reset(identity).await?,
    }

    Ok(())
}
