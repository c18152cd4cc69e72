//! Persona and profile types: the static descriptive data prompts are built from.

use serde::{Deserialize, Serialize};

/// Personality tag of a persona. Selects the temperament paragraph of the
/// system instruction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Personality {
    /// Open, kind, easy to talk to
    #[default]
    Friendly,
    /// Jokes, flirts, uses emoji
    Playful,
    /// Thoughtful, prefers deep conversation
    Serious,
    /// Dreamy, talks about feelings
    Romantic,
}

impl Personality {
    /// One-paragraph temperament description used in the system instruction.
    pub fn description(&self) -> &'static str {
        match self {
            Personality::Friendly => {
                "You are open and kind and easy to talk to. You enjoy keeping a conversation going and are genuinely curious about the other person."
            }
            Personality::Playful => {
                "You are cheerful and love jokes and light flirting. You often use emoji and playful phrases."
            }
            Personality::Serious => {
                "You are intellectual and thoughtful. You prefer deep conversations to small talk."
            }
            Personality::Romantic => {
                "You are dreamy and sensitive. You like talking about feelings and romance."
            }
        }
    }
}

/// The persona the assistant speaks as. Immutable for the lifetime of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    /// Display name, also used as the assistant's label in rendered history
    pub name: String,

    pub age: u8,

    pub interests: Vec<String>,

    #[serde(default)]
    pub personality: Personality,

    /// Language every reply must be written in
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "English".into()
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            name: "Anna".into(),
            age: 21,
            interests: vec![
                "photography".into(),
                "travel".into(),
                "reading".into(),
                "yoga".into(),
                "cooking".into(),
            ],
            personality: Personality::Friendly,
            language: default_language(),
        }
    }
}

impl std::fmt::Display for Persona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Persona(name='{}', age={}, personality={:?})",
            self.name, self.age, self.personality
        )
    }
}

/// The coached user's own profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u8>,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub dating_goals: String,
    #[serde(default)]
    pub personality_type: String,
}

/// The person on the other side of an analysed chat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Where the chat happens (Tinder, Instagram, ...)
    #[serde(default)]
    pub platform: String,
}

/// Where an opener will be sent; shapes the tone of generated examples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatPlatform {
    #[default]
    General,
    DatingApp,
    SocialMedia,
    Professional,
}

impl ChatPlatform {
    pub fn description(&self) -> &'static str {
        match self {
            ChatPlatform::General => "meeting people in general",
            ChatPlatform::DatingApp => "dating apps (Tinder, Bumble)",
            ChatPlatform::SocialMedia => "social networks (Instagram, VK)",
            ChatPlatform::Professional => "professional networking",
        }
    }
}

impl std::str::FromStr for ChatPlatform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "general" => Ok(ChatPlatform::General),
            "dating_app" | "app" => Ok(ChatPlatform::DatingApp),
            "social_media" | "social" => Ok(ChatPlatform::SocialMedia),
            "professional" => Ok(ChatPlatform::Professional),
            other => Err(format!("unknown platform '{other}'")),
        }
    }
}
