//! Prompt assembly: persona framing plus the conversation so far.
//!
//! The system instruction depends only on the [`Persona`] and is computed
//! once. The user prompt is the rendered history first and the new message
//! last, followed by the reply instruction.

use wingman_core::error::ValidationError;
use wingman_core::gateway::CompletionRequest;
use wingman_core::persona::Persona;

/// The two-part payload handed to a gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    pub system_instruction: String,
    pub user_prompt: String,
}

impl From<AssembledPrompt> for CompletionRequest {
    fn from(prompt: AssembledPrompt) -> Self {
        CompletionRequest::new(prompt.system_instruction, prompt.user_prompt)
    }
}

/// Builds prompts for one persona.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    persona: Persona,
    system_instruction: String,
}

impl PromptAssembler {
    pub fn new(persona: Persona) -> Self {
        let system_instruction = system_instruction(&persona);
        Self {
            persona,
            system_instruction,
        }
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// Reject a message that `build` would refuse, before anything is recorded.
    pub fn validate(&self, new_message: &str) -> Result<(), ValidationError> {
        non_blank(new_message).map(|_| ())
    }

    /// Assemble the prompt for a reply to `new_message`.
    pub fn build(
        &self,
        rendered_context: &str,
        new_message: &str,
    ) -> Result<AssembledPrompt, ValidationError> {
        let message = non_blank(new_message)?;
        let user_prompt = format!(
            "{rendered_context}\n\nNEW MESSAGE: {message}\n\nReply as {}, taking the whole conversation above into account.",
            self.persona.name
        );
        Ok(AssembledPrompt {
            system_instruction: self.system_instruction.clone(),
            user_prompt,
        })
    }

    /// Assemble the goodbye prompt sent when the user ends a session.
    pub fn farewell(&self, message: &str) -> Result<AssembledPrompt, ValidationError> {
        let message = non_blank(message)?;
        let user_prompt = format!(
            "He is saying goodbye to you with: '{message}'. Say goodbye warmly and sweetly, as {}.",
            self.persona.name
        );
        Ok(AssembledPrompt {
            system_instruction: self.system_instruction.clone(),
            user_prompt,
        })
    }
}

fn non_blank(message: &str) -> Result<&str, ValidationError> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        Err(ValidationError::EmptyMessage)
    } else {
        Ok(trimmed)
    }
}

/// The persona's system instruction.
pub fn system_instruction(persona: &Persona) -> String {
    let interests = if persona.interests.is_empty() {
        "nothing in particular yet".to_string()
    } else {
        persona.interests.join(", ")
    };

    format!(
        "You are {name}, a {age}-year-old girl chatting in a dating app.

YOUR PERSONALITY:
{personality}

YOUR INTERESTS: {interests}

RULES:
1. Reply naturally, like a real girl would.
2. Show interest in the other person and ask about him.
3. Use emoji sparingly and where they fit.
4. Don't be pushy, but don't be distant either.
5. If he writes something rude or inappropriate, make it clear politely but firmly that this is not acceptable.
6. Keep the conversation going and develop its topics.
7. You may flirt a little, within the bounds of decency.
8. Remember earlier messages in the conversation and refer to them.
9. Keep messages medium length (usually 1-3 sentences).
10. Reply only in {language}.

IMPORTANT: You are a real girl with feelings and emotions. Behave naturally!",
        name = persona.name,
        age = persona.age,
        personality = persona.personality.description(),
        language = persona.language,
    )
}
