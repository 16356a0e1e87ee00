//! NPC persona

use serde::{Deserialize, Serialize};

/// The two free-text fields that define who the NPC is.
///
/// Set once at start-up and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    system_message: String,
    assistant_role: String,
}

impl Persona {
    /// Stock instruction every NPC shares unless configured otherwise
    pub const DEFAULT_SYSTEM_MESSAGE: &'static str = "You are an Assistant in a game world. \
Answer the ### Question ### section by referring to the ### Context ### section. \
Keep your response in character, very brief, and limited to two short sentences at most. \
Absolutely avoid mentioning that you're an NPC, and respond as if you're truly the person \
fitting the given role. Do not use any emojis or emoticons.";

    pub fn new(system_message: impl Into<String>, assistant_role: impl Into<String>) -> Self {
        Self {
            system_message: system_message.into(),
            assistant_role: assistant_role.into(),
        }
    }

    /// Default system message with the given role text
    pub fn with_role(assistant_role: impl Into<String>) -> Self {
        Self::new(Self::DEFAULT_SYSTEM_MESSAGE, assistant_role)
    }

    pub fn system_message(&self) -> &str {
        &self.system_message
    }

    pub fn assistant_role(&self) -> &str {
        &self.assistant_role
    }
}

impl Default for Persona {
    fn default() -> Self {
        Self::with_role("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_persona_has_stock_instruction() {
        let persona = Persona::default();
        assert!(persona.system_message().starts_with("You are an Assistant in a game world."));
        assert!(persona.system_message().contains("### Context ###"));
        assert!(persona.system_message().ends_with("Do not use any emojis or emoticons."));
        assert_eq!(persona.assistant_role(), "");
    }
}
