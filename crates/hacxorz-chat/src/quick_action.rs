//! Canned one-tap actions offered under the input box.

use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QuickAction {
    CheckFakeNews,
    ExplainConfidence,
    DeleteChat,
}

impl QuickAction {
    pub const ALL: [QuickAction; 3] = [
        QuickAction::CheckFakeNews,
        QuickAction::ExplainConfidence,
        QuickAction::DeleteChat,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            QuickAction::CheckFakeNews => "Check for fake news",
            QuickAction::ExplainConfidence => "Explain confidence",
            QuickAction::DeleteChat => "Delete chat",
        }
    }

    /// Message sent on the user's behalf, if the action sends one.
    pub fn prompt(&self) -> Option<&'static str> {
        match self {
            QuickAction::CheckFakeNews => Some(
                "Please help me verify if this information is accurate and check for misinformation.",
            ),
            QuickAction::ExplainConfidence => {
                Some("Can you explain your confidence level in your previous response?")
            }
            QuickAction::DeleteChat => None,
        }
    }
}

impl fmt::Display for QuickAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for QuickAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fake" | "check for fake news" => Ok(QuickAction::CheckFakeNews),
            "explain" | "explain confidence" => Ok(QuickAction::ExplainConfidence),
            "delete" | "delete chat" => Ok(QuickAction::DeleteChat),
            other => Err(format!("unknown quick action: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts() {
        assert!(QuickAction::CheckFakeNews
            .prompt()
            .unwrap()
            .contains("misinformation"));
        assert_eq!(
            QuickAction::ExplainConfidence.prompt(),
            Some("Can you explain your confidence level in your previous response?")
        );
        assert!(QuickAction::DeleteChat.prompt().is_none());
    }

    #[test]
    fn test_parse() {
        assert_eq!("fake".parse::<QuickAction>().unwrap(), QuickAction::CheckFakeNews);
        assert_eq!(
            "Explain Confidence".parse::<QuickAction>().unwrap(),
            QuickAction::ExplainConfidence
        );
        assert!("dance".parse::<QuickAction>().is_err());
        for action in QuickAction::ALL {
            assert_eq!(action.label().parse::<QuickAction>().unwrap(), action);
        }
    }
}
