//! Slash-command parsing for the terminal front end.

use hacxorz_chat::QuickAction;
use hacxorz_core::types::SessionId;
use thiserror::Error;

/// A session named on the command line: a 1-based position in the last
/// `/sessions` listing, or a full session id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRef {
    Index(usize),
    Id(SessionId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Send(String),
    New,
    Sessions,
    Open(SessionRef),
    Delete(SessionRef),
    /// `/search` with no query clears the filter.
    Search(Option<String>),
    More,
    Nudges(bool),
    Confidence(bool),
    Quick(QuickAction),
    Dismiss,
    Help,
    Quit,
    Empty,
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("unknown command: /{0} (try /help)")]
    Unknown(String),

    #[error("/{0} needs an argument")]
    MissingArgument(&'static str),

    #[error("invalid argument for /{command}: {value}")]
    InvalidArgument { command: &'static str, value: String },
}

pub const HELP: &str = "\
Commands:
  /new                 start a new chat
  /sessions            list your chats
  /open <n|id>         switch to a chat
  /delete <n|id>       delete a chat
  /clear               delete every message in this chat
  /search [query]      filter messages (no query clears)
  /more                show the next page of messages
  /nudges on|off       periodic tips
  /confidence on|off   confidence scores under replies
  /fake                check for fake news
  /explain             explain the confidence score
  /dismiss             hide the current tip
  /help                this text
  /quit                exit
Anything else is sent as a message.";

pub fn parse(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Send(line.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, Some(arg.trim()).filter(|a| !a.is_empty())),
        None => (rest, None),
    };

    match name.to_ascii_lowercase().as_str() {
        "new" => Ok(Command::New),
        "sessions" | "history" => Ok(Command::Sessions),
        "open" => session_ref("open", arg).map(Command::Open),
        "delete" => session_ref("delete", arg).map(Command::Delete),
        "clear" => Ok(Command::Quick(QuickAction::DeleteChat)),
        "search" => Ok(Command::Search(arg.map(str::to_string))),
        "more" => Ok(Command::More),
        "nudges" => switch("nudges", arg).map(Command::Nudges),
        "confidence" => switch("confidence", arg).map(Command::Confidence),
        "fake" => Ok(Command::Quick(QuickAction::CheckFakeNews)),
        "explain" => Ok(Command::Quick(QuickAction::ExplainConfidence)),
        "dismiss" => Ok(Command::Dismiss),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn session_ref(command: &'static str, arg: Option<&str>) -> Result<SessionRef, CommandError> {
    let arg = arg.ok_or(CommandError::MissingArgument(command))?;
    if let Ok(n) = arg.parse::<usize>() {
        if n == 0 {
            return Err(CommandError::InvalidArgument {
                command,
                value: arg.to_string(),
            });
        }
        return Ok(SessionRef::Index(n));
    }
    arg.parse::<SessionId>()
        .map(SessionRef::Id)
        .map_err(|_| CommandError::InvalidArgument {
            command,
            value: arg.to_string(),
        })
}

fn switch(command: &'static str, arg: Option<&str>) -> Result<bool, CommandError> {
    match arg.map(str::to_ascii_lowercase).as_deref() {
        Some("on") | Some("true") | Some("yes") => Ok(true),
        Some("off") | Some("false") | Some("no") => Ok(false),
        Some(other) => Err(CommandError::InvalidArgument {
            command,
            value: other.to_string(),
        }),
        None => Err(CommandError::MissingArgument(command)),
    }
}

/// True for an affirmative answer to a y/N prompt.
pub fn confirmed(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_sent() {
        assert_eq!(
            parse("  is this real?  ").unwrap(),
            Command::Send("is this real?".into())
        );
        assert_eq!(parse("   ").unwrap(), Command::Empty);
    }

    #[test]
    fn test_session_refs() {
        assert_eq!(
            parse("/open 2").unwrap(),
            Command::Open(SessionRef::Index(2))
        );
        let id = SessionId::new();
        assert_eq!(
            parse(&format!("/delete {}", id)).unwrap(),
            Command::Delete(SessionRef::Id(id))
        );
        assert_eq!(
            parse("/open").unwrap_err(),
            CommandError::MissingArgument("open")
        );
        assert!(matches!(
            parse("/open 0"),
            Err(CommandError::InvalidArgument { .. })
        ));
        assert!(matches!(
            parse("/delete nope"),
            Err(CommandError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_search() {
        assert_eq!(
            parse("/search  printing press ").unwrap(),
            Command::Search(Some("printing press".into()))
        );
        assert_eq!(parse("/search").unwrap(), Command::Search(None));
        assert_eq!(parse("/search   ").unwrap(), Command::Search(None));
    }

    #[test]
    fn test_switches() {
        assert_eq!(parse("/nudges off").unwrap(), Command::Nudges(false));
        assert_eq!(parse("/confidence ON").unwrap(), Command::Confidence(true));
        assert_eq!(
            parse("/nudges").unwrap_err(),
            CommandError::MissingArgument("nudges")
        );
        assert!(parse("/nudges maybe").is_err());
    }

    #[test]
    fn test_quick_actions() {
        assert_eq!(
            parse("/fake").unwrap(),
            Command::Quick(QuickAction::CheckFakeNews)
        );
        assert_eq!(
            parse("/explain").unwrap(),
            Command::Quick(QuickAction::ExplainConfidence)
        );
        assert_eq!(
            parse("/clear").unwrap(),
            Command::Quick(QuickAction::DeleteChat)
        );
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            parse("/frobnicate").unwrap_err(),
            CommandError::Unknown("frobnicate".into())
        );
        assert_eq!(parse("/QUIT").unwrap(), Command::Quit);
    }

    #[test]
    fn test_confirmed() {
        assert!(confirmed("y"));
        assert!(confirmed(" YES "));
        assert!(!confirmed(""));
        assert!(!confirmed("n"));
    }
}
