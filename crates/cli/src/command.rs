use zano_gateway::ConversationId;

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Open(ConversationId),
    New,
    Rename { id: ConversationId, name: String },
    Delete(ConversationId),
    /// Share the given conversation, or the active one.
    Share(Option<ConversationId>),
    Shared(ConversationId),
    Show,
    Drawer,
    Help,
    Quit,
    Send(String),
    /// A slash command that could not be parsed; carries the usage hint.
    Invalid(&'static str),
}

pub const HELP: &str = "\
/list                  list conversations
/open <id>             show a conversation
/new                   start a new chat
/rename <id> <name>    rename a conversation
/delete <id>           delete a conversation
/share [id]            print the share link
/shared <id>           print a shared chat
/show                  reprint the current messages
/drawer                toggle the conversation drawer
/quit                  exit
anything else is sent as a message";

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return None;
        }
        let Some(rest) = line.trim_start().strip_prefix('/') else {
            return Some(Self::Send(line.to_string()));
        };

        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        };

        let command = match name {
            "list" | "ls" => Self::List,
            "new" => Self::New,
            "show" => Self::Show,
            "drawer" => Self::Drawer,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            "open" => single_id(args)
                .map(Self::Open)
                .unwrap_or(Self::Invalid("/open <id>")),
            "delete" | "rm" => single_id(args)
                .map(Self::Delete)
                .unwrap_or(Self::Invalid("/delete <id>")),
            "shared" => single_id(args)
                .map(Self::Shared)
                .unwrap_or(Self::Invalid("/shared <id>")),
            "share" => Self::Share(single_id(args)),
            "rename" => match args.split_once(char::is_whitespace) {
                Some((id, name)) if !name.trim().is_empty() => Self::Rename {
                    id: ConversationId::new(id),
                    name: name.trim().to_string(),
                },
                _ => Self::Invalid("/rename <id> <name>"),
            },
            _ => Self::Invalid("unknown command, try /help"),
        };
        Some(command)
    }
}

fn single_id(args: &str) -> Option<ConversationId> {
    let mut words = args.split_whitespace();
    let id = words.next()?;
    words.next().is_none().then(|| ConversationId::new(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_message() {
        assert_eq!(
            Command::parse("hello there\n"),
            Some(Command::Send("hello there".to_string()))
        );
        assert_eq!(Command::parse("   \n"), None);
    }

    #[test]
    fn commands_take_ids_and_names() {
        assert_eq!(
            Command::parse("/open c1"),
            Some(Command::Open(ConversationId::new("c1")))
        );
        assert_eq!(
            Command::parse("/rename c1  Road trip  "),
            Some(Command::Rename {
                id: ConversationId::new("c1"),
                name: "Road trip".to_string(),
            })
        );
        assert_eq!(Command::parse("/share"), Some(Command::Share(None)));
    }

    #[test]
    fn malformed_commands_carry_usage() {
        assert_eq!(
            Command::parse("/open"),
            Some(Command::Invalid("/open <id>"))
        );
        assert_eq!(
            Command::parse("/rename c1"),
            Some(Command::Invalid("/rename <id> <name>"))
        );
        assert!(matches!(
            Command::parse("/bogus"),
            Some(Command::Invalid(_))
        ));
    }
}
