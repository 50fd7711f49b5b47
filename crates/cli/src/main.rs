mod command;

use std::sync::Arc;

use snafu::{ResultExt, Snafu};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use zano_chat::{ChatShell, ControllerEvent, MutationOutcome, Selection, SendOutcome};
use zano_gateway::{ClientSettings, MessageRecord, Sender, SettingsError};

use crate::command::{Command, HELP};

#[derive(Debug, Snafu)]
enum CliError {
    #[snafu(display("[{stage}] could not build the backend client"))]
    Gateway {
        stage: &'static str,
        source: SettingsError,
    },
    #[snafu(display("[{stage}] could not read input"))]
    Input {
        stage: &'static str,
        source: std::io::Error,
    },
}

#[snafu::report]
#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = ClientSettings::load();
    tracing::info!(base_url = %settings.base_url, "connecting to agent backend");
    let gateway = settings.build_gateway().context(GatewaySnafu {
        stage: "build-gateway",
    })?;

    let mut shell = ChatShell::new(Arc::new(gateway));
    report(&shell.mount().await);
    print_conversations(&shell).await;
    println!("type a message to start a new chat, /help for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context(InputSnafu {
        stage: "read-stdin",
    })? {
        let Some(command) = Command::parse(&line) else {
            continue;
        };
        if command == Command::Quit {
            break;
        }
        run(&mut shell, command).await;
    }

    Ok(())
}

async fn run(shell: &mut ChatShell, command: Command) {
    match command {
        Command::List => {
            shell.directory().list().await;
            print_conversations(shell).await;
        }
        Command::Open(id) => {
            report(&shell.select(id).await);
            print_messages(shell).await;
        }
        Command::New => {
            report(&shell.new_chat().await);
            println!("new chat: the next message starts a conversation");
        }
        Command::Rename { id, name } => {
            let outcome = shell.rename(&id, &name).await;
            print_mutation("rename", outcome);
            print_conversations(shell).await;
        }
        Command::Delete(id) => {
            let outcome = shell.delete(&id).await;
            print_mutation("delete", outcome);
            print_conversations(shell).await;
        }
        Command::Share(id) => {
            let Some(id) = id.or_else(|| shell.selection().active_id().cloned()) else {
                println!("nothing to share yet");
                return;
            };
            match shell.share(&id) {
                Some(link) => println!("{}", link.url),
                None => println!("conversation {id} has no link yet"),
            }
        }
        Command::Shared(id) => match shell.directory().open_shared(&id).await {
            Some(shared) => {
                println!("== {} (shared, read-only)", shared.conversation.name);
                for message in &shared.messages {
                    print_message(message);
                }
            }
            None => println!("could not open shared chat {id}"),
        },
        Command::Show => print_messages(shell).await,
        Command::Drawer => {
            if shell.toggle_drawer() {
                print_conversations(shell).await;
            } else {
                println!("drawer closed");
            }
        }
        Command::Help => println!("{HELP}"),
        Command::Invalid(usage) => println!("usage: {usage}"),
        Command::Send(text) => {
            let (outcome, events) = shell.submit(&text).await;
            report(&events);
            match outcome {
                SendOutcome::Delivered => print_messages(shell).await,
                SendOutcome::RolledBack => {
                    println!("not sent; kept as draft: {}", shell.controller().draft().await);
                }
                SendOutcome::Skipped => println!("not sent"),
            }
        }
        Command::Quit => {}
    }
}

fn report(events: &[ControllerEvent]) {
    for event in events {
        match event {
            ControllerEvent::ConversationCreated(id) => println!("started conversation {id}"),
            ControllerEvent::SendFailed { error, .. } => println!("send failed: {error}"),
            ControllerEvent::LoadFailed {
                conversation_id,
                error,
            } => println!("could not load {conversation_id}: {error}"),
            ControllerEvent::SelectionChanged(_) => {}
        }
    }
}

async fn print_conversations(shell: &ChatShell) {
    let conversations = shell.directory().conversations().await;
    if conversations.is_empty() {
        println!("no conversations");
        return;
    }
    let active = shell.selection().active_id();
    for conversation in conversations {
        let marker = if active == Some(&conversation.id) { '*' } else { ' ' };
        println!(
            "{marker} {}  {}  ({})",
            conversation.id, conversation.name, conversation.updated_at
        );
    }
}

async fn print_messages(shell: &ChatShell) {
    let snapshot = shell.controller().snapshot().await;
    match &snapshot.selection {
        Selection::Welcome => println!("welcome: no conversation selected"),
        Selection::Starting(_) => println!("starting a conversation..."),
        Selection::Active(id) => println!("== {id}"),
    }
    for message in &snapshot.messages {
        print_message(message);
    }
}

fn print_message(message: &MessageRecord) {
    let who = match message.sender {
        Sender::User => "you",
        Sender::Agent => "agent",
    };
    println!("[{who}] {}", message.content);
}

fn print_mutation(action: &str, outcome: MutationOutcome) {
    match outcome {
        MutationOutcome::Applied => println!("{action} done"),
        MutationOutcome::Failed => println!("{action} failed; list shows the backend's state"),
        MutationOutcome::Skipped => println!("{action} cancelled"),
    }
}
