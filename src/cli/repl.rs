//! Terminal chat
//!
//! Runs the same turn engine as the HTTP API against one in-process session,
//! printing the reply as it streams in.

use super::output::Output;
use crate::chat::{ChatSession, TurnOutcome};
use crate::types::{AppError, Result};
use crate::AppState;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// One line of terminal input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Quit,
    Help,
    /// `/persona KEY`, or `/persona` / `/persona none` to leave persona mode
    Persona(Option<String>),
    Memories,
    /// Re-read the config file (personas, welcome, chat settings)
    Reload,
    /// `/switch NAME`
    Switch(String),
    Message(String),
    Unknown(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(command) = line.strip_prefix('/') else {
            return ReplCommand::Message(line.to_string());
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };

        match name {
            "quit" | "exit" | "q" => ReplCommand::Quit,
            "help" | "?" => ReplCommand::Help,
            "memories" => ReplCommand::Memories,
            "reload" => ReplCommand::Reload,
            "persona" if arg.is_empty() || arg == "none" => ReplCommand::Persona(None),
            "persona" => ReplCommand::Persona(Some(arg.to_string())),
            "switch" if !arg.is_empty() => ReplCommand::Switch(arg.to_string()),
            _ => ReplCommand::Unknown(line.to_string()),
        }
    }
}

fn print_help(output: &Output) {
    output.subheader("Commands");
    output.kv("/persona KEY", "talk to a persona (/persona none to leave)");
    output.kv("/memories", "list what is remembered about you");
    output.kv("/switch NAME", "continue as someone else");
    output.kv("/reload", "re-read the config file");
    output.kv("/quit", "leave");
}

fn apply_persona(state: &AppState, session: &mut ChatSession, key: Option<&str>, output: &Output) {
    match key {
        Some(key) => match state.personas().get(key) {
            Some(persona) => {
                session.set_persona(&persona.key, &persona.system_prompt);
                output.success(&format!("Now talking to {}", persona.name));
                if let Some(welcome) = &persona.welcome {
                    output.assistant_label(&persona.name);
                    println!("{}", welcome);
                }
            }
            None => {
                output.error(&format!("Unknown persona '{}'", key));
                let keys: Vec<_> = state.personas().list().map(|p| p.key.clone()).collect();
                if !keys.is_empty() {
                    output.hint(&format!("Available: {}", keys.join(", ")));
                }
            }
        },
        None => {
            session.clear_persona();
            output.success("Back to memory mode");
        }
    }
}

async fn show_memories(state: &AppState, user: &str, output: &Output) {
    match state.memory.list_facts(user).await {
        Ok(facts) if facts.is_empty() => output.info("Nothing remembered yet"),
        Ok(facts) => {
            output.subheader(&format!("What I know about {}", user));
            for fact in &facts {
                output.list_item(fact);
            }
        }
        Err(e) => output.error(&e.to_string()),
    }
}

/// Run an interactive chat until `/quit` or end of input.
pub async fn run(
    state: &AppState,
    user: &str,
    persona: Option<&str>,
    output: &Output,
) -> Result<()> {
    let mut session = ChatSession::new();
    session.connect(user)?;

    output.banner();
    if let Some(welcome) = &state.config_manager.config().session.welcome {
        output.assistant_label("memchat");
        println!("{}", welcome);
    }
    if persona.is_some() {
        apply_persona(state, &mut session, persona, output);
    }
    output.hint("Type /help for commands");
    output.newline();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let current_user = session.user_id().unwrap_or(user).to_string();
        output.prompt(&current_user);

        let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read input: {}", e)))?
        else {
            output.newline();
            break;
        };

        match ReplCommand::parse(&line) {
            ReplCommand::Quit => break,
            ReplCommand::Help => print_help(output),
            ReplCommand::Persona(key) => {
                apply_persona(state, &mut session, key.as_deref(), output)
            }
            ReplCommand::Memories => show_memories(state, &current_user, output).await,
            ReplCommand::Reload => {
                let manager = &state.config_manager;
                match manager.reload() {
                    Ok(()) => output.success(&format!(
                        "Reloaded {}",
                        manager.config_path().display()
                    )),
                    Err(e) => output.error(&format!("Config not reloaded: {}", e)),
                }
            }
            ReplCommand::Switch(name) => {
                session.disconnect();
                match session.connect(&name) {
                    Ok(id) => output.success(&format!("Now chatting as {}", id)),
                    Err(e) => output.error(&e.to_string()),
                }
            }
            ReplCommand::Unknown(line) => {
                output.warning(&format!("Unknown command: {}", line));
                output.hint("Type /help for commands");
            }
            ReplCommand::Message(message) => {
                chat_turn(state, &mut session, &message, output).await;
            }
        }
    }

    output.info("Bye!");
    Ok(())
}

async fn chat_turn(state: &AppState, session: &mut ChatSession, message: &str, output: &Output) {
    let engine = state.engine();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let label = session
        .persona()
        .and_then(|key| state.personas().get(key).map(|p| p.name.clone()))
        .unwrap_or_else(|| "memchat".to_string());

    let turn = async {
        let tx = tx;
        engine.run_turn(session, message, Some(&tx)).await
    };
    let printer = async {
        let mut started = false;
        while let Some(delta) = rx.recv().await {
            if !started {
                output.assistant_label(&label);
                started = true;
            }
            output.delta(&delta);
        }
        started
    };

    let (result, printed) = tokio::join!(turn, printer);
    if printed {
        output.newline();
    }

    match result {
        Ok(TurnOutcome::Ignored) => {}
        Ok(TurnOutcome::Completed(turn)) => {
            if turn.stored {
                output.note("saved to memory");
            }
            for warning in &turn.warnings {
                output.warning(warning);
            }
        }
        Err(e) => output.error(&e.to_string()),
    }
}
