//! Terminal presentation layer.
//!
//! Renders the transcript, streams the partial response as it arrives and
//! maps Ctrl-C to cancellation of the in-flight turn. Slash commands manage
//! the persona and show the profile.

use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::engine::{ConversationEngine, EngineError, ReplySource, TurnOutcome};
use crate::persona::PersonaId;
use crate::profile::UserProfile;
use crate::types::{Message, Sender};

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// Free text for the companion.
    Say(String),
    /// `/persona <id>`.
    Persona(PersonaId),
    /// `/personas`.
    Personas,
    /// `/profile`.
    Profile,
    /// `/quit` or `/exit`.
    Quit,
    /// Unrecognised slash command or bad argument, with a hint.
    Invalid(String),
    /// Blank line.
    Empty,
}

/// Parse an input line.
pub fn parse_line(line: &str) -> ReplCommand {
    let line = line.trim();
    if line.is_empty() {
        return ReplCommand::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return ReplCommand::Say(line.to_owned());
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    match name {
        "persona" if arg.is_empty() => {
            ReplCommand::Invalid("usage: /persona <Supportive|Calm|Cheerful|Practical>".to_owned())
        }
        "persona" => match arg.parse() {
            Ok(persona) => ReplCommand::Persona(persona),
            Err(e) => ReplCommand::Invalid(e),
        },
        "personas" => ReplCommand::Personas,
        "profile" => ReplCommand::Profile,
        "quit" | "exit" => ReplCommand::Quit,
        other => ReplCommand::Invalid(format!("unknown command: /{other}")),
    }
}

/// Render a transcript message for the terminal.
pub fn render_message(message: &Message) -> String {
    match message.sender {
        Sender::User => format!("you › {}", message.text),
        Sender::Bot => format!("{} kindred › {}", message.mood.emoji(), message.text),
    }
}

/// Render the selectable personas, marking the current one.
pub fn render_personas(current: PersonaId, options: &[PersonaId]) -> String {
    options
        .iter()
        .map(|p| {
            let marker = if *p == current { "*" } else { " " };
            format!("{marker} {:<10} {} ({})", p.as_str(), p.display_name(), p.description())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the profile summary.
pub fn render_profile(profile: &UserProfile, persona: PersonaId) -> String {
    let topics = if profile.topics.is_empty() {
        "(none yet)".to_owned()
    } else {
        profile.topics.join(", ")
    };
    format!(
        "name:    {}\nmood:    {}\ntopics:  {topics}\npersona: {}",
        profile.name.as_deref().unwrap_or("(unknown)"),
        profile.mood,
        persona.display_name()
    )
}

/// Run the interactive loop until `/quit`, end of input or Ctrl-C at the prompt.
///
/// # Errors
///
/// Returns an error if stdin or stdout fail.
pub async fn run_repl(engine: Arc<ConversationEngine>) -> anyhow::Result<()> {
    println!(
        "kindred ({}). /personas, /persona <id>, /profile, /quit. Ctrl-C cancels a reply.",
        engine.persona().display_name()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you › ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        match parse_line(&line) {
            ReplCommand::Empty => {}
            ReplCommand::Quit => break,
            ReplCommand::Invalid(hint) => println!("{hint}"),
            ReplCommand::Personas => {
                println!("{}", render_personas(engine.persona(), engine.persona_options()));
            }
            ReplCommand::Persona(persona) => {
                engine.set_persona(persona);
                println!("persona: {}", persona.display_name());
            }
            ReplCommand::Profile => {
                println!("{}", render_profile(&engine.profile(), engine.persona()));
            }
            ReplCommand::Say(text) => run_turn(&engine, text).await?,
        }
    }
    Ok(())
}

async fn run_turn(engine: &Arc<ConversationEngine>, text: String) -> anyhow::Result<()> {
    let mut partial = engine.subscribe_partial();
    let worker = Arc::clone(engine);
    let mut turn = tokio::spawn(async move { worker.submit(&text).await });

    let mut shown = String::new();
    let joined = loop {
        tokio::select! {
            joined = &mut turn => break joined,
            changed = partial.changed() => {
                if changed.is_err() {
                    continue;
                }
                let current = partial.borrow_and_update().clone();
                if let Some(delta) = current.strip_prefix(shown.as_str()) {
                    if shown.is_empty() && !delta.is_empty() {
                        print!("… ");
                    }
                    print!("{delta}");
                    std::io::stdout().flush()?;
                }
                if !current.is_empty() {
                    shown = current;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                engine.cancel();
            }
        }
    };
    if !shown.is_empty() {
        println!();
    }

    match joined? {
        Err(EngineError::EmptyMessage) => {}
        Err(e @ EngineError::TurnInFlight) => println!("{e}"),
        Ok(TurnOutcome::Answered {
            reply,
            source: ReplySource::Model,
        }) if reply == shown => {}
        Ok(_) => {
            if let Some(last) = engine.transcript().last() {
                println!("{}", render_message(last));
            }
        }
    }
    Ok(())
}
