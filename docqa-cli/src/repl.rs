//! Interactive chat loop.

use std::path::PathBuf;

use anyhow::Result;
use docqa_rag::SessionState;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::app::{App, collect_sources, print_outcome, print_stats};

const HELP: &str = "\
Type a question to ask it. Commands:
  /add <paths>  add files or directories
  /load         reopen the saved index
  /clear        forget the conversation
  /reset        delete the saved index
  /stats        show what is indexed
  /quit         leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Ask(String),
    Add(Vec<PathBuf>),
    Load,
    Clear,
    Reset,
    Stats,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl ChatCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Self::Ask(line.to_string());
        };

        let mut words = rest.split_whitespace();
        match words.next().unwrap_or_default() {
            "add" => Self::Add(words.map(PathBuf::from).collect()),
            "load" => Self::Load,
            "clear" => Self::Clear,
            "reset" => Self::Reset,
            "stats" => Self::Stats,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => Self::Unknown(other.to_string()),
        }
    }
}

pub async fn run(app: &App, mut session: SessionState) -> Result<()> {
    let assistant = app.assistant();
    if app.open_saved(&mut session).await? {
        let stats = assistant.stats(&session).await?;
        println!("Loaded saved content ({} items).", stats.chunk_count);
    } else {
        println!("No saved content yet. Use /add <paths> to add documents.");
    }
    println!("Type /help for commands.\n");

    let mut editor = DefaultEditor::new()?;
    loop {
        let line = match editor.readline("docqa> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        if !line.trim().is_empty() {
            let _ = editor.add_history_entry(line.as_str());
        }

        match ChatCommand::parse(&line) {
            ChatCommand::Ask(question) => {
                app.answer(&mut session, &question).await;
                println!();
            }
            ChatCommand::Add(paths) if paths.is_empty() => println!("Usage: /add <paths>"),
            ChatCommand::Add(paths) => match collect_sources(&paths) {
                Ok(files) => print_outcome(&assistant.add_documents(&mut session, &files).await),
                Err(e) => println!("{e:#}"),
            },
            ChatCommand::Load => print_outcome(&assistant.load_existing(&mut session).await),
            ChatCommand::Clear => {
                assistant.clear_conversation(&mut session);
                println!("Conversation cleared.");
            }
            ChatCommand::Reset => print_outcome(&assistant.reset(&mut session).await),
            ChatCommand::Stats => match assistant.stats(&session).await {
                Ok(stats) => print_stats(&stats),
                Err(e) => println!("{e}"),
            },
            ChatCommand::Help => println!("{HELP}"),
            ChatCommand::Quit => break,
            ChatCommand::Empty => {}
            ChatCommand::Unknown(name) => println!("Unknown command '/{name}'. Type /help."),
        }
    }
    Ok(())
}
