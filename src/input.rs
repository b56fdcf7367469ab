use std::{
    io::{self, BufRead},
    thread,
};

use crossbeam_channel::Sender;

use crate::types::DisplayMode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Switch(DisplayMode),
    Quit,
}

pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match line.to_ascii_lowercase().as_str() {
        "q" | "quit" | "exit" => Some(Command::Quit),
        _ => line.parse().ok().map(Command::Switch),
    }
}

/// Reads mode-switch commands from stdin until EOF.
pub fn spawn_stdin_commands(command_tx: Sender<Command>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    log::warn!("failed to read command: {err:?}");
                    break;
                }
            };
            let Some(command) = parse_command(&line) else {
                if !line.trim().is_empty() {
                    log::warn!(
                        "unknown command {:?}; try one of: {}, quit",
                        line.trim(),
                        mode_names()
                    );
                }
                continue;
            };
            if command_tx.send(command).is_err() || command == Command::Quit {
                break;
            }
        }
    })
}

fn mode_names() -> String {
    DisplayMode::ALL
        .iter()
        .map(DisplayMode::label)
        .collect::<Vec<_>>()
        .join(", ")
}
