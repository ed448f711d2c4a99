//! Single-keystroke operator console.
//!
//! Lines typed on stdin are read on a dedicated thread and turned into
//! commands, so the control loop only ever does a non-blocking `try_recv`.

use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver};
use std::thread;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Record,
    Play,
    ToggleLoop,
    Stop,
    Save,
    Devices,
    Quit,
}

impl Command {
    /// Map a key to a command. Case-insensitive; Esc quits.
    pub fn from_key(key: char) -> Option<Self> {
        match key.to_ascii_lowercase() {
            'r' => Some(Self::Record),
            'p' => Some(Self::Play),
            'l' => Some(Self::ToggleLoop),
            's' => Some(Self::Stop),
            'w' => Some(Self::Save),
            'd' => Some(Self::Devices),
            'q' | '\u{1b}' => Some(Self::Quit),
            _ => None,
        }
    }

    /// Every recognised key in a line, in order.
    pub fn parse_line(line: &str) -> Vec<Self> {
        line.chars().filter_map(Self::from_key).collect()
    }
}

pub const HELP: &str = "\
Press 'r' to record a segment of audio into the ring buffer.
Press 'p' to play the segment (while recording, playback trails the capture).
Press 'l' to turn looping on/off.
Press 's' to stop recording and playback.
Press 'w' to save the segment to a wav file.
Press 'd' to list devices.
Press 'q' or Esc to quit.
(Keys are read a line at a time: type them and press Enter.)";

/// Spawn the stdin reader. End of input is delivered as `Quit`.
pub fn spawn_stdin_reader() -> io::Result<Receiver<Command>> {
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name("console-input".into())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        log::error!("failed to read console input: {}", e);
                        break;
                    }
                };
                for command in Command::parse_line(&line) {
                    if tx.send(command).is_err() {
                        return;
                    }
                }
            }
            let _ = tx.send(Command::Quit);
        })?;

    Ok(rx)
}
