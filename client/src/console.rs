//! Console command parsing
//!
//! Each line typed on stdin becomes one [`Command`]. Parsing is separate from
//! execution so the client loop stays a plain match over commands.

use std::str::FromStr;
use thiserror::Error;

pub const HELP: &str = "\
Commands:
  open                  show the team screen (requests a fresh roster)
  close                 hide the team screen
  refresh               request a fresh roster
  teams                 print the cached roster
  set <player> <team>   ask the server to move a player
  click <row>           move the player in that row to the next team
  quit                  disconnect and exit
  help                  show this message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Open,
    Close,
    Refresh,
    Teams,
    Set { player: String, team: String },
    Click(usize),
    Quit,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}', type 'help' for a list")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Err(ParseError::Empty);
        };
        let args: Vec<&str> = words.collect();

        let command = match (name.to_lowercase().as_str(), args.as_slice()) {
            ("open", []) => Command::Open,
            ("close", []) => Command::Close,
            ("refresh", []) => Command::Refresh,
            ("teams", []) => Command::Teams,
            ("quit" | "exit", []) => Command::Quit,
            ("help" | "?", _) => Command::Help,
            ("set", [player, team]) => Command::Set {
                player: player.to_string(),
                team: team.to_string(),
            },
            ("set", _) => return Err(ParseError::Usage("set <player> <team>")),
            ("click", [row]) => match row.parse::<usize>() {
                Ok(row) if row > 0 => Command::Click(row),
                _ => return Err(ParseError::Usage("click <row number>")),
            },
            ("click", _) => return Err(ParseError::Usage("click <row number>")),
            ("open" | "close" | "refresh" | "teams" | "quit" | "exit", _) => {
                return Err(ParseError::Usage("this command takes no arguments"))
            }
            _ => return Err(ParseError::Unknown(name.to_string())),
        };

        Ok(command)
    }
}
