//! Team screen view model and its renderer
//!
//! The screen is a plain list of rows, each pairing a label with an action.
//! It knows nothing about the network: team display names come from a mapper
//! callback and row clicks go to a handler callback, both supplied by the
//! owner. Only the UI loop holds the screen.

use shared::Roster;
use std::fmt;
use std::io::{self, Write};

pub type DisplayNameMapper = Box<dyn Fn(&str) -> String + Send>;
pub type RowClickHandler = Box<dyn Fn(&str, &str) + Send>;

/// One line on the screen: `<player> - <team display name>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamRow {
    pub label: String,
    pub player_name: String,
    pub team_id: String,
}

pub struct TeamScreen {
    title: String,
    rows: Vec<TeamRow>,
    open: bool,
    display_name: DisplayNameMapper,
    on_click: Option<RowClickHandler>,
}

impl TeamScreen {
    pub fn new<F>(title: &str, display_name: F) -> Self
    where
        F: Fn(&str) -> String + Send + 'static,
    {
        Self {
            title: title.to_string(),
            rows: Vec::new(),
            open: false,
            display_name: Box::new(display_name),
            on_click: None,
        }
    }

    pub fn with_click_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, &str) + Send + 'static,
    {
        self.on_click = Some(Box::new(handler));
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn rows(&self) -> &[TeamRow] {
        &self.rows
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open(&mut self, roster: &Roster) {
        self.update_team_data(roster);
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Rebuilds every row from the roster
    pub fn update_team_data(&mut self, roster: &Roster) {
        self.rows = roster
            .iter()
            .map(|(player_name, team_id)| TeamRow {
                label: format!("{} - {}", player_name, (self.display_name)(team_id)),
                player_name: player_name.clone(),
                team_id: team_id.clone(),
            })
            .collect();
    }

    /// Runs the row action. Returns false if there is no such row.
    pub fn click(&self, index: usize) -> bool {
        let Some(row) = self.rows.get(index) else {
            return false;
        };
        if let Some(handler) = &self.on_click {
            handler(&row.player_name, &row.team_id);
        }
        true
    }
}

impl fmt::Debug for TeamScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TeamScreen")
            .field("title", &self.title)
            .field("rows", &self.rows)
            .field("open", &self.open)
            .finish()
    }
}

pub trait Renderer {
    fn render(&mut self, screen: &TeamScreen) -> io::Result<()>;
}

/// Draws the screen as plain text
pub struct TextRenderer<W: Write> {
    out: W,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for TextRenderer<W> {
    fn render(&mut self, screen: &TeamScreen) -> io::Result<()> {
        if !screen.is_open() {
            return Ok(());
        }

        writeln!(self.out, "{}", screen.title())?;
        writeln!(self.out, "{}", "=".repeat(screen.title().chars().count()))?;

        if screen.rows().is_empty() {
            writeln!(self.out, "  (no players on a team)")?;
        }
        for (index, row) in screen.rows().iter().enumerate() {
            writeln!(self.out, "  [{}] {}", index + 1, row.label)?;
        }

        writeln!(self.out, "Type 'close' to close")?;
        self.out.flush()
    }
}
