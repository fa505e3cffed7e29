use derive_setters::Setters;
use ratatui::crossterm::event::KeyEvent;
use std::fmt;
use std::io::Error as IoError;

use crate::records::DeskView;

/// Every intent the controller can hand to the model. The model decides
/// what a message means in the current modus and ignores the rest.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    ShowView(DeskView),
    Enter,
    Exit,
    Help,
    Search,
    Filter,
    SortAscending,
    SortDescending,
    ClearSort,
    ToggleIndex,
    CopyCell,
    CopyRow,
    Breakdown,
    NewRule,
    Acknowledge,
    Remove,
    Toggle,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

/// What the command line input is currently collecting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CmdMode {
    SearchTable,
    FilterColumn,
}

#[derive(Debug, Clone, Setters)]
#[setters(into)]
pub struct DeskConfig {
    pub event_poll_ms: u64,
    pub max_column_width: usize,
    pub operator: String,
    pub start_view: DeskView,
}

impl Default for DeskConfig {
    fn default() -> Self {
        DeskConfig {
            event_poll_ms: 100,
            max_column_width: 24,
            operator: "desk".to_string(),
            start_view: DeskView::Fixtures,
        }
    }
}

#[derive(Debug)]
pub enum DeskError {
    Io(IoError),
    LoadFailed(String),
    BadArgument(String),
}

impl From<IoError> for DeskError {
    fn from(err: IoError) -> Self {
        DeskError::Io(err)
    }
}

impl fmt::Display for DeskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeskError::Io(err) => write!(f, "io error: {}", err),
            DeskError::LoadFailed(msg) => write!(f, "failed to fetch desk data: {}", msg),
            DeskError::BadArgument(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for DeskError {}

pub const HELP_TEXT: &str = "\
 oddsdesk keys

 1-5        switch view (fixtures, alerts, margins, models, audit)
 arrows     move selection          PgUp/PgDn   page up / down
 Home/End   first / last row
 /          search all columns      f           filter current column
 s / S      sort asc / desc         c           clear sort
 Esc        clear search + filters, or leave the current mode
 Enter      inspect record          b           value breakdown
 i          toggle row numbers      y / Y       copy cell / row
 a          acknowledge alert       x           dismiss alert, delete rule
 t          suspend/reopen fixture, enable/disable model
 n          new margin rule         ?           this help
 q          quit
";
