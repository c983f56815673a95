use std::ops::Range;

use super::document::{Document, DocumentId};
use crate::app::services::clipboard::PasteMenuRow;

/// Messages a window posts for its frontend and for the application.
/// The frontend drains them after each call into the window; the
/// application routes the cross-window ones.
#[derive(Debug)]
pub enum Message {
    SetTitle(String),
    ShowTabs(bool),
    StatusbarVisible(bool),
    StatusbarCursor { line: usize, column: usize, selection: usize },
    StatusbarOverwrite(bool),
    /// The view should display this document.
    ShowDocument(DocumentId),

    // Cross-window
    NewWindow,
    /// Open a new window owning `document`, optionally at a screen position.
    NewWindowWithDocument { document: Document, position: Option<(i32, i32)> },
    /// The registry became empty; the window must be destroyed.
    WindowEmpty,
    /// Place the window at a screen position.
    MoveTo { x: i32, y: i32 },

    Print(DocumentId),
    /// Open the search bar, or the replace dialog when `replace` is set.
    ShowSearch { replace: bool },
    ShowGoTo,
    /// Pop up the paste-from-history menu.
    ShowPasteHistory(Vec<PasteMenuRow>),
}

/// Commands executed by the text view on one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewCommand {
    Undo,
    Redo,
    Cut,
    Copy,
    Paste,
    PasteColumn,
    /// Insert text from the paste history at the cursor.
    PasteText(String),
    Delete,
    SelectAll,
    ChangeSelection,
    Lowercase,
    Uppercase,
    Titlecase,
    OppositeCase,
    TabsToSpaces,
    SpacesToTabs,
    StripTrailing,
    Transpose,
    MoveLineUp,
    MoveLineDown,
    Duplicate,
    IncreaseIndent,
    DecreaseIndent,
    /// Byte ranges of every search match, replacing the previous highlight.
    Highlight(Vec<Range<usize>>),
    Select(Range<usize>),
    ScrollToCursor,
}

impl ViewCommand {
    /// Edit command bound to a menu action name.
    pub fn for_action(name: &str) -> Option<ViewCommand> {
        let cmd = match name {
            "undo" => ViewCommand::Undo,
            "redo" => ViewCommand::Redo,
            "cut" => ViewCommand::Cut,
            "copy" => ViewCommand::Copy,
            "paste" => ViewCommand::Paste,
            "paste-column" => ViewCommand::PasteColumn,
            "delete" => ViewCommand::Delete,
            "select-all" => ViewCommand::SelectAll,
            "change-selection" => ViewCommand::ChangeSelection,
            "lowercase" => ViewCommand::Lowercase,
            "uppercase" => ViewCommand::Uppercase,
            "titlecase" => ViewCommand::Titlecase,
            "opposite-case" => ViewCommand::OppositeCase,
            "tabs-to-spaces" => ViewCommand::TabsToSpaces,
            "spaces-to-tabs" => ViewCommand::SpacesToTabs,
            "strip-trailing" => ViewCommand::StripTrailing,
            "transpose" => ViewCommand::Transpose,
            "line-up" => ViewCommand::MoveLineUp,
            "line-down" => ViewCommand::MoveLineDown,
            "duplicate" => ViewCommand::Duplicate,
            "increase-indent" => ViewCommand::IncreaseIndent,
            "decrease-indent" => ViewCommand::DecreaseIndent,
            _ => return None,
        };
        Some(cmd)
    }
}
