//! Clipboard history shared by every window of the process.

/// Maximum number of remembered clipboard snapshots.
pub const HISTORY_LENGTH: usize = 10;

/// Characters of an entry shown in the paste menu before it is ellipsized.
pub const MENU_LABEL_LENGTH: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasteMenuRow {
    Item {
        label: String,
        /// Mnemonic markup, `_0` for the live clipboard entry.
        mnemonic: String,
        text: String,
    },
    Separator,
    /// Insensitive row shown when there is nothing to paste.
    Empty { label: String },
}

#[derive(Debug, Default)]
pub struct ClipboardHistory {
    entries: Vec<String>,
}

impl ClipboardHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the current clipboard text, newest first.
    ///
    /// An entry already in the history keeps its place.
    pub fn record(&mut self, text: Option<String>) {
        let Some(text) = text else {
            return;
        };
        if self.entries.contains(&text) {
            return;
        }
        self.entries.insert(0, text);
        self.entries.truncate(HISTORY_LENGTH);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Rows of the paste-from-history popup. The entry matching `current`
    /// (the live clipboard) goes last with mnemonic `_0`.
    pub fn build_menu(&self, current: Option<&str>) -> Vec<PasteMenuRow> {
        let mut rows = Vec::new();
        let mut live = None;
        let mut n = 1;

        for entry in &self.entries {
            if live.is_none() && current == Some(entry.as_str()) {
                live = Some(entry);
                continue;
            }
            rows.push(menu_item(entry, format!("_{}", n)));
            n += 1;
        }

        match live {
            Some(entry) => {
                if !rows.is_empty() {
                    rows.push(PasteMenuRow::Separator);
                }
                rows.push(menu_item(entry, "_0".to_string()));
            }
            None if rows.is_empty() => rows.push(PasteMenuRow::Empty {
                label: "No clipboard data".to_string(),
            }),
            None => {}
        }

        rows
    }
}

fn menu_item(text: &str, mnemonic: String) -> PasteMenuRow {
    PasteMenuRow::Item {
        label: menu_label(text),
        mnemonic,
        text: text.to_string(),
    }
}

/// First 30 characters, `...` when truncated, line breaks and tabs as spaces.
pub fn menu_label(text: &str) -> String {
    let mut label: String = text.chars().take(MENU_LABEL_LENGTH).collect();
    if text.chars().count() > MENU_LABEL_LENGTH {
        label.push_str("...");
    }
    label.replace(['\n', '\t', '\r'], " ")
}
