//! Window actions and their derived state.
//!
//! An [`ActionSet`] holds every menu action of one window. Its state is never
//! authoritative: [`derive_action_states`] computes it from the active
//! document and the preferences, and [`ActionSet::apply`] writes the result.

use crate::app::domain::document::{Document, LineEnding, SelectionKind};
use crate::app::domain::settings::AppSettings;

pub const NAVIGATION_PREFIX: &str = "quillpad-tab-";
pub const NAVIGATION_GROUP: &str = "go-to-tab";
pub const LINE_ENDING_GROUP: &str = "line-ending";
pub const TAB_SIZE_GROUP: &str = "tab-size";
pub const TAB_SIZE_PREFIX: &str = "tab-size_";
pub const TAB_SIZE_OTHER: &str = "tab-size-other";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Simple,
    Toggle { active: bool },
    Radio { group: String, value: i32, active: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub name: String,
    pub label: String,
    pub tooltip: Option<String>,
    pub accel: Option<String>,
    pub sensitive: bool,
    pub visible: bool,
    pub kind: ActionKind,
}

impl Action {
    pub fn simple(name: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            tooltip: None,
            accel: None,
            sensitive: true,
            visible: true,
            kind: ActionKind::Simple,
        }
    }

    pub fn toggle(name: &str, label: &str, active: bool) -> Self {
        Self {
            kind: ActionKind::Toggle { active },
            ..Self::simple(name, label)
        }
    }

    pub fn radio(name: &str, label: &str, group: &str, value: i32) -> Self {
        Self {
            kind: ActionKind::Radio {
                group: group.to_string(),
                value,
                active: false,
            },
            ..Self::simple(name, label)
        }
    }

    pub fn with_tooltip(mut self, tooltip: &str) -> Self {
        self.tooltip = Some(tooltip.to_string());
        self
    }

    pub fn with_accel(mut self, accel: &str) -> Self {
        self.accel = Some(accel.to_string());
        self
    }

    pub fn is_active(&self) -> bool {
        match self.kind {
            ActionKind::Simple => false,
            ActionKind::Toggle { active } | ActionKind::Radio { active, .. } => active,
        }
    }

    fn radio_group(&self) -> Option<&str> {
        match &self.kind {
            ActionKind::Radio { group, .. } => Some(group),
            _ => None,
        }
    }
}

/// One change computed by [`derive_action_states`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionUpdate {
    Sensitive(&'static str, bool),
    /// Activate a toggle (or deactivate it); radios only accept `true`.
    Active(String, bool),
    Label(&'static str, String),
}

/// Ordered actions of one window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionSet {
    actions: Vec<Action>,
}

impl ActionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action, replacing one with the same name.
    pub fn add(&mut self, action: Action) {
        match self.actions.iter_mut().find(|a| a.name == action.name) {
            Some(existing) => *existing = action,
            None => self.actions.push(action),
        }
    }

    /// Drop every action whose name starts with `prefix`. Returns how many went.
    pub fn remove_with_prefix(&mut self, prefix: &str) -> usize {
        let before = self.actions.len();
        self.actions.retain(|a| !a.name.starts_with(prefix));
        before - self.actions.len()
    }

    pub fn get(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.name == name)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut Action> {
        self.actions.iter_mut().find(|a| a.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }

    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a Action> + 'a {
        self.actions.iter().filter(move |a| a.name.starts_with(prefix))
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn is_sensitive(&self, name: &str) -> bool {
        self.get(name).is_some_and(|a| a.sensitive)
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.get(name).is_some_and(Action::is_active)
    }

    pub fn set_sensitive(&mut self, name: &str, sensitive: bool) -> bool {
        match self.get_mut(name) {
            Some(a) if a.sensitive != sensitive => {
                a.sensitive = sensitive;
                true
            }
            _ => false,
        }
    }

    pub fn set_visible(&mut self, name: &str, visible: bool) -> bool {
        match self.get_mut(name) {
            Some(a) if a.visible != visible => {
                a.visible = visible;
                true
            }
            _ => false,
        }
    }

    pub fn set_label(&mut self, name: &str, label: &str) -> bool {
        match self.get_mut(name) {
            Some(a) if a.label != label => {
                a.label = label.to_string();
                true
            }
            _ => false,
        }
    }

    /// Set the checked state of a toggle or radio. Activating a radio
    /// deactivates the rest of its group; a radio cannot be deactivated
    /// directly. Returns whether the named action changed.
    pub fn set_active(&mut self, name: &str, active: bool) -> bool {
        let group = match self.get(name) {
            Some(a) => match &a.kind {
                ActionKind::Simple => return false,
                ActionKind::Toggle { .. } => None,
                ActionKind::Radio { group, .. } => Some(group.clone()),
            },
            None => return false,
        };

        match group {
            None => match self.get_mut(name) {
                Some(Action { kind: ActionKind::Toggle { active: current }, .. }) if *current != active => {
                    *current = active;
                    true
                }
                _ => false,
            },
            Some(_) if !active => false,
            Some(group) => {
                let mut changed = false;
                for action in self.actions.iter_mut() {
                    if action.radio_group() != Some(group.as_str()) {
                        continue;
                    }
                    if let ActionKind::Radio { active: current, .. } = &mut action.kind {
                        let target = action.name == name;
                        if *current != target {
                            *current = target;
                            changed |= target;
                        }
                    }
                }
                changed
            }
        }
    }

    /// Currently active member of a radio group.
    pub fn active_radio(&self, group: &str) -> Option<&Action> {
        self.actions
            .iter()
            .find(|a| a.radio_group() == Some(group) && a.is_active())
    }

    /// Tab sizes that have their own radio action.
    pub fn tab_sizes(&self) -> Vec<u32> {
        self.with_prefix(TAB_SIZE_PREFIX)
            .filter_map(|a| a.name[TAB_SIZE_PREFIX.len()..].parse().ok())
            .collect()
    }

    /// Write derived state. Returns the names of toggles and radios whose
    /// checked state changed, in order, so their handlers can run.
    pub fn apply(&mut self, updates: &[ActionUpdate]) -> Vec<String> {
        let mut toggled = Vec::new();
        for update in updates {
            match update {
                ActionUpdate::Sensitive(name, sensitive) => {
                    self.set_sensitive(name, *sensitive);
                }
                ActionUpdate::Label(name, label) => {
                    self.set_label(name, label);
                }
                ActionUpdate::Active(name, active) => {
                    if self.set_active(name, *active) {
                        toggled.push(name.clone());
                    }
                }
            }
        }
        toggled
    }
}

/// Sensitivity of the selection-dependent actions for a selection kind.
pub fn selection_sensitivity(kind: SelectionKind) -> Vec<(&'static str, bool)> {
    let has_selection = kind != SelectionKind::None;
    let not_column = kind != SelectionKind::Column;
    let normal = kind == SelectionKind::Normal;

    let mut states = vec![("change-selection", has_selection)];
    for name in ["tabs-to-spaces", "spaces-to-tabs", "duplicate", "strip-trailing"] {
        states.push((name, not_column));
    }
    for name in ["line-up", "line-down"] {
        states.push((name, normal));
    }
    for name in ["cut", "copy", "delete", "lowercase", "uppercase", "titlecase", "opposite-case"] {
        states.push((name, has_selection));
    }
    states
}

/// Everything the derived action state depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionInputs {
    pub index: usize,
    pub count: usize,
    pub cycle_tabs: bool,
    pub read_only: bool,
    pub has_path: bool,
    pub line_ending: LineEnding,
    pub word_wrap: bool,
    pub line_numbers: bool,
    pub auto_indent: bool,
    pub insert_spaces: bool,
    pub tab_size: u32,
    pub can_undo: bool,
    pub can_redo: bool,
    pub selection: SelectionKind,
    /// Sizes that have a `tab-size_N` radio.
    pub tab_sizes: Vec<u32>,
    /// Go-to-tab radio of the active document, if the tab menu has one.
    pub navigation_action: Option<String>,
}

impl ActionInputs {
    pub fn new(doc: &Document, index: usize, count: usize, settings: &AppSettings, actions: &ActionSet) -> Self {
        Self {
            index,
            count,
            cycle_tabs: settings.cycle_tabs,
            read_only: doc.file.read_only,
            has_path: !doc.is_untitled(),
            line_ending: doc.file.line_ending,
            word_wrap: doc.word_wrap,
            line_numbers: doc.line_numbers,
            auto_indent: doc.auto_indent,
            insert_spaces: doc.insert_spaces,
            tab_size: doc.tab_size,
            can_undo: doc.can_undo(),
            can_redo: doc.can_redo(),
            selection: doc.selection(),
            tab_sizes: actions.tab_sizes(),
            navigation_action: None,
        }
    }
}

/// Compute the state of every document-dependent action.
///
/// Pure: the same inputs always give the same updates, and applying them to
/// a set that already reflects the inputs changes nothing.
pub fn derive_action_states(inputs: &ActionInputs) -> Vec<ActionUpdate> {
    let n = inputs.count;
    let page = inputs.index;
    let cycle = inputs.cycle_tabs && n > 1;

    let mut updates = vec![
        ActionUpdate::Sensitive("back", cycle || page > 0),
        ActionUpdate::Sensitive("forward", cycle || page + 1 < n),
        ActionUpdate::Sensitive("save", !inputs.read_only),
        ActionUpdate::Sensitive("detach", n > 1),
        ActionUpdate::Sensitive("revert", inputs.has_path),
        ActionUpdate::Active(inputs.line_ending.action_name().to_string(), true),
        ActionUpdate::Active("word-wrap".to_string(), inputs.word_wrap),
        ActionUpdate::Active("line-numbers".to_string(), inputs.line_numbers),
        ActionUpdate::Active("auto-indent".to_string(), inputs.auto_indent),
    ];

    if inputs.tab_sizes.contains(&inputs.tab_size) {
        updates.push(ActionUpdate::Active(format!("{}{}", TAB_SIZE_PREFIX, inputs.tab_size), true));
        updates.push(ActionUpdate::Label(TAB_SIZE_OTHER, "Other...".to_string()));
    } else {
        updates.push(ActionUpdate::Active(TAB_SIZE_OTHER.to_string(), true));
        updates.push(ActionUpdate::Label(TAB_SIZE_OTHER, format!("Other ({})...", inputs.tab_size)));
    }

    updates.push(ActionUpdate::Active("insert-spaces".to_string(), inputs.insert_spaces));
    updates.push(ActionUpdate::Sensitive("undo", inputs.can_undo));
    updates.push(ActionUpdate::Sensitive("redo", inputs.can_redo));

    for (name, sensitive) in selection_sensitivity(inputs.selection) {
        updates.push(ActionUpdate::Sensitive(name, sensitive));
    }

    if let Some(ref nav) = inputs.navigation_action {
        updates.push(ActionUpdate::Active(nav.clone(), true));
    }

    updates
}

/// Full action table of a new window.
pub fn default_actions(settings: &AppSettings) -> ActionSet {
    let mut set = ActionSet::new();

    let simple = [
        ("new", "_New", Some("<control>N"), "Create a new document"),
        ("new-window", "New _Window", Some("<shift><control>N"), "Create a new document in a new window"),
        ("open", "_Open...", None, "Open a file"),
        ("clear-recent", "Clear _History", None, "Clear the recently used files history"),
        ("save", "_Save", Some("<control>S"), "Save the current document"),
        ("save-as", "Save _As...", Some("<shift><control>S"), "Save current document as another file"),
        ("save-all", "Save A_ll", None, "Save all documents in this window"),
        ("revert", "Re_vert", None, "Revert to the saved version of the file"),
        ("print", "_Print...", Some("<control>P"), "Print the current document"),
        ("detach", "_Detach Tab", Some("<control>D"), "Move the current document to a new window"),
        ("close", "Close _Tab", Some("<control>W"), "Close the current document"),
        ("close-window", "_Close Window", Some("<control>Q"), "Close this window"),
        ("undo", "_Undo", Some("<control>Z"), "Undo the last action"),
        ("redo", "_Redo", Some("<control>Y"), "Redo the last undone action"),
        ("cut", "Cu_t", None, "Cut the selection"),
        ("copy", "_Copy", None, "Copy the selection"),
        ("paste", "_Paste", None, "Paste the clipboard"),
        ("paste-history", "Paste from _History", None, "Paste from the clipboard history"),
        ("paste-column", "Paste as _Column", None, "Paste the clipboard text into a column"),
        ("delete", "_Delete", None, "Delete the current selection"),
        ("select-all", "Select _All", None, "Select the text in the entire document"),
        ("change-selection", "Change the selection", None, "Change a normal selection into a column selection and vice versa"),
        ("find", "_Find", None, "Search for text"),
        ("find-next", "Find _Next", None, "Search forwards for the same text"),
        ("find-previous", "Find _Previous", None, "Search backwards for the same text"),
        ("replace", "Find and Rep_lace...", None, "Search for and replace text"),
        ("uppercase", "to _Uppercase", None, "Change the case of the selection to uppercase"),
        ("lowercase", "to _Lowercase", None, "Change the case of the selection to lowercase"),
        ("titlecase", "to _Title Case", None, "Change the case of the selection to title case"),
        ("opposite-case", "to _Opposite Case", None, "Change the case of the selection opposite case"),
        ("tabs-to-spaces", "_Tabs to Spaces", None, "Convert all tabs to spaces in the selection or document"),
        ("spaces-to-tabs", "_Spaces to Tabs", None, "Convert all the leading spaces to tabs in the selected line(s) or document"),
        ("strip-trailing", "St_rip Trailing Spaces", None, "Remove all the trailing spaces from the selected line(s) or document"),
        ("transpose", "_Transpose", Some("<control>T"), "Reverse the order of something"),
        ("line-up", "Line _Up", None, "Move the selection one line up"),
        ("line-down", "Line _Down", None, "Move the selection one line down"),
        ("duplicate", "D_uplicate Line / Selection", None, "Duplicate the current line or selection"),
        ("increase-indent", "_Increase Indent", None, "Increase indent of selection or line"),
        ("decrease-indent", "_Decrease Indent", None, "Decrease indent of selection or line"),
        ("back", "_Previous Tab", Some("<control>Page_Up"), "Select the previous tab"),
        ("forward", "_Next Tab", Some("<control>Page_Down"), "Select the next tab"),
        ("go-to", "_Go to...", Some("<control>G"), "Go to a specific location in the document"),
    ];
    for (name, label, accel, tooltip) in simple {
        let mut action = Action::simple(name, label).with_tooltip(tooltip);
        if let Some(accel) = accel {
            action = action.with_accel(accel);
        }
        set.add(action);
    }

    let mut no_recent = Action::simple("no-recent-items", "No items found");
    no_recent.sensitive = false;
    set.add(no_recent);

    let toggles = [
        ("statusbar", "St_atusbar", "Change the visibility of the statusbar", settings.statusbar_visible),
        ("line-numbers", "Line N_umbers", "Show line numbers", settings.line_numbers_enabled),
        ("auto-indent", "_Auto Indent", "Auto indent a new line", settings.auto_indent_enabled),
        ("word-wrap", "_Word Wrap", "Toggle breaking lines in between words", settings.word_wrap_enabled),
        ("insert-spaces", "Insert _Spaces", "Insert spaces when the tab button is pressed", settings.insert_spaces),
    ];
    for (name, label, tooltip, active) in toggles {
        set.add(Action::toggle(name, label, active).with_tooltip(tooltip));
    }

    let endings = [
        (LineEnding::Unix, "Unix (_LF)", "Set the line ending of the document to Unix (LF)"),
        (LineEnding::Mac, "Mac (_CR)", "Set the line ending of the document to Mac (CR)"),
        (LineEnding::Dos, "DOS / Windows (C_R LF)", "Set the line ending of the document to DOS / Windows (CR LF)"),
    ];
    for (value, (ending, label, tooltip)) in endings.into_iter().enumerate() {
        set.add(Action::radio(ending.action_name(), label, LINE_ENDING_GROUP, value as i32).with_tooltip(tooltip));
    }

    for size in settings.tab_size_choices() {
        let name = format!("{}{}", TAB_SIZE_PREFIX, size);
        set.add(Action::radio(&name, &size.to_string(), TAB_SIZE_GROUP, size as i32));
    }
    set.add(Action::radio(TAB_SIZE_OTHER, "Other...", TAB_SIZE_GROUP, 0).with_tooltip("Set custom tab size"));

    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::domain::DocumentId;

    fn inputs(selection: SelectionKind) -> ActionInputs {
        let doc = Document::new_untitled(DocumentId(1), 1, &AppSettings::default());
        let set = default_actions(&AppSettings::default());
        let mut i = ActionInputs::new(&doc, 0, 1, &AppSettings::default(), &set);
        i.selection = selection;
        i
    }

    fn sensitive_after(selection: SelectionKind, name: &str) -> bool {
        let mut set = default_actions(&AppSettings::default());
        set.apply(&derive_action_states(&inputs(selection)));
        set.is_sensitive(name)
    }

    #[test]
    fn test_selection_table() {
        let kinds = [SelectionKind::None, SelectionKind::Normal, SelectionKind::Column];
        let columns: [(&str, [bool; 3]); 4] = [
            ("change-selection", [false, true, true]),
            ("strip-trailing", [true, true, false]),
            ("line-up", [false, true, false]),
            ("copy", [false, true, true]),
        ];
        for (name, expected) in columns {
            for (kind, want) in kinds.into_iter().zip(expected) {
                assert_eq!(sensitive_after(kind, name), want, "{} with {:?}", name, kind);
            }
        }
    }

    #[test]
    fn test_selection_table_groups_are_uniform() {
        for kind in [SelectionKind::None, SelectionKind::Normal, SelectionKind::Column] {
            let states = selection_sensitivity(kind);
            let get = |n: &str| states.iter().find(|(name, _)| *name == n).map(|(_, s)| *s);
            for group in [
                &["tabs-to-spaces", "spaces-to-tabs", "duplicate", "strip-trailing"][..],
                &["line-up", "line-down"][..],
                &["cut", "copy", "delete", "lowercase", "uppercase", "titlecase", "opposite-case"][..],
            ] {
                let first = get(group[0]);
                assert!(group.iter().all(|n| get(n) == first));
            }
        }
    }

    #[test]
    fn test_derive_is_idempotent() {
        let mut set = default_actions(&AppSettings::default());
        let updates = derive_action_states(&inputs(SelectionKind::Normal));
        set.apply(&updates);
        let snapshot = set.clone();

        assert!(set.apply(&updates).is_empty());
        assert_eq!(set, snapshot);
    }

    #[test]
    fn test_back_forward_sensitivity() {
        let mut i = inputs(SelectionKind::None);
        i.count = 3;
        i.index = 0;
        let mut set = default_actions(&AppSettings::default());
        set.apply(&derive_action_states(&i));
        assert!(!set.is_sensitive("back"));
        assert!(set.is_sensitive("forward"));

        i.cycle_tabs = true;
        set.apply(&derive_action_states(&i));
        assert!(set.is_sensitive("back"));

        i.count = 1;
        set.apply(&derive_action_states(&i));
        assert!(!set.is_sensitive("back"));
        assert!(!set.is_sensitive("forward"));
        assert!(!set.is_sensitive("detach"));
    }

    #[test]
    fn test_document_state_mirrored() {
        let mut i = inputs(SelectionKind::None);
        i.read_only = true;
        i.line_ending = LineEnding::Dos;
        i.can_undo = true;
        let mut set = default_actions(&AppSettings::default());
        set.apply(&derive_action_states(&i));

        assert!(!set.is_sensitive("save"));
        assert!(!set.is_sensitive("revert"));
        assert!(set.is_sensitive("undo"));
        assert!(!set.is_sensitive("redo"));
        assert_eq!(set.active_radio(LINE_ENDING_GROUP).map(|a| a.name.as_str()), Some("dos"));
    }

    #[test]
    fn test_custom_tab_size_uses_other() {
        let mut i = inputs(SelectionKind::None);
        let mut set = default_actions(&AppSettings::default());

        i.tab_size = 8;
        set.apply(&derive_action_states(&i));
        assert!(set.is_active("tab-size_8"));
        assert_eq!(set.get(TAB_SIZE_OTHER).map(|a| a.label.as_str()), Some("Other..."));

        i.tab_size = 5;
        set.apply(&derive_action_states(&i));
        assert!(set.is_active(TAB_SIZE_OTHER));
        assert!(!set.is_active("tab-size_8"));
        assert_eq!(set.get(TAB_SIZE_OTHER).map(|a| a.label.as_str()), Some("Other (5)..."));
    }

    #[test]
    fn test_radio_group_exclusive() {
        let mut set = default_actions(&AppSettings::default());
        assert!(set.set_active("mac", true));
        assert!(set.set_active("unix", true));
        assert!(!set.is_active("mac"));
        assert!(!set.set_active("unix", false));
        assert!(set.is_active("unix"));
    }

    #[test]
    fn test_remove_with_prefix() {
        let mut set = ActionSet::new();
        for n in 0..3 {
            set.add(Action::radio(&format!("{}{}", NAVIGATION_PREFIX, n), "x", NAVIGATION_GROUP, n));
        }
        set.add(Action::simple("new", "_New"));
        assert_eq!(set.remove_with_prefix(NAVIGATION_PREFIX), 3);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_default_table() {
        let set = default_actions(&AppSettings::default());
        assert_eq!(set.tab_sizes(), vec![2, 3, 4, 8]);
        assert!(!set.is_sensitive("no-recent-items"));
        assert!(set.is_active("statusbar"));
    }
}
