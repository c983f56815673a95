use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing_subscriber::EnvFilter;

use quill_pad::app::controllers::actions::NAVIGATION_PREFIX;
use quill_pad::app::services::recent::{JsonRecencyStore, RECENT_ACTION_PREFIX};
use quill_pad::app::{
    AppContext, AppSettings, Application, Clipboard, Collaborators, Dialogs, DocumentId, FsFileEngine, Message,
    RevertResponse, SaveChangesResponse, TextView, ViewCommand,
};

/// Frontend without a display: every question is declined so nothing is
/// ever written or discarded behind the user's back.
struct Headless;

impl Dialogs for Headless {
    fn save_changes(&self, name: &str, _read_only: bool) -> SaveChangesResponse {
        tracing::info!(document = name, "unsaved changes kept");
        SaveChangesResponse::Cancel
    }

    fn revert(&self, _name: &str) -> RevertResponse {
        RevertResponse::Cancel
    }

    fn save_as_path(&self, _suggested_name: &str, _current: Option<&Path>) -> Option<PathBuf> {
        None
    }

    fn open_paths(&self, _current: Option<&Path>) -> Vec<PathBuf> {
        Vec::new()
    }

    fn choose_encoding(&self, path: &Path, failed: &str) -> Option<String> {
        eprintln!("{}: cannot decode as {}", path.display(), failed);
        None
    }

    fn other_tab_size(&self, _current: u32) -> Option<u32> {
        None
    }

    fn confirm_clear_recent(&self) -> bool {
        false
    }

    fn show_error(&self, message: &str, detail: Option<&str>) {
        tracing::error!(detail, "{}", message);
        match detail {
            Some(detail) => eprintln!("{}: {}", message, detail),
            None => eprintln!("{}", message),
        }
    }
}

impl Clipboard for Headless {
    fn text(&self) -> Option<String> {
        None
    }
}

impl TextView for Headless {
    fn execute(&self, doc: DocumentId, command: &ViewCommand) {
        tracing::trace!(document = doc.0, ?command, "view command");
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("QUILLPAD_LOG").unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let settings = AppSettings::load();
    let headless = Rc::new(Headless);
    let collab = Collaborators {
        files: Rc::new(FsFileEngine),
        dialogs: headless.clone(),
        clipboard: headless.clone(),
        view: headless,
    };
    let store = JsonRecencyStore::open(JsonRecencyStore::default_path());
    let ctx = AppContext::new(collab, settings, Box::new(store)).persist_settings_to(AppSettings::get_config_path());

    let locations: Vec<String> = std::env::args().skip(1).collect();
    let working_dir = std::env::current_dir().ok();

    let mut app = Application::new(Rc::new(ctx));
    let id = app.open_window(&locations, working_dir.as_deref());
    app.run_idle();
    for (window, message) in app.process_events() {
        if let Message::SetTitle(title) = message {
            tracing::debug!(window = window.0, title, "title");
        }
    }

    let Some(window) = app.window(id) else {
        return;
    };
    println!("{}", window.title());
    for action in window.actions().with_prefix(NAVIGATION_PREFIX) {
        let marker = if action.is_active() { "*" } else { " " };
        println!("{} {}", marker, action.label);
    }
    let recent: Vec<_> = window.actions().with_prefix(RECENT_ACTION_PREFIX).collect();
    if !recent.is_empty() {
        println!("Recent:");
        for action in recent {
            println!("  {}", action.tooltip.as_deref().unwrap_or(&action.label));
        }
    }
}
