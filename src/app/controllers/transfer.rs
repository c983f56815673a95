//! Moving tabs between windows.
//!
//! A transfer always takes the document out of the source registry first
//! and then either inserts it into the target registry or hands it to a new
//! window through `Message::NewWindowWithDocument`. The document value moves
//! through every step, so it can never be dropped or duplicated on the way.

use std::path::{Path, PathBuf};

use url::Url;

use super::idle::WindowId;
use crate::app::domain::document::DocumentId;

/// Horizontal allocation of one tab label in the tab strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TabExtent {
    pub x: i32,
    pub width: i32,
}

/// Insert position for a drop at `x`: the first tab whose midpoint lies
/// right of `x`, or the end of the strip.
pub fn drop_index(layout: &[TabExtent], x: i32) -> usize {
    layout
        .iter()
        .position(|tab| x < tab.x + tab.width / 2)
        .unwrap_or(layout.len())
}

/// A window with a single tab has nothing to leave behind.
pub fn can_detach(count: usize) -> bool {
    count >= 2
}

/// What was dropped on a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropPayload {
    /// A `text/uri-list` body.
    UriList(String),
    /// A tab dragged out of `source`.
    Tab { source: WindowId, document: DocumentId },
}

/// Split a `text/uri-list` body into its uris, skipping comments.
pub fn parse_uri_list(data: &str) -> Vec<String> {
    data.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Turn a `file://` uri or a plain path into a path, resolving relative
/// paths against `working_dir`. Non-file uris give `None`.
pub fn resolve_location(location: &str, working_dir: Option<&Path>) -> Option<PathBuf> {
    if let Ok(url) = Url::parse(location) {
        // Single letters are drive prefixes on Windows, not schemes.
        if url.scheme().len() > 1 {
            return if url.scheme() == "file" {
                url.to_file_path().ok()
            } else {
                tracing::debug!(location, "ignoring non-file uri");
                None
            };
        }
    }

    let path = PathBuf::from(location);
    if path.is_absolute() {
        return Some(path);
    }
    Some(match working_dir {
        Some(dir) => dir.join(path),
        None => path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip() -> Vec<TabExtent> {
        vec![
            TabExtent { x: 0, width: 100 },
            TabExtent { x: 100, width: 100 },
            TabExtent { x: 200, width: 100 },
        ]
    }

    #[test]
    fn test_drop_index_uses_midpoints() {
        let layout = strip();
        assert_eq!(drop_index(&layout, 10), 0);
        assert_eq!(drop_index(&layout, 49), 0);
        assert_eq!(drop_index(&layout, 50), 1);
        assert_eq!(drop_index(&layout, 249), 2);
        assert_eq!(drop_index(&layout, 290), 3);
        assert_eq!(drop_index(&[], 5), 0);
    }

    #[test]
    fn test_can_detach() {
        assert!(!can_detach(0));
        assert!(!can_detach(1));
        assert!(can_detach(2));
    }

    #[test]
    fn test_parse_uri_list() {
        let body = "# comment\r\nfile:///tmp/a.txt\r\n\r\nfile:///tmp/b%20c.txt\r\n";
        assert_eq!(
            parse_uri_list(body),
            vec!["file:///tmp/a.txt".to_string(), "file:///tmp/b%20c.txt".to_string()]
        );
    }

    #[test]
    #[cfg(not(target_os = "windows"))]
    fn test_resolve_location() {
        let cwd = Path::new("/home/user");
        assert_eq!(resolve_location("file:///tmp/b%20c.txt", Some(cwd)), Some(PathBuf::from("/tmp/b c.txt")));
        assert_eq!(resolve_location("/etc/hosts", Some(cwd)), Some(PathBuf::from("/etc/hosts")));
        assert_eq!(resolve_location("notes.txt", Some(cwd)), Some(PathBuf::from("/home/user/notes.txt")));
        assert_eq!(resolve_location("https://example.com/x", Some(cwd)), None);
    }
}
