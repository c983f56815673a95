//! Interfaces to the parts of the editor that live outside the window core:
//! file I/O, modal dialogs, the system clipboard and the text view.
//!
//! `FsFileEngine` is the production file engine. The others are implemented
//! by the frontend.

use std::fs;
use std::path::{Component, Path, PathBuf};

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};

use super::error::{AppError, Result};
use crate::app::domain::document::{DocumentFile, LoadedFile, LineEnding};
use crate::app::domain::messages::ViewCommand;
use crate::app::domain::DocumentId;

pub trait FileEngine {
    /// Read and decode `path`. Decode failures are `AppError::Encoding`.
    fn read(&self, path: &Path, encoding: &str) -> Result<LoadedFile>;
    fn write(&self, path: &Path, file: &DocumentFile, text: &str) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn is_regular_file(&self, path: &Path) -> bool;

    /// The form of `path` used to tell whether a file is already open.
    fn resolve(&self, path: &Path) -> PathBuf {
        normalize_path(path)
    }
}

/// Drop `.` components and fold `..` into the preceding name without
/// touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveChangesResponse {
    Save,
    SaveAs,
    DontSave,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertResponse {
    Revert,
    SaveAs,
    Cancel,
}

pub trait Dialogs {
    /// Ask what to do with unsaved changes. `read_only` lets the prompt
    /// offer save-as instead of save.
    fn save_changes(&self, name: &str, read_only: bool) -> SaveChangesResponse;
    fn revert(&self, name: &str) -> RevertResponse;
    fn save_as_path(&self, suggested_name: &str, current: Option<&Path>) -> Option<PathBuf>;
    fn open_paths(&self, current: Option<&Path>) -> Vec<PathBuf>;
    /// Offer another encoding after `path` failed to decode. `None` aborts.
    fn choose_encoding(&self, path: &Path, failed: &str) -> Option<String>;
    fn other_tab_size(&self, current: u32) -> Option<u32>;
    fn confirm_clear_recent(&self) -> bool;
    fn show_error(&self, message: &str, detail: Option<&str>);
}

pub trait Clipboard {
    fn text(&self) -> Option<String>;
}

pub trait TextView {
    fn execute(&self, doc: DocumentId, command: &ViewCommand);
}

/// Plain filesystem engine decoding with `encoding_rs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsFileEngine;

fn lookup_encoding(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| AppError::Encoding(format!("Unknown encoding \"{}\"", label)))
}

/// Rewrite every line break in `text` to `ending`.
pub fn convert_line_endings(text: &str, ending: LineEnding) -> String {
    let unix = text.replace("\r\n", "\n").replace('\r', "\n");
    match ending {
        LineEnding::Unix => unix,
        other => unix.replace('\n', other.as_str()),
    }
}

/// Encode `text` as `encoding`, prefixed with its byte order mark when `bom`
/// is set. `encoding_rs` only encodes UTF-16 through UTF-8, so those two are
/// handled here.
fn encode(encoding: &'static Encoding, text: &str, bom: bool) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    if encoding == UTF_16LE || encoding == UTF_16BE {
        let little = encoding == UTF_16LE;
        bytes.reserve(2 * text.len() + 2);
        if bom {
            bytes.extend_from_slice(if little { &[0xff, 0xfe] } else { &[0xfe, 0xff] });
        }
        for unit in text.encode_utf16() {
            let pair = if little { unit.to_le_bytes() } else { unit.to_be_bytes() };
            bytes.extend_from_slice(&pair);
        }
        return Ok(bytes);
    }

    if encoding.output_encoding() != encoding {
        return Err(AppError::Encoding(format!("Cannot save files as {}", encoding.name())));
    }
    if bom && encoding == UTF_8 {
        bytes.extend_from_slice(&[0xef, 0xbb, 0xbf]);
    }
    let (encoded, _, had_errors) = encoding.encode(text);
    if had_errors {
        return Err(AppError::Encoding(format!(
            "Some characters cannot be represented in {}",
            encoding.name()
        )));
    }
    bytes.extend_from_slice(&encoded);
    Ok(bytes)
}

impl FileEngine for FsFileEngine {
    fn read(&self, path: &Path, encoding: &str) -> Result<LoadedFile> {
        let encoding = lookup_encoding(encoding)?;
        let bytes = fs::read(path)?;
        let (bytes, encoding, bom) = match Encoding::for_bom(&bytes) {
            Some((bom_encoding, len)) => (&bytes[len..], bom_encoding, true),
            None => (&bytes[..], encoding, false),
        };

        let text = encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .ok_or_else(|| {
                AppError::Encoding(format!("Invalid byte sequence for {}", encoding.name()))
            })?
            .into_owned();

        let read_only = fs::metadata(path)
            .map(|m| m.permissions().readonly())
            .unwrap_or(false);

        tracing::trace!(path = %path.display(), encoding = encoding.name(), read_only, "file decoded");

        Ok(LoadedFile {
            line_ending: LineEnding::detect(&text),
            text,
            encoding: encoding.name().to_string(),
            read_only,
            bom,
        })
    }

    fn write(&self, path: &Path, file: &DocumentFile, text: &str) -> Result<()> {
        let encoding = lookup_encoding(&file.encoding)?;
        let text = convert_line_endings(text, file.line_ending);
        let bytes = encode(encoding, &text, file.bom)?;
        fs::write(path, bytes)?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_regular_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    /// Resolves symlinked and `..` directories through the filesystem but
    /// keeps the file name itself, so a symlinked file keeps its own name.
    fn resolve(&self, path: &Path) -> PathBuf {
        let path = normalize_path(path);
        let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
            return path;
        };
        let parent = if parent.as_os_str().is_empty() { Path::new(".") } else { parent };
        match fs::canonicalize(parent) {
            Ok(dir) => dir.join(name),
            Err(_) => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_utf8_detects_line_ending() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "one\r\ntwo\r\n").unwrap();

        let loaded = FsFileEngine.read(&path, "UTF-8").unwrap();
        assert_eq!(loaded.text, "one\r\ntwo\r\n");
        assert_eq!(loaded.line_ending, LineEnding::Dos);
        assert_eq!(loaded.encoding, "UTF-8");
        assert!(!loaded.read_only);
    }

    #[test]
    fn test_invalid_utf8_is_encoding_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latin1.txt");
        fs::write(&path, [0x63, 0x61, 0x66, 0xe9]).unwrap();

        let err = FsFileEngine.read(&path, "UTF-8").unwrap_err();
        assert!(err.is_encoding());

        let loaded = FsFileEngine.read(&path, "ISO-8859-1").unwrap();
        assert_eq!(loaded.text, "café");
        assert_eq!(loaded.encoding, "windows-1252");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = FsFileEngine.read(&dir.path().join("nope"), "UTF-8").unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }

    #[test]
    fn test_unknown_label() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "x").unwrap();
        assert!(FsFileEngine.read(&path, "KLINGON-8").unwrap_err().is_encoding());
    }

    #[test]
    fn test_write_converts_line_endings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.txt");
        let file = DocumentFile {
            line_ending: LineEnding::Dos,
            ..Default::default()
        };
        FsFileEngine.write(&path, &file, "a\nb\rc\r\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\r\nb\r\nc\r\n");
    }

    #[test]
    fn test_utf16_file_keeps_encoding_and_bom() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wide.txt");
        fs::write(&path, [0xff, 0xfe, 0x68, 0x00, 0x69, 0x00]).unwrap();

        let loaded = FsFileEngine.read(&path, "UTF-8").unwrap();
        assert_eq!(loaded.text, "hi");
        assert_eq!(loaded.encoding, "UTF-16LE");
        assert!(loaded.bom);

        let file = DocumentFile {
            encoding: loaded.encoding.clone(),
            line_ending: loaded.line_ending,
            bom: loaded.bom,
            ..Default::default()
        };
        FsFileEngine.write(&path, &file, &loaded.text).unwrap();
        assert_eq!(fs::read(&path).unwrap(), vec![0xff, 0xfe, 0x68, 0x00, 0x69, 0x00]);
    }

    #[test]
    fn test_utf16be_without_bom() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("be.txt");
        let file = DocumentFile {
            encoding: "UTF-16BE".to_string(),
            ..Default::default()
        };
        FsFileEngine.write(&path, &file, "é").unwrap();
        assert_eq!(fs::read(&path).unwrap(), vec![0x00, 0xe9]);
        assert_eq!(FsFileEngine.read(&path, "UTF-16BE").unwrap().text, "é");
    }

    #[test]
    fn test_utf8_bom_is_written_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bom.txt");
        fs::write(&path, [0xef, 0xbb, 0xbf, b'x']).unwrap();

        let loaded = FsFileEngine.read(&path, "UTF-8").unwrap();
        assert_eq!(loaded.text, "x");
        assert!(loaded.bom);

        let file = DocumentFile {
            bom: true,
            ..Default::default()
        };
        FsFileEngine.write(&path, &file, "y").unwrap();
        assert_eq!(fs::read(&path).unwrap(), vec![0xef, 0xbb, 0xbf, b'y']);
    }

    #[test]
    fn test_decode_only_encoding_is_refused_on_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.txt");
        let file = DocumentFile {
            encoding: "iso-2022-kr".to_string(),
            ..Default::default()
        };
        assert!(FsFileEngine.write(&path, &file, "x").unwrap_err().is_encoding());
        assert!(!path.exists());
    }

    #[test]
    fn test_normalize_path_is_lexical() {
        assert_eq!(normalize_path(Path::new("/a/./sub/../b.txt")), PathBuf::from("/a/b.txt"));
        assert_eq!(normalize_path(Path::new("/../x")), PathBuf::from("/x"));
        assert_eq!(normalize_path(Path::new("../x/../y")), PathBuf::from("../y"));
        assert_eq!(normalize_path(Path::new("a/..")), PathBuf::from("."));
    }

    #[test]
    fn test_resolve_goes_through_the_filesystem() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.txt"), "x").unwrap();

        let direct = FsFileEngine.resolve(&dir.path().join("a.txt"));
        let detour = FsFileEngine.resolve(&dir.path().join("sub").join("..").join(".").join("a.txt"));
        assert_eq!(direct, detour);
        assert_eq!(direct.file_name().unwrap(), "a.txt");
        assert!(direct.is_absolute());
    }

    #[test]
    fn test_regular_file_checks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f");
        fs::write(&path, "").unwrap();
        assert!(FsFileEngine.is_regular_file(&path));
        assert!(!FsFileEngine.is_regular_file(dir.path()));
        assert!(FsFileEngine.exists(dir.path()));
    }
}
