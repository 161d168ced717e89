//! Local call-recording storage.
//!
//! One file per recording in a single flat directory under the per-user
//! application data root. The directory itself is the catalog: there is no
//! index or database, and filenames are caller-chosen (typically embedding a
//! timestamp plus an audio extension). Saves overwrite silently, deletes are
//! idempotent, and nothing here serializes concurrent operations on the same
//! filename - callers must not overlap save/delete on one name.

use std::fs;
use std::path::{Component, Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::error::{Error, Result};

/// Directory name under the per-user data root, e.g.
/// `~/.local/share/voxline/CallRecordings` on Linux.
pub const RECORDINGS_DIR: &str = "CallRecordings";

/// Infer the playback MIME type from a recording filename's extension.
///
/// The store persists no MIME type; this fixed table is the only source.
/// Unknown extensions fall back to `audio/webm`, the format the softphone
/// UI records in.
pub fn mime_for(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("webm") => "audio/webm",
        Some("ogg") => "audio/ogg",
        Some("m4a") => "audio/mp4",
        Some("wav") => "audio/wav",
        _ => "audio/webm",
    }
}

/// A recording rendered as a self-contained `data:` URI, usable directly as
/// a playback source without further disk access.
#[derive(Debug, Clone)]
pub struct DataUrl {
    pub mime: &'static str,
    pub url: String,
    pub path: PathBuf,
}

/// Outcome of a delete, which never fails on an absent file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Removed,
    AlreadyAbsent,
}

impl DeleteOutcome {
    pub fn was_removed(self) -> bool {
        self == DeleteOutcome::Removed
    }
}

/// Flat on-disk store for opaque binary recordings.
#[derive(Debug, Clone)]
pub struct RecordingStore {
    root: PathBuf,
}

impl RecordingStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Store rooted at the canonical per-user location.
    pub fn open_default() -> Self {
        Self::new(Self::default_root())
    }

    /// `<perUserAppDataRoot>/voxline/CallRecordings`, falling back to the
    /// home directory when the platform data dir cannot be determined.
    pub fn default_root() -> PathBuf {
        dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("voxline")
            .join(RECORDINGS_DIR)
    }

    /// The canonical recordings directory, for external tooling to browse.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `content` to `<root>/<filename>`, creating the directory on
    /// first use and overwriting any existing file with that name. Returns
    /// the absolute path of the stored recording.
    pub fn save(&self, filename: &str, content: &[u8]) -> Result<PathBuf> {
        let path = self.entry_path(filename)?;
        fs::create_dir_all(&self.root)?;
        fs::write(&path, content)?;
        tracing::debug!(filename, bytes = content.len(), "saved recording");
        Ok(path)
    }

    /// Resolve a filename to its stored path, or `NotFound` if absent.
    /// Playback itself is delegated to the host OS by the shell layer.
    pub fn resolve(&self, filename: &str) -> Result<PathBuf> {
        let path = self.entry_path(filename)?;
        if !path.is_file() {
            return Err(Error::NotFound(filename.to_string()));
        }
        Ok(path)
    }

    /// Read the whole recording into memory and render it as a `data:` URI.
    ///
    /// Whole-file buffering is fine for short voice-call recordings; this
    /// does not scale to large files.
    pub fn data_url(&self, filename: &str) -> Result<DataUrl> {
        let path = self.resolve(filename)?;
        let content = fs::read(&path)?;
        let mime = mime_for(filename);
        let url = format!("data:{};base64,{}", mime, BASE64.encode(&content));
        Ok(DataUrl { mime, url, path })
    }

    /// Remove a recording. Deleting an absent file is not an error; the
    /// outcome reports which case occurred.
    pub fn delete(&self, filename: &str) -> Result<DeleteOutcome> {
        let path = self.entry_path(filename)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(filename, "deleted recording");
                Ok(DeleteOutcome::Removed)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DeleteOutcome::AlreadyAbsent),
            Err(e) => Err(e.into()),
        }
    }

    /// Join a caller-supplied filename onto the storage root, rejecting
    /// anything that could escape it. The store is flat: no separators, no
    /// parent components.
    fn entry_path(&self, filename: &str) -> Result<PathBuf> {
        if filename.is_empty() {
            return Err(Error::InvalidInput("empty recording filename".into()));
        }
        let candidate = Path::new(filename);
        let mut components = candidate.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => {
                return Err(Error::InvalidInput(format!(
                    "recording filename must be a bare file name: {filename:?}"
                )));
            }
        }
        Ok(self.root.join(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, RecordingStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordingStore::new(dir.path().join(RECORDINGS_DIR));
        (dir, store)
    }

    fn decode_payload(url: &str) -> Vec<u8> {
        let payload = url.split(";base64,").nth(1).unwrap();
        BASE64.decode(payload).unwrap()
    }

    #[test]
    fn test_save_then_data_url_round_trips() {
        let (_dir, store) = store();
        let content = [0u8, 1, 2, 255, 254, 128, 7];
        store.save("call.webm", &content).unwrap();
        let data = store.data_url("call.webm").unwrap();
        assert_eq!(data.mime, "audio/webm");
        assert!(data.url.starts_with("data:audio/webm;base64,"));
        assert_eq!(decode_payload(&data.url), content);
    }

    #[test]
    fn test_save_creates_directory_lazily() {
        let (_dir, store) = store();
        assert!(!store.root().exists());
        let path = store.save("a.wav", b"x").unwrap();
        assert!(store.root().is_dir());
        assert_eq!(path, store.root().join("a.wav"));
    }

    #[test]
    fn test_last_write_wins() {
        let (_dir, store) = store();
        store.save("call.ogg", b"first").unwrap();
        store.save("call.ogg", b"second").unwrap();
        assert_eq!(decode_payload(&store.data_url("call.ogg").unwrap().url), b"second");
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (_dir, store) = store();
        assert_eq!(
            store.delete("never-saved.wav").unwrap(),
            DeleteOutcome::AlreadyAbsent
        );
        store.save("call.wav", b"x").unwrap();
        assert_eq!(store.delete("call.wav").unwrap(), DeleteOutcome::Removed);
        assert_eq!(store.delete("call.wav").unwrap(), DeleteOutcome::AlreadyAbsent);
    }

    #[test]
    fn test_delete_then_resolve_is_not_found() {
        let (_dir, store) = store();
        store.save("call.wav", b"x").unwrap();
        store.delete("call.wav").unwrap();
        assert!(matches!(store.resolve("call.wav"), Err(Error::NotFound(_))));
        assert!(matches!(store.data_url("call.wav"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_mime_inference_table() {
        assert_eq!(mime_for("a.wav"), "audio/wav");
        assert_eq!(mime_for("a.ogg"), "audio/ogg");
        assert_eq!(mime_for("a.m4a"), "audio/mp4");
        assert_eq!(mime_for("a.webm"), "audio/webm");
        assert_eq!(mime_for("a.xyz"), "audio/webm");
        assert_eq!(mime_for("noextension"), "audio/webm");
        assert_eq!(mime_for("UPPER.WAV"), "audio/wav");
    }

    #[test]
    fn test_traversal_filenames_rejected() {
        let (_dir, store) = store();
        for bad in ["../escape.wav", "a/b.wav", "/abs.wav", "..", ""] {
            assert!(
                matches!(store.save(bad, b"x"), Err(Error::InvalidInput(_))),
                "expected rejection for {bad:?}"
            );
        }
        assert!(matches!(store.delete("../x"), Err(Error::InvalidInput(_))));
    }
}
