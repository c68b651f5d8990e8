use directories::ProjectDirs;
use overlay_core::{Entry, Settings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const SETTINGS_SCHEMA_VERSION: u32 = 1;
const SESSION_SCHEMA_VERSION: u32 = 1;
const SESSION_SUFFIX: &str = ".overlay.json";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to resolve local data directory")]
    NoDataDirectory,
    #[error("unsupported {kind} schema version {found} (expected {expected})")]
    UnsupportedVersion { kind: &'static str, found: u32, expected: u32 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SettingsEnvelope {
    version: u32,
    settings: Settings,
}

/// Persisted annotation session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFile {
    pub version: u32,
    pub entries: Vec<Entry>,
}

#[derive(Serialize)]
struct SessionFileRef<'a> {
    version: u32,
    entries: &'a [Entry],
}

impl Storage {
    pub fn from_default_project() -> Result<Self, StorageError> {
        let dirs = ProjectDirs::from("dev", "PdfOverlay", "PdfOverlay")
            .ok_or(StorageError::NoDataDirectory)?;

        Ok(Self { root: dirs.data_local_dir().to_path_buf() })
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn load_settings(&self) -> Result<Settings, StorageError> {
        let path = self.settings_path();
        if !path.exists() {
            return Ok(Settings::default());
        }

        let bytes = fs::read(path)?;
        let envelope: SettingsEnvelope = serde_json::from_slice(&bytes)?;
        check_version("settings", envelope.version, SETTINGS_SCHEMA_VERSION)?;

        Ok(envelope.settings)
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;

        let envelope =
            SettingsEnvelope { version: SETTINGS_SCHEMA_VERSION, settings: settings.clone() };

        let bytes = serde_json::to_vec_pretty(&envelope)?;
        write_atomic(&self.settings_path(), &bytes)
    }

    fn settings_path(&self) -> PathBuf {
        self.root.join("settings.json")
    }
}

/// Sidecar file holding the session for `pdf_path`
pub fn session_path(pdf_path: &Path) -> PathBuf {
    let mut path = pdf_path.as_os_str().to_owned();
    path.push(SESSION_SUFFIX);
    PathBuf::from(path)
}

/// Write the session next to the document; returns the sidecar path
pub fn save_session(pdf_path: &Path, entries: &[Entry]) -> Result<PathBuf, StorageError> {
    let path = session_path(pdf_path);
    save_session_to(&path, entries)?;
    Ok(path)
}

pub fn save_session_to(path: &Path, entries: &[Entry]) -> Result<(), StorageError> {
    let envelope = SessionFileRef { version: SESSION_SCHEMA_VERSION, entries };
    let bytes = serde_json::to_vec_pretty(&envelope)?;
    write_atomic(path, &bytes)?;
    debug!(path = %path.display(), entries = entries.len(), "session saved");
    Ok(())
}

/// Load the sidecar session, or `None` when the document has none
pub fn load_session(pdf_path: &Path) -> Result<Option<Vec<Entry>>, StorageError> {
    let path = session_path(pdf_path);
    if !path.exists() {
        return Ok(None);
    }
    load_session_from(&path).map(Some)
}

pub fn load_session_from(path: &Path) -> Result<Vec<Entry>, StorageError> {
    let bytes = fs::read(path)?;
    let session: SessionFile = serde_json::from_slice(&bytes)?;
    check_version("session", session.version, SESSION_SCHEMA_VERSION)?;
    Ok(session.entries)
}

pub fn delete_session(pdf_path: &Path) -> Result<(), StorageError> {
    let path = session_path(pdf_path);
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

fn check_version(kind: &'static str, found: u32, expected: u32) -> Result<(), StorageError> {
    if found > expected {
        return Err(StorageError::UnsupportedVersion { kind, found, expected });
    }
    Ok(())
}

/// Write through a temporary sibling and rename over the target
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);
    fs::write(&temp, bytes)?;
    fs::rename(&temp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_core::entry::{EntryKind, RectSize, TextData, WatermarkData};
    use overlay_core::{Color, TableConfig};

    #[test]
    fn settings_round_trip() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = Storage::with_root(temp.path().join("nested"));

        let mut settings = Settings::default();
        settings.tool.font_size = 16.0;
        settings.watermark.text = "COPY".to_owned();
        settings.table = TableConfig::new(2, 5);

        store.save_settings(&settings).expect("save should succeed");
        let loaded = store.load_settings().expect("load should succeed");

        assert_eq!(loaded, settings);
    }

    #[test]
    fn load_defaults_when_file_absent() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = Storage::with_root(temp.path());

        let loaded = store.load_settings().expect("load should succeed");
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn newer_settings_schema_is_rejected() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = Storage::with_root(temp.path());
        fs::write(temp.path().join("settings.json"), r#"{"version":9,"settings":{}}"#)
            .expect("fixture should be written");

        let err = store.load_settings().expect_err("load should fail");
        assert!(matches!(err, StorageError::UnsupportedVersion { found: 9, .. }));
    }

    #[test]
    fn session_path_appends_suffix() {
        assert_eq!(
            session_path(Path::new("/docs/report.pdf")),
            PathBuf::from("/docs/report.pdf.overlay.json")
        );
    }

    #[test]
    fn session_round_trip_keeps_order_and_sentinel() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let pdf = temp.path().join("doc.pdf");

        let entries = vec![
            Entry::new(2, 1.0, 2.0, EntryKind::Text(TextData::new(11.0, Color::BLACK, "a\nb")))
                .expect("entry should be valid"),
            Entry::watermark(WatermarkData::default()),
            Entry::new(1, 3.0, 4.0, EntryKind::Highlight(RectSize::new(5.0, 6.0)))
                .expect("entry should be valid"),
        ];

        let path = save_session(&pdf, &entries).expect("save should succeed");
        assert!(path.exists());
        let loaded = load_session(&pdf).expect("load should succeed").expect("session exists");

        assert_eq!(loaded, entries);
        assert!(loaded[1].applies_to_all_pages());
    }

    #[test]
    fn missing_session_is_none() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let pdf = temp.path().join("none.pdf");
        assert!(load_session(&pdf).expect("load should succeed").is_none());
        delete_session(&pdf).expect("delete of a missing session is fine");
    }

    #[test]
    fn session_file_uses_exchange_field_names() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("s.json");
        let entry = Entry::new(1, 10.0, 20.0, EntryKind::Blackout(RectSize::new(50.0, 30.0)))
            .expect("entry should be valid");
        save_session_to(&path, std::slice::from_ref(&entry)).expect("save should succeed");

        let raw: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).expect("read should succeed"))
                .expect("valid json");
        let first = &raw["entries"][0];
        assert_eq!(raw["version"], 1);
        assert_eq!(first["type"], "blackout");
        assert_eq!(first["pageNum"], 1);
        assert_eq!(first["normWidth"], 50.0);
    }
}
