//! §4.7 ProjectStore — persistence of project / history / session as
//! separate, self-describing JSON files with atomic writes.

use crate::error::MorcError;
use crate::project::{HistoryEntry, Project, PROJ_DIR_SENTINEL};
use crate::session::SessionJar;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CURRENT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ProjectDoc {
    schema_version: u32,
    #[serde(flatten)]
    project: Project,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct HistoryDoc {
    schema_version: u32,
    #[serde(default)]
    entries: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct SessionDoc {
    schema_version: u32,
    #[serde(default)]
    calls: Vec<crate::session::SetCookieCall>,
}

/// Expands a setting path (which may carry the `::PROJ_DIR::` sentinel, or
/// be a plain path relative to the project directory) into an absolute
/// filesystem path. This resolution is entirely in-memory/just-in-time:
/// `Project::config` itself is never mutated, which is what makes
/// `load(persist(p)) == p` hold trivially (Testable Property 1).
pub fn resolve_path(raw: &str, project_dir: &Path) -> PathBuf {
    if let Some(rest) = raw.strip_prefix(PROJ_DIR_SENTINEL) {
        project_dir.join(rest.trim_start_matches(['/', '\\']))
    } else {
        project_dir.join(raw)
    }
}

pub struct ProjectStore;

impl ProjectStore {
    /// Loads `project.json` from `path`. If `load_all`, also resolves and
    /// loads `history.json`/`session.json` (sentinel-expanded relative to
    /// `path`'s directory); missing auxiliary files are treated as empty,
    /// not as errors.
    pub fn load(path: &Path, load_all: bool) -> Result<Project, MorcError> {
        let bytes = std::fs::read(path).map_err(|e| MorcError::io(path.display().to_string(), e))?;
        let doc: ProjectDoc = serde_json::from_slice(&bytes)
            .map_err(|e| MorcError::Schema(format!("{}: {e}", path.display())))?;
        if doc.schema_version != CURRENT_SCHEMA_VERSION {
            return Err(MorcError::Schema(format!(
                "unknown project schema version {}",
                doc.schema_version
            )));
        }
        let mut project = doc.project;
        project.vars.ensure_default_env();

        if load_all {
            let project_dir = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));

            if project.config.record_history && !project.config.history_file.is_empty() {
                let history_path = resolve_path(&project.config.history_file, &project_dir);
                project.history = Self::load_history(&history_path)?;
            }
            if project.config.record_session && !project.config.session_file.is_empty() {
                let session_path = resolve_path(&project.config.session_file, &project_dir);
                project.cookies = Self::load_session(&session_path)?;
            }
        }

        Ok(project)
    }

    fn load_history(path: &Path) -> Result<Vec<HistoryEntry>, MorcError> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let bytes = std::fs::read(path).map_err(|e| MorcError::io(path.display().to_string(), e))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        let doc: HistoryDoc = serde_json::from_slice(&bytes)
            .map_err(|e| MorcError::Schema(format!("{}: {e}", path.display())))?;
        Ok(doc.entries)
    }

    fn load_session(path: &Path) -> Result<SessionJar, MorcError> {
        if !path.exists() {
            return Ok(SessionJar::new());
        }
        let bytes = std::fs::read(path).map_err(|e| MorcError::io(path.display().to_string(), e))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(SessionJar::new());
        }
        let doc: SessionDoc = serde_json::from_slice(&bytes)
            .map_err(|e| MorcError::Schema(format!("{}: {e}", path.display())))?;
        let mut jar = SessionJar::new();
        for call in doc.calls {
            jar.record(&call.request_url, &call.set_cookie_headers, call.received_at);
        }
        Ok(jar)
    }

    /// Writes `project.json` atomically; if `all`, also writes
    /// `history.json`/`session.json`. A path string that is empty disables
    /// persistence of that stream; the engine refuses to silently drop data
    /// the user asked to keep (`record_history`/`record_session` true with
    /// an empty path is a configuration error, not a silent no-op).
    pub fn persist(path: &Path, project: &Project, all: bool) -> Result<(), MorcError> {
        if project.config.record_history && project.config.history_file.is_empty() {
            return Err(MorcError::BadInput(
                "record_history is enabled but history_file is empty".to_string(),
            ));
        }
        if project.config.record_session && project.config.session_file.is_empty() {
            return Err(MorcError::BadInput(
                "record_session is enabled but session_file is empty".to_string(),
            ));
        }

        let doc = ProjectDoc {
            schema_version: CURRENT_SCHEMA_VERSION,
            project: project.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&doc)
            .map_err(|e| MorcError::Schema(format!("serializing project: {e}")))?;
        write_atomic(path, &bytes)?;

        if all {
            let project_dir = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));

            if project.config.record_history {
                let history_path = resolve_path(&project.config.history_file, &project_dir);
                let doc = HistoryDoc {
                    schema_version: CURRENT_SCHEMA_VERSION,
                    entries: project.history.clone(),
                };
                let bytes = serde_json::to_vec_pretty(&doc)
                    .map_err(|e| MorcError::Schema(format!("serializing history: {e}")))?;
                write_atomic(&history_path, &bytes)?;
            }
            if project.config.record_session {
                let session_path = resolve_path(&project.config.session_file, &project_dir);
                let doc = SessionDoc {
                    schema_version: CURRENT_SCHEMA_VERSION,
                    calls: project.cookies.calls_snapshot(),
                };
                let bytes = serde_json::to_vec_pretty(&doc)
                    .map_err(|e| MorcError::Schema(format!("serializing session: {e}")))?;
                write_atomic(&session_path, &bytes)?;
            }
        }

        Ok(())
    }
}

/// write-temp-then-rename: a crash leaves either the old or the new file
/// intact, never a truncated one (spec.md §4.7/§5).
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), MorcError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| MorcError::io(dir.display().to_string(), e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| MorcError::io(dir.display().to_string(), e))?;
    use std::io::Write;
    tmp.write_all(bytes)
        .map_err(|e| MorcError::io(path.display().to_string(), e))?;
    tmp.flush()
        .map_err(|e| MorcError::io(path.display().to_string(), e))?;
    tmp.persist(path)
        .map_err(|e| MorcError::io(path.display().to_string(), e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::RequestTemplate;

    #[test]
    fn round_trip_preserves_sentinel_paths() {
        let dir = tempfile::tempdir().unwrap();
        let project_path = dir.path().join("project.json");

        let mut project = Project::new("demo");
        project.add_template(RequestTemplate::new("req1")).unwrap();
        ProjectStore::persist(&project_path, &project, true).unwrap();

        let loaded = ProjectStore::load(&project_path, true).unwrap();
        assert_eq!(loaded.name, "demo");
        assert!(loaded.get_template("REQ1").is_some());
        assert_eq!(loaded.config.history_file, project.config.history_file);
        assert!(loaded.config.history_file.starts_with(PROJ_DIR_SENTINEL));
    }

    #[test]
    fn missing_auxiliary_files_load_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let project_path = dir.path().join("project.json");
        let project = Project::new("demo");
        ProjectStore::persist(&project_path, &project, false).unwrap();

        let loaded = ProjectStore::load(&project_path, true).unwrap();
        assert!(loaded.history.is_empty());
        assert_eq!(loaded.cookies.total_cookie_sets(), 0);
    }

    #[test]
    fn persist_refuses_when_history_enabled_without_path() {
        let dir = tempfile::tempdir().unwrap();
        let project_path = dir.path().join("project.json");
        let mut project = Project::new("demo");
        project.config.history_file = String::new();

        assert!(ProjectStore::persist(&project_path, &project, true).is_err());
    }

    #[test]
    fn atomic_write_never_leaves_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let project_path = dir.path().join("project.json");
        let project = Project::new("first");
        ProjectStore::persist(&project_path, &project, false).unwrap();
        let first_bytes = std::fs::read(&project_path).unwrap();

        // Simulate a fresh write that we never finish (tmp file dropped,
        // never renamed): the original file on disk must be untouched.
        {
            let dir_path = project_path.parent().unwrap();
            let _tmp = tempfile::NamedTempFile::new_in(dir_path).unwrap();
        }
        let after = std::fs::read(&project_path).unwrap();
        assert_eq!(first_bytes, after);
    }
}
