//! Switch-target handoff
//!
//! The picker runs as a child of the user's shell and cannot change the
//! shell's directory or replace it with a session. Instead it writes the
//! chosen action to a single-slot file; the shell hook then evaluates the
//! output of `zp resume`, which reads the file and prints the `cd`/`exec` line.
//!
//! A missing, empty, malformed or stale file means "nothing to do" and is
//! never reported as an error.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::backend::{quote, BackendClient};

/// Targets older than this are ignored
const MAX_AGE_SECS: u64 = 5 * 60;

const FILE_NAME: &str = "switch-target.json";

/// What the shell should do with the target session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchAction {
    Attach,
    New,
    Unknown,
}

impl SwitchAction {
    pub fn as_str(self) -> &'static str {
        match self {
            SwitchAction::Attach => "attach",
            SwitchAction::New => "new",
            SwitchAction::Unknown => "",
        }
    }
}

/// The persisted handoff record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchTarget {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dir: String,
    /// Unix seconds; 0 means unknown
    #[serde(default)]
    pub written_at: u64,
}

impl SwitchTarget {
    pub fn new(action: SwitchAction, name: impl Into<String>, dir: Option<&Path>) -> Self {
        Self {
            action: action.as_str().to_string(),
            name: name.into(),
            dir: dir.map(|d| d.to_string_lossy().to_string()).unwrap_or_default(),
            written_at: now_secs(),
        }
    }

    pub fn attach(name: impl Into<String>) -> Self {
        Self::new(SwitchAction::Attach, name, None)
    }

    pub fn new_session(name: impl Into<String>, dir: &Path) -> Self {
        Self::new(SwitchAction::New, name, Some(dir))
    }

    pub fn action(&self) -> SwitchAction {
        match self.action.as_str() {
            "attach" => SwitchAction::Attach,
            "new" => SwitchAction::New,
            _ => SwitchAction::Unknown,
        }
    }

    fn is_stale(&self, now: u64) -> bool {
        self.written_at != 0 && now.saturating_sub(self.written_at) > MAX_AGE_SECS
    }

    /// Shell line that performs the switch, or `None` if there is nothing to do
    pub fn resume_line(&self, client: &BackendClient) -> Option<String> {
        if !matches!(self.action(), SwitchAction::Attach | SwitchAction::New) || self.name.is_empty() {
            return None;
        }
        let attach = client.attach_command(&self.name);
        if self.dir.is_empty() {
            Some(format!("exec {}", attach))
        } else {
            Some(format!("cd {} && exec {}", quote(&self.dir), attach))
        }
    }
}

/// Default location: `$ZPICK_SWITCH_FILE`, else under the runtime dir
pub fn default_path() -> PathBuf {
    if let Some(path) = std::env::var_os("ZPICK_SWITCH_FILE").filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    state_dir().join(FILE_NAME)
}

/// Per-user state directory, preferring XDG_RUNTIME_DIR
fn state_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_RUNTIME_DIR").filter(|d| !d.is_empty()) {
        PathBuf::from(xdg).join("zpick")
    } else {
        let uid = unsafe { libc::getuid() };
        PathBuf::from(format!("/tmp/zpick-{}", uid))
    }
}

/// The single-slot mailbox file
#[derive(Debug, Clone)]
pub struct SwitchFile {
    path: PathBuf,
}

impl SwitchFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the file with `target`.
    ///
    /// Writes a sibling temp file and renames it into place so readers never
    /// see a partial record.
    pub fn write(&self, target: &SwitchTarget) -> Result<()> {
        let json = serde_json::to_string(target).context("Failed to serialize switch target")?;

        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => parent,
            None => Path::new("."),
        };
        if !dir.exists() {
            fs::DirBuilder::new()
                .recursive(true)
                .mode(0o700)
                .create(dir)
                .with_context(|| format!("Failed to create directory: {:?}", dir))?;
        }

        // One temp file per writer; concurrent pickers only race on the rename
        let mut temp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp switch file in {:?}", dir))?;
        temp.write_all(json.as_bytes())
            .with_context(|| format!("Failed to write temp switch file: {:?}", temp.path()))?;
        temp.as_file()
            .sync_all()
            .with_context(|| format!("Failed to sync temp switch file: {:?}", temp.path()))?;

        temp.persist(&self.path)
            .with_context(|| format!("Failed to rename switch file: {:?}", self.path))?;

        debug!("Wrote switch target {:?} to {:?}", target, self.path);
        Ok(())
    }

    /// Read the pending target, if any. Never fails.
    pub fn read(&self) -> Option<SwitchTarget> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No switch target at {:?}: {}", self.path, e);
                return None;
            }
        };

        let target: SwitchTarget = match serde_json::from_slice(&content) {
            Ok(target) => target,
            Err(e) => {
                debug!("Ignoring malformed switch target: {}", e);
                return None;
            }
        };

        if target.is_stale(now_secs()) {
            debug!("Ignoring stale switch target for {:?}", target.name);
            return None;
        }
        Some(target)
    }

    /// Read the pending target and remove the file so it is used only once
    pub fn take(&self) -> Option<SwitchTarget> {
        let target = self.read();
        if let Err(e) = fs::remove_file(&self.path) {
            debug!("Could not remove switch file {:?}: {}", self.path, e);
        }
        target
    }
}

impl Default for SwitchFile {
    fn default() -> Self {
        Self::new(default_path())
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scratch() -> (tempfile::TempDir, SwitchFile) {
        let dir = tempfile::tempdir().unwrap();
        let file = SwitchFile::new(dir.path().join("state").join(FILE_NAME));
        (dir, file)
    }

    #[test]
    fn test_round_trip() {
        let (_dir, file) = scratch();
        let target = SwitchTarget::new(SwitchAction::Attach, "foo", Some(Path::new("/tmp/x")));
        file.write(&target).unwrap();

        let read = file.read().unwrap();
        assert_eq!(read, target);
        assert_eq!(read.action(), SwitchAction::Attach);
        assert_eq!(read.name, "foo");
        assert_eq!(read.dir, "/tmp/x");
    }

    #[test]
    fn test_write_overwrites_previous_target() {
        let (_dir, file) = scratch();
        file.write(&SwitchTarget::attach("first")).unwrap();
        file.write(&SwitchTarget::attach("second")).unwrap();
        assert_eq!(file.read().unwrap().name, "second");
    }

    #[test]
    fn test_concurrent_writes_last_one_wins() {
        let (_dir, file) = scratch();
        file.write(&SwitchTarget::attach("seed")).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|writer| {
                let file = SwitchFile::new(file.path());
                std::thread::spawn(move || {
                    (0..50)
                        .filter(|round| {
                            file.write(&SwitchTarget::attach(format!("w{writer}-r{round}")))
                                .is_err()
                        })
                        .count()
                })
            })
            .collect();
        let failed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(failed, 0);
        let target = file.read().unwrap();
        assert!(target.name.starts_with('w'));
        assert_eq!(target.action(), SwitchAction::Attach);

        let leftovers: Vec<_> = std::fs::read_dir(file.path().parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path() != file.path())
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_written_file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let (_dir, file) = scratch();
        file.write(&SwitchTarget::attach("secret")).unwrap();
        let mode = std::fs::metadata(file.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_missing_file_is_none() {
        let (_dir, file) = scratch();
        assert_eq!(file.read(), None);
        assert_eq!(file.take(), None);
    }

    #[test]
    fn test_garbage_and_empty_are_none() {
        let (dir, _) = scratch();
        let path = dir.path().join("garbage");
        let file = SwitchFile::new(&path);

        std::fs::write(&path, b"\xff\x00\x13\x37").unwrap();
        assert_eq!(file.read(), None);

        std::fs::write(&path, "").unwrap();
        assert_eq!(file.read(), None);

        std::fs::write(&path, r#"{"action":"attach","na"#).unwrap();
        assert_eq!(file.read(), None);
    }

    #[test]
    fn test_stale_target_is_none() {
        let (_dir, file) = scratch();
        let mut target = SwitchTarget::attach("old");
        target.written_at = now_secs() - MAX_AGE_SECS - 10;
        file.write(&target).unwrap();
        assert_eq!(file.read(), None);
    }

    #[test]
    fn test_missing_timestamp_is_accepted() {
        let (dir, _) = scratch();
        let path = dir.path().join("legacy.json");
        std::fs::write(&path, r#"{"action":"new","name":"foo"}"#).unwrap();

        let target = SwitchFile::new(&path).read().unwrap();
        assert_eq!(target.action(), SwitchAction::New);
        assert_eq!(target.written_at, 0);
        assert!(target.dir.is_empty());
    }

    #[test]
    fn test_take_consumes() {
        let (_dir, file) = scratch();
        file.write(&SwitchTarget::attach("once")).unwrap();
        assert_eq!(file.take().unwrap().name, "once");
        assert!(!file.path().exists());
        assert_eq!(file.take(), None);
    }

    #[test]
    fn test_resume_line_with_dir() {
        let client = BackendClient::default();
        let target = SwitchTarget::new(SwitchAction::Attach, "foo", Some(Path::new("/tmp/x")));
        assert_eq!(
            target.resume_line(&client).unwrap(),
            r#"cd "/tmp/x" && exec zmosh attach "foo""#
        );
    }

    #[test]
    fn test_resume_line_without_dir() {
        let client = BackendClient::default();
        assert_eq!(
            SwitchTarget::attach("foo").resume_line(&client).unwrap(),
            r#"exec zmosh attach "foo""#
        );
    }

    #[test]
    fn test_resume_line_new_session() {
        let client = BackendClient::new("zmx");
        let target = SwitchTarget::new_session("proj", Path::new("/home/me/proj"));
        assert_eq!(
            target.resume_line(&client).unwrap(),
            r#"cd "/home/me/proj" && exec zmx attach "proj""#
        );
    }

    #[test]
    fn test_resume_line_nothing_to_do() {
        let client = BackendClient::default();

        let mut unknown = SwitchTarget::attach("foo");
        unknown.action = "detach".to_string();
        assert_eq!(unknown.resume_line(&client), None);

        let mut absent = SwitchTarget::attach("foo");
        absent.action.clear();
        assert_eq!(absent.resume_line(&client), None);

        let nameless = SwitchTarget::attach("");
        assert_eq!(nameless.resume_line(&client), None);
    }

    #[test]
    fn test_default_path_override() {
        temp_env::with_var("ZPICK_SWITCH_FILE", Some("/tmp/custom-switch.json"), || {
            assert_eq!(default_path(), PathBuf::from("/tmp/custom-switch.json"));
        });
        temp_env::with_vars(
            [("ZPICK_SWITCH_FILE", None), ("XDG_RUNTIME_DIR", Some("/run/user/1000"))],
            || {
                assert_eq!(
                    default_path(),
                    PathBuf::from("/run/user/1000/zpick/switch-target.json")
                );
            },
        );
    }
}
