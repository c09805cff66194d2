//! In-memory surfaces for tests
//!
//! `RecordingGit` and `RecordingTmux` stand in for the git and tmux binaries.
//! They keep just enough state to answer queries the way the real tools
//! would, and record every call for assertions.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::error::{GitError, Result, SessionError, TmuxError};
use crate::git::{Attachment, VersionControl};
use crate::session::SessionName;
use crate::tmux::Multiplexer;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking test must not cascade into every other assertion
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Revision reported for every fake attachment
pub const FAKE_REVISION: &str = "0123456789abcdef0123456789abcdef01234567";

#[derive(Debug, Default)]
struct GitState {
    attachments: HashMap<PathBuf, Vec<Attachment>>,
    failing_urls: HashSet<String>,
    failing_commits: bool,
    /// Roots with changes since their last commit
    uncommitted: HashSet<PathBuf>,
    attach_calls: usize,
    commits: Vec<String>,
    calls: Vec<String>,
}

/// Version control that mirrors its effects on disk (`.git` and attachment
/// directories) but never runs git
#[derive(Debug, Clone, Default)]
pub struct RecordingGit {
    state: Arc<Mutex<GitState>>,
}

impl RecordingGit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `attach` of `url` fail
    pub fn fail_url(&self, url: &str) {
        lock(&self.state).failing_urls.insert(url.to_string());
    }

    pub fn clear_failures(&self) {
        lock(&self.state).failing_urls.clear();
    }

    /// Make `commit_all` fail, as git does without a configured identity
    pub fn fail_commits(&self, fail: bool) {
        lock(&self.state).failing_commits = fail;
    }

    /// Number of `attach` calls so far, failed ones included
    pub fn attach_calls(&self) -> usize {
        lock(&self.state).attach_calls
    }

    /// Commit messages in order
    pub fn commits(&self) -> Vec<String> {
        lock(&self.state).commits.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.state).calls.clone()
    }

    /// Attachments currently recorded under `root`
    pub fn recorded(&self, root: &Path) -> Vec<Attachment> {
        lock(&self.state)
            .attachments
            .get(root)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl VersionControl for RecordingGit {
    async fn is_repository(&self, path: &Path) -> Result<bool> {
        Ok(path.join(".git").is_dir())
    }

    async fn init(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path.join(".git"))?;
        let mut state = lock(&self.state);
        state.calls.push(format!("init {}", path.display()));
        state.attachments.insert(path.to_path_buf(), Vec::new());
        state.uncommitted.insert(path.to_path_buf());
        Ok(())
    }

    async fn attachments(&self, root: &Path) -> Result<Vec<Attachment>> {
        Ok(self.recorded(root))
    }

    async fn attach(&self, root: &Path, url: &str, name: &str) -> Result<Attachment> {
        let mut state = lock(&self.state);
        state.attach_calls += 1;
        state.calls.push(format!("attach {url} {name}"));

        if state.failing_urls.contains(url) {
            return Err(GitError::CommandFailed {
                command: format!("git submodule add -- {url} {name}"),
                stderr: format!("fatal: repository '{url}' not found"),
            }
            .into());
        }

        let dir = root.join(name);
        if dir.exists() {
            return Err(GitError::CommandFailed {
                command: format!("git submodule add -- {url} {name}"),
                stderr: format!("fatal: '{name}' already exists in the index"),
            }
            .into());
        }
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join(".git"), format!("gitdir: ../.git/modules/{name}\n"))?;

        let attachment = Attachment {
            name: name.to_string(),
            path: PathBuf::from(name),
            url: url.to_string(),
            revision: Some(FAKE_REVISION.to_string()),
        };
        state
            .attachments
            .entry(root.to_path_buf())
            .or_default()
            .push(attachment.clone());
        state.uncommitted.insert(root.to_path_buf());

        Ok(attachment)
    }

    async fn has_uncommitted(&self, root: &Path) -> Result<bool> {
        Ok(lock(&self.state).uncommitted.contains(root))
    }

    async fn commit_all(&self, root: &Path, message: &str) -> Result<()> {
        let mut state = lock(&self.state);
        state.calls.push(format!("commit {}", root.display()));

        if state.failing_commits {
            return Err(GitError::CommandFailed {
                command: format!("git commit --quiet --allow-empty -m {message}"),
                stderr: "Author identity unknown".to_string(),
            }
            .into());
        }
        state.commits.push(message.to_string());
        state.uncommitted.remove(root);
        Ok(())
    }
}

/// A window as the fake multiplexer sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeWindow {
    pub name: String,
    pub panes: usize,
    /// Command the first pane was started with
    pub command: Option<String>,
    /// Literal text and `<Key>` presses sent to the window, in order
    pub typed: Vec<String>,
}

impl FakeWindow {
    fn new(name: &str, command: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            panes: 1,
            command: command.map(str::to_string),
            typed: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
struct FakeSession {
    cwd: PathBuf,
    windows: Vec<FakeWindow>,
    selected: Option<String>,
}

#[derive(Debug, Default)]
struct TmuxState {
    sessions: IndexMap<String, FakeSession>,
    failing_windows: HashSet<String>,
    racing: HashMap<String, PathBuf>,
    attached: Vec<String>,
    calls: Vec<String>,
}

/// Multiplexer that keeps a session table in memory
#[derive(Debug, Clone, Default)]
pub struct RecordingTmux {
    state: Arc<Mutex<TmuxState>>,
}

impl RecordingTmux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make creating a window with this name fail
    pub fn fail_window(&self, window: &str) {
        lock(&self.state).failing_windows.insert(window.to_string());
    }

    pub fn clear_failures(&self) {
        lock(&self.state).failing_windows.clear();
    }

    /// Pretend a session was started outside this tool
    pub fn add_session(&self, session: &str, cwd: &Path) {
        lock(&self.state).sessions.insert(
            session.to_string(),
            FakeSession {
                cwd: cwd.to_path_buf(),
                windows: vec![FakeWindow::new("0", None)],
                selected: Some("0".to_string()),
            },
        );
    }

    /// Have another client start `session` just before the next
    /// `new-session` for it, as a concurrent invocation would
    pub fn race_session(&self, session: &str, cwd: &Path) {
        lock(&self.state)
            .racing
            .insert(session.to_string(), cwd.to_path_buf());
    }

    pub fn session_names(&self) -> Vec<String> {
        lock(&self.state).sessions.keys().cloned().collect()
    }

    pub fn windows(&self, session: &str) -> Vec<FakeWindow> {
        lock(&self.state)
            .sessions
            .get(session)
            .map(|s| s.windows.clone())
            .unwrap_or_default()
    }

    pub fn selected(&self, session: &str) -> Option<String> {
        lock(&self.state)
            .sessions
            .get(session)
            .and_then(|s| s.selected.clone())
    }

    pub fn cwd(&self, session: &str) -> Option<PathBuf> {
        lock(&self.state).sessions.get(session).map(|s| s.cwd.clone())
    }

    /// Sessions attached to, in order
    pub fn attached(&self) -> Vec<String> {
        lock(&self.state).attached.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.state).calls.clone()
    }

    fn with_window<R>(
        &self,
        session: &SessionName,
        window: &str,
        call: String,
        f: impl FnOnce(&mut FakeSession, usize) -> R,
    ) -> Result<R> {
        let mut state = lock(&self.state);
        state.calls.push(call.clone());

        let fake = state.sessions.get_mut(session.as_str());
        let index = fake
            .as_ref()
            .and_then(|s| s.windows.iter().position(|w| w.name == window));
        match (fake, index) {
            (Some(fake), Some(index)) => Ok(f(fake, index)),
            _ => Err(TmuxError::CommandFailed {
                command: call,
                stderr: format!("can't find window: {window}"),
            }
            .into()),
        }
    }
}

#[async_trait]
impl Multiplexer for RecordingTmux {
    async fn has_session(&self, session: &SessionName) -> Result<bool> {
        Ok(lock(&self.state).sessions.contains_key(session.as_str()))
    }

    async fn new_session(
        &self,
        session: &SessionName,
        window: &str,
        cwd: &Path,
        command: Option<&str>,
    ) -> Result<()> {
        let mut state = lock(&self.state);
        state.calls.push(format!("new-session {session} {window}"));

        if let Some(other_cwd) = state.racing.remove(session.as_str()) {
            state.sessions.insert(
                session.to_string(),
                FakeSession {
                    cwd: other_cwd,
                    windows: vec![FakeWindow::new("0", None)],
                    selected: Some("0".to_string()),
                },
            );
        }
        if state.sessions.contains_key(session.as_str()) {
            return Err(SessionError::AlreadyExists(session.to_string()).into());
        }

        state.sessions.insert(
            session.to_string(),
            FakeSession {
                cwd: cwd.to_path_buf(),
                windows: vec![FakeWindow::new(window, command)],
                selected: Some(window.to_string()),
            },
        );
        Ok(())
    }

    async fn new_window(
        &self,
        session: &SessionName,
        window: &str,
        _cwd: &Path,
        command: Option<&str>,
    ) -> Result<()> {
        let mut state = lock(&self.state);
        let call = format!("new-window {session} {window}");
        state.calls.push(call.clone());

        if state.failing_windows.contains(window) {
            return Err(TmuxError::CommandFailed {
                command: call,
                stderr: "create window failed".to_string(),
            }
            .into());
        }

        match state.sessions.get_mut(session.as_str()) {
            Some(fake) => {
                fake.windows.push(FakeWindow::new(window, command));
                Ok(())
            }
            None => Err(TmuxError::CommandFailed {
                command: call,
                stderr: format!("can't find session: {session}"),
            }
            .into()),
        }
    }

    async fn split_window(&self, session: &SessionName, window: &str, _cwd: &Path) -> Result<()> {
        self.with_window(
            session,
            window,
            format!("split-window {session} {window}"),
            |fake, index| fake.windows[index].panes += 1,
        )
    }

    async fn send_literal(&self, session: &SessionName, window: &str, text: &str) -> Result<()> {
        self.with_window(
            session,
            window,
            format!("send-keys -l {session} {window}"),
            |fake, index| fake.windows[index].typed.push(text.to_string()),
        )
    }

    async fn send_key(&self, session: &SessionName, window: &str, key: &str) -> Result<()> {
        self.with_window(
            session,
            window,
            format!("send-keys {session} {window} {key}"),
            |fake, index| fake.windows[index].typed.push(format!("<{key}>")),
        )
    }

    async fn select_window(&self, session: &SessionName, window: &str) -> Result<()> {
        self.with_window(
            session,
            window,
            format!("select-window {session} {window}"),
            |fake, _| fake.selected = Some(window.to_string()),
        )
    }

    async fn attach(&self, session: &SessionName) -> Result<()> {
        let mut state = lock(&self.state);
        let call = format!("attach {session}");
        state.calls.push(call.clone());

        if !state.sessions.contains_key(session.as_str()) {
            return Err(TmuxError::CommandFailed {
                command: call,
                stderr: format!("can't find session: {session}"),
            }
            .into());
        }
        state.attached.push(session.to_string());
        Ok(())
    }

    async fn kill_session(&self, session: &SessionName) -> Result<()> {
        let mut state = lock(&self.state);
        let call = format!("kill-session {session}");
        state.calls.push(call.clone());

        match state.sessions.shift_remove(session.as_str()) {
            Some(_) => Ok(()),
            None => Err(TmuxError::CommandFailed {
                command: call,
                stderr: format!("can't find session: {session}"),
            }
            .into()),
        }
    }
}
