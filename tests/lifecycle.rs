//! Lifecycle tests against the in-memory git and tmux surfaces
//!
//! No external binaries are needed; every workspace lives in its own
//! temporary directory.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use devnest::config::{Overrides, PartialSettings, Settings, resolve};
use devnest::error::{Error, SessionError, WorkspaceError};
use devnest::lifecycle::{AssumeYes, Confirm, DestroyPlan, LifecycleManager, Mode, Outcome};
use devnest::session::SessionName;
use devnest::testing::{FakeWindow, RecordingGit, RecordingTmux};
use devnest::workspace::{CONTEXT_FILE, ExistenceState, MARKER_FILE};

type Manager = LifecycleManager<RecordingGit, RecordingTmux>;

fn manager() -> (Manager, RecordingGit, RecordingTmux) {
    let git = RecordingGit::new();
    let tmux = RecordingTmux::new();
    (LifecycleManager::new(git.clone(), tmux.clone()), git, tmux)
}

/// Settings from the documented example: two repositories, `chat` as the
/// main command, a shell window and a git window
fn example_settings() -> Settings {
    let layer = PartialSettings::from_toml_str(
        r#"
        [dev]
        repos = ["https://x/a.git", "https://x/b.git"]
        main_command = "chat"

        [dev.windows]
        shell = ""
        git = "lazygit"
        files = false
        "#,
        Path::new("test.toml"),
    )
    .unwrap();

    resolve(Settings::default(), [layer], &Overrides::default()).unwrap()
}

fn workspace_path(temp_dir: &TempDir, name: &str) -> PathBuf {
    temp_dir.path().join(name)
}

/// (name, url) of every recorded attachment
fn attachment_summary(git: &RecordingGit, root: &Path) -> Vec<(String, String)> {
    git.recorded(root)
        .into_iter()
        .map(|a| (a.name, a.url))
        .collect()
}

/// Log output captured from a scoped subscriber
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    (logs, tracing::subscriber::set_default(subscriber))
}

#[tokio::test]
async fn test_enter_fresh_workspace_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let path = workspace_path(&temp_dir, "feature-login");
    let (manager, git, tmux) = manager();

    let outcome = manager
        .run(&path, Mode::Enter, &example_settings())
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Entered { created_session: true });

    // Workspace on disk
    assert!(path.join(MARKER_FILE).is_file());
    assert!(path.join(CONTEXT_FILE).is_file());
    assert!(path.join("a").is_dir());
    assert!(path.join("b").is_dir());
    assert_eq!(
        attachment_summary(&git, &path),
        vec![
            ("a".to_string(), "https://x/a.git".to_string()),
            ("b".to_string(), "https://x/b.git".to_string()),
        ]
    );

    // Session named after the directory, three windows in order
    assert_eq!(tmux.session_names(), vec!["feature-login"]);
    assert_eq!(tmux.cwd("feature-login"), Some(path.clone()));
    assert_eq!(
        tmux.windows("feature-login"),
        vec![
            FakeWindow {
                name: "main".to_string(),
                panes: 1,
                command: Some("chat".to_string()),
                typed: vec![],
            },
            FakeWindow {
                name: "shell".to_string(),
                panes: 2,
                command: None,
                typed: vec![],
            },
            FakeWindow {
                name: "git".to_string(),
                panes: 1,
                command: Some("lazygit".to_string()),
                typed: vec![],
            },
        ]
    );
    assert_eq!(tmux.attached(), vec!["feature-login"]);
}

#[tokio::test]
async fn test_window_spec_translation_order() {
    let temp_dir = TempDir::new().unwrap();
    let path = workspace_path(&temp_dir, "ws");
    let (manager, _git, tmux) = manager();

    manager
        .run(&path, Mode::Enter, &example_settings())
        .await
        .unwrap();

    let window_calls: Vec<String> = tmux
        .calls()
        .into_iter()
        .filter(|c| {
            c.starts_with("new-session") || c.starts_with("new-window") || c.starts_with("split")
        })
        .collect();
    assert_eq!(
        window_calls,
        vec![
            "new-session ws main",
            "new-window ws shell",
            "split-window ws shell",
            "new-window ws git",
        ]
    );
}

#[tokio::test]
async fn test_prompt_is_typed_literally_into_main_window() {
    let temp_dir = TempDir::new().unwrap();
    let path = workspace_path(&temp_dir, "ws");
    let (manager, _git, tmux) = manager();

    let layer = PartialSettings::from_toml_str(
        "[dev]\nmain_command = \"chat\"\ndefault_prompt = \"Review $(whoami) 'now'\"\n",
        Path::new("test.toml"),
    )
    .unwrap();
    let overrides = Overrides {
        prompt: None,
        extra: Some("and run the tests".to_string()),
    };
    let settings = resolve(Settings::default(), [layer], &overrides).unwrap();

    manager.run(&path, Mode::Enter, &settings).await.unwrap();

    let main = &tmux.windows("ws")[0];
    assert_eq!(
        main.typed,
        vec![
            "Review $(whoami) 'now'\nand run the tests".to_string(),
            "<Enter>".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_ensure_workspace_twice_is_a_no_op() {
    let temp_dir = TempDir::new().unwrap();
    let path = workspace_path(&temp_dir, "ws");
    let (manager, git, _tmux) = manager();
    let settings = example_settings();

    let first = manager
        .composer()
        .ensure_workspace(&path, &settings.dev)
        .await
        .unwrap();
    let attach_calls = git.attach_calls();
    let commits = git.commits();

    let second = manager
        .composer()
        .ensure_workspace(&path, &settings.dev)
        .await
        .unwrap();

    assert!(first.changed());
    assert!(!second.changed());
    assert_eq!(second.workspace, first.workspace);
    assert_eq!(git.attach_calls(), attach_calls);
    assert_eq!(git.commits(), commits);
}

#[tokio::test]
async fn test_conflicting_remote_leaves_existing_attachment() {
    let temp_dir = TempDir::new().unwrap();
    let path = workspace_path(&temp_dir, "ws");
    let (manager, git, _tmux) = manager();

    manager
        .run(&path, Mode::EnterNoSession, &example_settings())
        .await
        .unwrap();
    let before = attachment_summary(&git, &path);

    let err = manager
        .composer()
        .attach_repository(&path, "https://elsewhere/a.git")
        .await
        .unwrap_err();

    match err {
        Error::Workspace(WorkspaceError::RepositoryConflict {
            name,
            recorded,
            requested,
        }) => {
            assert_eq!(name, "a");
            assert_eq!(recorded, "https://x/a.git");
            assert_eq!(requested, "https://elsewhere/a.git");
        }
        other => panic!("expected RepositoryConflict, got {other:?}"),
    }
    assert_eq!(attachment_summary(&git, &path), before);
}

#[tokio::test]
async fn test_conflict_in_settings_reports_partial_success() {
    let temp_dir = TempDir::new().unwrap();
    let path = workspace_path(&temp_dir, "ws");
    let (manager, git, tmux) = manager();

    manager
        .run(&path, Mode::EnterNoSession, &example_settings())
        .await
        .unwrap();

    let mut settings = example_settings();
    settings.dev.repos = vec![
        "https://x/c.git".to_string(),
        "https://elsewhere/b.git".to_string(),
        "https://x/d.git".to_string(),
    ];
    let err = manager
        .run(&path, Mode::Enter, &settings)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "RepositoryConflictError");
    let names: Vec<_> = attachment_summary(&git, &path)
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert!(tmux.calls().is_empty());
}

#[test]
fn test_session_name_depends_only_on_basename() {
    let a = SessionName::derive(Path::new("/home/alice/work/api")).unwrap();
    let b = SessionName::derive(Path::new("/srv/checkouts/api")).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.as_str(), "api");
}

#[tokio::test]
async fn test_enter_after_destroy_matches_fresh_enter() {
    let temp_dir = TempDir::new().unwrap();
    let reused = workspace_path(&temp_dir, "reused");
    let (manager, git, tmux) = manager();
    let settings = example_settings();

    manager.run(&reused, Mode::Enter, &settings).await.unwrap();
    let outcome = manager
        .run(&reused, Mode::Destroy(&AssumeYes), &settings)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Destroyed { session_killed: true });
    assert!(!reused.exists());
    assert!(tmux.session_names().is_empty());

    manager.run(&reused, Mode::Enter, &settings).await.unwrap();

    // A never-used path with the same basename, on separate surfaces
    let fresh_dir = TempDir::new().unwrap();
    let fresh = workspace_path(&fresh_dir, "reused");
    let (fresh_manager, fresh_git, fresh_tmux) = crate::manager();
    fresh_manager.run(&fresh, Mode::Enter, &settings).await.unwrap();

    assert_eq!(
        attachment_summary(&git, &reused),
        attachment_summary(&fresh_git, &fresh)
    );
    assert_eq!(tmux.windows("reused"), fresh_tmux.windows("reused"));
}

#[tokio::test]
async fn test_session_failure_recovers_without_reattaching() {
    let temp_dir = TempDir::new().unwrap();
    let path = workspace_path(&temp_dir, "ws");
    let (manager, git, tmux) = manager();
    let settings = example_settings();

    tmux.fail_window("git");
    let err = manager.run(&path, Mode::Enter, &settings).await.unwrap_err();
    assert_eq!(err.kind(), "ExecutionError");
    assert_eq!(
        manager.state(&path).await.unwrap(),
        ExistenceState::InitializedNoSession
    );
    let attach_calls = git.attach_calls();
    assert_eq!(attach_calls, 2);

    tmux.clear_failures();
    let outcome = manager.run(&path, Mode::Enter, &settings).await.unwrap();

    assert_eq!(outcome, Outcome::Entered { created_session: true });
    assert_eq!(git.attach_calls(), attach_calls);
    assert_eq!(tmux.windows("ws").len(), 3);
    assert_eq!(
        manager.state(&path).await.unwrap(),
        ExistenceState::InitializedWithSession
    );
}

#[tokio::test]
async fn test_enter_existing_session_focuses_main_window() {
    let temp_dir = TempDir::new().unwrap();
    let path = workspace_path(&temp_dir, "ws");
    let (manager, _git, tmux) = manager();
    let settings = example_settings();

    manager.run(&path, Mode::Enter, &settings).await.unwrap();
    let created = tmux
        .calls()
        .iter()
        .filter(|c| c.starts_with("new-"))
        .count();

    let outcome = manager.run(&path, Mode::Enter, &settings).await.unwrap();

    assert_eq!(outcome, Outcome::Entered { created_session: false });
    assert_eq!(
        tmux.calls().iter().filter(|c| c.starts_with("new-")).count(),
        created
    );
    assert_eq!(tmux.calls().last().map(String::as_str), Some("attach ws"));
    assert_eq!(tmux.selected("ws").as_deref(), Some("main"));
}

#[tokio::test]
async fn test_enter_no_session_never_touches_tmux() {
    let temp_dir = TempDir::new().unwrap();
    let path = workspace_path(&temp_dir, "ws");
    let (manager, git, tmux) = manager();

    let outcome = manager
        .run(&path, Mode::EnterNoSession, &example_settings())
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Prepared);
    assert_eq!(git.recorded(&path).len(), 2);
    assert!(tmux.calls().is_empty());
}

struct Decline;

impl Confirm for Decline {
    fn confirm(&self, plan: &DestroyPlan) -> bool {
        assert!(plan.directory_present);
        false
    }
}

#[tokio::test]
async fn test_declined_destroy_keeps_everything() {
    let temp_dir = TempDir::new().unwrap();
    let path = workspace_path(&temp_dir, "ws");
    let (manager, _git, tmux) = manager();
    let settings = example_settings();

    manager.run(&path, Mode::Enter, &settings).await.unwrap();
    let outcome = manager
        .run(&path, Mode::Destroy(&Decline), &settings)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Aborted);
    assert!(path.join(MARKER_FILE).exists());
    assert_eq!(tmux.session_names(), vec!["ws"]);
}

#[tokio::test]
async fn test_destroy_refuses_unmarked_directory() {
    let temp_dir = TempDir::new().unwrap();
    let path = workspace_path(&temp_dir, "photos");
    std::fs::create_dir(&path).unwrap();
    std::fs::write(path.join("holiday.jpg"), b"jpeg").unwrap();
    let (manager, _git, _tmux) = manager();

    let err = manager
        .run(&path, Mode::Destroy(&AssumeYes), &example_settings())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Workspace(WorkspaceError::NotAWorkspace(_))));
    assert!(path.join("holiday.jpg").exists());
}

#[tokio::test]
async fn test_destroy_without_session_is_fine() {
    let temp_dir = TempDir::new().unwrap();
    let path = workspace_path(&temp_dir, "ws");
    let (manager, _git, _tmux) = manager();
    let settings = example_settings();

    manager
        .run(&path, Mode::EnterNoSession, &settings)
        .await
        .unwrap();
    let outcome = manager
        .run(&path, Mode::Destroy(&AssumeYes), &settings)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Destroyed { session_killed: false });
    assert!(!path.exists());
}

#[tokio::test]
async fn test_destroy_warns_when_session_not_running() {
    let temp_dir = TempDir::new().unwrap();
    let path = workspace_path(&temp_dir, "ws");
    let (manager, _git, _tmux) = manager();
    let settings = example_settings();

    manager
        .run(&path, Mode::EnterNoSession, &settings)
        .await
        .unwrap();

    let (logs, _guard) = capture_logs();
    let outcome = manager
        .run(&path, Mode::Destroy(&AssumeYes), &settings)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Destroyed { session_killed: false });
    let logs = logs.contents();
    assert!(
        logs.lines()
            .any(|l| l.contains("WARN") && l.contains("Session ws was not running")),
        "missing warning in:\n{logs}"
    );
}

#[tokio::test]
async fn test_concurrently_started_session_is_reused() {
    let temp_dir = TempDir::new().unwrap();
    let path = workspace_path(&temp_dir, "ws");
    let (manager, _git, tmux) = manager();
    tmux.race_session("ws", &path);

    let outcome = manager
        .run(&path, Mode::Enter, &example_settings())
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Entered { created_session: false });
    assert_eq!(tmux.attached(), vec!["ws"]);
    // The other client's layout is left as it was
    assert_eq!(tmux.windows("ws").len(), 1);
}

#[tokio::test]
async fn test_attach_to_missing_session_is_an_error() {
    let (manager, _git, _tmux) = manager();
    let name = SessionName::parse("nowhere").unwrap();

    let err = manager.sessions().attach(&name).await.unwrap_err();
    assert_eq!(err.kind(), "SessionNotFoundError");
    assert!(matches!(err, Error::Session(SessionError::NotFound(n)) if n == "nowhere"));
}
