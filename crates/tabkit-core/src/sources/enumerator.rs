//! Local tab enumeration.
//!
//! The live list of open tabs comes from an OS scripting bridge (JXA through
//! `osascript` by default). A decoded session file can stand in for it when
//! the browser exposes no scripting interface.

use crate::codec::load_session_tabs;
use crate::error::{Result, TabkitError};
use crate::models::LocalTab;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

/// Source of the tabs open on this machine.
#[async_trait]
pub trait TabEnumerator: Send + Sync {
    async fn list_tabs(&self) -> Result<Vec<LocalTab>>;
}

/// Runs a script that prints a JSON array of `{title, url, windowId, index}`.
#[derive(Debug, Clone)]
pub struct ScriptTabEnumerator {
    program: String,
    args: Vec<String>,
}

impl ScriptTabEnumerator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Enumerate the tabs of a scriptable browser application via JXA.
    pub fn for_application(app_name: &str) -> Self {
        let script = format!(
            r#"const app = Application({name});
if (!app.running()) {{ throw new Error({name} + " is not running"); }}
const tabs = [];
app.windows().forEach((w) => {{
  w.tabs().forEach((t, i) => {{
    tabs.push({{ title: t.title() || "", url: t.url() || "", windowId: w.id(), index: i }});
  }});
}});
JSON.stringify(tabs);"#,
            name = serde_json::Value::String(app_name.to_string())
        );
        Self::new(
            "osascript",
            vec!["-l".into(), "JavaScript".into(), "-e".into(), script],
        )
    }

    fn permission_denied(&self, detail: &str) -> TabkitError {
        TabkitError::PermissionDenied {
            path: PathBuf::from(&self.program),
            message: format!(
                "{}. Allow automation of the browser in System Settings > Privacy & Security",
                detail
            ),
        }
    }
}

#[async_trait]
impl TabEnumerator for ScriptTabEnumerator {
    async fn list_tabs(&self) -> Result<Vec<LocalTab>> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .await
            .map_err(|e| TabkitError::Enumeration {
                message: format!("failed to run {}: {}", self.program, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let lowered = stderr.to_lowercase();
            if lowered.contains("-1743")
                || lowered.contains("not authorized")
                || lowered.contains("not allowed")
            {
                return Err(self.permission_denied(&stderr));
            }
            return Err(TabkitError::Enumeration {
                message: if stderr.is_empty() {
                    format!("{} exited with {}", self.program, output.status)
                } else {
                    stderr
                },
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = stdout.trim();
        if stdout.is_empty() {
            return Ok(Vec::new());
        }
        let tabs: Vec<LocalTab> =
            serde_json::from_str(stdout).map_err(|e| TabkitError::Enumeration {
                message: format!("unexpected enumerator output: {}", e),
            })?;
        debug!("Enumerated {} local tabs via {}", tabs.len(), self.program);
        Ok(tabs)
    }
}

/// Reads the local tab list from a session-store frame on disk.
#[derive(Debug, Clone)]
pub struct SessionFileEnumerator {
    path: PathBuf,
}

impl SessionFileEnumerator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TabEnumerator for SessionFileEnumerator {
    async fn list_tabs(&self) -> Result<Vec<LocalTab>> {
        load_session_tabs(&self.path).await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(script: &str) -> ScriptTabEnumerator {
        ScriptTabEnumerator::new("sh", vec!["-c".into(), script.into()])
    }

    #[tokio::test]
    async fn test_parses_script_output() {
        let enumerator = shell(
            r#"printf '[{"title":"Docs","url":"https://a","windowId":7,"index":0}]'"#,
        );
        let tabs = enumerator.list_tabs().await.unwrap();
        assert_eq!(tabs.len(), 1);
        assert_eq!(tabs[0].title, "Docs");
        assert_eq!(tabs[0].window_id, 7);
    }

    #[tokio::test]
    async fn test_empty_output_is_empty_list() {
        assert!(shell("true").list_tabs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_not_authorized_is_permission_denied() {
        let err = shell("echo 'Not authorized to send Apple events (-1743)' >&2; exit 1")
            .list_tabs()
            .await
            .unwrap_err();
        assert!(err.is_permission_denied());
    }

    #[tokio::test]
    async fn test_app_not_running_is_enumeration_error() {
        let err = shell("echo 'Error: Firefox is not running' >&2; exit 1")
            .list_tabs()
            .await
            .unwrap_err();
        assert!(matches!(err, TabkitError::Enumeration { .. }));
    }

    #[tokio::test]
    async fn test_missing_program_is_enumeration_error() {
        let err = ScriptTabEnumerator::new("/nonexistent/osascript", vec![])
            .list_tabs()
            .await
            .unwrap_err();
        assert!(matches!(err, TabkitError::Enumeration { .. }));
    }

    #[tokio::test]
    async fn test_garbage_output_is_enumeration_error() {
        let err = shell("echo not-json").list_tabs().await.unwrap_err();
        assert!(matches!(err, TabkitError::Enumeration { .. }));
    }

    #[test]
    fn test_for_application_quotes_name() {
        let enumerator = ScriptTabEnumerator::for_application("Zen \"Beta\"");
        assert_eq!(enumerator.program, "osascript");
        assert!(enumerator.args[3].contains(r#"Application("Zen \"Beta\"")"#));
    }
}
