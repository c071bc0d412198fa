//! Shell Environment
//!
//! Main entry point for the interpreter session. Ties together the
//! materialized filesystem, session state, command dispatch, and the
//! audit log.
//!
//! The session has exactly two states: Active, in which commands are
//! dispatched and recorded, and Terminated, entered one-way via `exit`
//! after the audit log has been flushed.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error};

use crate::audit::AuditLog;
use crate::commands::{file, nav, CommandError};
use crate::fs::{FileSystem, InMemoryFs};
use crate::session::SessionState;

const FAREWELL: &str = "Session terminated.";

/// Options for creating a shell session.
#[derive(Default)]
pub struct ShellOptions {
    /// Session identifier shown in the prompt (defaults to "user")
    pub username: Option<String>,
    /// File system holding the materialized tree (defaults to an empty InMemoryFs)
    pub fs: Option<Arc<dyn FileSystem>>,
    /// Tree root the logical paths map under (defaults to "/")
    pub root: Option<String>,
    /// Audit log destination; when absent the flush on exit is skipped
    pub log_path: Option<PathBuf>,
}

/// Result of one dispatched command.
#[derive(Debug, Clone)]
pub struct ExecResult {
    pub text: String,
    pub terminated: bool,
}

/// One interpreter session over a materialized tree.
pub struct Shell {
    fs: Arc<dyn FileSystem>,
    root: String,
    state: SessionState,
    audit: AuditLog,
    log_path: Option<PathBuf>,
    terminated: bool,
}

impl Shell {
    pub fn new(options: ShellOptions) -> Self {
        let username = options.username.unwrap_or_else(|| "user".to_string());
        let fs: Arc<dyn FileSystem> = options
            .fs
            .unwrap_or_else(|| Arc::new(InMemoryFs::new()));
        let root = options.root.unwrap_or_else(|| "/".to_string());

        Self {
            fs,
            root,
            audit: AuditLog::new(&username),
            state: SessionState::new(username),
            log_path: options.log_path,
            terminated: false,
        }
    }

    /// Prompt text for the front-end.
    pub fn prompt(&self) -> String {
        self.state.prompt()
    }

    pub fn current_dir(&self) -> &str {
        self.state.current_dir()
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Execute one raw command line.
    ///
    /// Never fails: every handler error is folded into the result text at
    /// this boundary, and each non-empty command appends exactly one audit
    /// record. After termination this is a no-op.
    pub async fn execute(&mut self, raw: &str) -> ExecResult {
        if self.terminated {
            return ExecResult {
                text: String::new(),
                terminated: true,
            };
        }

        let tokens: Vec<&str> = raw.split_whitespace().collect();
        let Some((&verb, args)) = tokens.split_first() else {
            // Blank input is not a command; nothing is recorded.
            return ExecResult {
                text: String::new(),
                terminated: false,
            };
        };

        debug!(verb, "dispatching command");

        if verb == "exit" {
            return self.terminate(raw);
        }

        let text = match self.dispatch(verb, args).await {
            Ok(text) => text,
            Err(err) => err.to_string(),
        };
        self.audit.record(raw, &text);

        ExecResult {
            text,
            terminated: false,
        }
    }

    async fn dispatch(&mut self, verb: &str, args: &[&str]) -> Result<String, CommandError> {
        match verb {
            "ls" => nav::list(self.fs.as_ref(), &self.root, &self.state).await,
            "cd" => {
                let target = args.first().copied().unwrap_or("/");
                nav::change_directory(self.fs.as_ref(), &self.root, &mut self.state, target).await
            }
            "cat" => {
                let name = required_operand(verb, args)?;
                file::cat(self.fs.as_ref(), &self.root, self.state.current_dir(), name).await
            }
            "tac" => {
                let name = required_operand(verb, args)?;
                file::tac(self.fs.as_ref(), &self.root, self.state.current_dir(), name).await
            }
            "head" => {
                file::head(self.fs.as_ref(), &self.root, self.state.current_dir(), args).await
            }
            other => Err(CommandError::Unsupported(other.to_string())),
        }
    }

    /// Handle `exit`: stage the termination record, flush, then flip to
    /// Terminated. A failed flush keeps the session Active so no record is
    /// silently dropped.
    fn terminate(&mut self, raw: &str) -> ExecResult {
        self.audit.record(raw, FAREWELL);

        if let Some(path) = &self.log_path {
            if let Err(err) = self.audit.flush(path) {
                error!(%err, path = %path.display(), "audit log flush failed");
                let text = format!("Error: failed to flush audit log: {}", err);
                self.audit.amend_last(&text);
                return ExecResult {
                    text,
                    terminated: false,
                };
            }
        }

        self.terminated = true;
        ExecResult {
            text: FAREWELL.to_string(),
            terminated: true,
        }
    }
}

fn required_operand<'a>(verb: &str, args: &[&'a str]) -> Result<&'a str, CommandError> {
    args.first()
        .copied()
        .ok_or_else(|| CommandError::Malformed(format!("{}: missing file operand", verb)))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    async fn make_shell(log_path: Option<PathBuf>) -> Shell {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/file1.txt", b"a\nb\na\n", 0o644).await.unwrap();
        fs.write_file("/file2.txt", b"1\n2\n3\n", 0o644).await.unwrap();
        fs.write_file("/subdir/file3.txt", b"nested\n", 0o644)
            .await
            .unwrap();
        Shell::new(ShellOptions {
            username: Some("alice".to_string()),
            fs: Some(fs),
            log_path,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_prompt_combines_user_and_dir() {
        let mut shell = make_shell(None).await;
        assert_eq!(shell.prompt(), "alice:/$ ");
        shell.execute("cd subdir").await;
        assert_eq!(shell.prompt(), "alice:/subdir$ ");
    }

    #[tokio::test]
    async fn test_ls_lists_children() {
        let mut shell = make_shell(None).await;
        let result = shell.execute("ls").await;
        assert_eq!(result.text, "file1.txt  file2.txt  subdir");
        assert!(!result.terminated);
    }

    #[tokio::test]
    async fn test_cd_then_ls() {
        let mut shell = make_shell(None).await;
        let result = shell.execute("cd subdir").await;
        assert_eq!(result.text, "Changed directory to '/subdir'.");
        let result = shell.execute("ls").await;
        assert_eq!(result.text, "file3.txt");
    }

    #[tokio::test]
    async fn test_cd_without_argument_goes_to_root() {
        let mut shell = make_shell(None).await;
        shell.execute("cd subdir").await;
        let result = shell.execute("cd").await;
        assert_eq!(result.text, "Changed directory to '/'.");
        assert_eq!(shell.current_dir(), "/");
    }

    #[tokio::test]
    async fn test_failed_cd_leaves_state_unchanged() {
        let mut shell = make_shell(None).await;
        let result = shell.execute("cd nope").await;
        assert_eq!(result.text, "Directory 'nope' does not exist.");
        assert_eq!(shell.current_dir(), "/");
    }

    #[tokio::test]
    async fn test_non_cd_commands_do_not_move_current_dir() {
        let mut shell = make_shell(None).await;
        shell.execute("cd subdir").await;
        for command in [
            "ls",
            "cat file3.txt",
            "tac file3.txt",
            "head 1 file3.txt",
            "cat missing",
            "bogus",
        ] {
            shell.execute(command).await;
            assert_eq!(shell.current_dir(), "/subdir", "after '{}'", command);
        }
    }

    #[tokio::test]
    async fn test_cat_via_dispatcher() {
        let mut shell = make_shell(None).await;
        let result = shell.execute("cat file1.txt").await;
        assert_eq!(result.text, "a\nb\na\n");
    }

    #[tokio::test]
    async fn test_tac_via_dispatcher() {
        let mut shell = make_shell(None).await;
        let result = shell.execute("tac file2.txt").await;
        assert_eq!(result.text, "3\n2\n1");
    }

    #[tokio::test]
    async fn test_head_via_dispatcher() {
        let mut shell = make_shell(None).await;
        let result = shell.execute("head 2 file2.txt").await;
        assert_eq!(result.text, "1\n2");
    }

    #[tokio::test]
    async fn test_missing_operand_is_an_error_result() {
        let mut shell = make_shell(None).await;
        let result = shell.execute("cat").await;
        assert_eq!(result.text, "Error: cat: missing file operand");
        let result = shell.execute("tac").await;
        assert_eq!(result.text, "Error: tac: missing file operand");
        let result = shell.execute("head").await;
        assert_eq!(result.text, "Error: head: missing file operand");
    }

    #[tokio::test]
    async fn test_bad_head_count_is_an_error_result() {
        let mut shell = make_shell(None).await;
        let result = shell.execute("head five file2.txt").await;
        assert_eq!(result.text, "Error: invalid line count 'five'");
        // The session stays usable afterwards.
        let result = shell.execute("ls").await;
        assert!(!result.text.is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_verb_names_the_verb() {
        let mut shell = make_shell(None).await;
        let result = shell.execute("grep foo bar").await;
        assert_eq!(result.text, "Command 'grep' is not supported.");
        assert!(!result.terminated);
    }

    #[tokio::test]
    async fn test_blank_input_records_nothing() {
        let mut shell = make_shell(None).await;
        let result = shell.execute("   ").await;
        assert_eq!(result.text, "");
        assert!(shell.audit().is_empty());
    }

    #[tokio::test]
    async fn test_every_command_is_recorded() {
        let mut shell = make_shell(None).await;
        shell.execute("ls").await;
        shell.execute("cat missing").await;
        shell.execute("bogus").await;
        let records = shell.audit().records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].command, "ls");
        assert_eq!(records[1].result, "File 'missing' does not exist.");
        assert_eq!(records[2].result, "Command 'bogus' is not supported.");
    }

    #[tokio::test]
    async fn test_exit_flushes_one_record_per_command() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.json");
        let mut shell = make_shell(Some(path.clone())).await;

        shell.execute("ls").await;
        shell.execute("cat file1.txt").await;
        let result = shell.execute("exit").await;
        assert_eq!(result.text, "Session terminated.");
        assert!(result.terminated);
        assert!(shell.is_terminated());

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["session"], "alice");
        let records = value["records"].as_array().unwrap();
        // One per prior command plus the termination record.
        assert_eq!(records.len(), 3);
        assert_eq!(records[2]["command"], "exit");
        assert_eq!(records[2]["result"], "Session terminated.");
    }

    #[tokio::test]
    async fn test_execute_after_termination_is_a_noop() {
        let mut shell = make_shell(None).await;
        shell.execute("exit").await;
        let before = shell.audit().len();
        let result = shell.execute("ls").await;
        assert!(result.terminated);
        assert_eq!(result.text, "");
        assert_eq!(shell.audit().len(), before);
    }

    #[tokio::test]
    async fn test_flush_failure_keeps_session_active() {
        let mut shell = make_shell(Some(PathBuf::from("/nonexistent/dir/audit.json"))).await;
        shell.execute("ls").await;
        let result = shell.execute("exit").await;
        assert!(result.text.starts_with("Error: failed to flush audit log"));
        assert!(!result.terminated);
        assert!(!shell.is_terminated());
        // The attempt is recorded with its actual outcome; nothing dropped.
        assert_eq!(shell.audit().len(), 2);
        assert!(shell.audit().records()[1].result.starts_with("Error:"));
    }

    #[tokio::test]
    async fn test_exit_without_log_path() {
        let mut shell = make_shell(None).await;
        let result = shell.execute("exit").await;
        assert!(result.terminated);
        assert_eq!(shell.audit().len(), 1);
    }
}
