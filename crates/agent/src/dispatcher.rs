//! Launching the external notification handler.
//!
//! [`NotificationDispatcher`] turns an event id and the configured handler
//! name into a [`HandlerInvocation`] and hands it to a [`Launcher`]. The
//! production launcher, [`ProcessLauncher`], spawns the handler as an
//! independent process with a cleared environment and does not wait for it.
//!
//! Launch failures are logged and absorbed: the caller always gets a
//! [`DispatchOutcome`] back, never an error.

use std::num::NonZeroU32;
use std::process::Stdio;
use std::sync::Arc;

use loadwatch_core::event::{ENV_EVENT_ID, HANDLER_HOME, HANDLER_PATH};
use loadwatch_core::EventKind;

/// Argument and environment vectors for a single handler launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerInvocation {
    /// Program to execute (the configured handler name).
    pub program: String,
    /// Full argument vector, `argv[0]` included.
    pub argv: Vec<String>,
    /// Complete environment of the child; nothing is inherited.
    pub env: Vec<(String, String)>,
}

impl HandlerInvocation {
    pub fn new(event_id: NonZeroU32, handler_name: &str) -> Self {
        Self {
            program: handler_name.to_string(),
            argv: vec![handler_name.to_string()],
            env: vec![
                ("HOME".to_string(), HANDLER_HOME.to_string()),
                ("PATH".to_string(), HANDLER_PATH.to_string()),
                (ENV_EVENT_ID.to_string(), event_id.to_string()),
            ],
        }
    }

    /// Value of environment variable `key` in this invocation.
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Errors raised while starting a handler process.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Failed to launch handler '{handler}': {source}")]
    Launch {
        handler: String,
        #[source]
        source: std::io::Error,
    },
}

/// Starts a handler process for an invocation.
///
/// Implementations must return as soon as the process is started (or has
/// failed to start); they must not wait for it to finish.
pub trait Launcher: Send + Sync {
    /// Start the handler. Returns the child's pid when known.
    fn launch(&self, invocation: &HandlerInvocation) -> Result<Option<u32>, DispatchError>;
}

/// Spawns handlers as real child processes.
///
/// Must be used from within a Tokio runtime: the dropped child handle is
/// reaped in the background by the runtime rather than left as a zombie.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    fn launch(&self, invocation: &HandlerInvocation) -> Result<Option<u32>, DispatchError> {
        let mut cmd = tokio::process::Command::new(&invocation.program);
        cmd.args(invocation.argv.iter().skip(1))
            .env_clear()
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(HANDLER_HOME)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let child = cmd.spawn().map_err(|source| DispatchError::Launch {
            handler: invocation.program.clone(),
            source,
        })?;

        // Dropping the handle neither kills nor waits for the child.
        Ok(child.id())
    }
}

/// Result of a single dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No handler configured; nothing was launched.
    Skipped,
    /// The handler process was started.
    Launched { pid: Option<u32> },
    /// The handler could not be started. Already logged.
    Failed,
}

/// Builds handler invocations and launches them.
#[derive(Clone)]
pub struct NotificationDispatcher {
    launcher: Arc<dyn Launcher>,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher").finish_non_exhaustive()
    }
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new(Arc::new(ProcessLauncher))
    }
}

impl NotificationDispatcher {
    pub fn new(launcher: Arc<dyn Launcher>) -> Self {
        Self { launcher }
    }

    /// Launch `handler_name` for `event_id`.
    ///
    /// An empty handler name is a configured no-op. Launch errors are
    /// logged and reported as [`DispatchOutcome::Failed`]; there is no
    /// retry.
    pub fn dispatch(&self, event_id: NonZeroU32, handler_name: &str) -> DispatchOutcome {
        if handler_name.is_empty() {
            tracing::debug!(event_id = event_id.get(), "No handler configured, skipping dispatch");
            return DispatchOutcome::Skipped;
        }

        let raw_id = event_id.get();
        let kind = EventKind::from_id(raw_id).unwrap_or(EventKind::Other(raw_id));
        let invocation = HandlerInvocation::new(event_id, handler_name);

        match self.launcher.launch(&invocation) {
            Ok(pid) => {
                tracing::info!(event_id = raw_id, %kind, handler = %handler_name, ?pid, "Handler launched");
                DispatchOutcome::Launched { pid }
            }
            Err(e) => {
                tracing::error!(event_id = raw_id, %kind, error = %e, "Handler launch failed");
                DispatchOutcome::Failed
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use assert_matches::assert_matches;

    use super::*;

    /// Launcher that records invocations instead of spawning processes.
    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<HandlerInvocation>>,
        fail: bool,
    }

    impl Launcher for Recorder {
        fn launch(&self, invocation: &HandlerInvocation) -> Result<Option<u32>, DispatchError> {
            self.seen.lock().expect("recorder lock").push(invocation.clone());
            if self.fail {
                return Err(DispatchError::Launch {
                    handler: invocation.program.clone(),
                    source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
                });
            }
            Ok(Some(4242))
        }
    }

    fn id(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).expect("non-zero id")
    }

    #[test]
    fn invocation_follows_the_handler_contract() {
        let inv = HandlerInvocation::new(id(1), "notifyd");
        assert_eq!(inv.program, "notifyd");
        assert_eq!(inv.argv, vec!["notifyd".to_string()]);
        assert_eq!(inv.env_var("HOME"), Some("/"));
        assert_eq!(inv.env_var("PATH"), Some("/sbin:/usr/sbin:/bin:/usr/bin"));
        assert_eq!(inv.env_var("TROUBLED_DS"), Some("1"));
        assert_eq!(inv.env.len(), 3);
    }

    #[test]
    fn event_id_is_rendered_in_decimal() {
        let inv = HandlerInvocation::new(id(4_000_000_000), "h");
        assert_eq!(inv.env_var(ENV_EVENT_ID), Some("4000000000"));
    }

    #[test]
    fn empty_handler_launches_nothing() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = NotificationDispatcher::new(recorder.clone());

        assert_eq!(dispatcher.dispatch(id(2), ""), DispatchOutcome::Skipped);
        assert!(recorder.seen.lock().expect("recorder lock").is_empty());
    }

    #[test]
    fn configured_handler_is_launched_once() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = NotificationDispatcher::new(recorder.clone());

        let outcome = dispatcher.dispatch(id(1), "notifyd");
        assert_eq!(outcome, DispatchOutcome::Launched { pid: Some(4242) });

        let seen = recorder.seen.lock().expect("recorder lock");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].env_var("TROUBLED_DS"), Some("1"));
    }

    #[test]
    fn launch_failure_is_absorbed() {
        let recorder = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let dispatcher = NotificationDispatcher::new(recorder);
        assert_eq!(dispatcher.dispatch(id(1), "notifyd"), DispatchOutcome::Failed);
    }

    #[tokio::test]
    async fn missing_program_is_a_launch_error() {
        let inv = HandlerInvocation::new(id(1), "/nonexistent/loadwatch-handler");
        let result = ProcessLauncher.launch(&inv);
        assert_matches!(result, Err(DispatchError::Launch { ref handler, .. }) if handler == "/nonexistent/loadwatch-handler");
    }

    #[test]
    fn display_launch_error() {
        let err = DispatchError::Launch {
            handler: "notifyd".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(err.to_string(), "Failed to launch handler 'notifyd': gone");
        assert!(std::error::Error::source(&err).is_some());
    }
}
