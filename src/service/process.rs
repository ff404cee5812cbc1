// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Home server run as a local child process.
//!
//! ## Lifecycle
//!
//! 1. **Start**: refuse when `PORT` is already taken, spawn the executable
//!    inside the data directory with the environment descriptor, pump
//!    stdout/stderr lines into the log sink, then poll `127.0.0.1:PORT` until
//!    it accepts connections or the child exits. The child must still be alive
//!    once the port answers.
//! 2. **Stop**: ask the child to terminate (SIGTERM on unix), wait up to the
//!    stop timeout, then kill it.
//!
//! Log pumps are cancelled through a `CancellationToken` once the child is gone.

use std::net::TcpListener as StdTcpListener;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{HomeServerService, LogSink, ServiceFactory, StartOptions};
use crate::config::{DATA_DIR_ENV, DEFAULT_READY_TIMEOUT};
use crate::environment::{self, Environment};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(300);
const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);
const PREMIUM_ACTIVATION_COMMAND: &str = "activate-premium";

/// How to launch and supervise the home server executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSettings {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub ready_timeout: Duration,
    pub poll_interval: Duration,
    pub stop_timeout: Duration,
}

impl ProcessSettings {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            ready_timeout: DEFAULT_READY_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_ready_timeout(mut self, ready_timeout: Duration) -> Self {
        self.ready_timeout = ready_timeout;
        self
    }
}

struct RunningServer {
    child: Child,
    pumps: CancellationToken,
}

/// Launch parameters of the most recent start, reused for one-off commands.
#[derive(Clone)]
struct LaunchContext {
    data_directory: PathBuf,
    environment: Environment,
}

/// [`HomeServerService`] backed by a tokio child process.
pub struct ChildProcessService {
    settings: ProcessSettings,
    running: Mutex<Option<RunningServer>>,
    last_launch: Mutex<Option<LaunchContext>>,
}

impl ChildProcessService {
    pub fn new(settings: ProcessSettings) -> Self {
        Self {
            settings,
            running: Mutex::new(None),
            last_launch: Mutex::new(None),
        }
    }

    fn command(&self, context: &LaunchContext) -> Command {
        let mut command = Command::new(&self.settings.program);
        command
            .current_dir(&context.data_directory)
            .envs(&context.environment)
            .env(DATA_DIR_ENV, &context.data_directory)
            .stdin(Stdio::null());
        command
    }

    /// Poll the server port until it opens, the child exits, or time runs out.
    async fn wait_until_ready(&self, port: u16) -> Result<(), String> {
        let deadline = Instant::now() + self.settings.ready_timeout;

        loop {
            self.ensure_child_alive().await?;

            let probe = timeout(
                self.settings.poll_interval,
                TcpStream::connect(("127.0.0.1", port)),
            )
            .await;
            if matches!(probe, Ok(Ok(_))) {
                // Something answered; it only counts if our child is still up.
                self.ensure_child_alive().await?;
                return Ok(());
            }

            if Instant::now() >= deadline {
                return Err(format!(
                    "Home server did not become ready within {}ms.",
                    self.settings.ready_timeout.as_millis()
                ));
            }
            sleep(self.settings.poll_interval).await;
        }
    }

    async fn ensure_child_alive(&self) -> Result<(), String> {
        let mut guard = self.running.lock().await;
        let Some(server) = guard.as_mut() else {
            return Err("Home server was stopped before becoming ready.".to_string());
        };
        match server.child.try_wait() {
            Ok(None) => Ok(()),
            Ok(Some(status)) => {
                guard.take();
                Err(format!("Home server exited before becoming ready: {status}"))
            }
            Err(e) => Err(format!("Failed to poll home server process: {e}")),
        }
    }

    async fn terminate(&self, mut server: RunningServer) -> Result<(), String> {
        if let Ok(Some(status)) = server.child.try_wait() {
            debug!(%status, "Home server already exited");
            server.pumps.cancel();
            return Ok(());
        }

        request_graceful_exit(&server.child);

        let result = match timeout(self.settings.stop_timeout, server.child.wait()).await {
            Ok(Ok(status)) => {
                info!(%status, "Home server exited");
                Ok(())
            }
            Ok(Err(e)) => Err(format!("Failed to wait for home server: {e}")),
            Err(_) => {
                warn!(
                    timeout_ms = self.settings.stop_timeout.as_millis() as u64,
                    "Home server ignored graceful stop, killing"
                );
                server
                    .child
                    .kill()
                    .await
                    .map_err(|e| format!("Failed to kill home server: {e}"))
            }
        };

        server.pumps.cancel();
        result
    }
}

#[cfg(unix)]
fn request_graceful_exit(child: &Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return;
    };
    let Ok(raw) = i32::try_from(pid) else {
        warn!(pid, "Home server pid out of range, cannot signal");
        return;
    };
    if let Err(e) = kill(Pid::from_raw(raw), Signal::SIGTERM) {
        warn!(pid, error = %e, "SIGTERM failed");
    }
}

#[cfg(not(unix))]
fn request_graceful_exit(_child: &Child) {}

fn spawn_log_pump<R>(reader: R, sink: LogSink, pumps: CancellationToken, stream: &'static str)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).split(b'\n');
        loop {
            tokio::select! {
                _ = pumps.cancelled() => break,
                line = lines.next_segment() => match line {
                    Ok(Some(bytes)) => sink(decode_line(&bytes)),
                    Ok(None) => break,
                    Err(e) => {
                        warn!(stream, error = %e, "Home server log stream failed");
                        break;
                    }
                },
            }
        }
        debug!(stream, "Home server log pump finished");
    });
}

/// Child output is not guaranteed to be UTF-8.
fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\r')
        .to_string()
}

/// Another listener on `port` would answer the readiness probe for us.
fn ensure_port_free(port: u16) -> Result<(), String> {
    match StdTcpListener::bind(("0.0.0.0", port)) {
        Ok(listener) => {
            drop(listener);
            Ok(())
        }
        Err(e) => Err(format!("Port {port} is not available for the home server: {e}")),
    }
}

fn port_from(environment: &Environment) -> Result<u16, String> {
    environment
        .get("PORT")
        .and_then(|port| port.parse::<u16>().ok())
        .ok_or_else(|| "Home server environment has no valid PORT.".to_string())
}

#[async_trait]
impl HomeServerService for ChildProcessService {
    async fn start(&self, options: StartOptions) -> Result<(), String> {
        let port = port_from(&options.environment)?;

        {
            let mut guard = self.running.lock().await;
            if let Some(server) = guard.as_mut() {
                if matches!(server.child.try_wait(), Ok(None)) {
                    return Err("Home server is already running.".to_string());
                }
                guard.take();
            }

            ensure_port_free(port)?;

            let context = LaunchContext {
                data_directory: options.data_directory.clone(),
                environment: options.environment.clone(),
            };
            let mut command = self.command(&context);
            command
                .args(&self.settings.args)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            debug!(
                program = %self.settings.program.display(),
                environment = ?environment::redacted(&options.environment),
                "Launching home server"
            );

            let mut child = command
                .spawn()
                .map_err(|e| format!("Failed to launch home server: {e}"))?;

            let pumps = CancellationToken::new();
            if let Some(stdout) = child.stdout.take() {
                spawn_log_pump(stdout, options.log_sink.clone(), pumps.clone(), "stdout");
            }
            if let Some(stderr) = child.stderr.take() {
                spawn_log_pump(stderr, options.log_sink.clone(), pumps.clone(), "stderr");
            }

            info!(pid = ?child.id(), port, "Home server process spawned");
            *guard = Some(RunningServer { child, pumps });
            *self.last_launch.lock().await = Some(context);
        }

        if let Err(message) = self.wait_until_ready(port).await {
            let leftover = self.running.lock().await.take();
            if let Some(server) = leftover {
                if let Err(e) = self.terminate(server).await {
                    warn!(error = %e, "Could not clean up home server after failed start");
                }
            }
            return Err(message);
        }

        info!(port, "Home server is ready");
        Ok(())
    }

    async fn stop(&self) -> Result<(), String> {
        let Some(server) = self.running.lock().await.take() else {
            return Ok(());
        };
        self.terminate(server).await
    }

    async fn is_running(&self) -> bool {
        let mut guard = self.running.lock().await;
        let Some(server) = guard.as_mut() else {
            return false;
        };
        match server.child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                info!(%status, "Home server process has exited");
                false
            }
            Err(e) => {
                warn!(error = %e, "Failed to poll home server process");
                false
            }
        }
    }

    async fn activate_premium_features(&self, username: &str) -> Result<(), String> {
        let Some(context) = self.last_launch.lock().await.clone() else {
            return Err("Home server has not been started yet.".to_string());
        };

        let output = self
            .command(&context)
            .arg(PREMIUM_ACTIVATION_COMMAND)
            .arg(username)
            .output()
            .await
            .map_err(|e| format!("Failed to run premium activation: {e}"))?;

        if output.status.success() {
            info!("Premium features activated");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.is_empty() {
            Err(format!("Premium activation failed: {}", output.status))
        } else {
            Err(stderr)
        }
    }
}

/// [`ServiceFactory`] producing [`ChildProcessService`] handles.
#[derive(Debug, Clone)]
pub struct ChildProcessFactory {
    settings: ProcessSettings,
}

impl ChildProcessFactory {
    pub fn new(settings: ProcessSettings) -> Self {
        Self { settings }
    }
}

impl ServiceFactory for ChildProcessFactory {
    fn create(&self) -> Result<Arc<dyn HomeServerService>, String> {
        if self.settings.program.as_os_str().is_empty() {
            return Err("No home server executable configured.".to_string());
        }
        Ok(Arc::new(ChildProcessService::new(self.settings.clone())))
    }
}
