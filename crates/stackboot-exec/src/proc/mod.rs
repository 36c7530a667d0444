use std::{process::Stdio, time::Duration};

use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, BufReader},
    process::{Child, Command},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument::WithSubscriber, trace};

use crate::error::ExecError;

mod kill;
use kill::kill_graceful;

/// Time a child gets to exit after SIGTERM before it is killed.
pub const KILL_GRACE: Duration = Duration::from_secs(5);

/// One command invocation.
#[derive(Clone, Debug, Default)]
pub struct ProcConfig {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl ProcConfig {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (k, v) in &self.env {
            cmd.env(k, v);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// What a successful run printed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcOutput {
    pub stdout_lines: usize,
    pub stderr: String,
}

/// Run the command to completion.
///
/// Stdout is forwarded line by line to debug logs; stderr is captured and
/// attached to the error on failure. Cancelling `cancel` terminates the child.
pub async fn run(cfg: &ProcConfig, cancel: &CancellationToken) -> Result<ProcOutput, ExecError> {
    if cfg.program.is_empty() {
        return Err(ExecError::Spawn("program is empty".into()));
    }
    if cancel.is_cancelled() {
        return Err(ExecError::Cancelled);
    }

    trace!(target: "stackboot.exec.proc", program = %cfg.program, args = ?cfg.args, "spawn");
    let mut child = cfg.command().spawn().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ExecError::MissingProgram(cfg.program.clone()),
        _ => ExecError::Spawn(e.to_string()),
    })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ExecError::Io("stdout not captured".into()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| ExecError::Io("stderr not captured".into()))?;

    let program = cfg.program.clone();
    let read_stdout = tokio::spawn(
        async move {
            let mut lines = BufReader::new(stdout).lines();
            let mut count = 0usize;
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(target: "stackboot.exec.proc.out", %program, %line);
                count += 1;
            }
            count
        }
        .with_current_subscriber(),
    );
    let read_stderr = tokio::spawn(async move {
        let mut buf = String::new();
        let _ = BufReader::new(stderr).read_to_string(&mut buf).await;
        buf
    });

    tokio::select! {
        status = child.wait() => {
            let status = status?;
            let stdout_lines = read_stdout.await.unwrap_or_default();
            let stderr = read_stderr.await.unwrap_or_default();

            if !status.success() {
                return Err(match status.code() {
                    Some(code) => ExecError::NonZeroExit { code, stderr },
                    None => ExecError::KilledBySignal { stderr },
                });
            }

            debug!(target: "stackboot.exec.proc", program = %cfg.program, "exit success");
            Ok(ProcOutput { stdout_lines, stderr })
        }
        _ = cancel.cancelled() => {
            debug!(target: "stackboot.exec.proc", program = %cfg.program, "cancelled; terminating child");
            terminate(&mut child).await;
            read_stdout.abort();
            read_stderr.abort();
            Err(ExecError::Cancelled)
        }
    }
}

async fn terminate(child: &mut Child) {
    if let Err(e) = kill_graceful(child, KILL_GRACE).await {
        debug!(target: "stackboot.exec.proc", error = %e, "failed to terminate child");
    }
}
