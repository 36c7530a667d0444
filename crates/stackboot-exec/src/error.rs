use stackboot_core::ToolError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("non-zero exit code: {code}{}", stderr_suffix(.stderr))]
    NonZeroExit { code: i32, stderr: String },
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("killed by signal{}", stderr_suffix(.stderr))]
    KilledBySignal { stderr: String },
    #[error("missing program: {0}")]
    MissingProgram(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("cancelled")]
    Cancelled,
}

impl ExecError {
    /// Attribute the failure to `tool`.
    pub fn into_tool_error(self, tool: &str) -> ToolError {
        ToolError::new(tool, self.to_string())
    }
}

impl From<std::io::Error> for ExecError {
    fn from(e: std::io::Error) -> Self {
        ExecError::Io(e.to_string())
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}
