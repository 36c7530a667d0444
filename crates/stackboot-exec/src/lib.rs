//! Subprocess execution and the orchestration tool's command adapter.

mod error;
pub use error::ExecError;

pub mod proc;
pub use proc::{ProcConfig, ProcOutput};

mod juju;
pub use juju::{DEFAULT_PROGRAM, JUJU_HOME_ENV, JujuCli};

pub mod prelude {
    pub use crate::error::ExecError;
    pub use crate::juju::JujuCli;
    pub use crate::proc::{ProcConfig, ProcOutput};
}
