//! Turning a `ServiceSpec` into an OS command.

use std::io;
use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};

use crate::config::ServiceSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Auxiliary,
    Foreground,
}

/// Build the command for `spec`. Every child leads a new process group;
/// auxiliaries get `/dev/null` as stdin, the foreground service inherits ours.
pub fn command_for(spec: &ServiceSpec, role: Role) -> io::Result<Command> {
    let program = spec.program().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("service `{}` has an empty command", spec.name),
        )
    })?;

    let mut command = Command::new(program);
    command.args(spec.args()).envs(&spec.env).process_group(0);

    if role == Role::Auxiliary {
        command.stdin(Stdio::null());
    }

    Ok(command)
}
