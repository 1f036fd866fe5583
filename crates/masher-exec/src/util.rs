use std::{ffi::OsStr, process::Stdio};

use tokio::process::Command;

/// Command for `program` with the given args, stdin closed and output captured.
pub fn cmd_program<I, S>(program: &str, args: I) -> Command
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

/// Stdout followed by stderr.
pub fn combine_output(stdout: Vec<u8>, stderr: &[u8]) -> Vec<u8> {
    let mut out = stdout;
    if !stderr.is_empty() {
        if !out.is_empty() && !out.ends_with(b"\n") {
            out.push(b'\n');
        }
        out.extend_from_slice(stderr);
    }
    out
}
