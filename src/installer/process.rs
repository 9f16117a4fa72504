use std::ffi::OsStr;
use tokio::process::Command;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Child process command, optionally without a console window.
pub(crate) fn command(program: impl AsRef<OsStr>, hide_window: bool) -> Command {
    let mut cmd = Command::new(program);
    cmd.kill_on_drop(true);
    if hide_window {
        hide_console(&mut cmd);
    }
    cmd
}

#[cfg(windows)]
fn hide_console(cmd: &mut Command) {
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_console(_cmd: &mut Command) {}

/// Render a command line for debug output.
pub(crate) fn display_command<S: AsRef<str>>(program: &str, args: &[S]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        let arg = arg.as_ref();
        if arg.contains(' ') {
            line.push('"');
            line.push_str(arg);
            line.push('"');
        } else {
            line.push_str(arg);
        }
    }
    line
}
