//! Encoder process plumbing.
//!
//! This module handles spawning the encoder, collecting its diagnostic output, and
//! delivering the platform's graceful interrupt. The supervisor only talks to the
//! [`ProcessHost`] and [`EncoderChild`] traits, so tests can substitute fakes.

use std::collections::VecDeque;
use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

use crate::command::EncoderCommand;
use crate::events::{AppEvent, EventSender};

/// Number of trailing stderr lines kept for error reports.
pub const DIAGNOSTIC_TAIL_LINES: usize = 40;

/// How a process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    /// Exit code. On Unix a process killed by signal `n` reports `128 + n`.
    pub code: Option<i32>,
}

impl ExitInfo {
    pub fn with_code(code: i32) -> Self {
        Self { code: Some(code) }
    }
}

impl From<ExitStatus> for ExitInfo {
    fn from(status: ExitStatus) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ExitInfo {
                    code: Some(128 + signal),
                };
            }
        }
        ExitInfo {
            code: status.code(),
        }
    }
}

/// A running encoder owned by the supervisor's monitor thread.
pub trait EncoderChild: Send {
    fn pid(&self) -> u32;

    /// Non-blocking exit check. Reaps the process once it has exited.
    fn try_wait(&mut self) -> io::Result<Option<ExitInfo>>;

    /// Forced termination, used only after the stop timeout.
    fn kill(&mut self) -> io::Result<()>;

    /// Captured stderr text. Only complete after the process has exited.
    fn take_diagnostics(&mut self) -> String;
}

/// Platform capability for launching and interrupting encoders.
pub trait ProcessHost: Send + Sync {
    fn start(&self, command: &EncoderCommand) -> io::Result<Box<dyn EncoderChild>>;

    /// Ask the process to finish its output and exit.
    fn interrupt(&self, pid: u32) -> io::Result<()>;
}

/// Launches real processes on the host operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHost;

impl ProcessHost for SystemHost {
    fn start(&self, command: &EncoderCommand) -> io::Result<Box<dyn EncoderChild>> {
        let mut cmd = Command::new(command.program());
        cmd.args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        detach_from_console_signals(&mut cmd);

        let mut child = cmd.spawn()?;
        let stderr_thread = child.stderr.take().map(|stderr| {
            thread::Builder::new()
                .name("encoder-stderr".to_string())
                .spawn(move || collect_diagnostics(stderr, DIAGNOSTIC_TAIL_LINES))
        });
        let stderr_thread = match stderr_thread {
            Some(Ok(handle)) => Some(handle),
            Some(Err(e)) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
            None => None,
        };

        log::info!("Encoder started (pid {})", child.id());
        Ok(Box::new(SystemChild {
            child,
            stderr_thread,
        }))
    }

    fn interrupt(&self, pid: u32) -> io::Result<()> {
        send_interrupt(pid)
    }
}

/// The child in its own process group, so the terminal's Ctrl+C reaches only us and
/// the interrupt we send is the one the encoder sees.
#[cfg(unix)]
fn detach_from_console_signals(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(windows)]
fn detach_from_console_signals(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;
    use windows_sys::Win32::System::Threading::CREATE_NEW_PROCESS_GROUP;
    cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
}

#[cfg(not(any(unix, windows)))]
fn detach_from_console_signals(_cmd: &mut Command) {}

#[cfg(unix)]
fn send_interrupt(pid: u32) -> io::Result<()> {
    let pid = i32::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    // SAFETY: kill(2) has no memory-safety preconditions.
    let rc = unsafe { libc::kill(pid, libc::SIGINT) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(windows)]
fn send_interrupt(pid: u32) -> io::Result<()> {
    use windows_sys::Win32::System::Console::{GenerateConsoleCtrlEvent, CTRL_BREAK_EVENT};
    // SAFETY: plain Win32 call; the group id is the child's pid because it was
    // created with CREATE_NEW_PROCESS_GROUP.
    let ok = unsafe { GenerateConsoleCtrlEvent(CTRL_BREAK_EVENT, pid) };
    if ok != 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(any(unix, windows)))]
fn send_interrupt(_pid: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "graceful interrupt is not supported on this platform",
    ))
}

struct SystemChild {
    child: Child,
    stderr_thread: Option<JoinHandle<Vec<String>>>,
}

impl EncoderChild for SystemChild {
    fn pid(&self) -> u32 {
        self.child.id()
    }

    fn try_wait(&mut self) -> io::Result<Option<ExitInfo>> {
        Ok(self.child.try_wait()?.map(ExitInfo::from))
    }

    fn kill(&mut self) -> io::Result<()> {
        self.child.kill()
    }

    fn take_diagnostics(&mut self) -> String {
        self.stderr_thread
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default()
            .join("\n")
    }
}

/// Read a stream to the end, keeping the last `keep` non-empty lines.
///
/// ffmpeg rewrites its progress line with `\r`, so both `\r` and `\n` end a line.
pub fn collect_diagnostics<R: Read>(mut reader: R, keep: usize) -> Vec<String> {
    let mut tail: VecDeque<String> = VecDeque::with_capacity(keep);
    let mut pending: Vec<u8> = Vec::new();
    let mut buf = [0u8; 4096];

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        };
        for &byte in &buf[..n] {
            if byte == b'\n' || byte == b'\r' {
                push_line(&mut tail, keep, &pending);
                pending.clear();
            } else {
                pending.push(byte);
            }
        }
    }
    push_line(&mut tail, keep, &pending);

    tail.into_iter().collect()
}

fn push_line(tail: &mut VecDeque<String>, keep: usize, bytes: &[u8]) {
    let line = String::from_utf8_lossy(bytes).trim().to_string();
    if line.is_empty() {
        return;
    }
    log::debug!("[ffmpeg] {}", line);
    if keep == 0 {
        return;
    }
    if tail.len() == keep {
        tail.pop_front();
    }
    tail.push_back(line);
}

/// Run the encoder with `args` and wait for it, returning the exit and both
/// output streams. Used for probes and device listings, not for recordings.
pub fn run_to_completion(program: &str, args: &[&str]) -> io::Result<(ExitInfo, String, String)> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()?;
    Ok((
        ExitInfo::from(output.status),
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    ))
}

/// Route the terminal's Ctrl+C into the event loop as a close request.
///
/// This should be called once at program startup.
pub fn setup_ctrlc_handler(events: EventSender) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        log::debug!("Received Ctrl+C");
        let _ = events.send(AppEvent::CloseRequested);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_diagnostics_splits_carriage_returns() {
        let input = b"Input #0, gdigrab\nframe=  10 fps=30\rframe=  20 fps=30\rExiting normally\n";
        let lines = collect_diagnostics(&input[..], 10);
        assert_eq!(
            lines,
            vec![
                "Input #0, gdigrab",
                "frame=  10 fps=30",
                "frame=  20 fps=30",
                "Exiting normally"
            ]
        );
    }

    #[test]
    fn test_collect_diagnostics_keeps_tail() {
        let input = "a\nb\nc\nd\ne";
        let lines = collect_diagnostics(input.as_bytes(), 2);
        assert_eq!(lines, vec!["d", "e"]);
    }

    #[test]
    fn test_collect_diagnostics_skips_blank_lines() {
        let lines = collect_diagnostics(&b"\r\n\r\n  \nerror\r\n"[..], 5);
        assert_eq!(lines, vec!["error"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_spawn_missing_program() {
        let cmd = EncoderCommand::new("screen-recorder-no-such-encoder", vec![]);
        let err = SystemHost.start(&cmd).err().expect("spawn should fail");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn test_system_child_captures_stderr() {
        let cmd = EncoderCommand::new(
            "sh",
            vec!["-c".to_string(), "echo 'Invalid argument' >&2; exit 3".to_string()],
        );
        let mut child = SystemHost.start(&cmd).unwrap();
        let exit = loop {
            if let Some(exit) = child.try_wait().unwrap() {
                break exit;
            }
            thread::sleep(std::time::Duration::from_millis(10));
        };
        assert_eq!(exit.code, Some(3));
        assert_eq!(child.take_diagnostics(), "Invalid argument");
    }

    #[cfg(unix)]
    #[test]
    fn test_interrupt_maps_to_130() {
        let cmd = EncoderCommand::new("sleep", vec!["30".to_string()]);
        let mut child = SystemHost.start(&cmd).unwrap();
        SystemHost.interrupt(child.pid()).unwrap();
        let exit = loop {
            if let Some(exit) = child.try_wait().unwrap() {
                break exit;
            }
            thread::sleep(std::time::Duration::from_millis(10));
        };
        assert_eq!(exit.code, Some(130));
    }

    #[test]
    fn test_run_to_completion_missing_program() {
        let result = run_to_completion("screen-recorder-no-such-encoder", &["-version"]);
        assert!(result.is_err());
    }
}
