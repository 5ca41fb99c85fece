//! Launching external programs.
//!
//! The runner never touches `std::process` directly. It hands each
//! [`Invocation`] to a [`Launcher`], which lets the same experiment loop
//! drive real processes, print a dry run, or feed a test.
//!
//! [`Invocation`]: ../command/struct.Invocation.html
//! [`Launcher`]: trait.Launcher.html

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use crate::command::Invocation;
use crate::error::{Error, Result};

/// Exit information of a finished process.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code, `None` if the process was terminated by a signal.
    pub code: Option<i32>,
}

impl ProcessExit {
    pub const SUCCESS: ProcessExit = ProcessExit { code: Some(0) };

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for ProcessExit {
    fn from(status: ExitStatus) -> Self {
        ProcessExit {
            code: status.code(),
        }
    }
}

impl fmt::Display for ProcessExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {}", code),
            None => write!(f, "terminated by signal"),
        }
    }
}

/// Runs invocations to completion.
pub trait Launcher {
    /// Launches the invocation inside `work_dir` and blocks until it exits.
    fn launch(&mut self, invocation: &Invocation, work_dir: &Path) -> Result<ProcessExit>;
}

impl<L: Launcher + ?Sized> Launcher for &mut L {
    fn launch(&mut self, invocation: &Invocation, work_dir: &Path) -> Result<ProcessExit> {
        (**self).launch(invocation, work_dir)
    }
}

/// Launcher spawning real operating system processes.
#[derive(Debug, Default)]
pub struct ProcessLauncher {
    /// Echo teed output to the terminal.
    pub echo: bool,
}

impl ProcessLauncher {
    pub fn new() -> Self {
        ProcessLauncher { echo: true }
    }

    /// Launcher that only writes teed output to the log files.
    pub fn quiet() -> Self {
        ProcessLauncher { echo: false }
    }
}

impl Launcher for ProcessLauncher {
    fn launch(&mut self, invocation: &Invocation, work_dir: &Path) -> Result<ProcessExit> {
        let program = resolve_program(&invocation.program, work_dir);
        debug!("launching `{}` in {}", invocation, work_dir.display());

        let mut cmd = Command::new(&program);
        cmd.args(&invocation.args).current_dir(work_dir);

        let launch_err =
            |e: io::Error| Error::LaunchFailed(program.to_string_lossy().to_string(), e.to_string());

        let status = match &invocation.log_file {
            None => cmd.status().map_err(launch_err)?,
            Some(log_file) => {
                let log_path = work_dir.join(log_file);
                let mut log = File::create(&log_path).map_err(|e| {
                    Error::IoError(format!("failed creating {}: {}", log_path.display(), e))
                })?;
                cmd.stdout(Stdio::piped())
                    .stderr(Stdio::from(log.try_clone()?));
                let mut child = cmd.spawn().map_err(launch_err)?;
                // the pipe is closed before waiting, so a child still
                // writing after a failed copy gets EPIPE instead of blocking
                let copied = match child.stdout.take() {
                    Some(mut stdout) => tee(&mut stdout, &mut log, self.echo),
                    None => Ok(()),
                };
                let status = child.wait()?;
                if let Err(e) = copied {
                    warn!(
                        "failed capturing output of `{}` ({}), process {}",
                        invocation,
                        e,
                        ProcessExit::from(status)
                    );
                    return Err(Error::OutputCaptureFailed(
                        log_path.display().to_string(),
                        e.to_string(),
                    ));
                }
                status
            }
        };
        Ok(ProcessExit::from(status))
    }
}

/// Copies everything from `source` into `log`, and onto the terminal when
/// `echo` is set.
fn tee<R: Read, W: Write>(source: &mut R, log: &mut W, echo: bool) -> Result<()> {
    let mut buf = [0u8; 8192];
    let stdout = io::stdout();
    loop {
        let n = match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        log.write_all(&buf[..n])?;
        if echo {
            let mut handle = stdout.lock();
            handle.write_all(&buf[..n])?;
            handle.flush()?;
        }
    }
    log.flush()?;
    Ok(())
}

/// Relative paths with a directory component (`./jcm.jl`) are relative to
/// the working directory. Bare names are left for `PATH` lookup.
fn resolve_program(program: &Path, work_dir: &Path) -> PathBuf {
    if program.is_relative() && program.components().count() > 1 {
        work_dir.join(program)
    } else {
        program.to_path_buf()
    }
}

/// Launcher that only prints and records what would be launched.
#[derive(Debug, Default)]
pub struct DryRunLauncher {
    pub launched: Vec<Invocation>,
    /// Print each invocation to stdout.
    pub print: bool,
}

impl DryRunLauncher {
    pub fn new() -> Self {
        DryRunLauncher {
            launched: Vec::new(),
            print: true,
        }
    }

    /// Recording launcher without output.
    pub fn silent() -> Self {
        DryRunLauncher::default()
    }
}

impl Launcher for DryRunLauncher {
    fn launch(&mut self, invocation: &Invocation, work_dir: &Path) -> Result<ProcessExit> {
        if self.print {
            println!("[dry-run] {}", invocation);
        }
        trace!("dry run in {}: {:?}", work_dir.display(), invocation);
        self.launched.push(invocation.clone());
        Ok(ProcessExit::SUCCESS)
    }
}

#[test]
fn resolve_relative_programs() {
    let wd = Path::new("/data/runs");
    assert_eq!(
        resolve_program(Path::new("./jcm.jl"), wd),
        PathBuf::from("/data/runs/./jcm.jl")
    );
    assert_eq!(resolve_program(Path::new("julia"), wd), PathBuf::from("julia"));
    assert_eq!(
        resolve_program(Path::new("/usr/bin/Rscript"), wd),
        PathBuf::from("/usr/bin/Rscript")
    );
}

#[test]
fn tee_copies_everything() {
    let mut source = io::Cursor::new(b"step 1\nstep 2\n".to_vec());
    let mut log = Vec::new();
    tee(&mut source, &mut log, false).unwrap();
    assert_eq!(log, b"step 1\nstep 2\n");
}

#[test]
fn dry_run_records() {
    let mut launcher = DryRunLauncher::silent();
    let inv = Invocation {
        program: PathBuf::from("./jcm.jl"),
        args: vec!["-n".to_string()],
        log_file: None,
    };
    let exit = launcher.launch(&inv, Path::new(".")).unwrap();
    assert!(exit.success());
    assert_eq!(launcher.launched, vec![inv]);
}

#[cfg(unix)]
#[test]
fn process_exit_codes() {
    let dir = tempfile::tempdir().unwrap();
    let mut launcher = ProcessLauncher::quiet();
    let ok = Invocation {
        program: PathBuf::from("true"),
        args: vec![],
        log_file: None,
    };
    assert!(launcher.launch(&ok, dir.path()).unwrap().success());
    let failing = Invocation {
        program: PathBuf::from("false"),
        ..ok
    };
    let exit = launcher.launch(&failing, dir.path()).unwrap();
    assert!(!exit.success());
    assert_eq!(exit.to_string(), "exit code 1");
}

#[cfg(unix)]
#[test]
fn process_output_teed_into_log() {
    let dir = tempfile::tempdir().unwrap();
    let mut launcher = ProcessLauncher::quiet();
    let inv = Invocation {
        program: PathBuf::from("echo"),
        args: vec!["-f".to_string(), "null_0.csv".to_string()],
        log_file: Some(PathBuf::from("null_0.log")),
    };
    assert!(launcher.launch(&inv, dir.path()).unwrap().success());
    let log = std::fs::read_to_string(dir.path().join("null_0.log")).unwrap();
    assert_eq!(log, "-f null_0.csv\n");
}

#[cfg(unix)]
#[test]
fn failed_log_write_still_waits_for_child() {
    let dir = tempfile::tempdir().unwrap();
    let mut launcher = ProcessLauncher::quiet();
    let inv = Invocation {
        program: PathBuf::from("sh"),
        args: vec![
            "-c".to_string(),
            "trap '' PIPE; echo hi; sleep 1; touch done".to_string(),
        ],
        log_file: Some(PathBuf::from("/dev/full")),
    };
    match launcher.launch(&inv, dir.path()) {
        Err(Error::OutputCaptureFailed(log, _)) => assert_eq!(log, "/dev/full"),
        other => panic!("expected output capture failure, got {:?}", other),
    }
    // the child ran to completion before launch returned
    assert!(dir.path().join("done").exists());
}

#[test]
fn missing_program_fails_to_launch() {
    let dir = tempfile::tempdir().unwrap();
    let mut launcher = ProcessLauncher::quiet();
    let inv = Invocation {
        program: PathBuf::from("./no-such-simulation"),
        args: vec![],
        log_file: None,
    };
    match launcher.launch(&inv, dir.path()) {
        Err(Error::LaunchFailed(program, _)) => assert!(program.contains("no-such-simulation")),
        other => panic!("expected launch failure, got {:?}", other),
    }
}
