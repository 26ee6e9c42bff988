//! Command dispatch and text rendering over the virtual filesystem

use std::fs;
use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tarfs_core::{FsError, VirtualFileSystem};
use tracing::{debug, info, warn};

use crate::action_log::ActionLog;
use crate::command::Command;

/// Whether the session goes on after a command
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Interactive shell bound to one virtual filesystem and one output sink
pub struct Shell<W: Write> {
    vfs: VirtualFileSystem,
    user: String,
    host: String,
    log: Option<ActionLog>,
    out: W,
}

impl<W: Write> Shell<W> {
    pub fn new(vfs: VirtualFileSystem, user: impl Into<String>, host: impl Into<String>, out: W) -> Self {
        Self {
            vfs,
            user: user.into(),
            host: host.into(),
            log: None,
            out,
        }
    }

    pub fn with_action_log(mut self, log: ActionLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn vfs(&self) -> &VirtualFileSystem {
        &self.vfs
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Current directory with the home prefix shown as `~`.
    pub fn display_cwd(&self) -> String {
        let cwd = self.vfs.current_dir();
        let home = format!("/{}", self.vfs.home());
        match cwd.strip_prefix(&home) {
            Some("") => "~".to_string(),
            Some(rest) if rest.starts_with('/') => format!("~{}", rest),
            _ => cwd,
        }
    }

    pub fn prompt(&self) -> String {
        format!("{}@{}:{}$ ", self.user, self.host, self.display_cwd())
    }

    /// Log a command typed by the user, then execute it.
    pub fn submit(&mut self, line: &str) -> Result<Flow> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Flow::Continue);
        }
        if let Some(log) = &self.log {
            log.record(&self.user, line)
                .with_context(|| format!("failed to write action log {}", log.path().display()))?;
        }
        self.execute(line)
    }

    /// Execute one command line and render its result. Failures of the
    /// command itself are rendered; only output errors are returned.
    pub fn execute(&mut self, line: &str) -> Result<Flow> {
        let command = match Command::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(Flow::Continue),
            Err(err) => {
                writeln!(self.out, "{}", err)?;
                return Ok(Flow::Continue);
            }
        };
        debug!("Executing {:?}", command);

        match command {
            Command::Ls(path) => {
                let listing = self.vfs.list(path.as_deref().unwrap_or("."));
                for name in listing.names() {
                    writeln!(self.out, "{}", name)?;
                }
            }
            Command::Cd(path) => {
                let message = match self.vfs.change_dir(&path) {
                    Ok(()) => format!("Directory changed to {}", self.display_cwd()),
                    Err(err) => {
                        debug!("cd failed: {}", err);
                        format!("cd: {}: No such file or directory", path)
                    }
                };
                writeln!(self.out, "{}", message)?;
            }
            Command::Cp {
                source,
                destination,
            } => match self.vfs.copy(&source, &destination) {
                Ok(()) => writeln!(self.out, "Copied {} to {}", source, destination)?,
                Err(err) => {
                    debug!("cp failed: {}", err);
                    writeln!(self.out, "cp: cannot copy '{}': No such file or directory", source)?;
                }
            },
            Command::Tac(path) => match self.vfs.reverse_read(&path) {
                Ok(text) => writeln!(self.out, "{}", text)?,
                Err(FsError::NoSuchPath(_)) => {
                    writeln!(self.out, "tac: cannot open '{}': No such file or directory", path)?
                }
                Err(err) => writeln!(self.out, "{}", err)?,
            },
            Command::Cat(path) => match self.vfs.read(&path) {
                Ok(text) => {
                    write!(self.out, "{}", text)?;
                    if !text.is_empty() && !text.ends_with('\n') {
                        writeln!(self.out)?;
                    }
                }
                Err(FsError::NoSuchPath(_)) => {
                    writeln!(self.out, "cat: {}: No such file or directory", path)?
                }
                Err(err) => writeln!(self.out, "{}", err)?,
            },
            Command::Chmod { mode, path } => match self.vfs.set_mode(&mode, &path) {
                Ok(()) => writeln!(self.out, "Changed mode of {} to {}", path, mode)?,
                Err(FsError::NoSuchPath(_)) => writeln!(
                    self.out,
                    "chmod: cannot access '{}': No such file or directory",
                    path
                )?,
                Err(err) => writeln!(self.out, "chmod: {}", err)?,
            },
            Command::Pwd => {
                let cwd = self.display_cwd();
                writeln!(self.out, "{}", cwd)?;
            }
            Command::Exit => {
                writeln!(self.out, "Program exited")?;
                return Ok(Flow::Exit);
            }
        }
        Ok(Flow::Continue)
    }

    /// Run each line of a startup script. Script lines are not logged.
    /// A missing script is skipped with a warning.
    pub fn run_script(&mut self, path: &Path) -> Result<Flow> {
        if !path.exists() {
            warn!("Startup script {} not found, skipping", path.display());
            return Ok(Flow::Continue);
        }
        let script = fs::read_to_string(path)
            .with_context(|| format!("failed to read startup script {}", path.display()))?;
        info!("Running startup script {}", path.display());

        for line in script.lines() {
            if self.execute(line.trim())? == Flow::Exit {
                return Ok(Flow::Exit);
            }
        }
        Ok(Flow::Continue)
    }

    /// Prompt, read and submit lines until `exit` or end of input.
    /// Input that is not UTF-8 is decoded lossily.
    pub fn run<R: BufRead>(&mut self, mut input: R) -> Result<()> {
        let mut line = Vec::new();
        loop {
            let prompt = self.prompt();
            write!(self.out, "{}", prompt)?;
            self.out.flush()?;

            line.clear();
            if input.read_until(b'\n', &mut line)? == 0 {
                writeln!(self.out)?;
                return Ok(());
            }
            let text = String::from_utf8_lossy(&line);
            if self.submit(&text)? == Flow::Exit {
                return Ok(());
            }
        }
    }
}
