//! Traversal through the system `find`
//!
//! Runs, inside the root directory:
//!
//! ```text
//! find . ( -ipath ./boot* -prune -o -ipath ./Recovery -prune ) -o -type f -print
//! ```
//!
//! and streams stdout line by line. Invalid UTF-8 is replaced rather than
//! rejected so odd file names still produce a row.

use crate::error::WalkError;
use crate::walker::{PathIter, PathSource, PruneRules};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use tracing::{debug, warn};

/// Name of the external program
const FIND_PROGRAM: &str = "find";

#[derive(Debug, Clone, Default)]
pub struct FindWalker {
    prune: PruneRules,
}

impl FindWalker {
    pub fn new(prune: PruneRules) -> Self {
        Self { prune }
    }

    /// Arguments passed to `find`
    pub fn arguments(&self) -> Vec<String> {
        let mut args = vec![".".to_string()];
        if !self.prune.is_empty() {
            args.push("(".to_string());
            for (i, pattern) in self.prune.patterns().iter().enumerate() {
                if i > 0 {
                    args.push("-o".to_string());
                }
                args.push("-ipath".to_string());
                args.push(format!("./{}", pattern));
                args.push("-prune".to_string());
            }
            args.push(")".to_string());
            args.push("-o".to_string());
        }
        args.extend(["-type", "f", "-print"].map(String::from));
        args
    }
}

impl PathSource for FindWalker {
    fn paths(&self, root: &Path) -> Result<PathIter, WalkError> {
        let args = self.arguments();
        debug!(root = %root.display(), "Running {} {}", FIND_PROGRAM, args.join(" "));

        let mut child = Command::new(FIND_PROGRAM)
            .args(&args)
            .current_dir(root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| WalkError::Spawn {
                command: format!("{} {}", FIND_PROGRAM, args.join(" ")),
                source,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| WalkError::Io {
            root: root.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "find stdout unavailable"),
        })?;

        Ok(Box::new(FindLines {
            root: root.to_path_buf(),
            child: Some(child),
            reader: BufReader::new(stdout),
            buf: Vec::new(),
        }))
    }

    fn name(&self) -> &'static str {
        "find"
    }
}

/// Line iterator over a running `find`
struct FindLines {
    root: PathBuf,
    child: Option<Child>,
    reader: BufReader<ChildStdout>,
    buf: Vec<u8>,
}

impl FindLines {
    fn reap(&mut self) {
        if let Some(mut child) = self.child.take() {
            match child.wait() {
                Ok(status) if !status.success() => {
                    // find exits non-zero on unreadable directories; the
                    // paths it did print are still valid
                    warn!(root = %self.root.display(), "find exited with {}", status);
                }
                Ok(_) => {}
                Err(e) => warn!(root = %self.root.display(), "Failed to wait for find: {}", e),
            }
        }
    }
}

impl Iterator for FindLines {
    type Item = Result<String, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.reap();
                    return None;
                }
                Ok(_) => {
                    let line = String::from_utf8_lossy(&self.buf);
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    return Some(Ok(line.to_string()));
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    self.reap();
                    return Some(Err(WalkError::Io {
                        root: self.root.clone(),
                        source,
                    }));
                }
            }
        }
    }
}

impl Drop for FindLines {
    fn drop(&mut self) {
        // Abandoned early (interrupted run): stop find instead of leaving it running
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
