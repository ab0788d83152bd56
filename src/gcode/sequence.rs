//! The in-memory G-code file: load, render, and write back in place

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::error::{Result, WizardError};

use super::command::Command;

/// Ordered commands of one file, in document order
#[derive(Debug, Clone, Default)]
pub struct Sequence {
    pub commands: Vec<Command>,
}

impl Sequence {
    /// Parse a whole buffer, one command per line
    pub fn parse(text: &str) -> Self {
        let commands = text
            .lines()
            .enumerate()
            .map(|(idx, line)| Command::parse(idx + 1, line))
            .collect();
        Self { commands }
    }

    /// Parse raw file contents
    ///
    /// Lines that are not valid UTF-8 are still parsed (see
    /// [`Command::parse_bytes`]) and written back byte for byte.
    pub fn parse_bytes(bytes: &[u8]) -> Self {
        let mut lines: Vec<&[u8]> = bytes.split(|b| *b == b'\n').collect();
        if lines.last().is_some_and(|line| line.is_empty()) {
            lines.pop();
        }

        let commands = lines
            .into_iter()
            .enumerate()
            .map(|(idx, line)| match std::str::from_utf8(line) {
                Ok(text) => Command::parse(idx + 1, text),
                Err(_) => Command::parse_bytes(idx + 1, line),
            })
            .collect();
        Self { commands }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|source| WizardError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let sequence = Self::parse_bytes(&bytes);
        tracing::debug!(?path, lines = sequence.len(), "Loaded G-code");
        Ok(sequence)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    /// Clear every derived fact and insertion
    pub fn reset(&mut self) {
        for command in &mut self.commands {
            command.reset();
        }
    }

    /// Number of synthesized lines across all commands
    pub fn inserted_count(&self) -> usize {
        self.iter().map(|c| c.pre.len() + c.post.len()).sum()
    }

    /// Write the output text: insertions tagged with `annotation`, originals untouched
    pub fn write_to<W: Write>(&self, out: &mut W, annotation: &str) -> std::io::Result<()> {
        for command in &self.commands {
            for line in &command.pre {
                writeln!(out, "{} ; {}", line, annotation)?;
            }
            out.write_all(command.raw_output())?;
            out.write_all(b"\n")?;
            for line in &command.post {
                writeln!(out, "{} ; {}", line, annotation)?;
            }
        }
        Ok(())
    }

    pub fn to_bytes(&self, annotation: &str) -> Vec<u8> {
        let mut out = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.write_to(&mut out, annotation);
        out
    }

    pub fn render(&self, annotation: &str) -> String {
        String::from_utf8_lossy(&self.to_bytes(annotation)).into_owned()
    }

    /// Replace `path` with the rendered output
    ///
    /// Goes through a temporary file next to the real target (symlinks are
    /// resolved) that takes over the target's permissions, so a failed write
    /// leaves the original intact.
    pub fn write_in_place(&self, path: &Path, annotation: &str) -> Result<()> {
        let write_err = |source: std::io::Error| WizardError::WriteFile {
            path: path.to_path_buf(),
            source,
        };
        let target = fs::canonicalize(path).map_err(write_err)?;
        let metadata = fs::metadata(&target).map_err(write_err)?;
        let tmp = temp_path(&target);

        let staged = fs::write(&tmp, self.to_bytes(annotation))
            .and_then(|()| fs::set_permissions(&tmp, metadata.permissions()));
        if let Err(source) = staged {
            let _ = fs::remove_file(&tmp);
            return Err(write_err(source));
        }
        keep_owner(&tmp, &metadata);
        if let Err(source) = fs::rename(&tmp, &target) {
            let _ = fs::remove_file(&tmp);
            return Err(write_err(source));
        }
        Ok(())
    }

    /// Human-readable dump of every command with its insertions and facts
    pub fn debug_dump<W: Write>(&self, out: &mut W) -> Result<()> {
        for command in &self.commands {
            if !command.pre.is_empty() {
                writeln!(out, "; pre: {}", serde_json::to_string(&command.pre)?)?;
            }
            writeln!(out, "{}", command.raw)?;
            writeln!(out, "; facts: {}", serde_json::to_string(&command.facts)?)?;
            if !command.post.is_empty() {
                writeln!(out, "; post: {}", serde_json::to_string(&command.post)?)?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

/// Give `tmp` the owner of the file it replaces. Only root can hand a file
/// to another user, so failure leaves the current owner in place.
#[cfg(unix)]
fn keep_owner(tmp: &Path, original: &fs::Metadata) {
    use std::os::unix::fs::MetadataExt;

    if let Err(e) = std::os::unix::fs::chown(tmp, Some(original.uid()), Some(original.gid())) {
        tracing::debug!(?tmp, error = %e, "Could not restore file owner");
    }
}

#[cfg(not(unix))]
fn keep_owner(_tmp: &Path, _original: &fs::Metadata) {}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tool-wizard.tmp", name))
}
