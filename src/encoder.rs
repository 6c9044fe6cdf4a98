//! Lossless re-encoding through an external `cwebp` process.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{Error, Result};

/// Default encoder program name.
pub const CWEBP: &str = "cwebp";

/// Handle to the external lossless encoder.
///
/// The encoder is invoked with maximum quality and effort
/// (`-q 100 -m 6 -mt -lossless`) and is otherwise a black box: only its
/// exit status is observed.
#[derive(Debug, Clone)]
pub struct LosslessEncoder {
    program: PathBuf,
    show_progress: bool,
}

impl LosslessEncoder {
    /// Locate `cwebp` on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EncoderNotFound`] if no executable is found.
    pub fn locate() -> Result<Self> {
        Self::locate_program(CWEBP)
    }

    /// Locate `program`, either as an explicit path or by searching `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EncoderNotFound`] if no executable file exists.
    pub fn locate_program(program: &str) -> Result<Self> {
        let candidate = Path::new(program);
        if candidate.components().count() > 1 {
            return if is_executable(candidate) {
                Ok(Self::with_program(candidate))
            } else {
                Err(Error::EncoderNotFound(program.to_string()))
            };
        }

        let path_var = std::env::var_os("PATH").unwrap_or_default();
        std::env::split_paths(&path_var)
            .flat_map(|dir| executable_names(program).map(move |name| dir.join(name)))
            .find(|p| is_executable(p))
            .map(|p| Self::with_program(&p))
            .ok_or_else(|| Error::EncoderNotFound(program.to_string()))
    }

    /// Use `program` as-is without checking that it exists.
    #[must_use]
    pub fn with_program(program: &Path) -> Self {
        Self {
            program: program.to_path_buf(),
            show_progress: false,
        }
    }

    /// Let the encoder print progress to the inherited stdout/stderr.
    #[must_use]
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Path of the encoder executable.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Encode `input` losslessly into `output`, blocking until the process
    /// exits.
    ///
    /// A partially written `output` is removed on failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the process cannot be spawned, or
    /// [`Error::EncoderFailure`] on a non-zero or abnormal exit.
    pub fn encode(&self, input: &Path, output: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(["-q", "100", "-m", "6", "-mt", "-lossless"]);
        if self.show_progress {
            cmd.arg("-progress");
        } else {
            cmd.arg("-quiet").stdout(Stdio::null()).stderr(Stdio::null());
        }
        cmd.arg(input).arg("-o").arg(output);

        log::debug!("running {:?}", cmd);
        let status = cmd.status()?;
        if status.success() {
            return Ok(());
        }

        if output.exists() {
            if let Err(e) = std::fs::remove_file(output) {
                log::warn!("failed to remove partial output {}: {e}", output.display());
            }
        }
        Err(Error::EncoderFailure {
            output: output.to_path_buf(),
            status,
        })
    }
}

fn executable_names(program: &str) -> impl Iterator<Item = String> + '_ {
    let exe = if cfg!(windows) && Path::new(program).extension().is_none() {
        Some(format!("{program}.exe"))
    } else {
        None
    };
    std::iter::once(program.to_string()).chain(exe)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
