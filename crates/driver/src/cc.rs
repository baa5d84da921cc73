//! External C compiler probing, grounded in `check_clang_version`'s
//! cached-`OnceLock` pattern: the probe runs once per process regardless of
//! how many `cnc build` invocations it's consulted from within a single run.

use std::fmt;
use std::process::Command;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub enum CcError {
    NotFound,
    VersionProbeFailed(String),
}

impl fmt::Display for CcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CcError::NotFound => write!(f, "no C compiler found on PATH (tried 'cc')"),
            CcError::VersionProbeFailed(msg) => write!(f, "failed to probe C compiler: {msg}"),
        }
    }
}

static CC_CHECKED: OnceLock<Result<(), CcError>> = OnceLock::new();

/// Confirms a `cc` binary is runnable before `cnc build` writes any output,
/// so a missing toolchain fails before the `.c` file is produced rather
/// than after.
pub fn check_cc_available() -> Result<(), CcError> {
    CC_CHECKED
        .get_or_init(|| {
            Command::new("cc")
                .arg("--version")
                .output()
                .map(|_| ())
                .map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        CcError::NotFound
                    } else {
                        CcError::VersionProbeFailed(e.to_string())
                    }
                })
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cc_error_messages_are_non_empty() {
        assert!(!CcError::NotFound.to_string().is_empty());
        assert!(!CcError::VersionProbeFailed("x".into()).to_string().is_empty());
    }
}
