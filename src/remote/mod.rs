//! Remote mirroring of pipeline output.
//!
//! Pipelines hand their artifacts to a [`RemoteSink`] after writing them
//! locally. The production sink is [`SftpSink`]; tests substitute a
//! recording sink.

mod sftp;

pub use sftp::SftpSink;

use thiserror::Error;

/// An output file: name relative to the destination directory, plus bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Remote transport errors.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("cannot resolve {0}")]
    Resolve(String, #[source] std::io::Error),

    #[error("cannot connect to {0}")]
    Connect(String, #[source] std::io::Error),

    #[error("ssh error")]
    Ssh(#[from] ssh2::Error),

    #[error("authentication failed for {user}@{host}")]
    Auth { user: String, host: String },

    #[error("cannot write `{0}`")]
    Write(String, #[source] std::io::Error),
}

/// Destination that receives a pipeline's artifacts.
pub trait RemoteSink: Send + Sync {
    /// Upload every artifact into `remote_dir`, creating it if needed.
    fn upload(&self, remote_dir: &str, artifacts: &[Artifact]) -> Result<(), RemoteError>;
}

/// Remote directory for a category: the base path followed by the
/// category's destination directory.
///
/// ```ignore
/// remote_dir("/var/www/site/", "build/css/") == "/var/www/site/build/css"
/// ```
pub fn remote_dir(base: &str, dest: &str) -> String {
    let dest = dest.trim_start_matches("./").trim_matches('/');
    let base = base.trim_end_matches('/');
    if dest.is_empty() {
        if base.is_empty() { "/".to_string() } else { base.to_string() }
    } else {
        format!("{base}/{dest}")
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_dir_joins_base_and_dest() {
        assert_eq!(remote_dir("/var/www/site/", "build/css/"), "/var/www/site/build/css");
        assert_eq!(remote_dir("/var/www/site", "./build/js"), "/var/www/site/build/js");
        assert_eq!(remote_dir("/", "build/js/"), "/build/js");
        assert_eq!(remote_dir("/srv", ""), "/srv");
    }
}
