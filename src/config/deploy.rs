//! Deployment config: `.sftpconfig`.
//!
//! A JSON file kept out of version control, read once at startup when
//! `--deploy` is given. A missing or malformed file is fatal.
//!
//! ```json
//! {
//!   "path": "/var/www/example.com/",
//!   "connect": {
//!     "host": "example.com",
//!     "port": 22,
//!     "username": "deploy",
//!     "privateKeyPath": "~/.ssh/id_ed25519"
//!   }
//! }
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{ConfigDiagnostics, ConfigError, FieldPath};

/// Remote base path plus SSH connection profile.
#[derive(Debug, Clone, Deserialize)]
pub struct DeployConfig {
    /// Remote base directory; category destinations are appended to it.
    pub path: String,

    pub connect: ConnectProfile,
}

/// SSH connection parameters.
///
/// Credentials are tried in order: password, in-memory key, key file,
/// then the running SSH agent.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectProfile {
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub username: String,

    #[serde(default)]
    pub password: Option<String>,

    /// PEM-encoded private key contents.
    #[serde(default)]
    pub private_key: Option<String>,

    /// Path to a private key file (`~` expands to the home directory).
    #[serde(default)]
    pub private_key_path: Option<PathBuf>,

    #[serde(default)]
    pub passphrase: Option<String>,
}

const fn default_port() -> u16 {
    22
}

// Keep secrets out of `--verbose` output.
impl fmt::Debug for ConnectProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const REDACTED: &str = "<redacted>";
        f.debug_struct("ConnectProfile")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| REDACTED))
            .field("private_key", &self.private_key.as_ref().map(|_| REDACTED))
            .field("private_key_path", &self.private_key_path)
            .field("passphrase", &self.passphrase.as_ref().map(|_| REDACTED))
            .finish()
    }
}

impl DeployConfig {
    const PATH: FieldPath = FieldPath::new("path");
    const HOST: FieldPath = FieldPath::new("connect.host");
    const USERNAME: FieldPath = FieldPath::new("connect.username");

    /// Load and validate the deployment config.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::DeployMissing(path.to_path_buf()));
        }
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        let mut config: Self = serde_json::from_str(&content)
            .map_err(|err| ConfigError::Json(path.to_path_buf(), err))?;

        let mut diag = ConfigDiagnostics::for_file(Some(path));
        config.validate(&mut diag);
        diag.into_result().map_err(ConfigError::Diagnostics)?;

        config.connect.private_key_path = config.connect.private_key_path.map(expand_home);
        Ok(config)
    }

    fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.path.trim().is_empty() {
            diag.error(Self::PATH, "remote base path is empty");
        }
        if self.connect.host.trim().is_empty() {
            diag.error(Self::HOST, "host is empty");
        }
        if self.connect.username.trim().is_empty() {
            diag.error(Self::USERNAME, "username is empty");
        }
    }
}

/// Expand a leading `~/` using `$HOME`.
fn expand_home(path: PathBuf) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path,
    }
}
