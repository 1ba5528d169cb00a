//! SFTP sink over an `ssh2` session.

use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use rustc_hash::FxHashSet;
use ssh2::{Session, Sftp};

use super::{Artifact, RemoteError, RemoteSink};
use crate::config::ConnectProfile;
use crate::debug;

/// Uploads artifacts with SFTP. Opens one SSH session per upload call.
pub struct SftpSink {
    profile: ConnectProfile,
    timeout: Duration,
}

impl SftpSink {
    pub fn new(profile: ConnectProfile, timeout: Duration) -> Self {
        Self { profile, timeout }
    }

    fn address(&self) -> String {
        format!("{}:{}", self.profile.host, self.profile.port)
    }

    /// Connect, handshake and authenticate.
    fn connect(&self) -> Result<Session, RemoteError> {
        let address = self.address();
        let socket = (self.profile.host.as_str(), self.profile.port)
            .to_socket_addrs()
            .map_err(|e| RemoteError::Resolve(address.clone(), e))?
            .next()
            .ok_or_else(|| {
                RemoteError::Resolve(
                    address.clone(),
                    std::io::Error::from(std::io::ErrorKind::AddrNotAvailable),
                )
            })?;

        let tcp = TcpStream::connect_timeout(&socket, self.timeout)
            .map_err(|e| RemoteError::Connect(address.clone(), e))?;

        let mut session = Session::new()?;
        session.set_tcp_stream(tcp);
        session.set_timeout(u32::try_from(self.timeout.as_millis()).unwrap_or(u32::MAX));
        session.handshake()?;

        self.authenticate(&session)?;
        debug!("remote"; "connected to {}", address);
        Ok(session)
    }

    fn authenticate(&self, session: &Session) -> Result<(), RemoteError> {
        let profile = &self.profile;
        let user = profile.username.as_str();
        let passphrase = profile.passphrase.as_deref();

        let attempt = if let Some(password) = &profile.password {
            session.userauth_password(user, password)
        } else if let Some(key) = &profile.private_key {
            session.userauth_pubkey_memory(user, None, key, passphrase)
        } else if let Some(key_path) = &profile.private_key_path {
            session.userauth_pubkey_file(user, None, key_path, passphrase)
        } else {
            session.userauth_agent(user)
        };

        match attempt {
            Ok(()) if session.authenticated() => Ok(()),
            Ok(()) | Err(_) => Err(RemoteError::Auth {
                user: user.to_string(),
                host: profile.host.clone(),
            }),
        }
    }
}

impl RemoteSink for SftpSink {
    fn upload(&self, remote_dir: &str, artifacts: &[Artifact]) -> Result<(), RemoteError> {
        let session = self.connect()?;
        let sftp = session.sftp()?;

        let mut created = FxHashSet::default();
        for artifact in artifacts {
            let path = format!("{}/{}", remote_dir.trim_end_matches('/'), artifact.name);
            let parent = path.rsplit_once('/').map_or("/", |(dir, _)| dir);
            if created.insert(parent.to_string()) {
                create_dir_all(&sftp, parent)?;
            }
            let mut file = sftp.create(Path::new(&path))?;
            file.write_all(&artifact.bytes)
                .map_err(|e| RemoteError::Write(path.clone(), e))?;
            debug!("remote"; "uploaded {}", path);
        }

        Ok(())
    }
}

/// `mkdir -p` over SFTP.
fn create_dir_all(sftp: &Sftp, dir: &str) -> Result<(), RemoteError> {
    let mut current = String::new();
    if dir.starts_with('/') {
        current.push('/');
    }

    for component in dir.split('/').filter(|c| !c.is_empty()) {
        if !current.is_empty() && !current.ends_with('/') {
            current.push('/');
        }
        current.push_str(component);

        let path = Path::new(&current);
        if sftp.stat(path).is_err() {
            // A concurrent upload may have created it between stat and mkdir.
            if let Err(e) = sftp.mkdir(path, 0o755) {
                sftp.stat(path).map_err(|_| RemoteError::Ssh(e))?;
            }
        }
    }

    Ok(())
}
