//! Open the served page in the system browser.

use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

use crate::{debug, log};

#[cfg(target_os = "macos")]
const OPENER: &str = "open";
#[cfg(windows)]
const OPENER: &str = "explorer";
#[cfg(not(any(target_os = "macos", windows)))]
const OPENER: &str = "xdg-open";

/// Launch the platform opener; failure only costs a log line.
pub fn open(url: &str) {
    let Ok(opener) = which::which(OPENER) else {
        log!("serve"; "`{}` not found, open {} manually", OPENER, url);
        return;
    };

    match launch(&opener, url) {
        Ok(_) => debug!("serve"; "opened {}", url),
        Err(e) => log!("serve"; "failed to open browser: {}", e),
    }
}

/// Spawn `program url` detached from our stdio. A reaper thread waits on
/// the child so it never lingers as a zombie.
fn launch(program: &Path, url: &str) -> io::Result<JoinHandle<io::Result<ExitStatus>>> {
    let mut child = Command::new(program)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    thread::Builder::new()
        .name("browser-reaper".into())
        .spawn(move || child.wait())
}
