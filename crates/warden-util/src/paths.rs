//! Default filesystem locations
//!
//! Both paths are user-writable (no root required). Overrides come in from
//! the daemon's CLI and `WARDEN_SOCKET`/`WARDEN_DATA_DIR` environment
//! variables, resolved there; these are only the fallbacks.

use std::path::PathBuf;

const APP_DIR: &str = "wardend";

/// Default Unix socket path: `$XDG_RUNTIME_DIR/wardend/wardend.sock`, or
/// `/tmp/wardend-$USER/wardend.sock` when no runtime dir is available.
pub fn default_socket_path() -> PathBuf {
    let dir = match std::env::var("XDG_RUNTIME_DIR") {
        Ok(runtime_dir) => PathBuf::from(runtime_dir).join(APP_DIR),
        Err(_) => {
            let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
            PathBuf::from(format!("/tmp/{APP_DIR}-{user}"))
        }
    };
    dir.join("wardend.sock")
}

/// Default data directory: `$XDG_DATA_HOME/wardend`, falling back to
/// `~/.local/share/wardend`.
pub fn default_data_dir() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    PathBuf::from("/tmp").join(APP_DIR).join("data")
}
