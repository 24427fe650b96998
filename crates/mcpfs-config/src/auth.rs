//! Per-server credential files.
//!
//! Each server's credentials live in `<config dir>/auth/<safe-name>.json`,
//! a flat JSON object from key to string. `safe-name` strips a leading `@`
//! and replaces `/` with `_`, so `@github/mcp` stores as `github_mcp.json`.

use crate::{default_config_dir, ConfigError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

fn auth_path(config_dir: Option<&Path>, server_name: &str) -> PathBuf {
    let dir = config_dir.map_or_else(default_config_dir, Path::to_path_buf);
    let safe = server_name.trim_start_matches('@').replace('/', "_");
    dir.join("auth").join(format!("{safe}.json"))
}

/// Load the auth map for a server. A missing file is an empty map, never an
/// error.
pub fn load_auth(
    config_dir: Option<&Path>,
    server_name: &str,
) -> Result<HashMap<String, String>, ConfigError> {
    let path = auth_path(config_dir, server_name);
    match std::fs::read(&path) {
        Ok(data) => Ok(serde_json::from_slice(&data).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(e) => Err(e.into()),
    }
}

/// Persist the auth map for a server. The file is mode 0600, the `auth/`
/// directory 0700.
pub fn save_auth(
    config_dir: Option<&Path>,
    server_name: &str,
    auth: &HashMap<String, String>,
) -> Result<(), ConfigError> {
    let path = auth_path(config_dir, server_name);
    let auth_dir = path.parent().expect("auth path has a parent");
    std::fs::create_dir_all(auth_dir)?;
    std::fs::write(&path, serde_json::to_vec_pretty(auth)?)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(auth_dir, std::fs::Permissions::from_mode(0o700))?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

/// Store a single bearer token under the conventional `token` key.
pub fn save_token(
    config_dir: Option<&Path>,
    server_name: &str,
    token: &str,
) -> Result<(), ConfigError> {
    let auth = HashMap::from([("token".to_string(), token.to_string())]);
    save_auth(config_dir, server_name, &auth)
}
