//! Server registry for mcpfs.
//!
//! Servers live in `<config dir>/servers.json`, a JSON object keyed by
//! qualified name (`@scope/name` or a bare `name`). Credentials live next to
//! it under `auth/` and are spliced into env vars and HTTP headers through
//! `${auth.<key>}` placeholders at client-creation time.

mod auth;
mod error;

pub use auth::{load_auth, save_auth, save_token};
pub use error::ConfigError;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// How a configured server is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Stdio,
    Http,
}

/// A single configured MCP server. Only the fields for the chosen transport
/// are populated; the rest serialize away.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub transport: Transport,
    /// Command to spawn (stdio transport).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
    /// Endpoint URL (http transport).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

/// The loaded server registry plus the directory it came from.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub servers: BTreeMap<String, ServerConfig>,
    dir: PathBuf,
}

/// Default config directory: `~/.mcp/.config`.
pub fn default_config_dir() -> PathBuf {
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mcp")
        .join(".config")
}

impl Config {
    /// Load the registry from `<dir>/servers.json`. A missing file is an
    /// empty registry; malformed JSON is an error.
    pub fn load(config_dir: Option<&Path>) -> Result<Self, ConfigError> {
        let dir = config_dir.map_or_else(default_config_dir, Path::to_path_buf);
        let path = dir.join("servers.json");

        let servers = match std::fs::read(&path) {
            Ok(data) => {
                serde_json::from_slice(&data).map_err(|e| ConfigError::Parse {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self { servers, dir })
    }

    /// Write the registry back to `<dir>/servers.json`.
    pub fn save(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join("servers.json");
        std::fs::write(&path, marshal_servers(&self.servers)?)?;
        Ok(())
    }

    pub fn add_stdio_server(
        &mut self,
        name: impl Into<String>,
        command: impl Into<String>,
        args: Vec<String>,
        env: HashMap<String, String>,
    ) {
        self.servers.insert(
            name.into(),
            ServerConfig {
                transport: Transport::Stdio,
                command: Some(command.into()),
                args,
                env,
                url: None,
                headers: HashMap::new(),
            },
        );
    }

    pub fn add_http_server(
        &mut self,
        name: impl Into<String>,
        url: impl Into<String>,
        headers: HashMap<String, String>,
    ) {
        self.servers.insert(
            name.into(),
            ServerConfig {
                transport: Transport::Http,
                command: None,
                args: Vec::new(),
                env: HashMap::new(),
                url: Some(url.into()),
                headers,
            },
        );
    }

    pub fn get_server(&self, name: &str) -> Option<&ServerConfig> {
        self.servers.get(name)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Render the registry the way `servers.json` stores it (indented JSON).
pub fn marshal_servers(
    servers: &BTreeMap<String, ServerConfig>,
) -> Result<Vec<u8>, ConfigError> {
    Ok(serde_json::to_vec_pretty(servers)?)
}

impl ServerConfig {
    /// Env vars with `${auth.<key>}` placeholders substituted.
    pub fn resolve_env(&self, auth: &HashMap<String, String>) -> HashMap<String, String> {
        self.env
            .iter()
            .map(|(k, v)| (k.clone(), resolve_auth_vars(v, auth)))
            .collect()
    }

    /// HTTP headers with `${auth.<key>}` placeholders substituted.
    pub fn resolve_headers(&self, auth: &HashMap<String, String>) -> HashMap<String, String> {
        self.headers
            .iter()
            .map(|(k, v)| (k.clone(), resolve_auth_vars(v, auth)))
            .collect()
    }
}

fn auth_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{auth\.([A-Za-z0-9_]+)\}").expect("placeholder pattern is valid")
    })
}

/// Replace every `${auth.<key>}` whose key is present in `auth`; unknown keys
/// are left verbatim.
pub fn resolve_auth_vars(template: &str, auth: &HashMap<String, String>) -> String {
    auth_pattern()
        .replace_all(template, |caps: &regex::Captures| {
            let key = &caps[1];
            match auth.get(key) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Split a qualified server name into its scope and short name.
///
/// `@scope/name` yields `(Some("@scope"), "name")`; a bare name yields
/// `(None, name)`.
pub fn parse_server_name(name: &str) -> (Option<String>, String) {
    let stripped = name.strip_prefix('@').unwrap_or(name);
    match stripped.split_once('/') {
        Some((scope, server)) => (Some(format!("@{scope}")), server.to_string()),
        None => (None, stripped.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn auth_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(Some(dir.path())).unwrap();
        assert!(config.servers.is_empty());
        assert_eq!(config.dir(), dir.path());
    }

    #[test]
    fn load_malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("servers.json"), b"not json").unwrap();
        let err = Config::load(Some(dir.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn save_and_reload_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::load(Some(dir.path())).unwrap();
        config.add_stdio_server(
            "@fs/local",
            "npx",
            vec!["-y".into(), "server-filesystem".into()],
            HashMap::new(),
        );
        config.add_http_server(
            "@github/mcp",
            "https://mcp.example.com/rpc",
            auth_map(&[("Authorization", "Bearer ${auth.token}")]),
        );
        config.save().unwrap();

        let reloaded = Config::load(Some(dir.path())).unwrap();
        assert_eq!(reloaded.servers.len(), 2);
        let fs = reloaded.get_server("@fs/local").unwrap();
        assert_eq!(fs.transport, Transport::Stdio);
        assert_eq!(fs.command.as_deref(), Some("npx"));
        let gh = reloaded.get_server("@github/mcp").unwrap();
        assert_eq!(gh.transport, Transport::Http);
        assert_eq!(gh.url.as_deref(), Some("https://mcp.example.com/rpc"));
    }

    #[test]
    fn saved_stdio_server_omits_http_fields() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::load(Some(dir.path())).unwrap();
        config.add_stdio_server("local", "echo", vec![], HashMap::new());
        config.save().unwrap();

        let raw = std::fs::read_to_string(dir.path().join("servers.json")).unwrap();
        assert!(raw.contains(r#""transport": "stdio""#));
        assert!(!raw.contains("url"));
        assert!(!raw.contains("headers"));
    }

    #[test]
    fn parse_scoped_name() {
        assert_eq!(
            parse_server_name("@github/mcp"),
            (Some("@github".to_string()), "mcp".to_string())
        );
    }

    #[test]
    fn parse_bare_name() {
        assert_eq!(parse_server_name("local"), (None, "local".to_string()));
    }

    #[test]
    fn resolve_known_placeholder() {
        let auth = auth_map(&[("token", "s3cret")]);
        assert_eq!(
            resolve_auth_vars("Bearer ${auth.token}", &auth),
            "Bearer s3cret"
        );
    }

    #[test]
    fn resolve_unknown_placeholder_left_verbatim() {
        let auth = auth_map(&[("token", "s3cret")]);
        assert_eq!(
            resolve_auth_vars("${auth.missing}", &auth),
            "${auth.missing}"
        );
    }

    #[test]
    fn resolve_mixed_placeholders() {
        let auth = auth_map(&[("user", "alice"), ("pass", "hunter2")]);
        assert_eq!(
            resolve_auth_vars("${auth.user}:${auth.pass}@${auth.host}", &auth),
            "alice:hunter2@${auth.host}"
        );
    }

    #[test]
    fn resolve_env_and_headers() {
        let auth = auth_map(&[("token", "tok")]);
        let mut server = ServerConfig {
            transport: Transport::Http,
            command: None,
            args: Vec::new(),
            env: auth_map(&[("API_KEY", "${auth.token}")]),
            url: Some("https://example.com".into()),
            headers: auth_map(&[("Authorization", "Bearer ${auth.token}")]),
        };
        assert_eq!(server.resolve_env(&auth)["API_KEY"], "tok");
        assert_eq!(server.resolve_headers(&auth)["Authorization"], "Bearer tok");

        server.env.clear();
        assert!(server.resolve_env(&auth).is_empty());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn key_strategy() -> impl Strategy<Value = String> {
            "[A-Za-z0-9_]{1,12}"
        }

        proptest! {
            /// Every placeholder whose key is in the auth map is replaced by
            /// its value; every other placeholder survives verbatim.
            #[test]
            fn substitution_is_exact(
                known in key_strategy(),
                unknown in key_strategy(),
                value in "[a-zA-Z0-9 ]{0,20}",
                prefix in "[a-z ]{0,10}",
                suffix in "[a-z ]{0,10}",
            ) {
                prop_assume!(known != unknown);
                let auth = HashMap::from([(known.clone(), value.clone())]);
                let template =
                    format!("{prefix}${{auth.{known}}}{suffix}${{auth.{unknown}}}");
                let resolved = resolve_auth_vars(&template, &auth);
                prop_assert_eq!(
                    resolved,
                    format!("{prefix}{value}{suffix}${{auth.{unknown}}}")
                );
            }

            /// Resolution never invents or drops text outside placeholders.
            #[test]
            fn plain_text_is_untouched(text in "[a-zA-Z0-9 /:.\\-]{0,40}") {
                prop_assume!(!text.contains("${"));
                let auth = HashMap::from([("k".to_string(), "v".to_string())]);
                prop_assert_eq!(resolve_auth_vars(&text, &auth), text);
            }
        }
    }
}
