//! The path grammar: every path the tree serves maps to exactly one node.
//!
//! A scoped server (`@scope/name`) consumes two leading segments; a bare
//! server consumes one. Whatever follows is the server-relative part, so
//! both layouts share one interpretation.

use mcpfs_config::{parse_server_name, Config};

/// A resolved position in the tree. `server` is always the full configured
/// name (`@scope/name` or bare).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Root,
    ConfigDir,
    /// `/.config/servers.json`
    ConfigFile,
    Scope(String),
    Server(String),
    /// `/<server>/.status`
    StatusFile(String),
    /// `/<server>/.schema`
    SchemaFile(String),
    ToolDir { server: String, tool: String },
    ToolSchemaFile { server: String, tool: String },
    CallFile { server: String, tool: String },
    ResultFile { server: String, tool: String },
}

pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Map a path onto the grammar. `None` means the path cannot exist — tool
/// names are not checked here (that needs a live connection).
pub fn parse(path: &str, config: &Config) -> Option<Node> {
    let parts = split_path(path);
    match parts.as_slice() {
        [] => Some(Node::Root),
        [".config"] => Some(Node::ConfigDir),
        [".config", "servers.json"] => Some(Node::ConfigFile),
        [".config", ..] => None,
        rest => parse_server_path(rest, config),
    }
}

fn parse_server_path(parts: &[&str], config: &Config) -> Option<Node> {
    let (server, rest): (String, &[&str]) = if parts[0].starts_with('@') {
        if parts.len() == 1 {
            let scope = parts[0];
            return has_scope(config, scope).then(|| Node::Scope(scope.to_string()));
        }
        (format!("{}/{}", parts[0], parts[1]), &parts[2..])
    } else {
        (parts[0].to_string(), &parts[1..])
    };

    if config.get_server(&server).is_none() {
        return None;
    }

    match rest {
        [] => Some(Node::Server(server)),
        [".status"] => Some(Node::StatusFile(server)),
        [".schema"] => Some(Node::SchemaFile(server)),
        [tool] => Some(Node::ToolDir {
            server,
            tool: (*tool).to_string(),
        }),
        [tool, ".schema"] => Some(Node::ToolSchemaFile {
            server,
            tool: (*tool).to_string(),
        }),
        [tool, ".call"] => Some(Node::CallFile {
            server,
            tool: (*tool).to_string(),
        }),
        [tool, ".result"] => Some(Node::ResultFile {
            server,
            tool: (*tool).to_string(),
        }),
        _ => None,
    }
}

fn has_scope(config: &Config, scope: &str) -> bool {
    config
        .servers
        .keys()
        .any(|name| parse_server_name(name).0.as_deref() == Some(scope))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.add_http_server("@github/mcp", "http://example.com", HashMap::new());
        config.add_stdio_server("local", "echo", vec![], HashMap::new());
        config
    }

    #[test]
    fn root_and_config_paths() {
        let config = test_config();
        assert_eq!(parse("/", &config), Some(Node::Root));
        assert_eq!(parse("", &config), Some(Node::Root));
        assert_eq!(parse("/.config", &config), Some(Node::ConfigDir));
        assert_eq!(parse("/.config/servers.json", &config), Some(Node::ConfigFile));
        assert_eq!(parse("/.config/other", &config), None);
    }

    #[test]
    fn scoped_server_paths() {
        let config = test_config();
        assert_eq!(
            parse("/@github", &config),
            Some(Node::Scope("@github".to_string()))
        );
        assert_eq!(
            parse("/@github/mcp", &config),
            Some(Node::Server("@github/mcp".to_string()))
        );
        assert_eq!(
            parse("/@github/mcp/.status", &config),
            Some(Node::StatusFile("@github/mcp".to_string()))
        );
        assert_eq!(
            parse("/@github/mcp/search/.call", &config),
            Some(Node::CallFile {
                server: "@github/mcp".to_string(),
                tool: "search".to_string(),
            })
        );
    }

    #[test]
    fn bare_server_paths_shift_one_level() {
        let config = test_config();
        assert_eq!(parse("/local", &config), Some(Node::Server("local".to_string())));
        assert_eq!(
            parse("/local/.schema", &config),
            Some(Node::SchemaFile("local".to_string()))
        );
        assert_eq!(
            parse("/local/echo/.result", &config),
            Some(Node::ResultFile {
                server: "local".to_string(),
                tool: "echo".to_string(),
            })
        );
    }

    #[test]
    fn unknown_names_do_not_parse() {
        let config = test_config();
        assert_eq!(parse("/@nope", &config), None);
        assert_eq!(parse("/@github/other", &config), None);
        assert_eq!(parse("/stranger", &config), None);
        assert_eq!(parse("/@github/mcp/tool/bogus", &config), None);
        assert_eq!(parse("/@github/mcp/tool/.call/deeper", &config), None);
    }

    #[test]
    fn tool_dirs_parse_without_membership_check() {
        // Tool existence needs a live connection; the grammar accepts any
        // name at tool depth.
        let config = test_config();
        assert_eq!(
            parse("/@github/mcp/anything", &config),
            Some(Node::ToolDir {
                server: "@github/mcp".to_string(),
                tool: "anything".to_string(),
            })
        );
    }
}
