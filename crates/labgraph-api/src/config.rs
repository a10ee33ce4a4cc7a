//! Configuration for the LabGraph API server and CLI.

use std::path::PathBuf;

use serde::Deserialize;

use labgraph_graph::GraphConfig;

/// Top-level configuration.
///
/// Loaded from `labgraph.toml` (optional) and overridden by `LABGRAPH__`
/// environment variables, e.g. `LABGRAPH__NEO4J__URI`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabGraphConfig {
    #[serde(default)]
    pub neo4j: GraphConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub bulk: BulkConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP server listens on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Attempts at creating an entity when a concurrent creation took its id.
    #[serde(default = "default_id_retry_attempts")]
    pub id_retry_attempts: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            id_retry_attempts: default_id_retry_attempts(),
        }
    }
}

/// Locations of CSV tables, as seen by the Neo4j server.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkConfig {
    /// Exports go to a dated directory below this one.
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,

    #[serde(default = "default_import_dir")]
    pub import_dir: PathBuf,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            export_dir: default_export_dir(),
            import_dir: default_import_dir(),
        }
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_id_retry_attempts() -> u32 {
    3
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("export")
}

fn default_import_dir() -> PathBuf {
    PathBuf::from("import")
}

impl LabGraphConfig {
    /// Load from `<file_prefix>.toml` and the environment.
    pub fn load(file_prefix: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("LABGRAPH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use config::{Config, File, FileFormat};

    use super::*;

    fn parse(toml: &str) -> LabGraphConfig {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse("");
        assert_eq!(config.server.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.server.id_retry_attempts, 3);
        assert_eq!(config.neo4j.uri, "bolt://localhost:7687");
        assert_eq!(config.bulk.export_dir, PathBuf::from("export"));
    }

    #[test]
    fn sections_override_defaults() {
        let config = parse(
            r#"
            [neo4j]
            uri = "bolt://graph:7687"
            password = "secret"

            [server]
            bind_addr = "0.0.0.0:9000"

            [bulk]
            import_dir = "/var/lib/neo4j/import/2024-03-09"
            "#,
        );
        assert_eq!(config.neo4j.uri, "bolt://graph:7687");
        assert_eq!(config.neo4j.password, "secret");
        assert_eq!(config.neo4j.user, "neo4j");
        assert_eq!(config.server.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.server.id_retry_attempts, 3);
        assert_eq!(
            config.bulk.import_dir,
            PathBuf::from("/var/lib/neo4j/import/2024-03-09")
        );
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let config = LabGraphConfig::load("does-not-exist-labgraph").unwrap();
        assert_eq!(config.server.id_retry_attempts, 3);
    }
}
