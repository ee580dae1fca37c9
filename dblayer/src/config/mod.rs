//! Connection configuration.
//!
//! A [`ConnectionConfig`] is read from YAML or from `DBLAYER_*` environment
//! variables and carries everything needed to open one connection, including
//! the request-scoped lock policy (`weak_locks`).

use crate::error::{DbError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where a server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostSpec {
    Tcp { host: String, port: Option<u16> },
    Socket(String),
}

impl HostSpec {
    /// Parse `host`, `host:port`, `host:/path/to/socket`, `/path/to/socket` or `[::1]:port`.
    pub fn parse(host: &str) -> Result<HostSpec> {
        let host = host.trim();
        if host.is_empty() {
            return Ok(HostSpec::Tcp {
                host: "localhost".to_string(),
                port: None,
            });
        }
        if host.starts_with('/') {
            return Ok(HostSpec::Socket(host.to_string()));
        }
        if let Some(rest) = host.strip_prefix('[') {
            let (addr, tail) = rest
                .split_once(']')
                .ok_or_else(|| DbError::Config(format!("Unterminated IPv6 host '{host}'")))?;
            let port = match tail.strip_prefix(':') {
                Some(port) => Some(parse_port(host, port)?),
                None if tail.is_empty() => None,
                None => return Err(DbError::Config(format!("Invalid host '{host}'"))),
            };
            return Ok(HostSpec::Tcp {
                host: addr.to_string(),
                port,
            });
        }
        match host.split_once(':') {
            // the host part is irrelevant once a socket is named
            Some((_, socket)) if socket.starts_with('/') => Ok(HostSpec::Socket(socket.to_string())),
            Some((name, port)) => Ok(HostSpec::Tcp {
                host: name.to_string(),
                port: Some(parse_port(host, port)?),
            }),
            None => Ok(HostSpec::Tcp {
                host: host.to_string(),
                port: None,
            }),
        }
    }
}

fn parse_port(host: &str, port: &str) -> Result<u16> {
    port.parse::<u16>()
        .map_err(|_| DbError::Config(format!("Invalid port in host '{host}'")))
}

/// Everything needed to open one connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// `sqlite`, `mysqli`, `mysqlimb4` or `pgsql`.
    pub driver: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// Database name, or file path (`:memory:` allowed) for SQLite.
    pub database: String,
    /// Prepended to every table name the layer builds itself.
    #[serde(default)]
    pub prefix: String,
    /// Tolerate a missing lock privilege instead of failing.
    #[serde(default)]
    pub weak_locks: bool,
}

impl ConnectionConfig {
    /// In-memory SQLite database, mostly for tests and tooling.
    pub fn sqlite_memory() -> Self {
        ConnectionConfig {
            driver: "sqlite".to_string(),
            host: String::new(),
            user: String::new(),
            password: String::new(),
            database: ":memory:".to_string(),
            prefix: String::new(),
            weak_locks: false,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: ConnectionConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read `DBLAYER_*` variables. `None` when `DBLAYER_DRIVER` is unset.
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>> {
        let Some(driver) = lookup("DBLAYER_DRIVER") else {
            return Ok(None);
        };
        let weak_locks = match lookup("DBLAYER_WEAK_LOCKS").as_deref() {
            None | Some("") | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(other) => {
                return Err(DbError::Config(format!(
                    "DBLAYER_WEAK_LOCKS must be true or false, got '{other}'"
                )))
            }
        };
        let config = ConnectionConfig {
            driver,
            host: lookup("DBLAYER_HOST").unwrap_or_default(),
            user: lookup("DBLAYER_USER").unwrap_or_default(),
            password: lookup("DBLAYER_PASSWORD").unwrap_or_default(),
            database: lookup("DBLAYER_DATABASE").unwrap_or_default(),
            prefix: lookup("DBLAYER_PREFIX").unwrap_or_default(),
            weak_locks,
        };
        config.validate()?;
        Ok(Some(config))
    }

    pub fn host_spec(&self) -> Result<HostSpec> {
        HostSpec::parse(&self.host)
    }

    fn validate(&self) -> Result<()> {
        crate::driver::Driver::from_name(&self.driver)?;
        if self.database.is_empty() {
            return Err(DbError::Config("No database given".to_string()));
        }
        if !self
            .prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(DbError::Config(format!(
                "Table prefix '{}' may only contain letters, digits and '_'",
                self.prefix
            )));
        }
        self.host_spec().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::OnceLock;

    // Serializes tests that touch process environment
    fn test_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    #[test]
    fn test_host_spec_forms() {
        assert_eq!(
            HostSpec::parse("").unwrap(),
            HostSpec::Tcp {
                host: "localhost".into(),
                port: None
            }
        );
        assert_eq!(
            HostSpec::parse("db.local:3307").unwrap(),
            HostSpec::Tcp {
                host: "db.local".into(),
                port: Some(3307)
            }
        );
        assert_eq!(
            HostSpec::parse("localhost:/var/run/mysqld/mysqld.sock").unwrap(),
            HostSpec::Socket("/var/run/mysqld/mysqld.sock".into())
        );
        assert_eq!(
            HostSpec::parse("/tmp/.s.PGSQL.5432").unwrap(),
            HostSpec::Socket("/tmp/.s.PGSQL.5432".into())
        );
        assert_eq!(
            HostSpec::parse("[::1]:5432").unwrap(),
            HostSpec::Tcp {
                host: "::1".into(),
                port: Some(5432)
            }
        );
        assert!(matches!(
            HostSpec::parse("db:notaport"),
            Err(DbError::Config(_))
        ));
    }

    #[test]
    fn test_from_yaml() {
        let config = ConnectionConfig::from_yaml_str(
            r#"
driver: mysqlimb4
host: "db:3306"
user: blog
password: secret
database: blog
prefix: dc_
weak_locks: true
"#,
        )
        .unwrap();
        assert_eq!(config.driver, "mysqlimb4");
        assert_eq!(config.prefix, "dc_");
        assert!(config.weak_locks);
        assert_eq!(
            config.host_spec().unwrap(),
            HostSpec::Tcp {
                host: "db".into(),
                port: Some(3306)
            }
        );
    }

    #[test]
    fn test_defaults_and_validation() {
        let config = ConnectionConfig::from_yaml_str("driver: sqlite\ndatabase: ':memory:'\n").unwrap();
        assert!(!config.weak_locks);
        assert!(config.prefix.is_empty());

        assert!(matches!(
            ConnectionConfig::from_yaml_str("driver: oracle\ndatabase: x\n"),
            Err(DbError::UnknownDriver(_))
        ));
        assert!(matches!(
            ConnectionConfig::from_yaml_str("driver: sqlite\ndatabase: x\nprefix: 'a b'\n"),
            Err(DbError::Config(_))
        ));
        assert!(matches!(
            ConnectionConfig::from_yaml_str("driver: sqlite\n"),
            Err(DbError::Yaml(_))
        ));
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("DBLAYER_DRIVER", "pgsql"),
            ("DBLAYER_DATABASE", "blog"),
            ("DBLAYER_WEAK_LOCKS", "true"),
        ]
        .into_iter()
        .collect();
        let config = ConnectionConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap()
            .unwrap();
        assert_eq!(config.driver, "pgsql");
        assert!(config.weak_locks);

        assert!(ConnectionConfig::from_lookup(|_| None).unwrap().is_none());
    }

    #[test]
    fn test_from_env() {
        let _guard = test_lock().lock().unwrap();
        std::env::set_var("DBLAYER_DRIVER", "sqlite");
        std::env::set_var("DBLAYER_DATABASE", ":memory:");
        std::env::set_var("DBLAYER_WEAK_LOCKS", "maybe");
        assert!(matches!(
            ConnectionConfig::from_env(),
            Err(DbError::Config(_))
        ));
        std::env::remove_var("DBLAYER_WEAK_LOCKS");
        let config = ConnectionConfig::from_env().unwrap().unwrap();
        assert_eq!(config.database, ":memory:");
        std::env::remove_var("DBLAYER_DRIVER");
        std::env::remove_var("DBLAYER_DATABASE");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dblayer.yaml");
        std::fs::write(&path, "driver: sqlite\ndatabase: blog.db\n").unwrap();
        let config = ConnectionConfig::from_file(&path).unwrap();
        assert_eq!(config.database, "blog.db");
    }
}
