use std::collections::BTreeMap;

use thiserror::Error;

/// Database engines recognized from container image names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbKind {
    Postgres,
    MySql,
    MariaDb,
    MongoDb,
    Redis,
}

/// Image-name substrings mapped to database kinds. Order matters only in so
/// far as `mariadb` must match before the looser patterns would.
const DB_PATTERNS: &[(&str, DbKind)] = &[
    ("postgres", DbKind::Postgres),
    ("mariadb", DbKind::MariaDb),
    ("mysql", DbKind::MySql),
    ("mongo", DbKind::MongoDb),
    ("redis", DbKind::Redis),
];

impl DbKind {
    /// Matches known database patterns against an image name,
    /// case-insensitively. Returns None for non-database images.
    pub fn detect(image: &str) -> Option<DbKind> {
        let lower = image.to_lowercase();
        DB_PATTERNS
            .iter()
            .find(|(pat, _)| lower.contains(pat))
            .map(|(_, kind)| *kind)
    }

    pub fn label(&self) -> &'static str {
        match self {
            DbKind::Postgres => "postgres",
            DbKind::MySql => "mysql",
            DbKind::MariaDb => "mariadb",
            DbKind::MongoDb => "mongodb",
            DbKind::Redis => "redis",
        }
    }

    /// The conventional server port inside the container.
    pub fn default_port(&self) -> u16 {
        match self {
            DbKind::Postgres => 5432,
            DbKind::MySql | DbKind::MariaDb => 3306,
            DbKind::MongoDb => 27017,
            DbKind::Redis => 6379,
        }
    }

    /// The SQL wire protocol spoken by this engine, when there is one.
    /// mariadb is mysql-compatible; mongodb/redis have no SQL surface.
    pub fn sql_flavor(&self) -> Option<SqlFlavor> {
        match self {
            DbKind::Postgres => Some(SqlFlavor::Postgres),
            DbKind::MySql | DbKind::MariaDb => Some(SqlFlavor::MySql),
            DbKind::MongoDb | DbKind::Redis => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SqlFlavor {
    Postgres,
    MySql,
}

#[derive(Clone, Debug, Error)]
pub enum ConnectError {
    #[error("browsing {0} databases is not supported")]
    Unsupported(&'static str),
}

/// Connection parameters for a database discovered inside a container,
/// derived from its declared environment and published port bindings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionSpec {
    pub flavor: SqlFlavor,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl ConnectionSpec {
    /// Derives connection parameters from the container's env var list
    /// (`KEY=VALUE` strings) and its published-port map (container port ->
    /// host port). Falls back to per-kind defaults for anything undeclared.
    pub fn derive(
        kind: DbKind,
        env: &[String],
        port_bindings: &BTreeMap<u16, u16>,
    ) -> Result<ConnectionSpec, ConnectError> {
        let flavor = kind
            .sql_flavor()
            .ok_or(ConnectError::Unsupported(kind.label()))?;

        let vars: BTreeMap<&str, &str> = env
            .iter()
            .filter_map(|e| e.split_once('='))
            .collect();
        let var = |key: &str, default: &str| -> String {
            match vars.get(key) {
                Some(v) if !v.is_empty() => (*v).to_string(),
                _ => default.to_string(),
            }
        };

        let (user, password, database) = match flavor {
            SqlFlavor::Postgres => (
                var("POSTGRES_USER", "postgres"),
                var("POSTGRES_PASSWORD", ""),
                var("POSTGRES_DB", "postgres"),
            ),
            SqlFlavor::MySql => (
                var("MYSQL_USER", "root"),
                var("MYSQL_PASSWORD", &var("MYSQL_ROOT_PASSWORD", "")),
                var("MYSQL_DATABASE", "mysql"),
            ),
        };

        let server_port = kind.default_port();
        let port = port_bindings.get(&server_port).copied().unwrap_or(server_port);

        Ok(ConnectionSpec {
            flavor,
            host: "localhost".into(),
            port,
            user,
            password,
            database,
        })
    }

    /// DSN in the form the sqlx drivers accept.
    pub fn dsn(&self) -> String {
        match self.flavor {
            SqlFlavor::Postgres => format!(
                "postgres://{}:{}@{}:{}/{}?sslmode=disable",
                self.user, self.password, self.host, self.port, self.database
            ),
            SqlFlavor::MySql => format!(
                "mysql://{}:{}@{}:{}/{}",
                self.user, self.password, self.host, self.port, self.database
            ),
        }
    }
}
