//! Core data models shared by the connector layer and the metadata store.
//!
//! Field names serialize in camelCase so that the persisted state blob keeps
//! the `connectionList` / `databaseList` / `schemaList` layout clients already
//! have on disk.

use serde::{Deserialize, Deserializer, Serialize};

/// Supported database engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Engine {
    #[serde(rename = "POSTGRESQL", alias = "postgresql", alias = "postgres")]
    PostgreSQL,
    #[serde(rename = "MYSQL", alias = "mysql")]
    MySQL,
    #[serde(rename = "MSSQL", alias = "mssql", alias = "sqlserver")]
    SqlServer,
}

impl Engine {
    /// All engines with an adapter, in display order.
    pub const ALL: [Engine; 3] = [Engine::PostgreSQL, Engine::MySQL, Engine::SqlServer];

    /// Port the engine listens on when a profile does not say otherwise.
    pub const fn default_port(self) -> u16 {
        match self {
            Engine::PostgreSQL => 5432,
            Engine::MySQL => 3306,
            Engine::SqlServer => 1433,
        }
    }

    /// Serialized tag of the engine.
    pub const fn tag(self) -> &'static str {
        match self {
            Engine::PostgreSQL => "POSTGRESQL",
            Engine::MySQL => "MYSQL",
            Engine::SqlServer => "MSSQL",
        }
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Engine::PostgreSQL => write!(f, "PostgreSQL"),
            Engine::MySQL => write!(f, "MySQL"),
            Engine::SqlServer => write!(f, "SQL Server"),
        }
    }
}

impl std::str::FromStr for Engine {
    type Err = crate::error::HarborError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgresql" | "postgres" | "pg" => Ok(Engine::PostgreSQL),
            "mysql" => Ok(Engine::MySQL),
            "mssql" | "sqlserver" | "sql-server" => Ok(Engine::SqlServer),
            other => Err(crate::error::HarborError::configuration(format!(
                "unknown engine type '{}' (expected postgresql, mysql or mssql)",
                other
            ))),
        }
    }
}

/// Optional TLS material of a connection profile.
///
/// `ca`, `cert` and `key` hold PEM contents. Certificate validation is
/// permissive unless `reject_unauthorized` is set.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SslOptions {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default)]
    pub reject_unauthorized: bool,
}

impl std::fmt::Debug for SslOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SslOptions")
            .field("enabled", &self.enabled)
            .field("ca", &self.ca.as_ref().map(|_| "<pem>"))
            .field("cert", &self.cert.as_ref().map(|_| "<pem>"))
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("reject_unauthorized", &self.reject_unauthorized)
            .finish()
    }
}

/// A named, persisted connection profile.
///
/// Identity is `id`. Profiles are created by the caller, mutated through
/// [`ConnectionPatch`] and only removed by an explicit bulk clear.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub engine_type: Engine,
    pub host: String,
    #[serde(deserialize_with = "deserialize_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl: Option<SslOptions>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("engine_type", &self.engine_type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("database", &self.database)
            .field("ssl", &self.ssl)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Creates a profile without an id; the store assigns one on creation.
    pub fn new(
        title: impl Into<String>,
        engine_type: Engine,
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            engine_type,
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            database: None,
            ssl: None,
        }
    }

    /// Builder method to set the default database.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Builder method to attach TLS options.
    pub fn with_ssl(mut self, ssl: SslOptions) -> Self {
        self.ssl = Some(ssl);
        self
    }

    /// `host:port`, safe for logs and error messages.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// TLS options when the profile opted in, `None` otherwise.
    pub fn active_ssl(&self) -> Option<&SslOptions> {
        self.ssl.as_ref().filter(|ssl| ssl.enabled)
    }

    /// Shallow-merges every field the patch sets.
    pub fn apply(&mut self, patch: ConnectionPatch) {
        let ConnectionPatch {
            title,
            engine_type,
            host,
            port,
            username,
            password,
            database,
            ssl,
        } = patch;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(engine_type) = engine_type {
            self.engine_type = engine_type;
        }
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        if let Some(username) = username {
            self.username = username;
        }
        if let Some(password) = password {
            self.password = password;
        }
        if let Some(database) = database {
            self.database = database;
        }
        if let Some(ssl) = ssl {
            self.ssl = ssl;
        }
    }
}

/// Accepts a port as a JSON number or as a decimal string.
fn deserialize_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortRepr {
        Number(u16),
        Text(String),
    }

    match PortRepr::deserialize(deserializer)? {
        PortRepr::Number(port) => Ok(port),
        PortRepr::Text(text) => text
            .trim()
            .parse::<u16>()
            .map_err(|e| serde::de::Error::custom(format!("invalid port '{}': {}", text, e))),
    }
}

/// Partial update of a [`Connection`]; `None` leaves a field untouched.
///
/// `database` and `ssl` are doubly optional so a patch can clear them.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnectionPatch {
    pub title: Option<String>,
    pub engine_type: Option<Engine>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<Option<String>>,
    pub ssl: Option<Option<SslOptions>>,
}

impl ConnectionPatch {
    /// True when the patch would not change anything.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl std::fmt::Debug for ConnectionPatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPatch")
            .field("title", &self.title)
            .field("engine_type", &self.engine_type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .field("database", &self.database)
            .field("ssl", &self.ssl)
            .finish()
    }
}

/// Structural definition of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Table name
    pub name: String,
    /// `CREATE TABLE`-equivalent definition
    pub structure: String,
}

/// One catalog discovered on a connection, identified by `(connection_id, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    pub connection_id: String,
    pub name: String,
    /// Empty until fetched, then a complete snapshot of the database's tables
    #[serde(default)]
    pub schema_list: Vec<Schema>,
}

impl Database {
    /// Creates a database entry whose schema list has not been fetched yet.
    pub fn new(connection_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            name: name.into(),
            schema_list: Vec::new(),
        }
    }

    /// Composite identity of the entry.
    pub fn key(&self) -> (&str, &str) {
        (&self.connection_id, &self.name)
    }

    /// Whether `other` denotes the same database.
    pub fn same_identity(&self, other: &Database) -> bool {
        self.key() == other.key()
    }
}

/// The connection, and optionally the database, the client is focused on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionContext {
    pub connection: Connection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<Database>,
}

/// One result row: column name to value, in column order.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Response shape of the metadata endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseObject<T> {
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ResponseObject<T> {
    /// Successful response.
    pub fn ok(data: T) -> Self {
        Self {
            data,
            message: None,
        }
    }

    /// Converts a non-empty `message` into [`HarborError::Remote`](crate::error::HarborError::Remote).
    pub fn into_result(self) -> crate::Result<T> {
        match self.message {
            Some(message) if !message.is_empty() => Err(crate::error::HarborError::remote(message)),
            _ => Ok(self.data),
        }
    }
}

impl<T: Default> ResponseObject<T> {
    /// Error response carrying an empty payload.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            data: T::default(),
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;
