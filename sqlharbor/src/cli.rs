//! Command-line surface.

use clap::{Args, Parser, Subcommand};
use sqlharbor_core::Engine;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "sqlharbor")]
#[command(about = "Manage database connection profiles and browse cached metadata")]
#[command(version)]
#[command(long_about = "
SQLHarbor - connection profiles and cached database metadata

Profiles, fetched database lists and table schemas are kept in a local
state file. Metadata is fetched directly from the database or, with
--remote-url, from a metadata service.

SUPPORTED DATABASES:
- PostgreSQL (POSTGRESQL)
- MySQL (MYSQL)
- SQL Server (MSSQL)

EXAMPLES:
  sqlharbor connection add --title local --engine postgresql --host localhost --username app
  sqlharbor databases 5f1c... --refresh
  sqlharbor describe 5f1c... sales orders
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// State file holding profiles and cached metadata
    #[arg(
        long,
        global = true,
        env = "SQLHARBOR_STATE_FILE",
        default_value = "sqlharbor-state.json"
    )]
    pub state_file: PathBuf,

    /// Base URL of a metadata service; metadata is fetched locally when unset
    #[arg(long, global = true, env = "SQLHARBOR_REMOTE_URL")]
    pub remote_url: Option<String>,

    /// Connect timeout in seconds
    #[arg(long, global = true, default_value = "30")]
    pub connect_timeout: u64,

    /// Password for `connection add` and `connection update`
    #[arg(long, global = true, env = "SQLHARBOR_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all logs except errors")]
    pub quiet: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage connection profiles
    #[command(subcommand)]
    Connection(ConnectionCommand),
    /// Focus a connection and optionally one of its databases
    Use {
        id: String,
        database: Option<String>,
    },
    /// Test that a connection profile can log in
    Test { id: String },
    /// List databases of a connection
    Databases {
        id: String,
        /// Bypass the cache
        #[arg(long)]
        refresh: bool,
    },
    /// Show the table schemas of a database
    Schema {
        id: String,
        database: String,
        /// Bypass the cache
        #[arg(long)]
        refresh: bool,
    },
    /// List base tables of a database
    Tables { id: String, database: String },
    /// Print the CREATE TABLE definition of a table
    Describe {
        id: String,
        database: String,
        table: String,
    },
    /// Run a statement and print its rows
    Execute {
        id: String,
        database: String,
        sql: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConnectionCommand {
    /// Create a profile
    Add(AddArgs),
    /// List profiles
    List,
    /// Show one profile
    Show { id: String },
    /// Change fields of a profile
    Update(UpdateArgs),
    /// Delete a profile and its cached metadata
    Remove { id: String },
}

#[derive(Debug, Args)]
pub struct AddArgs {
    #[arg(long)]
    pub title: String,

    /// postgresql, mysql or mssql
    #[arg(long)]
    pub engine: Engine,

    #[arg(long)]
    pub host: String,

    /// Defaults to the engine's standard port
    #[arg(long)]
    pub port: Option<u16>,

    #[arg(long)]
    pub username: String,

    /// Default database
    #[arg(long)]
    pub database: Option<String>,

    #[command(flatten)]
    pub tls: TlsArgs,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub engine: Option<Engine>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    #[arg(long)]
    pub username: Option<String>,

    #[arg(long, conflicts_with = "clear_database")]
    pub database: Option<String>,

    /// Remove the default database
    #[arg(long)]
    pub clear_database: bool,

    /// Remove TLS settings
    #[arg(long, conflicts_with_all = ["ssl", "ssl_ca", "ssl_cert", "ssl_key", "ssl_verify"])]
    pub clear_ssl: bool,

    #[command(flatten)]
    pub tls: TlsArgs,
}

#[derive(Debug, Args)]
pub struct TlsArgs {
    /// Connect over TLS
    #[arg(long)]
    pub ssl: bool,

    /// PEM file with the CA certificate
    #[arg(long, value_name = "FILE", requires = "ssl")]
    pub ssl_ca: Option<PathBuf>,

    /// PEM file with the client certificate
    #[arg(long, value_name = "FILE", requires = "ssl")]
    pub ssl_cert: Option<PathBuf>,

    /// PEM file with the client key
    #[arg(long, value_name = "FILE", requires = "ssl")]
    pub ssl_key: Option<PathBuf>,

    /// Verify the server certificate; by default any certificate is accepted
    #[arg(long, requires = "ssl")]
    pub ssl_verify: bool,
}
