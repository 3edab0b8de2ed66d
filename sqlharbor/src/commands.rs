//! Command execution against the state file and the connectors.

use crate::cli::{AddArgs, Cli, Command, ConnectionCommand, TlsArgs, UpdateArgs};
use anyhow::{Context, Result, bail};
use serde_json::{Value, json};
use sqlharbor_core::error::redact_database_url;
use sqlharbor_core::fetcher::ConnectorFetcher;
use sqlharbor_core::{
    Connection, ConnectionContext, ConnectionPatch, ConnectionStore, ConnectorConfig, Database,
    DatabaseAdapter, JsonFileStorage, MetadataFetcher, SslOptions, create_connector_with_config,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const MASKED: &str = "********";

/// Runs one command and returns the JSON document to print.
pub async fn run(cli: &Cli) -> Result<Value> {
    let config = ConnectorConfig::default()
        .with_connect_timeout(Duration::from_secs(cli.global.connect_timeout));
    config
        .validate()
        .context("invalid --connect-timeout")?;

    let storage = JsonFileStorage::new(&cli.global.state_file);
    let fetcher = build_fetcher(cli.global.remote_url.as_deref(), &config)?;
    let store = ConnectionStore::restore(fetcher, &storage)
        .await
        .with_context(|| format!("failed to load {}", cli.global.state_file.display()))?;
    debug!("Loaded state from {}", cli.global.state_file.display());

    let (output, mutated) = dispatch(cli, &store, &config).await?;

    if mutated {
        store
            .save(&storage)
            .await
            .with_context(|| format!("failed to save {}", cli.global.state_file.display()))?;
    }
    Ok(output)
}

fn build_fetcher(
    remote_url: Option<&str>,
    config: &ConnectorConfig,
) -> Result<Arc<dyn MetadataFetcher>> {
    match remote_url {
        #[cfg(feature = "http")]
        Some(url) => {
            info!("Fetching metadata from {}", redact_database_url(url));
            let fetcher =
                sqlharbor_core::fetcher::HttpFetcher::new(url, config.query_timeout)?;
            Ok(Arc::new(fetcher))
        }
        #[cfg(not(feature = "http"))]
        Some(url) => bail!(
            "cannot use remote metadata service {}: built without the http feature",
            redact_database_url(url)
        ),
        None => Ok(Arc::new(ConnectorFetcher::new(config.clone()))),
    }
}

async fn dispatch(
    cli: &Cli,
    store: &ConnectionStore,
    config: &ConnectorConfig,
) -> Result<(Value, bool)> {
    let password = cli.global.password.as_deref();

    match &cli.command {
        Command::Connection(ConnectionCommand::Add(args)) => {
            let profile = profile_from_args(args, password)?;
            let created = store.create_connection(profile).await;
            Ok((masked(&created)?, true))
        }
        Command::Connection(ConnectionCommand::List) => {
            let connections = store
                .connection_list()
                .await
                .iter()
                .map(masked)
                .collect::<Result<Vec<_>>>()?;
            Ok((Value::Array(connections), false))
        }
        Command::Connection(ConnectionCommand::Show { id }) => {
            let connection = lookup(store, id).await?;
            Ok((masked(&connection)?, false))
        }
        Command::Connection(ConnectionCommand::Update(args)) => {
            let patch = patch_from_args(args, password)?;
            let updated = store
                .update_connection(&args.id, patch)
                .await
                .with_context(|| format!("no connection with id '{}'", args.id))?;
            Ok((masked(&updated)?, true))
        }
        Command::Connection(ConnectionCommand::Remove { id }) => {
            let removed = store.clear_connection(|c| c.id != *id).await;
            if removed == 0 {
                bail!("no connection with id '{}'", id);
            }
            Ok((json!({ "removed": id }), true))
        }
        Command::Use { id, database } => {
            let connection = lookup(store, id).await?;
            let database = match database {
                Some(name) => Some(cached_or_new(store, &connection, name).await),
                None => None,
            };
            let ctx = ConnectionContext {
                connection,
                database,
            };
            let output = json!({
                "connectionId": ctx.connection.id,
                "database": ctx.database.as_ref().map(|db| db.name.clone()),
            });
            store.set_current_connection_ctx(Some(ctx)).await;
            Ok((output, true))
        }
        Command::Test { id } => {
            let connection = lookup(store, id).await?;
            let connector = create_connector_with_config(&connection, config.clone())?;
            connector.test_connection().await?;
            info!("Connection to {} succeeded", connection.address());
            Ok((json!({ "ok": true }), false))
        }
        Command::Databases { id, refresh } => {
            let connection = lookup(store, id).await?;
            let names: Vec<String> = store
                .get_or_fetch_database_list(&connection, *refresh)
                .await?
                .into_iter()
                .map(|db| db.name)
                .collect();
            Ok((json!(names), true))
        }
        Command::Schema {
            id,
            database,
            refresh,
        } => {
            let connection = lookup(store, id).await?;
            let database = cached_or_new(store, &connection, database).await;
            let schemas = store
                .get_or_fetch_database_schema(&database, *refresh)
                .await?;
            Ok((serde_json::to_value(schemas)?, true))
        }
        Command::Tables { id, database } => {
            let connection = lookup(store, id).await?;
            let connector = create_connector_with_config(&connection, config.clone())?;
            let tables = connector.get_tables(database).await?;
            Ok((json!(tables), false))
        }
        Command::Describe {
            id,
            database,
            table,
        } => {
            let connection = lookup(store, id).await?;
            let connector = create_connector_with_config(&connection, config.clone())?;
            let structure = connector.get_table_structure(database, table).await?;
            Ok((json!({ "name": table, "structure": structure }), false))
        }
        Command::Execute { id, database, sql } => {
            let connection = lookup(store, id).await?;
            let connector = create_connector_with_config(&connection, config.clone())?;
            let rows = connector.execute(database, sql).await?;
            Ok((json!(rows), false))
        }
    }
}

async fn lookup(store: &ConnectionStore, id: &str) -> Result<Connection> {
    store
        .get_connection_by_id(id)
        .await
        .with_context(|| format!("no connection with id '{}'", id))
}

/// The cached entry when one exists, so cached schemas are reused.
async fn cached_or_new(store: &ConnectionStore, connection: &Connection, name: &str) -> Database {
    let wanted = Database::new(connection.id.clone(), name);
    store
        .database_list()
        .await
        .into_iter()
        .find(|db| db.same_identity(&wanted))
        .unwrap_or(wanted)
}

/// Profile rendering for stdout; the password is never printed.
pub fn masked(connection: &Connection) -> Result<Value> {
    let mut value = serde_json::to_value(connection)?;
    if let Some(password) = value.get_mut("password")
        && password.as_str().is_some_and(|p| !p.is_empty())
    {
        *password = Value::String(MASKED.to_string());
    }
    if let Some(key) = value.pointer_mut("/ssl/key") {
        *key = Value::String(MASKED.to_string());
    }
    Ok(value)
}

pub fn profile_from_args(args: &AddArgs, password: Option<&str>) -> Result<Connection> {
    let port = args.port.unwrap_or_else(|| args.engine.default_port());
    let mut connection = Connection::new(
        args.title.clone(),
        args.engine,
        args.host.clone(),
        port,
        args.username.clone(),
        password.unwrap_or_default(),
    );
    if let Some(database) = &args.database {
        connection = connection.with_database(database.clone());
    }
    if let Some(ssl) = ssl_from_args(&args.tls)? {
        connection = connection.with_ssl(ssl);
    }
    Ok(connection)
}

pub fn patch_from_args(args: &UpdateArgs, password: Option<&str>) -> Result<ConnectionPatch> {
    let database = if args.clear_database {
        Some(None)
    } else {
        args.database.clone().map(Some)
    };
    let ssl = if args.clear_ssl {
        Some(None)
    } else {
        ssl_from_args(&args.tls)?.map(Some)
    };

    let patch = ConnectionPatch {
        title: args.title.clone(),
        engine_type: args.engine,
        host: args.host.clone(),
        port: args.port,
        username: args.username.clone(),
        password: password.map(str::to_string),
        database,
        ssl,
    };
    if patch.is_empty() {
        bail!("nothing to update for connection '{}'", args.id);
    }
    Ok(patch)
}

fn ssl_from_args(tls: &TlsArgs) -> Result<Option<SslOptions>> {
    if !tls.ssl {
        return Ok(None);
    }
    Ok(Some(SslOptions {
        enabled: true,
        ca: read_pem(tls.ssl_ca.as_deref())?,
        cert: read_pem(tls.ssl_cert.as_deref())?,
        key: read_pem(tls.ssl_key.as_deref())?,
        reject_unauthorized: tls.ssl_verify,
    }))
}

fn read_pem(path: Option<&Path>) -> Result<Option<String>> {
    path.map(|path| {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read PEM file {}", path.display()))
    })
    .transpose()
}
