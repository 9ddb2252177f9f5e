//! Database connection pool management.
//!
//! Opens one `sqlx` Any pool per named connection:
//! - SQLite files are created when missing and switched to WAL mode
//! - MySQL URLs are built from the individual parameters
//! - Connection limits and acquire timeouts come from the config constants

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::Path;

use log::{error, info, warn};
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use url::Url;

use crate::config::{DB_ACQUIRE_TIMEOUT, DB_MAX_CONNECTIONS};
use crate::error_handling::ConnectionError;

use super::params::{ConnectionParams, Driver};

/// Opens a pool for `params`.
pub(crate) async fn open_pool(
    params: &ConnectionParams,
    name: &str,
) -> Result<(Driver, AnyPool), ConnectionError> {
    sqlx::any::install_default_drivers();

    let driver = params.driver()?;
    let url = connect_url(driver, params)?;

    let pool = AnyPoolOptions::new()
        .max_connections(DB_MAX_CONNECTIONS)
        .acquire_timeout(DB_ACQUIRE_TIMEOUT)
        .connect(&url)
        .await
        .map_err(|e| {
            error!("Failed to connect to database '{}': {e}", name);
            ConnectionError::ConnectError {
                name: name.to_string(),
                source: e,
            }
        })?;

    if driver == Driver::Sqlite {
        if let Err(e) = sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await {
            warn!("Failed to set WAL mode on '{}': {e}", name);
        }
    }

    Ok((driver, pool))
}

/// Builds the `sqlx` connection URL, creating SQLite files as needed.
pub(crate) fn connect_url(
    driver: Driver,
    params: &ConnectionParams,
) -> Result<String, ConnectionError> {
    match driver {
        Driver::Sqlite => {
            if params.database == ":memory:" {
                return Ok("sqlite::memory:".to_string());
            }
            create_sqlite_file(Path::new(&params.database))?;
            Ok(format!("sqlite:{}", params.database))
        }
        Driver::MySql => {
            let invalid = |reason: &str| ConnectionError::InvalidUrl {
                url: format!("mysql://{}/{}", params.host, params.database),
                reason: reason.to_string(),
            };
            let mut url = Url::parse("mysql://localhost").map_err(|e| invalid(&e.to_string()))?;
            if !params.host.is_empty() {
                url.set_host(Some(&params.host))
                    .map_err(|e| invalid(&e.to_string()))?;
            }
            if !params.user.is_empty() {
                url.set_username(&params.user)
                    .map_err(|_| invalid("user name not allowed"))?;
            }
            if !params.password.is_empty() {
                url.set_password(Some(&params.password))
                    .map_err(|_| invalid("password not allowed"))?;
            }
            url.set_port(params.port)
                .map_err(|_| invalid("port not allowed"))?;
            url.set_path(&format!("/{}", params.database));
            Ok(url.to_string())
        }
    }
}

fn create_sqlite_file(db_path: &Path) -> Result<(), ConnectionError> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            error!("Failed to create database directory: {e}");
            ConnectionError::FileCreationError(e.to_string())
        })?;
    }
    match OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(db_path)
    {
        Ok(_) => info!("Database file {} created.", db_path.display()),
        Err(ref e) if e.kind() == ErrorKind::AlreadyExists => {}
        Err(e) => {
            error!("Failed to create database file: {e}");
            return Err(ConnectionError::FileCreationError(e.to_string()));
        }
    }
    Ok(())
}
