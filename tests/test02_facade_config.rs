#![cfg(feature = "sqlite")]

use std::sync::Arc;

use sql_dal::mapping::{NativeType, OdbcType, OracleDbType, SqlDbType, SqliteType};
use sql_dal::prelude::*;
use tempfile::tempdir;

fn registry_for(path: &std::path::Path) -> Arc<ConnectionStrings> {
    Arc::new(
        ConnectionStrings::new()
            .with("local", Provider::Sqlite, path.to_string_lossy().into_owned())
            .with("rpt", Provider::SqlServer, "Server=tcp:127.0.0.1,1;User Id=sa;Password=x")
            .with("dw", Provider::Odbc, "DSN=warehouse")
            .with("erp", Provider::Oracle, "User Id=scott;Password=tiger;Data Source=//h/svc"),
    )
}

#[tokio::test]
async fn configuration_errors_happen_before_any_io() -> Result<(), DalError> {
    let dir = tempdir()?;
    let path = dir.path().join("never.db");
    let registry = registry_for(&path);

    let mut pm = PersistenceManager::new().with_connection_strings(Arc::clone(&registry));
    pm.set_command_text("SELECT 1");
    let err = pm.execute_query_data_reader(&[]).await.unwrap_err();
    assert!(matches!(err, DalError::ConfigError(ref m) if m == "ConnectStringName : Must be defined"));

    let pm = PersistenceManager::with_connect_string_name("local")
        .with_connection_strings(Arc::clone(&registry));
    for err in [
        pm.execute_query_data_set(&[]).await.unwrap_err(),
        pm.execute_non_query(&[]).await.unwrap_err(),
        pm.execute_stored_proc(&[]).await.unwrap_err(),
    ] {
        assert!(matches!(err, DalError::ConfigError(ref m) if m == "Command Text (SQL) : Must be defined"));
    }

    let pm = PersistenceManager::with_command("nowhere", "SELECT 1")
        .with_connection_strings(registry);
    let err = pm.execute_non_query(&[]).await.unwrap_err();
    assert!(matches!(err, DalError::ConfigError(ref m) if m.contains("'nowhere'")));

    assert!(!path.exists());
    assert_eq!(pm.open_connections(), 0);
    Ok(())
}

#[tokio::test]
async fn typed_connectors_reject_other_providers() -> Result<(), DalError> {
    let dir = tempdir()?;
    let registry = registry_for(&dir.path().join("x.db"));
    let connector = SqliteConnector::with_command("rpt", "SELECT 1")
        .with_connection_strings(registry);
    let err = connector.execute_query_data_set(&[]).await.unwrap_err();
    assert!(matches!(err, DalError::ConfigError(ref m) if m.contains("sqlserver")));
    Ok(())
}

#[tokio::test]
async fn facade_selects_backend_from_toml_registry() -> Result<(), DalError> {
    let dir = tempdir()?;
    let db = dir.path().join("facade.db");
    let config_path = dir.path().join("connections.toml");
    std::fs::write(
        &config_path,
        format!(
            "[connection_strings.local]\nprovider = \"sqlite\"\nconnection_string = \"Data Source={}\"\n",
            db.display()
        ),
    )?;
    let registry = Arc::new(ConnectionStrings::from_file(&config_path)?);

    let mut pm = PersistenceManager::with_command("local", "CREATE TABLE k (v TEXT)")
        .with_connection_strings(registry);
    pm.execute_non_query(&[]).await?;

    pm.set_command_text("INSERT INTO k (v) VALUES (?), (?)");
    let a = pm.create_parameter("a", DbType::AnsiString, 10, "x")?;
    let b = pm.create_parameter("b", DbType::AnsiString, 10, "y")?;
    assert_eq!(a.native_type(), NativeType::Sqlite(SqliteType::Text));
    assert_eq!(pm.execute_non_query(&[a, b]).await?, 2);

    pm.set_command_text("SELECT v FROM k ORDER BY v");
    let mut reader = pm.execute_query_data_reader(&[]).await?;
    assert_eq!(reader.provider(), Provider::Sqlite);
    let values: Vec<_> = reader
        .read_to_end()
        .await?
        .into_iter()
        .map(|row| row.into_values())
        .collect();
    assert_eq!(
        values,
        vec![vec![DbValue::Text("x".into())], vec![DbValue::Text("y".into())]]
    );
    reader.close().await;
    assert_eq!(pm.open_connections(), 0);
    Ok(())
}

#[test]
fn create_parameter_maps_for_every_provider() -> Result<(), DalError> {
    let dir = tempdir()?;
    let registry = registry_for(&dir.path().join("m.db"));
    let native = |name: &str, db_type: DbType| {
        PersistenceManager::with_connect_string_name(name)
            .with_connection_strings(Arc::clone(&registry))
            .create_parameter("p", db_type, 0, DbValue::Null)
            .map(|p| p.native_type())
    };

    assert_eq!(native("rpt", DbType::Int32)?, NativeType::SqlServer(SqlDbType::Int));
    assert_eq!(native("rpt", DbType::String)?, NativeType::SqlServer(SqlDbType::NVarChar));
    assert_eq!(
        native("rpt", DbType::Guid)?,
        NativeType::SqlServer(SqlDbType::UniqueIdentifier)
    );
    assert_eq!(native("dw", DbType::Boolean)?, NativeType::Odbc(OdbcType::Bit));
    assert_eq!(native("dw", DbType::DateTime)?, NativeType::Odbc(OdbcType::Timestamp));
    assert_eq!(native("erp", DbType::String)?, NativeType::Oracle(OracleDbType::Varchar2));
    assert_eq!(native("erp", DbType::Double)?, NativeType::Oracle(OracleDbType::BinaryDouble));
    assert_eq!(native("local", DbType::Int64)?, NativeType::Sqlite(SqliteType::Integer));
    assert_eq!(native("local", DbType::Currency)?, NativeType::Sqlite(SqliteType::Numeric));
    Ok(())
}

#[test]
fn unmapped_types_are_rejected() -> Result<(), DalError> {
    let dir = tempdir()?;
    let registry = registry_for(&dir.path().join("u.db"));
    for (name, db_type) in [
        ("rpt", DbType::SByte),
        ("rpt", DbType::UInt64),
        ("dw", DbType::DateTimeOffset),
        ("erp", DbType::Time),
        ("local", DbType::UInt64),
    ] {
        let err = PersistenceManager::with_connect_string_name(name)
            .with_connection_strings(Arc::clone(&registry))
            .create_parameter("p", db_type, 0, DbValue::Null)
            .unwrap_err();
        assert!(matches!(err, DalError::ParameterError(_)), "{name} {db_type:?}");
    }
    Ok(())
}

#[tokio::test]
async fn parameters_must_match_the_connection_provider() -> Result<(), DalError> {
    let dir = tempdir()?;
    let path = dir.path().join("p.db");
    let registry = registry_for(&path);
    let oracle_param = PersistenceManager::with_connect_string_name("erp")
        .with_connection_strings(Arc::clone(&registry))
        .create_parameter("id", DbType::Int32, 0, 1)?;

    let pm = PersistenceManager::with_command("local", "SELECT ?")
        .with_connection_strings(registry);
    let err = pm.execute_query_data_set(&[oracle_param]).await.unwrap_err();
    assert!(matches!(err, DalError::ParameterError(_)));
    assert!(!path.exists());
    Ok(())
}

#[tokio::test]
async fn bad_values_fail_before_connecting() -> Result<(), DalError> {
    let dir = tempdir()?;
    let path = dir.path().join("v.db");
    let pm = PersistenceManager::with_command("local", "SELECT ?")
        .with_connection_strings(registry_for(&path));
    let byte = pm.create_parameter("b", DbType::Byte, 0, 300)?;
    let err = pm.execute_query_data_reader(&[byte]).await.unwrap_err();
    assert!(matches!(err, DalError::ParameterError(_)));
    assert!(!path.exists());
    Ok(())
}

#[tokio::test]
async fn statements_are_not_procedure_names() -> Result<(), DalError> {
    let dir = tempdir()?;
    let path = dir.path().join("sp.db");
    let pm = PersistenceManager::with_command("local", "delete from t")
        .with_connection_strings(registry_for(&path));
    let err = pm.execute_stored_proc(&[]).await.unwrap_err();
    assert!(err.is_config());
    assert!(!path.exists());
    Ok(())
}
