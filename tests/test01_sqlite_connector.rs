#![cfg(feature = "sqlite")]

use std::sync::Arc;
use std::time::Duration;

use sql_dal::prelude::*;
use tempfile::{TempDir, tempdir};
use tokio::time::sleep;

/// A registry with one `SQLite` entry named `app`, backed by a seeded table.
async fn seeded_registry() -> Result<(TempDir, Arc<ConnectionStrings>), DalError> {
    let dir = tempdir()?;
    let path = dir.path().join("app.db");
    let registry = Arc::new(ConnectionStrings::new().with(
        "app",
        Provider::Sqlite,
        path.to_string_lossy().into_owned(),
    ));

    for sql in [
        "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT NOT NULL, flag INTEGER NOT NULL)",
        "INSERT INTO t (id, name, flag) VALUES (1, 'ann', 0), (2, 'bob', 1), (5, 'cy', 1), (7, 'dee', 1)",
    ] {
        SqliteConnector::with_command("app", sql)
            .with_connection_strings(Arc::clone(&registry))
            .execute_non_query(&[])
            .await?;
    }
    Ok((dir, registry))
}

async fn wait_for_release(connector: &SqliteConnector) -> usize {
    for _ in 0..200 {
        if connector.open_connections() == 0 {
            return 0;
        }
        sleep(Duration::from_millis(10)).await;
    }
    connector.open_connections()
}

#[tokio::test]
async fn reader_streams_matching_row() -> Result<(), DalError> {
    let (_dir, registry) = seeded_registry().await?;
    let connector = SqliteConnector::with_command("app", "SELECT id, name FROM t WHERE id = ?")
        .with_connection_strings(registry);
    let id = connector.create_parameter("id", DbType::Int32, 0, 7)?;

    let mut reader = connector.execute_query_data_reader(&[id]).await?;
    assert_eq!(reader.columns(), ["id", "name"]);
    assert_eq!(reader.ordinal("name"), Some(1));

    let row = reader.next_row().await?.expect("one row");
    assert_eq!(row.get("id"), Some(&DbValue::Int(7)));
    assert_eq!(row.get("name").and_then(DbValue::as_text), Some("dee"));
    assert!(reader.next_row().await?.is_none());
    reader.close().await;
    Ok(())
}

#[tokio::test]
async fn reader_holds_one_connection_until_closed() -> Result<(), DalError> {
    let (_dir, registry) = seeded_registry().await?;
    let connector = SqliteConnector::with_command("app", "SELECT id FROM t ORDER BY id")
        .with_connection_strings(registry);

    let mut reader = connector.execute_query_data_reader(&[]).await?;
    assert_eq!(connector.open_connections(), 1);
    let rows = reader.read_to_end().await?;
    assert_eq!(rows.len(), 4);
    // the worker keeps the connection after the last row
    assert_eq!(connector.open_connections(), 1);
    reader.close().await;
    assert_eq!(connector.open_connections(), 0);
    Ok(())
}

#[tokio::test]
async fn dropping_a_reader_releases_its_connection() -> Result<(), DalError> {
    let (_dir, registry) = seeded_registry().await?;
    let connector = SqliteConnector::with_command("app", "SELECT id FROM t")
        .with_connection_strings(registry);

    let mut reader = connector.execute_query_data_reader(&[]).await?;
    assert!(reader.next_row().await?.is_some());
    assert_eq!(connector.open_connections(), 1);
    drop(reader);
    assert_eq!(wait_for_release(&connector).await, 0);
    Ok(())
}

#[tokio::test]
async fn reader_errors_surface_from_open_without_leaking() -> Result<(), DalError> {
    let (_dir, registry) = seeded_registry().await?;
    let connector = SqliteConnector::with_command("app", "SELECT nope FROM missing")
        .with_connection_strings(registry);

    let err = connector.execute_query_data_reader(&[]).await.unwrap_err();
    assert!(matches!(err, DalError::SqliteError(_)));
    assert_eq!(connector.open_connections(), 0);
    Ok(())
}

#[tokio::test]
async fn non_query_reports_affected_rows() -> Result<(), DalError> {
    let (_dir, registry) = seeded_registry().await?;
    let connector = SqliteConnector::with_command("app", "UPDATE t SET name = ? WHERE flag = ?")
        .with_connection_strings(Arc::clone(&registry));
    let name = connector.create_parameter("name", DbType::String, 20, "zed")?;
    let flag = connector.create_parameter("flag", DbType::Boolean, 0, true)?;
    assert_eq!(connector.execute_non_query(&[name, flag]).await?, 3);

    let check = SqliteConnector::with_command("app", "SELECT COUNT(*) AS n FROM t WHERE name = 'zed'")
        .with_connection_strings(registry);
    let set = check.execute_query_data_set(&[]).await?;
    let table = set.first_table().expect("one table");
    assert_eq!(table.rows()[0].get("n"), Some(&DbValue::Int(3)));
    Ok(())
}

#[tokio::test]
async fn data_set_closes_its_connection() -> Result<(), DalError> {
    let (_dir, registry) = seeded_registry().await?;
    let mut connector = SqliteConnector::with_command("app", "SELECT id, name FROM t WHERE id > ?")
        .with_connection_strings(registry);
    let floor = connector.create_parameter("floor", DbType::Int64, 0, 1_i64)?;

    let set = connector.execute_query_data_set(&[floor]).await?;
    assert_eq!(set.tables().len(), 1);
    let table = &set.tables()[0];
    assert_eq!(table.columns(), ["id", "name"]);
    assert_eq!(table.len(), 3);
    assert_eq!(connector.open_connections(), 0);

    connector.set_command_text("SELECT * FROM missing");
    assert!(connector.execute_query_data_set(&[]).await.is_err());
    assert_eq!(connector.open_connections(), 0);
    Ok(())
}

#[tokio::test]
async fn values_round_trip_through_their_columns() -> Result<(), DalError> {
    let (_dir, registry) = seeded_registry().await?;
    let create = SqliteConnector::with_command(
        "app",
        "CREATE TABLE v (b BLOB, d TEXT, r REAL, n NUMERIC, z TEXT)",
    )
    .with_connection_strings(Arc::clone(&registry));
    create.execute_non_query(&[]).await?;

    let insert = SqliteConnector::with_command("app", "INSERT INTO v VALUES (?, ?, ?, ?, ?)")
        .with_connection_strings(Arc::clone(&registry));
    let day = chrono::NaiveDate::from_ymd_opt(2024, 2, 29).expect("valid date");
    let params = vec![
        insert.create_parameter("b", DbType::Binary, 0, vec![1_u8, 2, 3])?,
        insert.create_parameter("d", DbType::Date, 0, day)?,
        insert.create_parameter("r", DbType::Double, 0, 2.5)?,
        insert.create_parameter("n", DbType::Decimal, 0, "12.75")?,
        insert.create_parameter("z", DbType::String, 0, Option::<String>::None)?,
    ];
    assert_eq!(insert.execute_non_query(&params).await?, 1);

    let select = SqliteConnector::with_command("app", "SELECT b, d, r, n, z FROM v")
        .with_connection_strings(registry);
    let set = select.execute_query_data_set(&[]).await?;
    let row = &set.tables()[0].rows()[0];
    assert_eq!(row.get("b").and_then(DbValue::as_blob), Some(&[1_u8, 2, 3][..]));
    assert_eq!(row.get("d").and_then(DbValue::as_date), Some(day));
    assert_eq!(row.get("r").and_then(DbValue::as_float), Some(2.5));
    assert_eq!(row.get("n").and_then(DbValue::as_float), Some(12.75));
    assert_eq!(row.get("z"), Some(&DbValue::Null));
    Ok(())
}

#[tokio::test]
async fn sqlite_has_no_stored_procedures() -> Result<(), DalError> {
    let (_dir, registry) = seeded_registry().await?;
    let mut connector = SqliteConnector::with_command("app", "purge_sessions")
        .with_connection_strings(registry);
    let err = connector.execute_stored_proc(&[]).await.unwrap_err();
    assert!(matches!(err, DalError::Unimplemented(ref m) if m.contains("purge_sessions")));

    connector.set_command_text("{CALL purge_sessions}");
    let err = connector.execute_non_query(&[]).await.unwrap_err();
    assert!(matches!(err, DalError::Unimplemented(_)));
    assert_eq!(connector.open_connections(), 0);
    Ok(())
}
