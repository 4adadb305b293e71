//! Writes that create tables and grow their schema

mod common;

use anyhow::Result;
use common::*;

#[tokio::test]
async fn test_table1_strict_then_flexible() -> Result<()> {
    let engine = SchemaEngine::open_in_memory().await?;
    engine.create_table("table1", Schema::new()).await?;
    assert_eq!(columns(&engine, "table1").await?, vec!["id"]);

    let stu = record! { "id" => 0, "name" => "Stu", "age" => 3, "stuff" => "none" };
    let err = engine.upsert("table1", stu.clone(), true).await.unwrap_err();
    assert!(matches!(err, SchemaError::Write { .. }), "{err:?}");
    assert_eq!(columns(&engine, "table1").await?, vec!["id"]);

    assert_eq!(engine.upsert("table1", stu, false).await?, 1);
    let schema = engine.read_schema("table1").await?;
    let types: Vec<(&str, &ColumnType)> = schema.iter().map(|(k, v)| (k.as_str(), v)).collect();
    assert_eq!(
        types,
        vec![
            ("id", &ColumnType::IntegerPrimaryKey),
            ("name", &ColumnType::Text),
            ("age", &ColumnType::Numeric),
            ("stuff", &ColumnType::Text),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_update_merges_with_stored_row() -> Result<()> {
    let engine = people().await?;

    let id = engine.upsert("people", record! { "id" => 2, "age" => 42, "city" => "Leeds" }, false).await?;
    assert_eq!(id, 2);

    let jan = engine.get("people", 2).await?.expect("row 2");
    assert_eq!(jan["name"], Value::from("Jan"));
    assert_eq!(jan["email"], Value::from("jan@example.com"));
    assert_eq!(jan["age"], Value::Integer(42));
    assert_eq!(jan["city"], Value::from("Leeds"));

    // Rows written before the column existed read it as NULL
    let ted = engine.get("people", 1).await?.expect("row 1");
    assert_eq!(ted["city"], Value::Null);
    Ok(())
}

#[tokio::test]
async fn test_numeric_strings_type_new_columns() -> Result<()> {
    let engine = SchemaEngine::open_in_memory().await?;
    engine.upsert("readings", record! { "sensor" => "a1", "level" => "3.25", "ok" => true }, false).await?;

    let schema = engine.read_schema("readings").await?;
    assert_eq!(schema["sensor"], ColumnType::Text);
    assert_eq!(schema["level"], ColumnType::Numeric);
    assert_eq!(schema["ok"], ColumnType::Numeric);

    // NUMERIC affinity stores the numeric text as a number
    let row = engine.get("readings", 1).await?.expect("row 1");
    assert_eq!(row["level"], Value::Real(3.25));
    Ok(())
}

#[tokio::test]
async fn test_existing_column_type_is_kept() -> Result<()> {
    let engine = people().await?;
    engine.upsert("people", record! { "name" => 12345, "age" => "unknown" }, false).await?;
    let schema = engine.read_schema("people").await?;
    assert_eq!(schema["name"], ColumnType::Text);
    assert_eq!(schema["age"], ColumnType::Numeric);

    let row = engine.get("people", 4).await?.expect("row 4");
    assert_eq!(row["name"], Value::from("12345"));
    assert_eq!(row["age"], Value::from("unknown"));
    Ok(())
}

#[tokio::test]
async fn test_batch_is_all_or_nothing() -> Result<()> {
    let engine = people().await?;

    let batch = vec![record! { "name" => "Al" }, record! { "name" => "Cy", "shoe" => 44 }];
    assert!(engine.upsert_batch("people", batch.clone(), true).await.is_err());
    assert_eq!(engine.get("people", 4).await?, None);
    assert!(!columns(&engine, "people").await?.contains(&"shoe".to_owned()));

    assert_eq!(engine.upsert_batch("people", batch, false).await?, vec![4, 5]);
    Ok(())
}

#[tokio::test]
async fn test_batch_joins_explicit_transaction() -> Result<()> {
    let engine = people().await?;
    assert!(engine.begin_transaction().await?);
    engine.upsert_batch("people", vec![record! { "name" => "Al" }], false).await?;
    // Still open: the batch did not own the transaction
    assert!(engine.rollback().await?);
    assert_eq!(engine.get("people", 4).await?, None);
    Ok(())
}

#[tokio::test]
async fn test_invalid_names_never_reach_sqlite() -> Result<()> {
    let engine = SchemaEngine::open_in_memory().await?;
    let err = engine.upsert("people; DROP TABLE x", record! { "name" => "Ted" }, false).await.unwrap_err();
    assert!(matches!(err, SchemaError::Validation { kind: "table", .. }), "{err:?}");
    let err = engine.upsert("people", record! { "1st" => "Ted" }, false).await.unwrap_err();
    assert!(matches!(err, SchemaError::Validation { kind: "column", .. }), "{err:?}");
    assert!(engine.list_tables().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_field_names_match_columns_regardless_of_case() -> Result<()> {
    let engine = SchemaEngine::open_in_memory().await?;
    engine.upsert("t", record! { "name" => "a" }, false).await?;

    assert_eq!(engine.upsert("t", record! { "id" => 1, "Name" => "c" }, false).await?, 1);
    assert_eq!(engine.get("t", 1).await?.expect("row 1")["name"], Value::from("c"));

    assert_eq!(engine.upsert("t", record! { "NAME" => "b", "extra" => 1 }, false).await?, 2);
    assert_eq!(columns(&engine, "t").await?, vec!["id", "name", "extra"]);
    assert_eq!(engine.get("t", 2).await?.expect("row 2"), record! { "id" => 2, "name" => "b", "extra" => 1 });

    // Table names match the same way
    assert!(engine.table_exists("T").await?);
    assert_eq!(engine.export_table("T").await?.data.len(), 2);
    Ok(())
}
