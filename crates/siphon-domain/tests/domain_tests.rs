use serde_json::json;
use siphon_domain::{DataSinkMeta, DataSourceMeta, DomainError, DrainMeta, DrawMeta, Identifiable, Named, Progress,
                    RawData};

#[test]
fn test_data_source_meta_owns_its_draws() -> Result<(), DomainError> {
    // Crear una fuente y dos draws que le pertenecen
    let source = DataSourceMeta::new("src-1", "facility-db")?.with_description("base operacional");
    let q1 = DrawMeta::new("q-1", "monthly visits", "src-1", json!({"sql": "SELECT 1"}))?;
    let q2 = DrawMeta::new("q-2", "monthly clients", "src-1", json!({"sql": "SELECT 2"}))?;

    let source = source.add_draw(q1)?.add_draw(q2)?;
    assert_eq!(source.draw_count(), 2);
    assert_eq!(source.draw("q-1").map(|d| d.name()), Some("monthly visits"));
    assert_eq!(source.description(), Some("base operacional"));

    // El orden de inserción se preserva en el mapping
    let ids: Vec<&str> = source.draws().keys().map(String::as_str).collect();
    assert_eq!(ids, vec!["q-1", "q-2"]);

    Ok(())
}

#[test]
fn test_draw_from_another_source_is_rejected() -> Result<(), DomainError> {
    let source = DataSourceMeta::new("src-1", "facility-db")?;
    let foreign = DrawMeta::new("q-9", "foreign", "src-2", json!({}))?;

    // Invariante: cada draw referencia a su fuente y a ninguna otra
    assert!(source.add_draw(foreign).is_err());
    Ok(())
}

#[test]
fn test_duplicate_draw_id_is_rejected() -> Result<(), DomainError> {
    let source = DataSourceMeta::new("src-1", "facility-db")?;
    let q = DrawMeta::new("q-1", "visits", "src-1", json!({}))?;

    let source = source.add_draw(q.clone())?;
    assert!(source.add_draw(q).is_err());
    Ok(())
}

#[test]
fn test_empty_ids_are_rejected() {
    assert!(DataSourceMeta::new("", "x").is_err());
    assert!(DataSourceMeta::new("  ", "x").is_err());
    assert!(DrawMeta::new("q-1", "", "src-1", json!({})).is_err());
    assert!(DataSinkMeta::new("snk-1", "warehouse", "", "http-v1").is_err());
    assert!(DrainMeta::new("up-1", "", "application/vnd.apache-parquet").is_err());
}

#[test]
fn test_drain_meta_references_its_draw() -> Result<(), DomainError> {
    let drain = DrainMeta::new("up-1", "q-17", "application/vnd.apache-parquet")?;
    assert_eq!(drain.id(), "up-1");
    assert_eq!(drain.draw_id(), "q-17");
    assert_eq!(drain.content_type(), "application/vnd.apache-parquet");
    Ok(())
}

#[test]
fn test_progress_range_is_validated() {
    assert!(Progress::new(0.0).is_ok());
    assert!(Progress::new(0.5).is_ok());
    assert!(Progress::new(1.0).unwrap().is_complete());
    assert!(Progress::new(-0.1).is_err());
    assert!(Progress::new(1.1).is_err());
    assert!(Progress::new(f64::NAN).is_err());
}

#[test]
fn test_raw_data_keeps_index_and_bytes() {
    let raw = RawData::new(3, b"abc".to_vec());
    assert_eq!(raw.index(), 3);
    assert_eq!(raw.bytes(), b"abc");
    assert_eq!(raw.len(), 3);
}
