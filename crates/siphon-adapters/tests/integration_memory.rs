//! Integración de los drivers en memoria: el protocolo demo de punta a
//! punta y los contratos de disposal de cada adapter.

use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use siphon_adapters::{demo_protocol_factory, InMemoryDataSink, InMemoryDataSource, PassthroughProcessor,
                      UuidDrainMetaFactory};
use siphon_core::constants::PARQUET_CONTENT_TYPE;
use siphon_core::{run_configured_protocols, AppContext, CoreError, DataSink, DataSource, Disposable,
                  DrainMetaFactory, DrainStream, DrawStream, ExtractProcessor, InMemorySignalHub, Settings,
                  SignalHub, StaticProtocolRegistry};
use siphon_domain::{DrainMeta, DrawMeta, Identifiable, RawData};

fn test_draw(id: &str) -> DrawMeta {
    DrawMeta::new(id, id, "src-1", json!({})).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_demo_protocol_end_to_end() {
    let hub = Arc::new(InMemorySignalHub::new());
    let settings = Settings { etl_protocols: vec!["demo".to_string()],
                              ..Settings::default() };
    let ctx = AppContext::new(settings, hub.clone() as Arc<dyn SignalHub>).unwrap();

    let mut registry = StaticProtocolRegistry::new();
    registry.register("demo", demo_protocol_factory());

    let summary = run_configured_protocols(&ctx, &registry, CancellationToken::new()).await
                                                                                     .unwrap();

    assert_eq!(summary.exit_code(), 0);
    assert_eq!(summary.reports.len(), 1);
    let report = &summary.reports[0];
    assert_eq!(report.protocol_id, "demo");
    assert_eq!(report.completed_count(), 3);
    assert!(report.errors.is_empty());

    // Secuencia de señales: protocolo abierto y cerrado, 3 workflows ok.
    let letters = hub.letters();
    assert!(letters.starts_with('P') && letters.ends_with('Q'));
    assert_eq!(letters.matches('V').count(), 3);
    assert_eq!(letters.matches('X').count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_demo_protocol_scale_comes_from_config() {
    let hub = Arc::new(InMemorySignalHub::new());
    let mut settings = Settings { etl_protocols: vec!["demo".to_string()],
                                  ..Settings::default() };
    settings.protocols.insert("demo".to_string(), json!({ "draw_count": 5, "chunks_per_draw": 1, "sink_count": 1 }));
    let ctx = AppContext::new(settings, hub as Arc<dyn SignalHub>).unwrap();

    let mut registry = StaticProtocolRegistry::new();
    registry.register("demo", demo_protocol_factory());

    let summary = run_configured_protocols(&ctx, &registry, CancellationToken::new()).await
                                                                                     .unwrap();
    assert_eq!(summary.reports[0].completed_count(), 5);
}

#[tokio::test]
async fn test_source_rejects_unknown_draw_and_post_dispose_use() {
    let source = InMemoryDataSource::new("src-1", "db").with_draw_chunks("q-1", vec![b"a".to_vec()]);

    let err = source.start_draw(&test_draw("q-404")).await.unwrap_err();
    assert!(matches!(err, CoreError::Permanent(_)));

    source.dispose().unwrap();
    let err = source.start_draw(&test_draw("q-1")).await.unwrap_err();
    assert!(matches!(err, CoreError::ResourceDisposed(_)));

    // El disposal es idempotente.
    source.dispose().unwrap();
}

#[tokio::test]
async fn test_draw_stream_is_finite_and_guarded() {
    let source = InMemoryDataSource::new("src-1", "db").with_draw_chunks("q-1", vec![b"a".to_vec(), b"b".to_vec()]);
    let stream = source.start_draw(&test_draw("q-1")).await.unwrap();

    let (raw, progress) = stream.draw().await.unwrap().unwrap();
    assert_eq!(raw.index(), 0);
    assert!((progress.value() - 0.5).abs() < f64::EPSILON);

    let (raw, progress) = stream.draw().await.unwrap().unwrap();
    assert_eq!(raw.index(), 1);
    assert!(progress.is_complete());

    assert!(stream.draw().await.unwrap().is_none(), "el stream es finito");

    stream.dispose().unwrap();
    let err = stream.draw().await.unwrap_err();
    assert!(matches!(err, CoreError::ResourceDisposed(_)));
}

#[tokio::test]
async fn test_drain_stream_guard_and_collection() {
    let sink = InMemoryDataSink::new("snk-1", "warehouse");
    let drain = DrainMeta::new("up-1", "q-1", PARQUET_CONTENT_TYPE).unwrap();
    let stream = sink.start_drain(&drain).await.unwrap();

    let chunk = siphon_domain::CleanedData::new(0, b"x".to_vec(), PARQUET_CONTENT_TYPE);
    stream.consume(chunk, siphon_domain::Progress::new(1.0).unwrap()).await.unwrap();
    assert_eq!(sink.consumed_indexes(), vec![0]);
    assert_eq!(sink.consumed()[0].drain_id, "up-1");

    stream.dispose().unwrap();
    let chunk = siphon_domain::CleanedData::new(1, b"y".to_vec(), PARQUET_CONTENT_TYPE);
    let err = stream.consume(chunk, siphon_domain::Progress::new(1.0).unwrap()).await.unwrap_err();
    assert!(matches!(err, CoreError::ResourceDisposed(_)));
}

#[tokio::test]
async fn test_processor_is_single_use() {
    let processor = PassthroughProcessor::new();
    let draw = test_draw("q-1");

    let clean = processor.process(RawData::new(0, b"abc".to_vec()), &draw).await.unwrap();
    assert_eq!(clean.index(), 0);
    assert_eq!(clean.bytes(), b"abc");
    assert_eq!(clean.content_type(), PARQUET_CONTENT_TYPE);

    let err = processor.process(RawData::new(1, b"def".to_vec()), &draw).await.unwrap_err();
    assert!(matches!(err, CoreError::Permanent(_)), "el procesador es de un solo uso");
}

#[tokio::test]
async fn test_drain_meta_factory_mints_unique_manifests() {
    let factory = UuidDrainMetaFactory::new();
    assert_eq!(factory.content_type(), PARQUET_CONTENT_TYPE);

    let draw = test_draw("q-1");
    let first = factory.new_drain_meta(&draw).await.unwrap();
    let second = factory.new_drain_meta(&draw).await.unwrap();

    assert_eq!(first.draw_id(), "q-1");
    assert_eq!(first.content_type(), PARQUET_CONTENT_TYPE);
    assert_ne!(first.id(), second.id(), "cada upload recibe su propio manifiesto");

    factory.dispose().unwrap();
    assert!(factory.new_drain_meta(&draw).await.is_err());
}
