//! Tests del workflow por extracción con drivers en memoria: orden de
//! chunks, fail-fast de sinks, cancelación y disciplina de disposal.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use siphon_adapters::{InMemoryDataSink, InMemoryDataSource, PassthroughProcessor, RecordingMetadataConsumer,
                      UuidDrainMetaFactory};
use siphon_core::constants::PARQUET_CONTENT_TYPE;
use siphon_core::{CoreError, DataSink, DataSinkSelector, DataSource, Disposable, DisposedFlag, DrainStream,
                  DrawStream, EtlWorkflow, ExtractProcessor, MetadataConsumer, ProcessorFactory, RetryPolicy};
use siphon_domain::{CleanedData, DrainMeta, DrawMeta, Identifiable, Named, Progress, RawData};

fn test_draw(id: &str) -> DrawMeta {
    DrawMeta::new(id, id, "src-1", json!({ "sql": "SELECT 1" })).unwrap()
}

fn chunks(draw_id: &str, n: usize) -> Vec<Vec<u8>> {
    (0..n).map(|i| format!("{draw_id}:{i}").into_bytes()).collect()
}

fn all_sinks_selector() -> DataSinkSelector {
    Arc::new(|sinks: &[Arc<dyn DataSink>], _: &DrainMeta, _: &DrawMeta| sinks.to_vec())
}

fn passthrough_factory() -> ProcessorFactory {
    Arc::new(|| Arc::new(PassthroughProcessor::new()) as Arc<dyn ExtractProcessor>)
}

#[allow(clippy::type_complexity)]
fn build_workflow(draw: DrawMeta,
                  source: Arc<InMemoryDataSource>,
                  sinks: Vec<Arc<dyn DataSink>>,
                  consumers: Vec<Arc<dyn MetadataConsumer>>,
                  cancel: CancellationToken)
                  -> EtlWorkflow {
    EtlWorkflow::new(draw,
                     source,
                     sinks,
                     passthrough_factory(),
                     Arc::new(UuidDrainMetaFactory::new()),
                     consumers,
                     all_sinks_selector(),
                     RetryPolicy::default(),
                     cancel)
}

#[tokio::test(start_paused = true)]
async fn test_happy_path_delivers_ordered_chunks_to_every_sink() {
    let draw = test_draw("q-1");
    let source = Arc::new(InMemoryDataSource::new("src-1", "db").with_draw_chunks("q-1", chunks("q-1", 3)));
    let sink_a = Arc::new(InMemoryDataSink::new("snk-a", "warehouse A"));
    let sink_b = Arc::new(InMemoryDataSink::new("snk-b", "warehouse B"));
    let consumer = Arc::new(RecordingMetadataConsumer::new("cons-1", "coordinator"));

    let report = build_workflow(draw,
                                source.clone(),
                                vec![sink_a.clone() as Arc<dyn DataSink>, sink_b.clone()],
                                vec![consumer.clone() as Arc<dyn MetadataConsumer>],
                                CancellationToken::new()).run()
                                                         .await
                                                         .unwrap();

    assert_eq!(report.chunks, 3);
    assert_eq!(report.draw_id, "q-1");

    // Invariante de orden: 0, 1, 2 en cada sink, sin reordenar.
    assert_eq!(sink_a.consumed_indexes(), vec![0, 1, 2]);
    assert_eq!(sink_b.consumed_indexes(), vec![0, 1, 2]);

    // Passthrough: bytes intactos, content-type del transporte.
    let consumed = sink_a.consumed();
    assert_eq!(consumed[0].bytes, b"q-1:0".to_vec());
    assert_eq!(consumed[0].content_type, PARQUET_CONTENT_TYPE);
    assert!((consumed[2].progress - 1.0).abs() < f64::EPSILON);

    // Happens-after: el manifiesto llega al consumer una sola vez, con el
    // draw de origen.
    let taken = consumer.taken();
    assert_eq!(taken.len(), 1);
    assert_eq!(taken[0].draw_id(), "q-1");
    assert_eq!(taken[0].id(), report.drain_meta.id());

    // Los streams abiertos quedaron liberados (LIFO via scope).
    assert!(source.all_streams_disposed());
    assert!(sink_a.all_streams_disposed());
    assert!(sink_b.all_streams_disposed());
}

#[tokio::test(start_paused = true)]
async fn test_transient_sink_failures_are_retried_in_order() {
    // S2: el sink falla transitoriamente 2 veces y acepta al tercer intento.
    let draw = test_draw("q-1");
    let source = Arc::new(InMemoryDataSource::new("src-1", "db").with_draw_chunks("q-1", chunks("q-1", 3)));
    let sink = Arc::new(InMemoryDataSink::new("snk-a", "warehouse").fail_transient_consumes(2));

    let report = build_workflow(draw,
                                source,
                                vec![sink.clone() as Arc<dyn DataSink>],
                                vec![],
                                CancellationToken::new()).run()
                                                         .await
                                                         .unwrap();

    assert_eq!(report.chunks, 3);
    assert_eq!(sink.consumed_indexes(), vec![0, 1, 2], "el orden sobrevive a los reintentos");
}

#[tokio::test(start_paused = true)]
async fn test_permanent_sink_error_fails_fast() {
    // S4: el sink A rechaza definitivamente el chunk con ordinal 1 (el
    // segundo de cinco); el workflow aborta sin extraer los chunks 3 a 5.
    let draw = test_draw("q-1");
    let source = Arc::new(InMemoryDataSource::new("src-1", "db").with_draw_chunks("q-1", chunks("q-1", 5)));
    let sink_a = Arc::new(InMemoryDataSink::new("snk-a", "warehouse A").fail_permanent_at_index(1));
    let sink_b = Arc::new(InMemoryDataSink::new("snk-b", "warehouse B"));
    let consumer = Arc::new(RecordingMetadataConsumer::new("cons-1", "coordinator"));

    let err = build_workflow(draw,
                             source.clone(),
                             vec![sink_a.clone() as Arc<dyn DataSink>, sink_b.clone()],
                             vec![consumer.clone() as Arc<dyn MetadataConsumer>],
                             CancellationToken::new()).run()
                                                      .await
                                                      .unwrap_err();

    assert!(matches!(err, CoreError::Permanent(_)));
    assert_eq!(sink_a.consumed_indexes(), vec![0]);
    assert_eq!(sink_b.consumed_indexes(), vec![0], "fail-fast: B no recibe el chunk que A rechazó");

    // Éxito parcial no es éxito: el manifiesto nunca llega al consumer.
    assert_eq!(consumer.taken_count(), 0);

    // Todos los streams abiertos quedaron liberados de todos modos.
    assert!(source.all_streams_disposed());
    assert!(sink_a.all_streams_disposed());
    assert!(sink_b.all_streams_disposed());
}

/// Sink que cancela el token al consumir el chunk con el ordinal indicado.
struct CancelOnConsume {
    inner: Arc<InMemoryDataSink>,
    token: CancellationToken,
    at: u64,
}

impl Identifiable for CancelOnConsume {
    fn id(&self) -> &str {
        self.inner.id()
    }
}

impl Named for CancelOnConsume {
    fn name(&self) -> &str {
        self.inner.name()
    }
}

impl Disposable for CancelOnConsume {
    fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    fn dispose(&self) -> Result<(), CoreError> {
        self.inner.dispose()
    }
}

#[async_trait]
impl DataSink for CancelOnConsume {
    async fn start_drain(&self, drain: &DrainMeta) -> Result<Arc<dyn DrainStream>, CoreError> {
        let inner = self.inner.start_drain(drain).await?;
        Ok(Arc::new(CancelOnConsumeStream { inner,
                                            token: self.token.clone(),
                                            at: self.at }))
    }
}

struct CancelOnConsumeStream {
    inner: Arc<dyn DrainStream>,
    token: CancellationToken,
    at: u64,
}

impl Disposable for CancelOnConsumeStream {
    fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    fn dispose(&self) -> Result<(), CoreError> {
        self.inner.dispose()
    }
}

#[async_trait]
impl DrainStream for CancelOnConsumeStream {
    async fn consume(&self, chunk: CleanedData, progress: Progress) -> Result<(), CoreError> {
        let index = chunk.index();
        self.inner.consume(chunk, progress).await?;
        if index == self.at {
            self.token.cancel();
        }
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_stops_before_next_chunk() {
    // S5: la cancelación llega tras el chunk 1 de 10. El chunk en curso se
    // asienta en todos los sinks; los chunks 2 a 10 no se extraen.
    let draw = test_draw("q-1");
    let source = Arc::new(InMemoryDataSource::new("src-1", "db").with_draw_chunks("q-1", chunks("q-1", 10)));
    let inner_sink = Arc::new(InMemoryDataSink::new("snk-a", "warehouse"));
    let token = CancellationToken::new();
    let cancelling: Arc<dyn DataSink> = Arc::new(CancelOnConsume { inner: inner_sink.clone(),
                                                                   token: token.clone(),
                                                                   at: 0 });
    let consumer = Arc::new(RecordingMetadataConsumer::new("cons-1", "coordinator"));

    let err = build_workflow(draw,
                             source.clone(),
                             vec![cancelling],
                             vec![consumer.clone() as Arc<dyn MetadataConsumer>],
                             token).run()
                                   .await
                                   .unwrap_err();

    assert_eq!(err, CoreError::Cancelled);
    assert_eq!(inner_sink.consumed_indexes(), vec![0], "el chunk en vuelo se completó");
    assert_eq!(consumer.taken_count(), 0);
    assert!(source.all_streams_disposed());
    assert!(inner_sink.all_streams_disposed());
}

#[tokio::test(start_paused = true)]
async fn test_consumer_transient_failure_is_retried() {
    let source = Arc::new(InMemoryDataSource::new("src-1", "db").with_draw_chunks("q-1", chunks("q-1", 2)));
    let sink = Arc::new(InMemoryDataSink::new("snk-a", "warehouse"));
    let consumer = Arc::new(RecordingMetadataConsumer::new("cons-1", "coordinator").fail_transient_takes(1));

    build_workflow(test_draw("q-1"),
                   source,
                   vec![sink.clone() as Arc<dyn DataSink>],
                   vec![consumer.clone() as Arc<dyn MetadataConsumer>],
                   CancellationToken::new()).run()
                                            .await
                                            .unwrap();

    assert_eq!(consumer.taken_count(), 1);
    assert_eq!(sink.consumed_indexes(), vec![0, 1]);
}

#[tokio::test(start_paused = true)]
async fn test_empty_selection_is_a_permanent_error() {
    let draw = test_draw("q-1");
    let source = Arc::new(InMemoryDataSource::new("src-1", "db").with_draw_chunks("q-1", chunks("q-1", 1)));
    let none_selector: DataSinkSelector = Arc::new(|_: &[Arc<dyn DataSink>], _: &DrainMeta, _: &DrawMeta| Vec::new());

    let workflow = EtlWorkflow::new(draw,
                                    source,
                                    vec![Arc::new(InMemoryDataSink::new("snk-a", "warehouse")) as Arc<dyn DataSink>],
                                    passthrough_factory(),
                                    Arc::new(UuidDrainMetaFactory::new()),
                                    vec![],
                                    none_selector,
                                    RetryPolicy::default(),
                                    CancellationToken::new());

    let err = workflow.run().await.unwrap_err();
    assert!(matches!(err, CoreError::Permanent(_)));
}

/// Fuente cuyo stream miente sobre el ordinal de los chunks.
struct SkewedSource {
    disposed: DisposedFlag,
}

impl Identifiable for SkewedSource {
    fn id(&self) -> &str {
        "skewed"
    }
}

impl Named for SkewedSource {
    fn name(&self) -> &str {
        "skewed source"
    }
}

impl Disposable for SkewedSource {
    fn is_disposed(&self) -> bool {
        self.disposed.is_disposed()
    }

    fn dispose(&self) -> Result<(), CoreError> {
        self.disposed.mark();
        Ok(())
    }
}

#[async_trait]
impl DataSource for SkewedSource {
    async fn start_draw(&self, _draw: &DrawMeta) -> Result<Arc<dyn DrawStream>, CoreError> {
        Ok(Arc::new(SkewedStream { disposed: DisposedFlag::new() }))
    }
}

struct SkewedStream {
    disposed: DisposedFlag,
}

impl Disposable for SkewedStream {
    fn is_disposed(&self) -> bool {
        self.disposed.is_disposed()
    }

    fn dispose(&self) -> Result<(), CoreError> {
        self.disposed.mark();
        Ok(())
    }
}

#[async_trait]
impl DrawStream for SkewedStream {
    async fn draw(&self) -> Result<Option<(RawData, Progress)>, CoreError> {
        // Ordinal 5 en el primer chunk: violación del contrato del driver.
        Ok(Some((RawData::new(5, b"bad".to_vec()), Progress::new(0.5).unwrap())))
    }
}

#[tokio::test(start_paused = true)]
async fn test_out_of_order_chunks_are_rejected() {
    let workflow = EtlWorkflow::new(test_draw("q-1"),
                                    Arc::new(SkewedSource { disposed: DisposedFlag::new() }),
                                    vec![Arc::new(InMemoryDataSink::new("snk-a", "warehouse")) as Arc<dyn DataSink>],
                                    passthrough_factory(),
                                    Arc::new(UuidDrainMetaFactory::new()),
                                    vec![],
                                    all_sinks_selector(),
                                    RetryPolicy::default(),
                                    CancellationToken::new());

    let err = workflow.run().await.unwrap_err();
    assert!(matches!(err, CoreError::Permanent(_)));
}
