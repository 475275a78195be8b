//! Máquina de estados por extracción (workflow ETL).
//!
//! ```text
//! NEW → DRAWING → DRAINING → DONE
//!                        ↘        ↘
//!                         FAILED ← ┘ (cualquier transición puede fallar)
//! ```
//!
//! Garantías:
//! - Orden de chunks: cada drain stream recibe los chunks en el mismo orden
//!   en que el draw stream los produjo; el `index` de cada chunk es igual a
//!   la cantidad de chunks entregados previamente. Nunca se reordena.
//! - Backpressure: no se extrae el siguiente chunk hasta que todos los sinks
//!   seleccionados acusaron el anterior. No hay buffering interno más allá
//!   del chunk en curso.
//! - Fail-fast: el primer error de sink no recuperable aborta el workflow;
//!   un éxito parcial de sinks nunca se reporta como éxito.
//! - La entrega del manifiesto a los consumers sucede estrictamente después
//!   de la última entrega de chunks (happens-after).
//! - Todos los streams abiertos se liberan en orden LIFO en todos los
//!   caminos de salida.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use siphon_domain::{DrainMeta, DrawMeta, Identifiable};

use crate::dispose::Scope;
use crate::errors::CoreError;
use crate::operations::{DataSink, DataSource, DrainStream, DrawStream, ExtractProcessor};
use crate::protocol::{DataSinkSelector, ProcessorFactory};
use crate::retry::RetryPolicy;
use crate::terminals::{DrainMetaFactory, MetadataConsumer};

/// Estado del workflow en tiempo de ejecución.
///
/// Las transiciones válidas son:
/// - `New` -> `Drawing`
/// - `Drawing` -> `Draining`
/// - `Draining` -> `Done`
/// - cualquiera -> `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    /// El workflow todavía no arrancó.
    New,
    /// Abriendo el draw stream de la fuente.
    Drawing,
    /// Drenando chunks hacia los sinks seleccionados.
    Draining,
    /// Terminó correctamente y el manifiesto fue entregado.
    Done,
    /// Abortó; los recursos quedaron liberados de todos modos.
    Failed,
}

/// Resultado de un workflow exitoso.
#[derive(Debug, Clone)]
pub struct WorkflowReport {
    pub draw_id: String,
    pub drain_meta: DrainMeta,
    /// Cantidad de chunks entregados a cada sink seleccionado.
    pub chunks: u64,
}

/// La máquina de estados por extracción: un `DrawMeta` → fan-out de drains.
///
/// Los inputs llegan completos en la construcción; `run` consume el
/// workflow (un workflow se ejecuta exactamente una vez).
pub struct EtlWorkflow {
    draw_meta: DrawMeta,
    data_source: Arc<dyn DataSource>,
    data_sinks: Vec<Arc<dyn DataSink>>,
    processor_factory: ProcessorFactory,
    drain_meta_factory: Arc<dyn DrainMetaFactory>,
    metadata_consumers: Vec<Arc<dyn MetadataConsumer>>,
    data_sink_selector: DataSinkSelector,
    retry: RetryPolicy,
    cancel: CancellationToken,
    state: WorkflowState,
}

impl EtlWorkflow {
    #[allow(clippy::too_many_arguments)]
    pub fn new(draw_meta: DrawMeta,
               data_source: Arc<dyn DataSource>,
               data_sinks: Vec<Arc<dyn DataSink>>,
               processor_factory: ProcessorFactory,
               drain_meta_factory: Arc<dyn DrainMetaFactory>,
               metadata_consumers: Vec<Arc<dyn MetadataConsumer>>,
               data_sink_selector: DataSinkSelector,
               retry: RetryPolicy,
               cancel: CancellationToken)
               -> Self {
        Self { draw_meta,
               data_source,
               data_sinks,
               processor_factory,
               drain_meta_factory,
               metadata_consumers,
               data_sink_selector,
               retry,
               cancel,
               state: WorkflowState::New }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    fn transition(&mut self, next: WorkflowState) {
        tracing::debug!(draw_id = %self.draw_meta.id(), from = ?self.state, to = ?next, "transición de workflow");
        self.state = next;
    }

    /// Ejecuta el workflow hasta completar o fallar. Consume `self`.
    pub async fn run(mut self) -> Result<WorkflowReport, CoreError> {
        let result = self.execute().await;
        if result.is_err() {
            self.transition(WorkflowState::Failed);
        }
        result
    }

    async fn execute(&mut self) -> Result<WorkflowReport, CoreError> {
        self.transition(WorkflowState::Drawing);

        // 1. Acuñar el manifiesto con el content-type que declara la factory.
        let drain_meta = self.retry
                             .run("new_drain_meta", || {
                                 let factory = self.drain_meta_factory.clone();
                                 let draw = self.draw_meta.clone();
                                 async move { factory.new_drain_meta(&draw).await }
                             })
                             .await?;

        let mut scope = Scope::new(format!("workflow:{}", self.draw_meta.id()));

        // 2. Abrir el draw stream dentro del scope.
        let draw_stream = self.retry
                              .run("start_draw", || {
                                  let source = self.data_source.clone();
                                  let draw = self.draw_meta.clone();
                                  async move { source.start_draw(&draw).await }
                              })
                              .await?;
        scope.adopt("draw-stream", draw_stream.clone());

        // 3. Seleccionar sinks y abrir un drain stream por cada uno.
        let selected = (self.data_sink_selector)(&self.data_sinks, &drain_meta, &self.draw_meta);
        if selected.is_empty() {
            return Err(CoreError::permanent(format!("ningún sink seleccionado para el draw '{}'",
                                                    self.draw_meta.id())));
        }

        self.transition(WorkflowState::Draining);
        let mut drain_streams: Vec<Arc<dyn DrainStream>> = Vec::with_capacity(selected.len());
        for sink in &selected {
            let stream = self.retry
                             .run("start_drain", || {
                                 let sink = sink.clone();
                                 let drain = drain_meta.clone();
                                 async move { sink.start_drain(&drain).await }
                             })
                             .await?;
            scope.adopt(format!("drain-stream:{}", sink.id()), stream.clone());
            drain_streams.push(stream);
        }

        // 4. Bombear chunks uno a la vez (backpressure por chunk).
        let mut delivered: u64 = 0;
        loop {
            // Cancelación cooperativa: no se extraen chunks nuevos; las
            // entregas en vuelo del chunk anterior ya quedaron asentadas.
            if self.cancel.is_cancelled() {
                tracing::debug!(draw_id = %self.draw_meta.id(), delivered, "workflow cancelado");
                return Err(CoreError::Cancelled);
            }

            let next = self.retry
                           .run("draw", || {
                               let stream = draw_stream.clone();
                               async move { stream.draw().await }
                           })
                           .await?;
            let Some((raw, progress)) = next else { break };

            if raw.index() != delivered {
                return Err(CoreError::permanent(format!("chunk fuera de orden en el draw '{}': se esperaba {} y llegó {}",
                                                        self.draw_meta.id(),
                                                        delivered,
                                                        raw.index())));
            }

            // 4a. Procesador fresco por chunk, liberado al salir del scope
            // anidado (los procesadores son de un solo uso).
            let processor = (self.processor_factory)();
            let mut chunk_scope = Scope::new("processor");
            chunk_scope.adopt("processor", processor.clone());

            let clean = processor.process(raw, &self.draw_meta).await?;
            if clean.index() != delivered {
                return Err(CoreError::permanent(format!("el procesador alteró el ordinal del chunk {} del draw '{}'",
                                                        delivered,
                                                        self.draw_meta.id())));
            }

            // 4c. Fan-out en orden a cada drain stream; fail-fast ante el
            // primer sink irrecuperable.
            for stream in &drain_streams {
                self.retry
                    .run("consume", || {
                        let stream = stream.clone();
                        let chunk = clean.clone();
                        async move { stream.consume(chunk, progress).await }
                    })
                    .await?;
            }

            drop(chunk_scope);
            delivered += 1;

            if progress.is_complete() {
                break;
            }
        }

        // 5. Entregar el manifiesto a los consumers (happens-after de todas
        // las entregas de chunks).
        for consumer in &self.metadata_consumers {
            self.retry
                .run("take_drain_meta", || {
                    let consumer = consumer.clone();
                    let drain = drain_meta.clone();
                    async move { consumer.take_drain_meta(drain).await }
                })
                .await?;
        }

        self.transition(WorkflowState::Done);

        // 6. Liberación LIFO de todos los streams abiertos.
        scope.dispose_all();

        Ok(WorkflowReport { draw_id: self.draw_meta.id().to_string(),
                            drain_meta,
                            chunks: delivered })
    }
}
