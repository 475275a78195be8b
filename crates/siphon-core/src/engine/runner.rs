//! Runner de protocolos: descubre trabajo, lo paraleliza y lo desmonta.
//!
//! Etapas por protocolo:
//! - **Descubrimiento**: cada supplier (con reintentos) aporta sinks,
//!   fuentes y draws; los ids duplicados entre suppliers se resuelven con
//!   first-writer-wins y warning.
//! - **Materialización**: las factories construyen los handles vivos; un
//!   error de factory es fatal sólo para ese handle.
//! - **Fan-out**: un task por `(fuente, draw)`, acotado por un semáforo de
//!   tamaño `min(32, draws)` salvo override de configuración.
//! - **Join**: se acumulan los desenlaces; el fallo de un workflow no
//!   cancela a sus hermanos.
//! - **Teardown**: se liberan fuentes, sinks, suppliers, consumers y la
//!   drain-meta factory, en ese orden, incluso si el run viene fallando.
//!   Los errores de disposal se loguean y se suprimen.

use indexmap::IndexMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use siphon_domain::{DataSinkMeta, DataSourceMeta, Identifiable, Named};

use crate::context::AppContext;
use crate::dispose::Disposable;
use crate::engine::outcome::{RunError, RunReport, RunSummary, WorkflowFailed, WorkflowOutcome};
use crate::engine::workflow::EtlWorkflow;
use crate::errors::CoreError;
use crate::operations::{DataSink, DataSource};
use crate::protocol::EtlProtocol;
use crate::registry::ProtocolRegistry;
use crate::signal::{SignalHub, SignalKind};
use crate::terminals::MetadataSupplier;

/// Ejecuta protocolos ETL de punta a punta bajo un contexto inmutable.
pub struct ProtocolRunner {
    ctx: AppContext,
    cancel: CancellationToken,
}

impl ProtocolRunner {
    pub fn new(ctx: AppContext, cancel: CancellationToken) -> Self {
        Self { ctx, cancel }
    }

    /// Ejecuta un protocolo completo y reporta los desenlaces. El runner no
    /// falla por fallos de workflows: los acumula en el reporte.
    pub async fn run(&self, protocol: &EtlProtocol) -> RunReport {
        let protocol_id = protocol.id().to_string();
        let signals = self.ctx.signals().clone();
        signals.emit(SignalKind::PreProtocolRun { protocol_id: protocol_id.clone() });
        tracing::info!(%protocol_id, protocol_name = protocol.name(), "ejecutando protocolo");

        let mut report = RunReport { protocol_id: protocol_id.clone(),
                                     outcomes: Vec::new(),
                                     errors: Vec::new() };

        // A. Descubrimiento.
        let (sink_metas, source_metas) = self.discover(protocol, &mut report).await;

        // B. Materialización.
        let sinks = self.materialize_sinks(protocol, &sink_metas, &mut report);
        let sources = self.materialize_sources(protocol, &source_metas, &mut report);

        // C + D. Fan-out acotado y join.
        self.run_workflows(protocol, &sources, &sinks, &mut report).await;

        // E. Teardown, incluso si el run viene fallando.
        self.teardown(protocol, &sources, &sinks);

        signals.emit(SignalKind::PostProtocolRun { protocol_id: protocol_id.clone() });
        tracing::info!(%protocol_id,
                       completed = report.completed_count(),
                       failed = report.failed_count(),
                       errors = report.errors.len(),
                       "protocolo terminado");
        report
    }

    /// Etapa A: une los metadatos de todos los suppliers del protocolo.
    /// Ids duplicados: gana el primer supplier listado, con warning.
    async fn discover(&self,
                      protocol: &EtlProtocol,
                      report: &mut RunReport)
                      -> (IndexMap<String, DataSinkMeta>, IndexMap<String, DataSourceMeta>) {
        let retry = self.ctx.retry_policy();
        let mut sink_metas: IndexMap<String, DataSinkMeta> = IndexMap::new();
        let mut source_metas: IndexMap<String, DataSourceMeta> = IndexMap::new();

        for supplier in protocol.metadata_suppliers() {
            let sinks = retry.run("data_sink_metas", || {
                                 let supplier = supplier.clone();
                                 async move { supplier.data_sink_metas().await }
                             })
                             .await;
            match sinks {
                Ok(metas) => {
                    for meta in metas {
                        if sink_metas.contains_key(meta.id()) {
                            tracing::warn!(sink_id = %meta.id(), supplier_id = %supplier.id(),
                                           "sink duplicado entre suppliers; se conserva el primero");
                            continue;
                        }
                        sink_metas.insert(meta.id().to_string(), meta);
                    }
                }
                Err(e) => self.record_discovery_error(protocol, supplier.id(), e, report),
            }

            let sources = retry.run("data_source_metas", || {
                                   let supplier = supplier.clone();
                                   async move { supplier.data_source_metas().await }
                               })
                               .await;
            match sources {
                Ok(metas) => {
                    for meta in metas {
                        if source_metas.contains_key(meta.id()) {
                            tracing::warn!(source_id = %meta.id(), supplier_id = %supplier.id(),
                                           "fuente duplicada entre suppliers; se conserva la primera");
                            continue;
                        }
                        source_metas.insert(meta.id().to_string(), meta);
                    }
                }
                Err(e) => self.record_discovery_error(protocol, supplier.id(), e, report),
            }
        }

        // Draws: unión entre suppliers por fuente, first-writer-wins por id.
        let source_ids: Vec<String> = source_metas.keys().cloned().collect();
        for source_id in source_ids {
            for supplier in protocol.metadata_suppliers() {
                let Some(current) = source_metas.get(&source_id).cloned() else { break };
                let draws = retry.run("draw_metas", || {
                                     let supplier = supplier.clone();
                                     let source = current.clone();
                                     async move { supplier.draw_metas(&source).await }
                                 })
                                 .await;
                match draws {
                    Ok(draws) => {
                        let mut merged = current;
                        for draw in draws {
                            if merged.draws().contains_key(draw.id()) {
                                tracing::warn!(draw_id = %draw.id(), source_id = %source_id, supplier_id = %supplier.id(),
                                               "draw duplicado entre suppliers; se conserva el primero");
                                continue;
                            }
                            match merged.add_draw(draw) {
                                Ok(next) => merged = next,
                                Err(e) => {
                                    tracing::warn!(source_id = %source_id, supplier_id = %supplier.id(), error = %e,
                                                   "draw inválido descartado durante el descubrimiento");
                                }
                            }
                        }
                        source_metas.insert(source_id.clone(), merged);
                    }
                    Err(e) => self.record_discovery_error(protocol, &source_id, e, report),
                }
            }
        }

        (sink_metas, source_metas)
    }

    fn record_discovery_error(&self,
                              protocol: &EtlProtocol,
                              entity_id: &str,
                              cause: CoreError,
                              report: &mut RunReport) {
        tracing::error!(protocol_id = %protocol.id(), entity_id, kind = cause.kind(), error = %cause.chain(),
                        "fallo de descubrimiento; se continúa con el resto");
        self.ctx.signals().emit(SignalKind::ProtocolRunError { protocol_id: protocol.id().to_string(),
                                                               error: cause.chain() });
        report.errors.push(RunError::Discovery { entity_id: entity_id.to_string(),
                                                 cause });
    }

    /// Etapa B: materializa los sinks. Un error de factory invalida sólo a
    /// ese sink.
    fn materialize_sinks(&self,
                         protocol: &EtlProtocol,
                         sink_metas: &IndexMap<String, DataSinkMeta>,
                         report: &mut RunReport)
                         -> Vec<Arc<dyn DataSink>> {
        let mut sinks = Vec::with_capacity(sink_metas.len());
        for meta in sink_metas.values() {
            match (protocol.data_sink_factory())(meta) {
                Ok(sink) => sinks.push(sink),
                Err(e) => {
                    tracing::error!(sink_id = %meta.id(), kind = e.kind(), error = %e,
                                    "no se pudo materializar el sink");
                    report.errors.push(RunError::Materialization { entity_id: meta.id().to_string(),
                                                                   cause: e });
                }
            }
        }
        sinks
    }

    /// Etapa B: materializa las fuentes. Los draws de una fuente que no
    /// materializó se reportan como workflows fallidos.
    fn materialize_sources(&self,
                           protocol: &EtlProtocol,
                           source_metas: &IndexMap<String, DataSourceMeta>,
                           report: &mut RunReport)
                           -> Vec<(Arc<dyn DataSource>, DataSourceMeta)> {
        let mut sources = Vec::with_capacity(source_metas.len());
        for meta in source_metas.values() {
            match (protocol.data_source_factory())(meta) {
                Ok(source) => sources.push((source, meta.clone())),
                Err(e) => {
                    tracing::error!(source_id = %meta.id(), kind = e.kind(), error = %e,
                                    "no se pudo materializar la fuente; sus draws se reportan fallidos");
                    for draw_id in meta.draws().keys() {
                        report.outcomes
                              .push(WorkflowOutcome::Failed(WorkflowFailed { draw_id: draw_id.clone(),
                                                                             cause: e.clone() }));
                    }
                    report.errors.push(RunError::Materialization { entity_id: meta.id().to_string(),
                                                                   cause: e });
                }
            }
        }
        sources
    }

    /// Etapas C y D: un task por `(fuente, draw)` bajo un semáforo acotado;
    /// el join acumula desenlaces sin cancelar hermanos.
    async fn run_workflows(&self,
                           protocol: &EtlProtocol,
                           sources: &[(Arc<dyn DataSource>, DataSourceMeta)],
                           sinks: &[Arc<dyn DataSink>],
                           report: &mut RunReport) {
        let total_draws: usize = sources.iter().map(|(_, meta)| meta.draw_count()).sum();
        if total_draws == 0 {
            tracing::debug!(protocol_id = %protocol.id(), "sin draws que ejecutar");
            return;
        }

        let pool_size = self.ctx.workflow_pool_size(total_draws);
        tracing::debug!(protocol_id = %protocol.id(), total_draws, pool_size, "lanzando workflows");
        let semaphore = Arc::new(Semaphore::new(pool_size));
        let mut join_set: JoinSet<WorkflowOutcome> = JoinSet::new();

        for (source, source_meta) in sources {
            for draw in source_meta.draws().values() {
                let draw = draw.clone();
                let source = source.clone();
                let sinks = sinks.to_vec();
                let processor_factory = protocol.processor_factory().clone();
                let drain_meta_factory = protocol.drain_meta_factory().clone();
                let consumers = protocol.metadata_consumers().to_vec();
                let selector = protocol.data_sink_selector().clone();
                let retry = self.ctx.retry_policy().clone();
                let cancel = self.cancel.clone();
                let signals = self.ctx.signals().clone();
                let protocol_id = protocol.id().to_string();
                let semaphore = semaphore.clone();

                join_set.spawn(async move {
                    let draw_id = draw.id().to_string();
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => return WorkflowOutcome::Cancelled { draw_id },
                    };
                    if cancel.is_cancelled() {
                        return WorkflowOutcome::Cancelled { draw_id };
                    }

                    signals.emit(SignalKind::PreWorkflowRun { protocol_id: protocol_id.clone(),
                                                              draw_id: draw_id.clone() });
                    let workflow = EtlWorkflow::new(draw,
                                                    source,
                                                    sinks,
                                                    processor_factory,
                                                    drain_meta_factory,
                                                    consumers,
                                                    selector,
                                                    retry,
                                                    cancel);
                    match workflow.run().await {
                        Ok(run_report) => {
                            signals.emit(SignalKind::PostWorkflowRun { protocol_id,
                                                                       draw_id: draw_id.clone() });
                            WorkflowOutcome::Completed(run_report)
                        }
                        Err(CoreError::Cancelled) => WorkflowOutcome::Cancelled { draw_id },
                        Err(e) => {
                            signals.emit(SignalKind::WorkflowRunError { protocol_id,
                                                                        draw_id: draw_id.clone(),
                                                                        error: e.chain() });
                            WorkflowOutcome::Failed(WorkflowFailed { draw_id, cause: e })
                        }
                    }
                });
            }
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(join_error) => {
                    // Un task que entra en pánico no debe tumbar el run.
                    tracing::error!(protocol_id = %protocol.id(), error = %join_error,
                                    "task de workflow abortado");
                }
            }
        }
    }

    /// Etapa E: libera todo en orden fijo. Los errores se loguean y se
    /// suprimen para no enmascarar el fallo primario.
    fn teardown(&self,
                protocol: &EtlProtocol,
                sources: &[(Arc<dyn DataSource>, DataSourceMeta)],
                sinks: &[Arc<dyn DataSink>]) {
        for (source, meta) in sources {
            dispose_logged("data-source", meta.id(), source.as_ref());
        }
        for sink in sinks {
            dispose_logged("data-sink", sink.id(), sink.as_ref());
        }
        for supplier in protocol.metadata_suppliers() {
            dispose_logged("metadata-supplier", supplier.id(), supplier.as_ref());
        }
        for consumer in protocol.metadata_consumers() {
            dispose_logged("metadata-consumer", consumer.id(), consumer.as_ref());
        }
        dispose_logged("drain-meta-factory", protocol.id(), protocol.drain_meta_factory().as_ref());
    }
}

fn dispose_logged(kind: &str, id: &str, resource: &dyn Disposable) {
    if resource.is_disposed() {
        return;
    }
    if let Err(e) = resource.dispose() {
        tracing::warn!(kind, id, error = %e, "error al liberar recurso durante el teardown");
    }
}

/// Ejecuta todos los protocolos configurados, resolviendo sus factories
/// contra el registro. Cada factory se invoca a lo sumo una vez por run;
/// los protocolos con id duplicado se descartan con warning (gana el
/// primero).
pub async fn run_configured_protocols(ctx: &AppContext,
                                      registry: &dyn ProtocolRegistry,
                                      cancel: CancellationToken)
                                      -> Result<RunSummary, CoreError> {
    let mut seen_factories: Vec<&str> = Vec::new();
    let mut protocols: IndexMap<String, EtlProtocol> = IndexMap::new();

    for factory_id in &ctx.settings().etl_protocols {
        if seen_factories.contains(&factory_id.as_str()) {
            tracing::warn!(%factory_id, "factory repetida en etl_protocols; se invoca una sola vez");
            continue;
        }
        seen_factories.push(factory_id.as_str());

        let factory = registry.resolve(factory_id)
                              .ok_or_else(|| CoreError::improperly_configured(format!("factory de protocolo desconocida: '{factory_id}'")))?;
        for protocol in factory(ctx)? {
            if protocols.contains_key(protocol.id()) {
                tracing::warn!(protocol_id = %protocol.id(),
                               "protocolo duplicado entre factories; se conserva el primero");
                continue;
            }
            protocols.insert(protocol.id().to_string(), protocol);
        }
    }

    let runner = ProtocolRunner::new(ctx.clone(), cancel.clone());
    let mut summary = RunSummary::default();
    for protocol in protocols.values() {
        if cancel.is_cancelled() {
            summary.cancelled = true;
            break;
        }
        summary.reports.push(runner.run(protocol).await);
    }
    Ok(summary)
}
