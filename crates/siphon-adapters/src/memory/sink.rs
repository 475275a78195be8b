//! Sink en memoria con guiones de fallo para ejercitar el motor de
//! reintentos y el fail-fast del workflow.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use siphon_core::{CoreError, DataSink, Disposable, DisposedFlag, DrainStream};
use siphon_domain::{CleanedData, DrainMeta, Identifiable, Progress};

/// Chunk registrado por el sink, con el manifiesto al que pertenece.
#[derive(Debug, Clone)]
pub struct ConsumedChunk {
    pub drain_id: String,
    pub index: u64,
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub progress: f64,
}

/// Sink determinista que acumula todo lo consumido, en orden de llegada.
///
/// Guiones de fallo:
/// - `fail_transient_consumes(n)`: los próximos `n` consumes fallan con
///   `Transient` (compartido entre los streams del sink, como lo haría una
///   conexión inestable).
/// - `fail_permanent_at_index(k)`: consumir el chunk con ordinal `k` falla
///   con `Permanent`.
pub struct InMemoryDataSink {
    id: String,
    name: String,
    description: Option<String>,
    collected: Arc<Mutex<Vec<ConsumedChunk>>>,
    transient_failures: Arc<AtomicUsize>,
    permanent_at_index: Option<u64>,
    issued: Mutex<Vec<Arc<InMemoryDrainStream>>>,
    disposed: DisposedFlag,
}

impl InMemoryDataSink {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(),
               name: name.into(),
               description: None,
               collected: Arc::new(Mutex::new(Vec::new())),
               transient_failures: Arc::new(AtomicUsize::new(0)),
               permanent_at_index: None,
               issued: Mutex::new(Vec::new()),
               disposed: DisposedFlag::new() }
    }

    /// Programa `n` fallos transitorios para los próximos consumes.
    pub fn fail_transient_consumes(self, n: usize) -> Self {
        self.transient_failures.store(n, Ordering::Release);
        self
    }

    /// Programa un fallo permanente al consumir el chunk con ordinal `k`.
    pub fn fail_permanent_at_index(mut self, k: u64) -> Self {
        self.permanent_at_index = Some(k);
        self
    }

    /// Todo lo consumido por este sink, en orden de llegada.
    pub fn consumed(&self) -> Vec<ConsumedChunk> {
        self.collected
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Ordinales consumidos, en orden de llegada.
    pub fn consumed_indexes(&self) -> Vec<u64> {
        self.consumed().iter().map(|c| c.index).collect()
    }

    /// Cantidad de drain streams abiertos sobre este sink.
    pub fn streams_opened(&self) -> usize {
        self.issued
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// True si todos los drain streams emitidos ya fueron liberados.
    pub fn all_streams_disposed(&self) -> bool {
        self.issued
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .all(|s| s.is_disposed())
    }
}

siphon_domain::impl_named!(InMemoryDataSink);

impl Disposable for InMemoryDataSink {
    fn is_disposed(&self) -> bool {
        self.disposed.is_disposed()
    }

    fn dispose(&self) -> Result<(), CoreError> {
        self.disposed.mark();
        Ok(())
    }
}

#[async_trait]
impl DataSink for InMemoryDataSink {
    async fn start_drain(&self, drain: &DrainMeta) -> Result<Arc<dyn DrainStream>, CoreError> {
        self.disposed.guard(&format!("data sink '{}'", self.id))?;
        let stream = Arc::new(InMemoryDrainStream { sink_id: self.id.clone(),
                                                    drain_id: drain.id().to_string(),
                                                    collected: self.collected.clone(),
                                                    transient_failures: self.transient_failures.clone(),
                                                    permanent_at_index: self.permanent_at_index,
                                                    disposed: DisposedFlag::new() });
        self.issued
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(stream.clone());
        Ok(stream)
    }
}

/// Stream de drenado exclusivo de un workflow; escribe en el acumulador
/// compartido de su sink.
pub struct InMemoryDrainStream {
    sink_id: String,
    drain_id: String,
    collected: Arc<Mutex<Vec<ConsumedChunk>>>,
    transient_failures: Arc<AtomicUsize>,
    permanent_at_index: Option<u64>,
    disposed: DisposedFlag,
}

impl Disposable for InMemoryDrainStream {
    fn is_disposed(&self) -> bool {
        self.disposed.is_disposed()
    }

    fn dispose(&self) -> Result<(), CoreError> {
        self.disposed.mark();
        Ok(())
    }
}

#[async_trait]
impl DrainStream for InMemoryDrainStream {
    async fn consume(&self, chunk: CleanedData, progress: Progress) -> Result<(), CoreError> {
        self.disposed.guard(&format!("drain stream de '{}'", self.sink_id))?;

        if let Some(k) = self.permanent_at_index {
            if chunk.index() == k {
                return Err(CoreError::permanent(format!("el sink '{}' rechazó definitivamente el chunk {}",
                                                        self.sink_id, k)));
            }
        }

        let pending = self.transient_failures.load(Ordering::Acquire);
        if pending > 0 {
            self.transient_failures.fetch_sub(1, Ordering::AcqRel);
            return Err(CoreError::transient(format!("fallo transitorio simulado del sink '{}' ({} restantes)",
                                                    self.sink_id,
                                                    pending - 1)));
        }

        self.collected
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(ConsumedChunk { drain_id: self.drain_id.clone(),
                                  index: chunk.index(),
                                  bytes: chunk.bytes().to_vec(),
                                  content_type: chunk.content_type().to_string(),
                                  progress: progress.value() });
        Ok(())
    }
}
