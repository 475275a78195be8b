//! Consumer que registra los manifiestos recibidos, en orden.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use siphon_core::{CoreError, Disposable, DisposedFlag, MetadataConsumer};
use siphon_domain::DrainMeta;

/// Consumer determinista: acumula cada `DrainMeta` acusado.
///
/// `fail_transient_takes(n)` programa `n` fallos transitorios para
/// ejercitar el reintento alrededor del acuse.
pub struct RecordingMetadataConsumer {
    id: String,
    name: String,
    description: Option<String>,
    taken: Mutex<Vec<DrainMeta>>,
    transient_failures: AtomicUsize,
    disposed: DisposedFlag,
}

impl RecordingMetadataConsumer {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(),
               name: name.into(),
               description: None,
               taken: Mutex::new(Vec::new()),
               transient_failures: AtomicUsize::new(0),
               disposed: DisposedFlag::new() }
    }

    pub fn fail_transient_takes(self, n: usize) -> Self {
        self.transient_failures.store(n, Ordering::Release);
        self
    }

    /// Manifiestos acusados, en orden de llegada.
    pub fn taken(&self) -> Vec<DrainMeta> {
        self.taken
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn taken_count(&self) -> usize {
        self.taken().len()
    }
}

siphon_domain::impl_named!(RecordingMetadataConsumer);

impl Disposable for RecordingMetadataConsumer {
    fn is_disposed(&self) -> bool {
        self.disposed.is_disposed()
    }

    fn dispose(&self) -> Result<(), CoreError> {
        self.disposed.mark();
        Ok(())
    }
}

#[async_trait]
impl MetadataConsumer for RecordingMetadataConsumer {
    async fn take_drain_meta(&self, drain: DrainMeta) -> Result<(), CoreError> {
        self.disposed.guard(&format!("metadata consumer '{}'", self.id))?;

        let pending = self.transient_failures.load(Ordering::Acquire);
        if pending > 0 {
            self.transient_failures.fetch_sub(1, Ordering::AcqRel);
            return Err(CoreError::transient(format!("fallo transitorio simulado del consumer '{}'", self.id)));
        }

        self.taken
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(drain);
        Ok(())
    }
}
