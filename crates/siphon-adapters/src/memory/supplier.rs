//! Supplier estático: metadatos precargados, con guion de fallo opcional.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use siphon_core::{CoreError, Disposable, DisposedFlag, MetadataSupplier};
use siphon_domain::{DataSinkMeta, DataSourceMeta, DrawMeta, Identifiable};

/// Supplier determinista con metadatos precargados.
///
/// `fail_draw_metas(n)` programa `n` fallos transitorios para
/// `draw_metas`; `usize::MAX` equivale a fallar siempre (útil para
/// ejercitar el agotamiento del deadline de reintentos).
pub struct StaticMetadataSupplier {
    id: String,
    name: String,
    description: Option<String>,
    sink_metas: Vec<DataSinkMeta>,
    source_metas: Vec<DataSourceMeta>,
    draws_by_source: HashMap<String, Vec<DrawMeta>>,
    draw_meta_failures: AtomicUsize,
    disposed: DisposedFlag,
}

impl StaticMetadataSupplier {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(),
               name: name.into(),
               description: None,
               sink_metas: Vec::new(),
               source_metas: Vec::new(),
               draws_by_source: HashMap::new(),
               draw_meta_failures: AtomicUsize::new(0),
               disposed: DisposedFlag::new() }
    }

    pub fn add_sink_meta(mut self, meta: DataSinkMeta) -> Self {
        self.sink_metas.push(meta);
        self
    }

    pub fn add_source_meta(mut self, meta: DataSourceMeta) -> Self {
        self.source_metas.push(meta);
        self
    }

    /// Agrega un draw a la lista de su fuente (por `data_source_id`).
    pub fn add_draw_meta(mut self, draw: DrawMeta) -> Self {
        self.draws_by_source
            .entry(draw.data_source_id().to_string())
            .or_default()
            .push(draw);
        self
    }

    /// Programa `n` fallos transitorios para `draw_metas`.
    pub fn fail_draw_metas(self, n: usize) -> Self {
        self.draw_meta_failures.store(n, Ordering::Release);
        self
    }

    /// `draw_metas` falla transitoriamente para siempre.
    pub fn fail_draw_metas_forever(self) -> Self {
        self.fail_draw_metas(usize::MAX)
    }
}

siphon_domain::impl_named!(StaticMetadataSupplier);

impl Disposable for StaticMetadataSupplier {
    fn is_disposed(&self) -> bool {
        self.disposed.is_disposed()
    }

    fn dispose(&self) -> Result<(), CoreError> {
        self.disposed.mark();
        Ok(())
    }
}

#[async_trait]
impl MetadataSupplier for StaticMetadataSupplier {
    async fn data_sink_metas(&self) -> Result<Vec<DataSinkMeta>, CoreError> {
        self.disposed.guard(&format!("metadata supplier '{}'", self.id))?;
        Ok(self.sink_metas.clone())
    }

    async fn data_source_metas(&self) -> Result<Vec<DataSourceMeta>, CoreError> {
        self.disposed.guard(&format!("metadata supplier '{}'", self.id))?;
        Ok(self.source_metas.clone())
    }

    async fn draw_metas(&self, source: &DataSourceMeta) -> Result<Vec<DrawMeta>, CoreError> {
        self.disposed.guard(&format!("metadata supplier '{}'", self.id))?;

        let pending = self.draw_meta_failures.load(Ordering::Acquire);
        if pending > 0 {
            if pending != usize::MAX {
                self.draw_meta_failures.fetch_sub(1, Ordering::AcqRel);
            }
            return Err(CoreError::transient(format!("fallo transitorio simulado del supplier '{}'", self.id)));
        }

        Ok(self.draws_by_source.get(source.id()).cloned().unwrap_or_default())
    }
}
