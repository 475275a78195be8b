//! Procesador de referencia: passthrough de bytes con content-type fijo.
//!
//! El procesador real (Parquet + Brotli) es un colaborador externo; éste
//! materializa el contrato observable: un solo uso, preserva el ordinal del
//! chunk y etiqueta el buffer con el content-type del transporte.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};

use siphon_core::constants::PARQUET_CONTENT_TYPE;
use siphon_core::{CoreError, Disposable, DisposedFlag, ExtractProcessor};
use siphon_domain::{CleanedData, DrawMeta, Identifiable, RawData};

/// Passthrough de un solo uso: copia los bytes y conserva el ordinal.
pub struct PassthroughProcessor {
    content_type: String,
    used: AtomicBool,
    disposed: DisposedFlag,
}

impl PassthroughProcessor {
    pub fn new() -> Self {
        Self { content_type: PARQUET_CONTENT_TYPE.to_string(),
               used: AtomicBool::new(false),
               disposed: DisposedFlag::new() }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

impl Default for PassthroughProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Disposable for PassthroughProcessor {
    fn is_disposed(&self) -> bool {
        self.disposed.is_disposed()
    }

    fn dispose(&self) -> Result<(), CoreError> {
        self.disposed.mark();
        Ok(())
    }
}

#[async_trait]
impl ExtractProcessor for PassthroughProcessor {
    async fn process(&self, raw: RawData, draw: &DrawMeta) -> Result<CleanedData, CoreError> {
        self.disposed.guard("extract processor")?;
        if self.used.swap(true, Ordering::AcqRel) {
            return Err(CoreError::permanent(format!("procesador de un solo uso reutilizado para el draw '{}'",
                                                    draw.id())));
        }
        let index = raw.index();
        Ok(CleanedData::new(index, raw.into_bytes(), &self.content_type))
    }
}
