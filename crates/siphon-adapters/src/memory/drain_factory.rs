//! Factory de manifiestos con ids UUID v4.

use async_trait::async_trait;
use uuid::Uuid;

use siphon_core::constants::PARQUET_CONTENT_TYPE;
use siphon_core::{CoreError, Disposable, DisposedFlag, DrainMetaFactory};
use siphon_domain::{DrainMeta, DrawMeta, Identifiable};

/// Acuña `DrainMeta`s con id UUID v4 y el content-type declarado (Parquet
/// por defecto; la elección del content-type es de la factory).
pub struct UuidDrainMetaFactory {
    content_type: String,
    disposed: DisposedFlag,
}

impl UuidDrainMetaFactory {
    pub fn new() -> Self {
        Self { content_type: PARQUET_CONTENT_TYPE.to_string(),
               disposed: DisposedFlag::new() }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

impl Default for UuidDrainMetaFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl Disposable for UuidDrainMetaFactory {
    fn is_disposed(&self) -> bool {
        self.disposed.is_disposed()
    }

    fn dispose(&self) -> Result<(), CoreError> {
        self.disposed.mark();
        Ok(())
    }
}

#[async_trait]
impl DrainMetaFactory for UuidDrainMetaFactory {
    fn content_type(&self) -> &str {
        &self.content_type
    }

    async fn new_drain_meta(&self, draw: &DrawMeta) -> Result<DrainMeta, CoreError> {
        self.disposed.guard("drain meta factory")?;
        let drain = DrainMeta::new(Uuid::new_v4().to_string(), draw.id(), &self.content_type)?;
        Ok(drain)
    }
}
