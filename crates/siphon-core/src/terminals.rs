//! Terminales de metadatos: qué trabajo hay, y a quién reportarlo.
//!
//! Rol en el flujo:
//! - `MetadataSupplier` trae del coordinador las fuentes, sinks y draws que
//!   el cliente debe ejecutar. Sus operaciones son idempotentes y seguras de
//!   repetir; el runner las envuelve en el motor de reintentos.
//! - `MetadataConsumer` recibe el `DrainMeta` de cada upload completado para
//!   que el servidor reconcilie lo recibido. Sucede estrictamente después de
//!   la última entrega de chunks de esa extracción.
//! - `DrainMetaFactory` acuña el manifiesto de upload antes de abrir los
//!   drain streams y declara el content-type del transporte.

use async_trait::async_trait;
use std::sync::Arc;

use siphon_domain::{DataSinkMeta, DataSourceMeta, DrainMeta, DrawMeta, Identifiable, Named};

use crate::dispose::{Disposable, DisposedFlag};
use crate::errors::CoreError;

/// Proveedor de metadatos del coordinador remoto.
#[async_trait]
pub trait MetadataSupplier: Named + Disposable {
    /// Sinks hacia los que el coordinador quiere drenar.
    async fn data_sink_metas(&self) -> Result<Vec<DataSinkMeta>, CoreError>;

    /// Fuentes lógicas declaradas por el coordinador.
    async fn data_source_metas(&self) -> Result<Vec<DataSourceMeta>, CoreError>;

    /// Draws pendientes para una fuente concreta.
    async fn draw_metas(&self, source: &DataSourceMeta) -> Result<Vec<DrawMeta>, CoreError>;
}

/// Receptor de manifiestos de uploads completados.
#[async_trait]
pub trait MetadataConsumer: Named + Disposable {
    /// Acusa recibo de un upload completado. Los fallos transitorios se
    /// reintentan; los permanentes suben al runner.
    async fn take_drain_meta(&self, drain: DrainMeta) -> Result<(), CoreError>;
}

/// Acuña `DrainMeta`s para los uploads de un protocolo.
#[async_trait]
pub trait DrainMetaFactory: Disposable {
    /// Content-type MIME que esta factory declara para el transporte.
    fn content_type(&self) -> &str;

    /// Acuña el manifiesto del upload para el draw dado.
    async fn new_drain_meta(&self, draw: &DrawMeta) -> Result<DrainMeta, CoreError>;
}

/// Consumidor nulo: descarta los manifiestos.
///
/// Es el consumer por defecto cuando un protocolo no declara ninguno, de
/// modo que el workflow siempre tenga a quién entregar el `DrainMeta`.
#[derive(Debug, Default)]
pub struct NullMetadataConsumer {
    disposed: DisposedFlag,
}

impl NullMetadataConsumer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl Identifiable for NullMetadataConsumer {
    fn id(&self) -> &str {
        "null-metadata-consumer"
    }
}

impl Named for NullMetadataConsumer {
    fn name(&self) -> &str {
        "Null metadata consumer"
    }

    fn description(&self) -> Option<&str> {
        Some("descarta los manifiestos de upload recibidos")
    }
}

impl Disposable for NullMetadataConsumer {
    fn is_disposed(&self) -> bool {
        self.disposed.is_disposed()
    }

    fn dispose(&self) -> Result<(), CoreError> {
        self.disposed.mark();
        Ok(())
    }
}

#[async_trait]
impl MetadataConsumer for NullMetadataConsumer {
    async fn take_drain_meta(&self, drain: DrainMeta) -> Result<(), CoreError> {
        self.disposed.guard("null metadata consumer")?;
        tracing::trace!(drain_id = %drain.id(), "drain meta descartado por el consumer nulo");
        Ok(())
    }
}
