//! El bundle ejecutable `EtlProtocol` y su builder.
//!
//! Un protocolo ata en una unidad nombrada todo lo que el runner necesita:
//! factories de fuentes/sinks/procesadores, los terminales de metadatos y la
//! factory de manifiestos. El builder valida en `build()` lo que el contrato
//! exige: al menos un supplier, todas las factories presentes. Un protocolo
//! sin consumers recibe el consumer nulo que descarta manifiestos.

use std::fmt;
use std::sync::Arc;

use siphon_domain::{DataSinkMeta, DataSourceMeta, DrainMeta, DrawMeta};

use crate::errors::CoreError;
use crate::operations::{DataSink, DataSource, ExtractProcessor};
use crate::terminals::{DrainMetaFactory, MetadataConsumer, MetadataSupplier, NullMetadataConsumer};

/// Materializa un handle vivo de fuente a partir de su metadato.
pub type DataSourceFactory = Arc<dyn Fn(&DataSourceMeta) -> Result<Arc<dyn DataSource>, CoreError> + Send + Sync>;

/// Materializa un handle vivo de sink a partir de su metadato.
pub type DataSinkFactory = Arc<dyn Fn(&DataSinkMeta) -> Result<Arc<dyn DataSink>, CoreError> + Send + Sync>;

/// Crea un procesador fresco (de un solo uso) por chunk.
pub type ProcessorFactory = Arc<dyn Fn() -> Arc<dyn ExtractProcessor> + Send + Sync>;

/// Elige a qué sinks drenar una extracción. El default selecciona todos.
pub type DataSinkSelector =
    Arc<dyn Fn(&[Arc<dyn DataSink>], &DrainMeta, &DrawMeta) -> Vec<Arc<dyn DataSink>> + Send + Sync>;

/// Bundle nombrado y ejecutable de un flujo ETL completo.
pub struct EtlProtocol {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    data_source_factory: DataSourceFactory,
    data_sink_factory: DataSinkFactory,
    processor_factory: ProcessorFactory,
    metadata_suppliers: Vec<Arc<dyn MetadataSupplier>>,
    metadata_consumers: Vec<Arc<dyn MetadataConsumer>>,
    drain_meta_factory: Arc<dyn DrainMetaFactory>,
    data_sink_selector: DataSinkSelector,
}

impl fmt::Debug for EtlProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EtlProtocol")
         .field("id", &self.id)
         .field("name", &self.name)
         .field("suppliers", &self.metadata_suppliers.len())
         .field("consumers", &self.metadata_consumers.len())
         .finish_non_exhaustive()
    }
}

impl EtlProtocol {
    /// Crea un builder para configurar el protocolo.
    pub fn builder(id: impl Into<String>, name: impl Into<String>) -> EtlProtocolBuilder {
        EtlProtocolBuilder { id: id.into(),
                             name: name.into(),
                             description: None,
                             data_source_factory: None,
                             data_sink_factory: None,
                             processor_factory: None,
                             metadata_suppliers: Vec::new(),
                             metadata_consumers: Vec::new(),
                             drain_meta_factory: None,
                             data_sink_selector: None }
    }

    pub fn data_source_factory(&self) -> &DataSourceFactory {
        &self.data_source_factory
    }

    pub fn data_sink_factory(&self) -> &DataSinkFactory {
        &self.data_sink_factory
    }

    pub fn processor_factory(&self) -> &ProcessorFactory {
        &self.processor_factory
    }

    pub fn metadata_suppliers(&self) -> &[Arc<dyn MetadataSupplier>] {
        &self.metadata_suppliers
    }

    pub fn metadata_consumers(&self) -> &[Arc<dyn MetadataConsumer>] {
        &self.metadata_consumers
    }

    pub fn drain_meta_factory(&self) -> &Arc<dyn DrainMetaFactory> {
        &self.drain_meta_factory
    }

    pub fn data_sink_selector(&self) -> &DataSinkSelector {
        &self.data_sink_selector
    }
}

siphon_domain::impl_named!(EtlProtocol);

/// Builder de `EtlProtocol`. `build()` valida el contrato completo.
pub struct EtlProtocolBuilder {
    id: String,
    name: String,
    description: Option<String>,
    data_source_factory: Option<DataSourceFactory>,
    data_sink_factory: Option<DataSinkFactory>,
    processor_factory: Option<ProcessorFactory>,
    metadata_suppliers: Vec<Arc<dyn MetadataSupplier>>,
    metadata_consumers: Vec<Arc<dyn MetadataConsumer>>,
    drain_meta_factory: Option<Arc<dyn DrainMetaFactory>>,
    data_sink_selector: Option<DataSinkSelector>,
}

impl EtlProtocolBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn data_source_factory(mut self, factory: DataSourceFactory) -> Self {
        self.data_source_factory = Some(factory);
        self
    }

    pub fn data_sink_factory(mut self, factory: DataSinkFactory) -> Self {
        self.data_sink_factory = Some(factory);
        self
    }

    pub fn processor_factory(mut self, factory: ProcessorFactory) -> Self {
        self.processor_factory = Some(factory);
        self
    }

    pub fn add_metadata_supplier(mut self, supplier: Arc<dyn MetadataSupplier>) -> Self {
        self.metadata_suppliers.push(supplier);
        self
    }

    pub fn add_metadata_consumer(mut self, consumer: Arc<dyn MetadataConsumer>) -> Self {
        self.metadata_consumers.push(consumer);
        self
    }

    pub fn drain_meta_factory(mut self, factory: Arc<dyn DrainMetaFactory>) -> Self {
        self.drain_meta_factory = Some(factory);
        self
    }

    pub fn data_sink_selector(mut self, selector: DataSinkSelector) -> Self {
        self.data_sink_selector = Some(selector);
        self
    }

    /// Construye el protocolo validando el contrato.
    ///
    /// # Errores
    /// `ImproperlyConfigured` si falta alguna factory o no hay suppliers.
    pub fn build(self) -> Result<EtlProtocol, CoreError> {
        if self.id.trim().is_empty() {
            return Err(CoreError::improperly_configured("el id de un protocolo no puede estar vacío"));
        }
        if self.metadata_suppliers.is_empty() {
            return Err(CoreError::improperly_configured(format!("el protocolo '{}' requiere al menos un metadata supplier",
                                                                self.id)));
        }

        let missing = |what: &str, id: &str| {
            CoreError::improperly_configured(format!("el protocolo '{id}' no declara {what}"))
        };
        let data_source_factory = self.data_source_factory
                                      .ok_or_else(|| missing("data_source_factory", &self.id))?;
        let data_sink_factory = self.data_sink_factory
                                    .ok_or_else(|| missing("data_sink_factory", &self.id))?;
        let processor_factory = self.processor_factory
                                    .ok_or_else(|| missing("processor_factory", &self.id))?;
        let drain_meta_factory = self.drain_meta_factory
                                     .ok_or_else(|| missing("drain_meta_factory", &self.id))?;

        let metadata_consumers = if self.metadata_consumers.is_empty() {
            vec![NullMetadataConsumer::new() as Arc<dyn MetadataConsumer>]
        } else {
            self.metadata_consumers
        };

        // Default: drenar a todos los sinks materializados.
        let data_sink_selector = self.data_sink_selector
                                     .unwrap_or_else(|| Arc::new(|sinks: &[Arc<dyn DataSink>], _: &DrainMeta, _: &DrawMeta| sinks.to_vec()));

        Ok(EtlProtocol { id: self.id,
                         name: self.name,
                         description: self.description,
                         data_source_factory,
                         data_sink_factory,
                         processor_factory,
                         metadata_suppliers: self.metadata_suppliers,
                         metadata_consumers,
                         drain_meta_factory,
                         data_sink_selector })
    }
}
