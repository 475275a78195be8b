//! Protocolo demo: un run completo con drivers en memoria.
//!
//! Permite ejecutar el binario sin infraestructura externa. La sección
//! `[protocols.demo]` de la configuración controla la escala (cantidad de
//! draws, chunks por draw, cantidad de sinks); es opaca para el núcleo y se
//! deserializa recién acá.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use siphon_core::{AppContext, CoreError, DataSink, DataSinkFactory, DataSource, DataSourceFactory, EtlProtocol,
                  ExtractProcessor, ProcessorFactory, ProtocolFactory};
use siphon_domain::{DataSinkMeta, DataSourceMeta, DrawMeta, Identifiable, Named};

use crate::memory::drain_factory::UuidDrainMetaFactory;
use crate::memory::sink::InMemoryDataSink;
use crate::memory::source::InMemoryDataSource;
use crate::memory::supplier::StaticMetadataSupplier;
use crate::processor::PassthroughProcessor;

/// Sección `[protocols.demo]` de la configuración.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DemoSettings {
    pub draw_count: usize,
    pub chunks_per_draw: usize,
    pub sink_count: usize,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self { draw_count: 3,
               chunks_per_draw: 3,
               sink_count: 2 }
    }
}

/// Factory del protocolo demo, registrable bajo el id "demo".
pub fn demo_protocol_factory() -> ProtocolFactory {
    Arc::new(|ctx: &AppContext| {
        let cfg: DemoSettings = match ctx.protocol_section("demo") {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| CoreError::improperly_configured(format!("sección [protocols.demo] inválida: {e}")))?,
            None => DemoSettings::default(),
        };

        let source_meta = DataSourceMeta::new("demo-db", "Demo operational database")?;
        let mut supplier = StaticMetadataSupplier::new("demo-supplier", "Demo metadata supplier")
            .add_source_meta(source_meta);
        for i in 0..cfg.draw_count {
            let draw = DrawMeta::new(format!("demo-q-{i}"),
                                     format!("Demo query {i}"),
                                     "demo-db",
                                     json!({ "sql": format!("SELECT * FROM demo_{i}") }))?;
            supplier = supplier.add_draw_meta(draw);
        }
        for s in 0..cfg.sink_count {
            supplier = supplier.add_sink_meta(DataSinkMeta::new(format!("demo-sink-{s}"),
                                                                format!("Demo sink {s}"),
                                                                format!("mem://demo/{s}"),
                                                                "in-memory")?);
        }

        let chunks_per_draw = cfg.chunks_per_draw;
        let source_factory: DataSourceFactory = Arc::new(move |meta: &DataSourceMeta| {
            let mut source = InMemoryDataSource::new(meta.id(), meta.name());
            for draw_id in meta.draws().keys() {
                let chunks = (0..chunks_per_draw).map(|c| format!("{draw_id}:chunk-{c}").into_bytes())
                                                 .collect();
                source = source.with_draw_chunks(draw_id.clone(), chunks);
            }
            Ok(Arc::new(source) as Arc<dyn DataSource>)
        });
        let sink_factory: DataSinkFactory =
            Arc::new(|meta: &DataSinkMeta| Ok(Arc::new(InMemoryDataSink::new(meta.id(), meta.name())) as Arc<dyn DataSink>));
        let processor_factory: ProcessorFactory =
            Arc::new(|| Arc::new(PassthroughProcessor::new()) as Arc<dyn ExtractProcessor>);

        let protocol = EtlProtocol::builder("demo", "Demo ETL protocol")
            .description("extrae chunks sintéticos y los drena a sinks en memoria")
            .data_source_factory(source_factory)
            .data_sink_factory(sink_factory)
            .processor_factory(processor_factory)
            .add_metadata_supplier(Arc::new(supplier))
            .drain_meta_factory(Arc::new(UuidDrainMetaFactory::new()))
            .build()?;

        Ok(vec![protocol])
    })
}
