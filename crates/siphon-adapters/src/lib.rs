//! siphon-adapters: drivers deterministas en memoria
//!
//! Propósito:
//! - Proveer implementaciones en memoria de todos los contratos del core
//!   (fuentes, sinks, suppliers, consumers, procesadores y la factory de
//!   manifiestos), sin IO externo.
//! - Servir como fixtures de los tests de integración y como protocolo demo
//!   del binario: los drivers aceptan guiones de fallo (N fallos
//!   transitorios, fallo permanente en el chunk K) para ejercitar el motor
//!   de reintentos y el fail-fast del workflow.
//!
//! Los drivers reales (SQL, HTTP, códecs Parquet) son colaboradores
//! externos; estos adapters sólo materializan la semántica observable que
//! el núcleo exige de ellos.

pub mod demo;
pub mod memory;
pub mod processor;

pub use demo::demo_protocol_factory;
pub use memory::consumer::RecordingMetadataConsumer;
pub use memory::drain_factory::UuidDrainMetaFactory;
pub use memory::sink::{ConsumedChunk, InMemoryDataSink};
pub use memory::source::InMemoryDataSource;
pub use memory::supplier::StaticMetadataSupplier;
pub use processor::PassthroughProcessor;
