//! siphon-core: núcleo de orquestación ETL
//!
//! Propósito:
//! - Proveer los contratos neutrales (sin drivers concretos) y la
//!   orquestación para descubrir trabajo, extraer datos chunk a chunk,
//!   transformarlos y drenarlos a uno o más sinks remotos.
//! - Garantizar la disciplina de recursos (disposal idempotente, scopes
//!   LIFO) y el reintento con backoff exponencial + jitter + deadline
//!   alrededor de toda operación remota transitoria.
//!
//! Componentes principales:
//! - `dispose`: contrato `Disposable` y el primitivo `Scope` (liberación
//!   garantizada en orden LIFO).
//! - `retry`: combinador de reintentos de primera clase (`RetryPolicy`) y su
//!   configuración validada.
//! - `operations`: contratos de drivers de extracción/drenado
//!   (`DataSource`, `DrawStream`, `DataSink`, `DrainStream`,
//!   `ExtractProcessor`).
//! - `terminals`: proveedores/consumidores de metadatos y la factory de
//!   manifiestos de upload.
//! - `protocol`: el bundle ejecutable `EtlProtocol` y su builder.
//! - `engine`: el workflow por extracción y el runner de protocolos.
//! - `signal`: hub observable de señales del runner (append-only).
//! - `settings` / `context`: configuración tipada, inicializadores y el
//!   contexto inmutable que se enhebra por todo el runner.
//! - `registry`: resolución de factories de protocolo por id opaco.
//!
//! Re-exports: se exponen símbolos clave para facilitar el uso desde
//! binarios/tests.

pub mod constants;
pub mod context;
pub mod dispose;
pub mod engine;
pub mod errors;
pub mod operations;
pub mod protocol;
pub mod registry;
pub mod retry;
pub mod settings;
pub mod signal;
pub mod terminals;

// Re-exports públicos principales
pub use context::AppContext;
pub use dispose::{Disposable, DisposedFlag, Scope};
pub use engine::outcome::{RunError, RunReport, RunSummary, WorkflowFailed, WorkflowOutcome};
pub use engine::runner::{run_configured_protocols, ProtocolRunner};
pub use engine::workflow::{EtlWorkflow, WorkflowReport, WorkflowState};
pub use errors::CoreError;
pub use operations::{DataSink, DataSource, DrainStream, DrawStream, ExtractProcessor};
pub use protocol::{DataSinkFactory, DataSinkSelector, DataSourceFactory, EtlProtocol, EtlProtocolBuilder,
                   ProcessorFactory};
pub use registry::{ProtocolFactory, ProtocolRegistry, StaticProtocolRegistry};
pub use retry::{RetryPolicy, RetryPredicate, RetrySettings};
pub use settings::{apply_initializers, builtin_initializers, resolve_initializer, LoggingSettings, SettingInitializer,
                   Settings};
pub use signal::{InMemorySignalHub, SignalHub, SignalKind, SignalRecord};
pub use terminals::{DrainMetaFactory, MetadataConsumer, MetadataSupplier, NullMetadataConsumer};
