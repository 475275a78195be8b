//! siphon-domain: modelo de metadatos del cliente ETL
//!
//! Propósito:
//! - Proveer los tipos de dominio neutrales (sin IO, sin async) que describen
//!   qué datos quiere el coordinador remoto y hacia dónde deben drenarse.
//! - Garantizar las invariantes estructurales (ids no vacíos, pertenencia de
//!   cada `DrawMeta` a su `DataSourceMeta`, progreso en `[0.0, 1.0]`) en el
//!   momento de construcción, nunca después.
//!
//! Componentes principales:
//! - `identity`: contratos `Identifiable` / `Named` y macros de impl.
//! - `data_source_meta` / `draw_meta`: fuente lógica y especificación opaca de
//!   una extracción. El `DrawMeta` referencia a su padre por id (sin ciclos).
//! - `data_sink_meta` / `drain_meta`: endpoint remoto y manifiesto de un
//!   upload en tránsito.
//! - `payload`: portadores opacos de bytes (`RawData`, `CleanedData`) y el
//!   newtype `Progress`.
//! - `error`: errores de validación del dominio.
//!
//! Re-exports: se exponen símbolos clave para facilitar el uso desde el core
//! y los adapters.

pub mod data_sink_meta;
pub mod data_source_meta;
pub mod drain_meta;
pub mod draw_meta;
pub mod error;
pub mod identity;
pub mod payload;

// Re-exports públicos principales
pub use data_sink_meta::DataSinkMeta;
pub use data_source_meta::DataSourceMeta;
pub use drain_meta::DrainMeta;
pub use draw_meta::DrawMeta;
pub use error::DomainError;
pub use identity::{Identifiable, Named};
pub use payload::{CleanedData, Progress, RawData};
