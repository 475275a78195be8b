//! Contratos de drivers de extracción y drenado (operaciones de datos).
//!
//! Reglas clave:
//! - Todo handle vivo se crea vía factory, se usa dentro de un scope
//!   explícito y se libera exactamente una vez por el orquestador.
//! - Los streams son perezosos, finitos y no reiniciables: agotado o
//!   liberado, un stream no vuelve a producir/aceptar chunks.
//! - Los métodos toman `&self`; las implementaciones usan interior
//!   mutability. Esto permite que un `DataSink` compartido entre workflows
//!   atienda `start_drain` concurrentes devolviendo streams independientes.
//!
//! Los drivers concretos (SQL, HTTP, códecs Parquet) son colaboradores
//! externos: el núcleo depende sólo de estos contratos.

use async_trait::async_trait;
use siphon_domain::{CleanedData, DrainMeta, DrawMeta, Named, Progress, RawData};

use crate::dispose::Disposable;
use crate::errors::CoreError;

/// Handle vivo sobre una fuente de datos; dueño de la conexión del driver.
#[async_trait]
pub trait DataSource: Named + Disposable {
    /// Abre un stream de extracción para el draw dado.
    ///
    /// Disposable-guarded: falla con `ResourceDisposed` tras `dispose`.
    async fn start_draw(&self, draw: &DrawMeta) -> Result<std::sync::Arc<dyn DrawStream>, CoreError>;
}

/// Secuencia perezosa y finita de chunks crudos con su progreso.
#[async_trait]
pub trait DrawStream: Disposable {
    /// Produce el siguiente `(RawData, Progress)`, o `None` cuando la
    /// extracción terminó. El progreso es no decreciente y llega a 1.0 con
    /// el último chunk.
    async fn draw(&self) -> Result<Option<(RawData, Progress)>, CoreError>;
}

impl std::fmt::Debug for dyn DrawStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawStream").finish()
    }
}

/// Handle vivo sobre un sink remoto.
///
/// Compartido entre workflows: `start_drain` concurrentes deben ser seguros
/// y devolver streams independientes.
#[async_trait]
pub trait DataSink: Named + Disposable {
    /// Abre un stream de drenado para el upload descrito por `drain`.
    async fn start_drain(&self, drain: &DrainMeta) -> Result<std::sync::Arc<dyn DrainStream>, CoreError>;
}

/// Consumidor de chunks transformados, en orden de llegada.
///
/// Nunca se comparte: cada `DrainStream` pertenece exclusivamente a un
/// workflow.
#[async_trait]
pub trait DrainStream: Disposable {
    /// Acepta un chunk transformado junto con el progreso de la extracción.
    async fn consume(&self, chunk: CleanedData, progress: Progress) -> Result<(), CoreError>;
}

/// Transformador RawData → CleanedData para un draw concreto.
///
/// Con estado y de un solo uso: el workflow crea un procesador fresco por
/// chunk vía la `ProcessorFactory` del protocolo y lo libera al terminar.
#[async_trait]
pub trait ExtractProcessor: Disposable {
    async fn process(&self, raw: RawData, draw: &DrawMeta) -> Result<CleanedData, CoreError>;
}
