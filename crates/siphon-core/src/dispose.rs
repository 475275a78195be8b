//! Disciplina de liberación de recursos (disposal).
//!
//! Contrato:
//! - `dispose` es idempotente: la segunda invocación es un no-op exitoso.
//! - Puede superficiar el primer error de liberación, pero el objeto queda
//!   marcado como disposed de todos modos.
//! - Toda operación "disposable-guarded" falla rápido con
//!   `CoreError::ResourceDisposed` cuando el recurso ya fue liberado.
//! - `Scope` garantiza la liberación en orden LIFO en todos los caminos de
//!   salida, incluyendo pánico (vía `Drop`). Los scopes anidan.
//!
//! Los errores de disposal dentro de un `Scope` se loguean y se suprimen
//! para que nunca enmascaren el fallo primario del workflow.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::errors::CoreError;

/// Recurso externo con liberación explícita e idempotente.
///
/// `dispose` toma `&self` para que handles compartidos (`Arc<dyn DataSink>`)
/// puedan liberarse desde el orquestador; las implementaciones mantienen el
/// flag con `DisposedFlag` (interior mutability).
pub trait Disposable: Send + Sync {
    /// Arranca en false; true tras la primera invocación de `dispose`.
    fn is_disposed(&self) -> bool;

    /// Libera los recursos subyacentes. Idempotente: repetir la llamada
    /// retorna `Ok(())` sin efectos.
    fn dispose(&self) -> Result<(), CoreError>;
}

/// Flag de disposal compartible entre hilos.
///
/// Helper pensado para que cada implementación de `Disposable` no repita el
/// mismo manejo atómico.
#[derive(Debug, Default)]
pub struct DisposedFlag(AtomicBool);

impl DisposedFlag {
    pub fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn is_disposed(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Marca el flag. Retorna true sólo la primera vez, para que el caller
    /// libere recursos exactamente una vez.
    pub fn mark(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    /// Guard de operación: falla con `ResourceDisposed` si ya fue liberado.
    pub fn guard(&self, who: &str) -> Result<(), CoreError> {
        if self.is_disposed() {
            return Err(CoreError::ResourceDisposed(who.to_string()));
        }
        Ok(())
    }
}

/// Región acotada de ejecución que garantiza el disposal de todo recurso
/// adoptado, en orden inverso al de adopción (LIFO).
///
/// El caller conserva su propio `Arc` para operar sobre el recurso; el scope
/// retiene un clon sólo a efectos de liberación. Salir del scope (normal,
/// error o pánico) dispara `dispose_all`.
pub struct Scope {
    label: String,
    entries: Vec<(String, Arc<dyn Disposable>)>,
}

impl Scope {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into(),
               entries: Vec::new() }
    }

    /// Adopta un recurso para liberarlo al salir del scope.
    pub fn adopt(&mut self, label: impl Into<String>, resource: Arc<dyn Disposable>) {
        self.entries.push((label.into(), resource));
    }

    /// Libera todos los recursos adoptados en orden LIFO. Los errores se
    /// loguean y se suprimen.
    pub fn dispose_all(&mut self) {
        for (label, resource) in self.entries.drain(..).rev() {
            if resource.is_disposed() {
                continue;
            }
            if let Err(e) = resource.dispose() {
                tracing::warn!(scope = %self.label, resource = %label, error = %e, "error al liberar recurso");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.dispose_all();
    }
}
