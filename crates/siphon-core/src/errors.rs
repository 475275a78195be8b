//! Taxonomía de errores del núcleo.
//!
//! El motor de reintentos decide sobre la variante (`Transient` se reintenta,
//! el resto no), nunca sobre jerarquías de tipos. `RetryDeadlineExceeded`
//! envuelve la última causa transitoria observada antes de agotar el
//! deadline.

use siphon_domain::DomainError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// Configuración inválida detectada antes de ejecutar cualquier workflow.
    #[error("improperly configured: {0}")]
    ImproperlyConfigured(String),
    /// Error recuperable; candidato a reintento con el predicate por defecto.
    #[error("transient error: {0}")]
    Transient(String),
    /// Error no recuperable; sube hasta el runner sin reintentos.
    #[error("permanent error: {0}")]
    Permanent(String),
    /// Uso erróneo de un recurso ya liberado. Error de programación.
    #[error("resource already disposed: {0}")]
    ResourceDisposed(String),
    /// El deadline del bloque de reintentos se agotó; envuelve la última
    /// causa transitoria.
    #[error("retry deadline exceeded")]
    RetryDeadlineExceeded(#[source] Box<CoreError>),
    /// Cancelación cooperativa. Distinta de transitoria y de permanente.
    #[error("operation cancelled")]
    Cancelled,
}

impl CoreError {
    pub fn transient(msg: impl Into<String>) -> Self {
        CoreError::Transient(msg.into())
    }

    pub fn permanent(msg: impl Into<String>) -> Self {
        CoreError::Permanent(msg.into())
    }

    pub fn improperly_configured(msg: impl Into<String>) -> Self {
        CoreError::ImproperlyConfigured(msg.into())
    }

    /// True para errores que el predicate por defecto reintenta.
    pub fn is_transient(&self) -> bool {
        matches!(self, CoreError::Transient(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CoreError::Cancelled)
    }

    /// Render del error junto con su cadena de causas, para registros de
    /// log orientados a humanos.
    pub fn chain(&self) -> String {
        let mut rendered = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            rendered.push_str(": ");
            rendered.push_str(&cause.to_string());
            source = cause.source();
        }
        rendered
    }

    /// Etiqueta corta y estable de la variante, para logging estructurado.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::ImproperlyConfigured(_) => "improperly-configured",
            CoreError::Transient(_) => "transient",
            CoreError::Permanent(_) => "permanent",
            CoreError::ResourceDisposed(_) => "resource-disposed",
            CoreError::RetryDeadlineExceeded(_) => "retry-deadline-exceeded",
            CoreError::Cancelled => "cancelled",
        }
    }
}

impl From<DomainError> for CoreError {
    fn from(e: DomainError) -> Self {
        CoreError::Permanent(e.to_string())
    }
}
