//! Portadores opacos de bytes intercambiados entre draw y drain.
//!
//! Rol en el flujo:
//! - `RawData` es lo que produce un `DrawStream`: bytes crudos más el ordinal
//!   del chunk dentro de la extracción.
//! - `CleanedData` es lo que produce el procesador y consumen los
//!   `DrainStream`s: bytes transformados, mismo ordinal, más content-type.
//! - `Progress` acompaña cada chunk e indica la fracción completada de la
//!   extracción, siempre dentro de `[0.0, 1.0]`.
//!
//! El núcleo jamás inspecciona los bytes; sólo garantiza orden y entrega.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::DomainError;

/// Chunk crudo extraído de una fuente.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawData {
    /// Ordinal 0-based del chunk dentro de una extracción.
    index: u64,
    bytes: Vec<u8>,
}

impl RawData {
    pub fn new(index: u64, bytes: Vec<u8>) -> Self {
        Self { index, bytes }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Chunk transformado, listo para drenarse a los sinks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CleanedData {
    /// Ordinal 0-based; debe coincidir con el del `RawData` de origen.
    index: u64,
    bytes: Vec<u8>,
    /// Content-type MIME del buffer transformado.
    content_type: String,
}

impl CleanedData {
    pub fn new(index: u64, bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self { index,
               bytes,
               content_type: content_type.into() }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Fracción completada de una extracción, validada en `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, PartialOrd)]
pub struct Progress(f64);

impl Progress {
    /// Crea un `Progress` validando el rango.
    pub fn new(value: f64) -> Result<Self, DomainError> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(DomainError::validation(format!("progreso fuera de rango [0.0, 1.0]: {value}")));
        }
        Ok(Self(value))
    }

    /// Progreso completo (1.0).
    pub fn complete() -> Self {
        Self(1.0)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// True cuando la extracción alcanzó el 100 %.
    pub fn is_complete(&self) -> bool {
        self.0 >= 1.0
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.0 * 100.0)
    }
}
