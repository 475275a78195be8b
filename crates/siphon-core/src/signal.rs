//! Señales observables del runner (append-only).
//!
//! Rol en el flujo:
//! - Cada ejecución de protocolo emite señales a un `SignalHub` append-only.
//! - Las señales son puramente observables: ignorarlas no altera la máquina
//!   de estados del runner ni de los workflows.
//! - La implementación in-memory sirve de referencia y es la que usan los
//!   tests para asertar secuencias de ejecución.
//!
//! Cada emisión se espeja además como record estructurado de `tracing`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Tipos de señal soportados por el runner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SignalKind {
    /// El runner va a ejecutar un protocolo.
    PreProtocolRun { protocol_id: String },
    /// El runner terminó un protocolo (con o sin fallos de workflows).
    PostProtocolRun { protocol_id: String },
    /// Un workflow está por ejecutarse para el draw indicado.
    PreWorkflowRun { protocol_id: String, draw_id: String },
    /// Un workflow completó exitosamente. No se emite para workflows
    /// fallidos ni cancelados.
    PostWorkflowRun { protocol_id: String, draw_id: String },
    /// Un workflow falló; `error` es la causa renderizada.
    WorkflowRunError {
        protocol_id: String,
        draw_id: String,
        error: String,
    },
    /// Fallo a nivel de protocolo (p. ej. descubrimiento de un supplier).
    ProtocolRunError { protocol_id: String, error: String },
}

impl SignalKind {
    /// Letra compacta de la variante, útil para asertar secuencias en tests.
    pub fn letter(&self) -> &'static str {
        match self {
            SignalKind::PreProtocolRun { .. } => "P",
            SignalKind::PostProtocolRun { .. } => "Q",
            SignalKind::PreWorkflowRun { .. } => "W",
            SignalKind::PostWorkflowRun { .. } => "V",
            SignalKind::WorkflowRunError { .. } => "X",
            SignalKind::ProtocolRunError { .. } => "E",
        }
    }
}

/// Señal persistida con su orden de emisión.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalRecord {
    pub seq: u64, // asignado por el hub (orden de emisión)
    pub kind: SignalKind,
    pub ts: DateTime<Utc>, // metadato informativo
}

/// Hub de señales append-only.
///
/// Contrato principal:
/// - `emit` agrega la señal al final del log, asigna `seq` y `ts`, y la
///   espeja a `tracing`.
/// - `list` devuelve todas las señales en orden ascendente por `seq`.
pub trait SignalHub: Send + Sync {
    fn emit(&self, kind: SignalKind) -> SignalRecord;

    fn list(&self) -> Vec<SignalRecord>;
}

/// Implementación en memoria del `SignalHub`.
///
/// - Volátil: las señales se pierden al finalizar el proceso.
/// - Thread-safe: el runner emite desde múltiples workflows concurrentes.
#[derive(Debug, Default)]
pub struct InMemorySignalHub {
    inner: Mutex<Vec<SignalRecord>>,
}

impl InMemorySignalHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Secuencia compacta de letras de variante, en orden de emisión.
    pub fn letters(&self) -> String {
        self.list().iter().map(|r| r.kind.letter()).collect()
    }
}

impl SignalHub for InMemorySignalHub {
    fn emit(&self, kind: SignalKind) -> SignalRecord {
        match &kind {
            SignalKind::WorkflowRunError { protocol_id, draw_id, error } => {
                tracing::error!(%protocol_id, %draw_id, %error, "workflow run error");
            }
            SignalKind::ProtocolRunError { protocol_id, error } => {
                tracing::error!(%protocol_id, %error, "protocol run error");
            }
            other => {
                tracing::debug!(signal = ?other, "señal del runner");
            }
        }

        let mut log = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let record = SignalRecord { seq: log.len() as u64,
                                    kind,
                                    ts: Utc::now() };
        log.push(record.clone());
        record
    }

    fn list(&self) -> Vec<SignalRecord> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
