//! Resultados agregados del runner y mapeo a códigos de salida.

use thiserror::Error;

use crate::constants::{EXIT_CANCELLED, EXIT_PARTIAL_FAILURE, EXIT_SUCCESS};
use crate::engine::workflow::WorkflowReport;
use crate::errors::CoreError;

/// Fallo agregado de un workflow: conserva el draw ofensor y la causa.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("workflow for draw '{draw_id}' failed")]
pub struct WorkflowFailed {
    pub draw_id: String,
    #[source]
    pub cause: CoreError,
}

/// Desenlace de un workflow individual.
#[derive(Debug, Clone)]
pub enum WorkflowOutcome {
    /// El workflow completó y el manifiesto fue entregado a los consumers.
    Completed(WorkflowReport),
    /// El workflow abortó; el fallo de un workflow no cancela a sus
    /// hermanos.
    Failed(WorkflowFailed),
    /// Cancelación cooperativa antes o durante el workflow.
    Cancelled { draw_id: String },
}

impl WorkflowOutcome {
    pub fn draw_id(&self) -> &str {
        match self {
            WorkflowOutcome::Completed(report) => &report.draw_id,
            WorkflowOutcome::Failed(failed) => &failed.draw_id,
            WorkflowOutcome::Cancelled { draw_id } => draw_id,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, WorkflowOutcome::Completed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkflowOutcome::Cancelled { .. })
    }
}

/// Error a nivel de protocolo, fuera de un workflow concreto.
#[derive(Debug, Clone)]
pub enum RunError {
    /// Un supplier falló al descubrir metadatos (tras reintentos).
    Discovery { entity_id: String, cause: CoreError },
    /// Una factory no pudo materializar un handle vivo.
    Materialization { entity_id: String, cause: CoreError },
}

impl RunError {
    pub fn cause(&self) -> &CoreError {
        match self {
            RunError::Discovery { cause, .. } => cause,
            RunError::Materialization { cause, .. } => cause,
        }
    }
}

/// Reporte de la ejecución de un protocolo completo.
#[derive(Debug, Default)]
pub struct RunReport {
    pub protocol_id: String,
    pub outcomes: Vec<WorkflowOutcome>,
    pub errors: Vec<RunError>,
}

impl RunReport {
    pub fn completed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_completed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, WorkflowOutcome::Failed(_)))
            .count()
    }

    /// True si hubo algún fallo de workflow o de protocolo.
    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0 || !self.errors.is_empty()
    }

    /// True si algún workflow terminó cancelado.
    pub fn was_cancelled(&self) -> bool {
        self.outcomes.iter().any(WorkflowOutcome::is_cancelled)
    }

    pub fn is_full_success(&self) -> bool {
        !self.has_failures() && !self.was_cancelled()
    }
}

/// Resumen de un `run` completo (todos los protocolos configurados).
#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<RunReport>,
    /// True cuando la cancelación llegó antes de ejecutar algún protocolo.
    pub cancelled: bool,
}

impl RunSummary {
    pub fn was_cancelled(&self) -> bool {
        self.cancelled || self.reports.iter().any(RunReport::was_cancelled)
    }

    pub fn has_failures(&self) -> bool {
        self.reports.iter().any(RunReport::has_failures)
    }

    /// Código de salida del proceso: cancelación > fallo parcial > éxito.
    pub fn exit_code(&self) -> i32 {
        if self.was_cancelled() {
            EXIT_CANCELLED
        } else if self.has_failures() {
            EXIT_PARTIAL_FAILURE
        } else {
            EXIT_SUCCESS
        }
    }
}
