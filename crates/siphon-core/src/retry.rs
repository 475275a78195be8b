//! Combinador de reintentos con backoff exponencial, jitter y deadline.
//!
//! Reglas clave:
//! - El intento #1 duerme con base `initial_delay`; el techo crece
//!   `delay · factor` después de cada sleep, acotado por `maximum_delay`.
//! - Jitter: cada sleep real es `uniform(0, delay)`.
//! - Si `now + sleep` supera el deadline, el sleep se recorta; si ya no queda
//!   margen, falla con `RetryDeadlineExceeded` envolviendo la última causa.
//! - Sólo se reintenta cuando `enabled` y `predicate(err)`; el predicate por
//!   defecto acepta únicamente `CoreError::Transient`.
//!
//! El combinador no guarda estado entre invocaciones; es seguro compartirlo
//! (es un valor clonable) entre workflows concurrentes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::constants::{DEFAULT_DEADLINE, DEFAULT_ENABLE_RETRIES, DEFAULT_INITIAL_DELAY, DEFAULT_MAXIMUM_DELAY,
                       DEFAULT_MULTIPLICATIVE_FACTOR};
use crate::errors::CoreError;

/// Decide si un error amerita reintento.
pub type RetryPredicate = Arc<dyn Fn(&CoreError) -> bool + Send + Sync>;

/// Sección `[retry]` de la configuración. Todos los campos numéricos deben
/// ser reales estrictamente positivos; `default_multiplicative_factor` además
/// debe ser `>= 1`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrySettings {
    pub enable_retries: bool,
    /// Deadline en segundos desde el primer intento. `None` = sin deadline.
    pub default_deadline: Option<f64>,
    pub default_initial_delay: f64,
    pub default_maximum_delay: f64,
    pub default_multiplicative_factor: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self { enable_retries: DEFAULT_ENABLE_RETRIES,
               default_deadline: Some(DEFAULT_DEADLINE),
               default_initial_delay: DEFAULT_INITIAL_DELAY,
               default_maximum_delay: DEFAULT_MAXIMUM_DELAY,
               default_multiplicative_factor: DEFAULT_MULTIPLICATIVE_FACTOR }
    }
}

impl RetrySettings {
    /// Valida la sección completa. Cualquier violación es
    /// `ImproperlyConfigured` y se reporta antes de ejecutar workflows.
    pub fn validate(&self) -> Result<(), CoreError> {
        let positives = [("retry.default_initial_delay", self.default_initial_delay),
                         ("retry.default_maximum_delay", self.default_maximum_delay),
                         ("retry.default_multiplicative_factor", self.default_multiplicative_factor)];
        for (key, value) in positives {
            if !value.is_finite() || value <= 0.0 {
                return Err(CoreError::improperly_configured(format!("{key} debe ser un real estrictamente positivo, se recibió {value}")));
            }
        }
        if self.default_multiplicative_factor < 1.0 {
            return Err(CoreError::improperly_configured(format!("retry.default_multiplicative_factor debe ser >= 1, se recibió {}",
                                                                self.default_multiplicative_factor)));
        }
        if let Some(deadline) = self.default_deadline {
            if !deadline.is_finite() || deadline <= 0.0 {
                return Err(CoreError::improperly_configured(format!("retry.default_deadline debe ser un real estrictamente positivo, se recibió {deadline}")));
            }
        }
        Ok(())
    }
}

/// Predicate por defecto del orquestador: reintenta sólo errores transitorios.
pub fn transient_predicate() -> RetryPredicate {
    Arc::new(|e: &CoreError| e.is_transient())
}

/// Combinador de reintentos de primera clase.
///
/// Envuelve cualquier operación falible async; cada invocación de `run` es
/// independiente (sin estado compartido entre invocaciones).
#[derive(Clone)]
pub struct RetryPolicy {
    enabled: bool,
    initial_delay: Duration,
    maximum_delay: Duration,
    multiplicative_factor: f64,
    deadline: Option<Duration>,
    predicate: RetryPredicate,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
         .field("enabled", &self.enabled)
         .field("initial_delay", &self.initial_delay)
         .field("maximum_delay", &self.maximum_delay)
         .field("multiplicative_factor", &self.multiplicative_factor)
         .field("deadline", &self.deadline)
         .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        // Los defaults de constants.rs son válidos por construcción.
        Self { enabled: DEFAULT_ENABLE_RETRIES,
               initial_delay: Duration::from_secs_f64(DEFAULT_INITIAL_DELAY),
               maximum_delay: Duration::from_secs_f64(DEFAULT_MAXIMUM_DELAY),
               multiplicative_factor: DEFAULT_MULTIPLICATIVE_FACTOR,
               deadline: Some(Duration::from_secs_f64(DEFAULT_DEADLINE)),
               predicate: transient_predicate() }
    }
}

impl RetryPolicy {
    /// Construye la policy desde una sección de configuración ya tipada.
    pub fn from_settings(settings: &RetrySettings) -> Result<Self, CoreError> {
        settings.validate()?;
        Ok(Self { enabled: settings.enable_retries,
                  initial_delay: Duration::from_secs_f64(settings.default_initial_delay),
                  maximum_delay: Duration::from_secs_f64(settings.default_maximum_delay),
                  multiplicative_factor: settings.default_multiplicative_factor,
                  deadline: settings.default_deadline.map(Duration::from_secs_f64),
                  predicate: transient_predicate() })
    }

    /// Policy desactivada: la operación se intenta exactamente una vez.
    pub fn disabled() -> Self {
        Self { enabled: false,
               ..Self::default() }
    }

    /// Reemplaza el predicate de reintento.
    pub fn with_predicate(mut self, predicate: RetryPredicate) -> Self {
        self.predicate = predicate;
        self
    }

    /// Reemplaza el deadline (o lo elimina con `None`).
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Ejecuta `op` reintentando según la policy.
    ///
    /// `operation` es una etiqueta estable para logging estructurado. La
    /// clausura se invoca una vez por intento; los futuros deben poseer sus
    /// capturas (clonar los `Arc` dentro de un bloque `async move`).
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, CoreError>
        where F: FnMut() -> Fut,
              Fut: Future<Output = Result<T, CoreError>>
    {
        let start = Instant::now();
        let deadline_at = self.deadline.map(|d| start + d);
        let mut delay = self.initial_delay;
        let mut attempt: u32 = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !self.enabled || !(self.predicate)(&e) {
                        return Err(e);
                    }

                    // El techo crece después del sleep actual: el intento #1
                    // duerme con base initial_delay.
                    let next_delay = {
                        let grown = delay.mul_f64(self.multiplicative_factor);
                        if grown > self.maximum_delay { self.maximum_delay } else { grown }
                    };
                    let mut sleep_for = delay.mul_f64(fastrand::f64());

                    if let Some(deadline_at) = deadline_at {
                        let now = Instant::now();
                        if now + sleep_for > deadline_at {
                            let remaining = deadline_at.saturating_duration_since(now);
                            if remaining.is_zero() {
                                tracing::warn!(operation,
                                               attempt,
                                               error = %e,
                                               "deadline de reintentos agotado");
                                return Err(CoreError::RetryDeadlineExceeded(Box::new(e)));
                            }
                            sleep_for = remaining;
                        }
                    }

                    tracing::debug!(operation,
                                    attempt,
                                    sleep_ms = sleep_for.as_millis() as u64,
                                    error = %e,
                                    "reintentando operación transitoria");
                    tokio::time::sleep(sleep_for).await;
                    delay = next_delay;
                    attempt += 1;
                }
            }
        }
    }
}
