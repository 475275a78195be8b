//! Contexto inmutable de la aplicación.
//!
//! Reemplaza cualquier global mutable: el bootstrap construye el contexto
//! una vez (configuración validada + policy de reintentos + hub de señales)
//! y lo enhebra por el runner y las factories. Después del setup el contexto
//! no cambia; clonar es barato (todo es `Arc`).

use std::fmt;
use std::sync::Arc;

use crate::constants::MAX_WORKFLOW_POOL;
use crate::errors::CoreError;
use crate::retry::RetryPolicy;
use crate::settings::Settings;
use crate::signal::SignalHub;

/// Contexto compartido por todo un `run`.
#[derive(Clone)]
pub struct AppContext {
    settings: Arc<Settings>,
    retry_policy: RetryPolicy,
    signals: Arc<dyn SignalHub>,
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
         .field("settings", &self.settings)
         .field("retry_policy", &self.retry_policy)
         .finish_non_exhaustive()
    }
}

impl AppContext {
    /// Construye el contexto validando la configuración completa.
    ///
    /// # Errores
    /// `ImproperlyConfigured` si algún valor tipado es inválido; nada se
    /// ejecuta en ese caso.
    pub fn new(settings: Settings, signals: Arc<dyn SignalHub>) -> Result<Self, CoreError> {
        settings.validate()?;
        let retry_policy = RetryPolicy::from_settings(&settings.retry)?;
        Ok(Self { settings: Arc::new(settings),
                  retry_policy,
                  signals })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    pub fn signals(&self) -> &Arc<dyn SignalHub> {
        &self.signals
    }

    /// Sección opaca de configuración de un protocolo concreto.
    pub fn protocol_section(&self, protocol_id: &str) -> Option<&serde_json::Value> {
        self.settings.protocol_section(protocol_id)
    }

    /// Tamaño efectivo del pool de workflows para `draw_count` draws.
    pub fn workflow_pool_size(&self, draw_count: usize) -> usize {
        self.settings
            .max_concurrent_workflows
            .unwrap_or_else(|| MAX_WORKFLOW_POOL.min(draw_count))
            .max(1)
    }
}
