//! Configuración tipada del cliente y sus inicializadores.
//!
//! El parsing del archivo (TOML) y de los argumentos de CLI vive en el
//! binario; el núcleo define la forma tipada, la validación y los
//! inicializadores que normalizan la configuración exactamente una vez antes
//! de ejecutar cualquier workflow. Claves desconocidas en el nivel superior
//! se reportan con warning y se ignoran; valores tipados inválidos fallan
//! con `ImproperlyConfigured`.
//!
//! Invariante de round-trip: aplicar los inicializadores dos veces produce
//! la misma configuración normalizada.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::errors::CoreError;
use crate::retry::RetrySettings;

/// Sección `[logging]`: directiva de filtro para el backend de tracing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    /// Directiva estilo env-filter (p. ej. "info", "siphon_core=debug").
    pub directive: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { directive: "info".to_string() }
    }
}

/// Configuración completa del cliente.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Settings {
    pub retry: RetrySettings,
    pub logging: LoggingSettings,
    /// Identificadores opacos de factories de protocolo a ejecutar.
    pub etl_protocols: Vec<String>,
    /// Identificadores de inicializadores adicionales a aplicar.
    pub settings_initializers: Vec<String>,
    /// Override del tamaño del pool de workflows. `None` = min(32, draws).
    pub max_concurrent_workflows: Option<usize>,
    /// Secciones específicas de cada protocolo, opacas para el núcleo.
    pub protocols: BTreeMap<String, serde_json::Value>,
    /// Claves de nivel superior no reconocidas (se reportan con warning).
    #[serde(flatten)]
    pub unknown: BTreeMap<String, serde_json::Value>,
}

impl Settings {
    /// Valida todos los valores tipados. Se invoca antes de ejecutar
    /// cualquier workflow.
    pub fn validate(&self) -> Result<(), CoreError> {
        self.retry.validate()?;
        if self.logging.directive.trim().is_empty() {
            return Err(CoreError::improperly_configured("logging.directive no puede estar vacío"));
        }
        if let Some(limit) = self.max_concurrent_workflows {
            if limit == 0 {
                return Err(CoreError::improperly_configured("max_concurrent_workflows debe ser >= 1"));
            }
        }
        Ok(())
    }

    /// Claves de nivel superior que el núcleo no reconoce.
    pub fn unknown_keys(&self) -> Vec<&str> {
        self.unknown.keys().map(String::as_str).collect()
    }

    /// Sección opaca de un protocolo, si fue declarada.
    pub fn protocol_section(&self, protocol_id: &str) -> Option<&serde_json::Value> {
        self.protocols.get(protocol_id)
    }
}

/// Tarea de inicialización ligada a una clave de configuración.
///
/// Un inicializador valida y/o normaliza el valor de su clave. Se ejecutan
/// una sola vez, en orden, como parte del bootstrap del cliente; deben ser
/// idempotentes (aplicarlos de nuevo no cambia la configuración).
pub trait SettingInitializer: Send + Sync {
    /// Clave de configuración que este inicializador atiende.
    fn setting(&self) -> &str;

    /// Aplica la inicialización y devuelve la configuración normalizada.
    fn execute(&self, settings: Settings) -> Result<Settings, CoreError>;
}

/// Valida la sección `[retry]` completa.
#[derive(Debug, Default)]
pub struct RetrySettingsInitializer;

impl SettingInitializer for RetrySettingsInitializer {
    fn setting(&self) -> &str {
        "retry"
    }

    fn execute(&self, settings: Settings) -> Result<Settings, CoreError> {
        settings.retry.validate()?;
        Ok(settings)
    }
}

/// Normaliza la sección `[logging]`: recorta la directiva y aplica el
/// default cuando quedó vacía.
#[derive(Debug, Default)]
pub struct LoggingSettingsInitializer;

impl SettingInitializer for LoggingSettingsInitializer {
    fn setting(&self) -> &str {
        "logging"
    }

    fn execute(&self, mut settings: Settings) -> Result<Settings, CoreError> {
        let directive = settings.logging.directive.trim().to_string();
        settings.logging.directive = if directive.is_empty() {
            LoggingSettings::default().directive
        } else {
            directive
        };
        Ok(settings)
    }
}

/// Inicializadores que el cliente aplica siempre, en este orden.
pub fn builtin_initializers() -> Vec<Arc<dyn SettingInitializer>> {
    vec![Arc::new(LoggingSettingsInitializer) as Arc<dyn SettingInitializer>,
         Arc::new(RetrySettingsInitializer) as Arc<dyn SettingInitializer>]
}

/// Resuelve un inicializador adicional por su identificador de
/// configuración.
pub fn resolve_initializer(id: &str) -> Option<Arc<dyn SettingInitializer>> {
    match id {
        "retry" => Some(Arc::new(RetrySettingsInitializer)),
        "logging" => Some(Arc::new(LoggingSettingsInitializer)),
        _ => None,
    }
}

/// Aplica los inicializadores en orden y devuelve la configuración
/// normalizada.
pub fn apply_initializers(settings: Settings,
                          initializers: &[Arc<dyn SettingInitializer>])
                          -> Result<Settings, CoreError> {
    let mut current = settings;
    for initializer in initializers {
        tracing::debug!(setting = initializer.setting(), "aplicando setting initializer");
        current = initializer.execute(current)?;
    }
    Ok(current)
}
