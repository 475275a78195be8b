//! Bootstrap del binario: configuración, logging e inicializadores.
//!
//! El núcleo define la forma tipada de la configuración; acá vive el
//! parsing del archivo TOML, el arranque del backend de tracing y la
//! aplicación de los setting initializers (una sola vez, antes de ejecutar
//! cualquier workflow).

use std::path::Path;
use tracing_subscriber::EnvFilter;

use siphon_core::{apply_initializers, builtin_initializers, resolve_initializer, CoreError, LoggingSettings, Settings};

/// Carga la configuración desde el archivo TOML, o los defaults si no se
/// indicó ruta.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, CoreError> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| CoreError::improperly_configured(format!("no se pudo leer '{}': {e}", path.display())))?;
    toml::from_str(&text)
        .map_err(|e| CoreError::improperly_configured(format!("configuración inválida en '{}': {e}", path.display())))
}

/// Inicializa el backend de tracing hacia stderr. La verbosidad de CLI
/// pisa la directiva del archivo (0 = configuración, 1 = debug, 2+ = trace).
pub fn init_tracing(verbosity: u8, logging: &LoggingSettings) {
    let directive = match verbosity {
        0 => logging.directive.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Reporta con warning las claves de nivel superior no reconocidas.
pub fn warn_unknown_keys(settings: &Settings) {
    for key in settings.unknown_keys() {
        tracing::warn!(key, "clave de configuración desconocida; se ignora");
    }
}

/// Aplica los inicializadores built-in más los declarados en
/// `settings_initializers`, en orden.
pub fn initialize(settings: Settings) -> Result<Settings, CoreError> {
    let mut initializers = builtin_initializers();
    for id in &settings.settings_initializers {
        let initializer = resolve_initializer(id)
            .ok_or_else(|| CoreError::improperly_configured(format!("setting initializer desconocido: '{id}'")))?;
        initializers.push(initializer);
    }
    apply_initializers(settings, &initializers)
}
