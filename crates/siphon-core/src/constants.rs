//! Constantes del núcleo de orquestación.
//!
//! Este módulo agrupa los defaults efectivos del motor de reintentos, el
//! content-type de referencia del transporte y los códigos de salida del
//! proceso. Los defaults de retry son los que aplican cuando la configuración
//! no los especifica; su validación vive en `retry::RetrySettings`.

/// Delay inicial entre reintentos, en segundos.
pub const DEFAULT_INITIAL_DELAY: f64 = 1.0;

/// Delay máximo entre reintentos, en segundos.
pub const DEFAULT_MAXIMUM_DELAY: f64 = 60.0;

/// Factor multiplicativo del backoff exponencial.
pub const DEFAULT_MULTIPLICATIVE_FACTOR: f64 = 2.0;

/// Deadline global de un bloque de reintentos, en segundos desde el primer
/// intento.
pub const DEFAULT_DEADLINE: f64 = 300.0;

/// Master switch de reintentos cuando la configuración no lo indica.
pub const DEFAULT_ENABLE_RETRIES: bool = true;

/// Content-type del payload de transporte de referencia (buffer Parquet).
/// El núcleo nunca inspecciona el buffer; sólo propaga este tag.
pub const PARQUET_CONTENT_TYPE: &str = "application/vnd.apache-parquet";

/// Cota superior por defecto del pool de workflows concurrentes. El tamaño
/// efectivo es `min(MAX_WORKFLOW_POOL, cantidad de draws)` salvo override por
/// configuración.
pub const MAX_WORKFLOW_POOL: usize = 32;

/// Código de salida: ejecución completa sin fallos.
pub const EXIT_SUCCESS: i32 = 0;

/// Código de salida: error de configuración antes de ejecutar workflows.
pub const EXIT_CONFIG_ERROR: i32 = 1;

/// Código de salida: al menos un workflow falló.
pub const EXIT_PARTIAL_FAILURE: i32 = 2;

/// Código de salida: cancelación cooperativa (128 + SIGINT).
pub const EXIT_CANCELLED: i32 = 130;
