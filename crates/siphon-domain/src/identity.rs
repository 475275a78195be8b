//! Contratos de identidad de los objetos de dominio.
//!
//! Reglas clave:
//! - `Identifiable::id` es no vacío y estable durante toda la vida del objeto.
//! - `Named` añade un nombre legible (no vacío) y una descripción opcional.
//!
//! Los structs concretos implementan estos traits mediante las macros
//! `impl_identifiable!` / `impl_named!` para evitar boilerplate repetido.

/// Objeto de dominio con identidad estable.
pub trait Identifiable {
    /// Id no vacío, estable durante la vida del objeto.
    fn id(&self) -> &str;
}

/// Objeto de dominio con nombre legible además de identidad.
pub trait Named: Identifiable {
    fn name(&self) -> &str;

    /// Descripción opcional orientada a humanos.
    fn description(&self) -> Option<&str> {
        None
    }
}

/// Implementa `Identifiable` para un struct con campo `id: String`.
#[macro_export]
macro_rules! impl_identifiable {
    ($ty:ty) => {
        impl $crate::identity::Identifiable for $ty {
            fn id(&self) -> &str {
                &self.id
            }
        }
    };
}

/// Implementa `Identifiable` + `Named` para un struct con campos
/// `id: String`, `name: String` y `description: Option<String>`.
#[macro_export]
macro_rules! impl_named {
    ($ty:ty) => {
        $crate::impl_identifiable!($ty);

        impl $crate::identity::Named for $ty {
            fn name(&self) -> &str {
                &self.name
            }

            fn description(&self) -> Option<&str> {
                self.description.as_deref()
            }
        }
    };
}

/// Valida que un id/nombre no sea vacío (tras recortar espacios).
pub(crate) fn require_non_empty(value: &str, what: &str) -> Result<(), crate::DomainError> {
    if value.trim().is_empty() {
        return Err(crate::DomainError::validation(format!("{what} no puede estar vacío")));
    }
    Ok(())
}
