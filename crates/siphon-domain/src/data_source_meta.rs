//! Fuente lógica de datos y su mapping de draws.
//!
//! Una `DataSourceMeta` declara una fuente operacional (p. ej. una base de
//! datos local) y es dueña del mapping `draw_id → DrawMeta`. Invariante:
//! cada `DrawMeta` contenido referencia a esta fuente y a ninguna otra; la
//! violación se rechaza en el momento de inserción.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::identity::require_non_empty;
use crate::{DomainError, DrawMeta};

/// Metadato de una fuente lógica de datos.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataSourceMeta {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    /// Draws de esta fuente, keyed por id de draw y en orden de inserción.
    draws: IndexMap<String, DrawMeta>,
}

impl DataSourceMeta {
    /// Crea una fuente sin draws, validando id y nombre no vacíos.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        let name = name.into();
        require_non_empty(&id, "el id de una fuente")?;
        require_non_empty(&name, "el nombre de una fuente")?;
        Ok(Self { id,
                  name,
                  description: None,
                  draws: IndexMap::new() })
    }

    /// Crea una nueva instancia con descripción modificada.
    pub fn with_description(&self, description: impl Into<String>) -> Self {
        let mut new_source = self.clone();
        new_source.description = Some(description.into());
        new_source
    }

    /// Agrega un draw a la fuente, creando una nueva instancia.
    ///
    /// # Errores
    /// Retorna `DomainError::ValidationError` si el draw referencia a otra
    /// fuente o si ya existe un draw con el mismo id.
    pub fn add_draw(&self, draw: DrawMeta) -> Result<Self, DomainError> {
        if draw.data_source_id() != self.id {
            return Err(DomainError::validation(format!("el draw '{}' pertenece a la fuente '{}', no a '{}'",
                                                       draw.id,
                                                       draw.data_source_id(),
                                                       self.id)));
        }
        if self.draws.contains_key(&draw.id) {
            return Err(DomainError::validation(format!("draw duplicado en la fuente '{}': {}", self.id, draw.id)));
        }

        let mut new_source = self.clone();
        new_source.draws.insert(draw.id.clone(), draw);
        Ok(new_source)
    }

    /// Mapping `draw_id → DrawMeta` en orden de inserción.
    pub fn draws(&self) -> &IndexMap<String, DrawMeta> {
        &self.draws
    }

    /// Busca un draw por id.
    pub fn draw(&self, draw_id: &str) -> Option<&DrawMeta> {
        self.draws.get(draw_id)
    }

    /// Cantidad de draws declarados en esta fuente.
    pub fn draw_count(&self) -> usize {
        self.draws.len()
    }
}

crate::impl_named!(DataSourceMeta);
