//! Especificación opaca de una extracción (draw).
//!
//! Un `DrawMeta` describe qué extraer de una fuente: típicamente una query
//! SQL más hints de ejecución, pero el contenido es opaco para el núcleo (el
//! coordinador lo suministra y el driver lo interpreta). Referencia a su
//! `DataSourceMeta` padre por id, nunca por ownership (sin ciclos).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identity::require_non_empty;
use crate::DomainError;

/// Metadato de una extracción individual dentro de una fuente.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrawMeta {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    /// Id de la `DataSourceMeta` a la que pertenece este draw.
    data_source_id: String,
    /// Especificación opaca (p. ej. texto SQL + hints). El núcleo nunca la
    /// interpreta.
    payload: Value,
}

impl DrawMeta {
    /// Crea un `DrawMeta` validando ids y nombre no vacíos.
    pub fn new(id: impl Into<String>,
               name: impl Into<String>,
               data_source_id: impl Into<String>,
               payload: Value)
               -> Result<Self, DomainError> {
        let id = id.into();
        let name = name.into();
        let data_source_id = data_source_id.into();
        require_non_empty(&id, "el id de un draw")?;
        require_non_empty(&name, "el nombre de un draw")?;
        require_non_empty(&data_source_id, "el id de la fuente de un draw")?;
        Ok(Self { id,
                  name,
                  description: None,
                  data_source_id,
                  payload })
    }

    /// Crea una nueva instancia con descripción modificada.
    pub fn with_description(&self, description: impl Into<String>) -> Self {
        let mut new_draw = self.clone();
        new_draw.description = Some(description.into());
        new_draw
    }

    /// Id de la fuente a la que este draw pertenece.
    pub fn data_source_id(&self) -> &str {
        &self.data_source_id
    }

    /// Especificación opaca suministrada por el coordinador.
    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

crate::impl_named!(DrawMeta);
