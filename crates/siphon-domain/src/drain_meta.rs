//! Manifiesto de transporte de un upload (drain).
//!
//! Un `DrainMeta` existe sólo durante el tránsito de una extracción: lo acuña
//! una `DrainMetaFactory` antes de abrir los drain streams y se entrega a los
//! consumidores de metadatos al completar el upload, para que el servidor
//! pueda reconciliar lo recibido.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::require_non_empty;
use crate::DomainError;

/// Manifiesto de un upload en curso. Referencia al draw de origen y declara
/// el content-type MIME del payload transformado.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrainMeta {
    pub(crate) id: String,
    /// Id del `DrawMeta` que originó este upload.
    draw_id: String,
    /// Content-type MIME de los chunks transformados.
    content_type: String,
    /// Instante de acuñación (metadato; no participa en reconciliación).
    started_at: DateTime<Utc>,
}

impl DrainMeta {
    /// Crea un `DrainMeta` validando campos no vacíos. Pensado para ser
    /// invocado únicamente desde una `DrainMetaFactory`.
    pub fn new(id: impl Into<String>,
               draw_id: impl Into<String>,
               content_type: impl Into<String>)
               -> Result<Self, DomainError> {
        let id = id.into();
        let draw_id = draw_id.into();
        let content_type = content_type.into();
        require_non_empty(&id, "el id de un drain")?;
        require_non_empty(&draw_id, "el id del draw de un drain")?;
        require_non_empty(&content_type, "el content-type de un drain")?;
        Ok(Self { id,
                  draw_id,
                  content_type,
                  started_at: Utc::now() })
    }

    pub fn draw_id(&self) -> &str {
        &self.draw_id
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

crate::impl_identifiable!(DrainMeta);
