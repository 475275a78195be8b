//! Endpoint remoto hacia el que se drenan los datos transformados.

use serde::{Deserialize, Serialize};

use crate::identity::require_non_empty;
use crate::DomainError;

/// Metadato de un sink remoto direccionable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataSinkMeta {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    /// Dirección del endpoint (URL u otro localizador que el driver entienda).
    address: String,
    /// Tag de dialecto del sink (p. ej. "http-api-v1").
    dialect: String,
}

impl DataSinkMeta {
    /// Crea un `DataSinkMeta` validando campos no vacíos.
    pub fn new(id: impl Into<String>,
               name: impl Into<String>,
               address: impl Into<String>,
               dialect: impl Into<String>)
               -> Result<Self, DomainError> {
        let id = id.into();
        let name = name.into();
        let address = address.into();
        let dialect = dialect.into();
        require_non_empty(&id, "el id de un sink")?;
        require_non_empty(&name, "el nombre de un sink")?;
        require_non_empty(&address, "la dirección de un sink")?;
        require_non_empty(&dialect, "el dialecto de un sink")?;
        Ok(Self { id,
                  name,
                  description: None,
                  address,
                  dialect })
    }

    /// Crea una nueva instancia con descripción modificada.
    pub fn with_description(&self, description: impl Into<String>) -> Self {
        let mut new_sink = self.clone();
        new_sink.description = Some(description.into());
        new_sink
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn dialect(&self) -> &str {
        &self.dialect
    }
}

crate::impl_named!(DataSinkMeta);
