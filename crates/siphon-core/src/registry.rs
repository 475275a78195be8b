//! Resolución de factories de protocolo por identificador opaco.
//!
//! El núcleo nunca interpreta los identificadores: los recibe de la
//! configuración (`etl_protocols`) y los resuelve contra este registro. El
//! registro estático se llena durante el bootstrap y queda inmutable después
//! (sin globals mutables).

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::context::AppContext;
use crate::errors::CoreError;
use crate::protocol::EtlProtocol;

/// Factory de protocolos: puede devolver uno o varios por invocación.
/// El runner la invoca a lo sumo una vez por `run`.
pub type ProtocolFactory = Arc<dyn Fn(&AppContext) -> Result<Vec<EtlProtocol>, CoreError> + Send + Sync>;

/// Registro de factories de protocolo.
pub trait ProtocolRegistry: Send + Sync {
    /// Resuelve el identificador opaco a una factory, si existe.
    fn resolve(&self, id: &str) -> Option<ProtocolFactory>;

    /// Identificadores registrados, en orden estable.
    fn ids(&self) -> Vec<String>;
}

/// Registro estático en memoria. Se llena en el bootstrap y no cambia
/// durante el `run`.
#[derive(Default)]
pub struct StaticProtocolRegistry {
    inner: BTreeMap<String, ProtocolFactory>,
}

impl StaticProtocolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra una factory. Ante un id duplicado gana el primer registro y
    /// se loguea un warning (misma política que los ids de draws).
    pub fn register(&mut self, id: impl Into<String>, factory: ProtocolFactory) {
        let id = id.into();
        if self.inner.contains_key(&id) {
            tracing::warn!(factory_id = %id, "factory de protocolo duplicada; se conserva la primera");
            return;
        }
        self.inner.insert(id, factory);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl ProtocolRegistry for StaticProtocolRegistry {
    fn resolve(&self, id: &str) -> Option<ProtocolFactory> {
        self.inner.get(id).cloned()
    }

    fn ids(&self) -> Vec<String> {
        self.inner.keys().cloned().collect()
    }
}
