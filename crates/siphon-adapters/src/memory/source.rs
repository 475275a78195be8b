//! Fuente en memoria: chunks precargados por draw, sin IO externo.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use siphon_core::{CoreError, DataSource, Disposable, DisposedFlag, DrawStream};
use siphon_domain::{DrawMeta, Identifiable, Progress, RawData};

/// Fuente determinista: cada draw tiene su lista de chunks precargada.
pub struct InMemoryDataSource {
    id: String,
    name: String,
    description: Option<String>,
    chunks_by_draw: HashMap<String, Vec<Vec<u8>>>,
    /// Streams emitidos, retenidos para poder asertar su disposal en tests.
    issued: Mutex<Vec<Arc<InMemoryDrawStream>>>,
    disposed: DisposedFlag,
}

impl InMemoryDataSource {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(),
               name: name.into(),
               description: None,
               chunks_by_draw: HashMap::new(),
               issued: Mutex::new(Vec::new()),
               disposed: DisposedFlag::new() }
    }

    /// Precarga los chunks de un draw.
    pub fn with_draw_chunks(mut self, draw_id: impl Into<String>, chunks: Vec<Vec<u8>>) -> Self {
        self.chunks_by_draw.insert(draw_id.into(), chunks);
        self
    }

    /// True si todos los draw streams emitidos ya fueron liberados.
    pub fn all_streams_disposed(&self) -> bool {
        self.issued
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .all(|s| s.is_disposed())
    }
}

siphon_domain::impl_named!(InMemoryDataSource);

impl Disposable for InMemoryDataSource {
    fn is_disposed(&self) -> bool {
        self.disposed.is_disposed()
    }

    fn dispose(&self) -> Result<(), CoreError> {
        self.disposed.mark();
        Ok(())
    }
}

#[async_trait]
impl DataSource for InMemoryDataSource {
    async fn start_draw(&self, draw: &DrawMeta) -> Result<Arc<dyn DrawStream>, CoreError> {
        self.disposed.guard(&format!("data source '{}'", self.id))?;
        let chunks = self.chunks_by_draw
                         .get(draw.id())
                         .cloned()
                         .ok_or_else(|| CoreError::permanent(format!("la fuente '{}' no conoce el draw '{}'",
                                                                     self.id,
                                                                     draw.id())))?;
        let stream = Arc::new(InMemoryDrawStream::new(draw.id(), chunks));
        self.issued
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(stream.clone());
        Ok(stream)
    }
}

struct DrawState {
    remaining: VecDeque<Vec<u8>>,
    produced: u64,
}

/// Stream perezoso y no reiniciable sobre una lista de chunks en memoria.
pub struct InMemoryDrawStream {
    draw_id: String,
    total: usize,
    state: Mutex<DrawState>,
    disposed: DisposedFlag,
}

impl InMemoryDrawStream {
    fn new(draw_id: impl Into<String>, chunks: Vec<Vec<u8>>) -> Self {
        let total = chunks.len();
        Self { draw_id: draw_id.into(),
               total,
               state: Mutex::new(DrawState { remaining: chunks.into(),
                                             produced: 0 }),
               disposed: DisposedFlag::new() }
    }
}

impl Disposable for InMemoryDrawStream {
    fn is_disposed(&self) -> bool {
        self.disposed.is_disposed()
    }

    fn dispose(&self) -> Result<(), CoreError> {
        if self.disposed.mark() {
            // Liberar los chunks restantes; el stream no vuelve a producir.
            self.state
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .remaining
                .clear();
        }
        Ok(())
    }
}

#[async_trait]
impl DrawStream for InMemoryDrawStream {
    async fn draw(&self) -> Result<Option<(RawData, Progress)>, CoreError> {
        self.disposed.guard(&format!("draw stream '{}'", self.draw_id))?;
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let Some(bytes) = state.remaining.pop_front() else {
            return Ok(None);
        };
        let index = state.produced;
        state.produced += 1;
        let progress = Progress::new(state.produced as f64 / self.total as f64)?;
        Ok(Some((RawData::new(index, bytes), progress)))
    }
}
