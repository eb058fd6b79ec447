//! Interface to the external raster/texture provider.
//!
//! Fetches are fire-and-forget: the stack hands the provider a
//! [`FetchResponder`], and whenever the provider calls
//! [`respond`](FetchResponder::respond) the result is queued for the stack's
//! next `tick`. A responder that is dropped without responding leaves the
//! fetch unresolved forever.

use std::cell::RefCell;
use std::rc::Rc;

use crossbeam_channel::Sender;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;
use trek_geo::BoundingBox;

/// Everything the provider needs to produce a texture.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainProductMetadata {
    /// Catalog product id.
    pub product_id: String,
    /// Area the texture must cover.
    pub bbox: BoundingBox,
    /// Requested width in pixels.
    pub width: u32,
    /// Requested height in pixels.
    pub height: u32,
}

/// Opaque handle to a texture owned by the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub u64);

/// A fetched texture plus the catalog details of its product.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    /// The uploaded texture.
    pub texture: TextureId,
    /// Product display name.
    pub display_name: String,
    /// Product thumbnail reference.
    pub thumbnail: Option<String>,
}

/// Why a fetch failed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FetchError {
    /// The catalog has no product with this id.
    #[error("product `{0}` not found")]
    NotFound(String),
    /// Transport or decoding failure inside the provider.
    #[error("texture provider failed: {0}")]
    Provider(String),
}

/// Identifies one outstanding fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FetchTicket(pub(crate) u64);

pub(crate) struct FetchCompletion {
    pub(crate) ticket: FetchTicket,
    pub(crate) result: Result<Raster, FetchError>,
}

/// One-shot channel back to the layer stack that issued a fetch.
///
/// `Send`, so providers may resolve fetches from their own threads.
pub struct FetchResponder {
    ticket: FetchTicket,
    sender: Sender<FetchCompletion>,
}

impl FetchResponder {
    pub(crate) fn new(ticket: FetchTicket, sender: Sender<FetchCompletion>) -> Self {
        Self { ticket, sender }
    }

    /// The fetch this responder answers.
    pub fn ticket(&self) -> FetchTicket {
        self.ticket
    }

    /// Deliver the result. Ignored if the stack has already been dropped.
    pub fn respond(self, result: Result<Raster, FetchError>) {
        let _ = self.sender.send(FetchCompletion {
            ticket: self.ticket,
            result,
        });
    }
}

/// Source of layer textures, keyed by [`TerrainProductMetadata`].
pub trait TextureProvider {
    /// Start fetching the texture described by `metadata`.
    fn fetch_texture(&mut self, metadata: &TerrainProductMetadata, responder: FetchResponder);
}

#[derive(Default)]
struct MemoryProviderState {
    requests: Vec<TerrainProductMetadata>,
    deferred: bool,
    held: Vec<(TerrainProductMetadata, FetchResponder)>,
    missing: FxHashSet<String>,
    cache: FxHashMap<String, TextureId>,
    next_texture: u64,
}

impl MemoryProviderState {
    fn resolve(&mut self, metadata: &TerrainProductMetadata) -> Result<Raster, FetchError> {
        if self.missing.contains(&metadata.product_id) {
            return Err(FetchError::NotFound(metadata.product_id.clone()));
        }
        let key = format!(
            "{}|{}|{}x{}",
            metadata.product_id, metadata.bbox, metadata.width, metadata.height
        );
        let next = &mut self.next_texture;
        let texture = *self.cache.entry(key).or_insert_with(|| {
            *next += 1;
            TextureId(*next)
        });
        Ok(Raster {
            texture,
            display_name: format!("Product {}", metadata.product_id),
            thumbnail: None,
        })
    }
}

/// In-process provider that synthesizes texture handles.
///
/// Identical requests return the same [`TextureId`]. Clones share state, so a
/// caller can keep one handle for inspection after boxing another into a stack.
/// In deferred mode responses are held until [`release_all`](Self::release_all).
#[derive(Clone, Default)]
pub struct MemoryTextureProvider {
    state: Rc<RefCell<MemoryProviderState>>,
}

impl MemoryTextureProvider {
    /// Provider that answers every fetch immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider that holds every fetch until released.
    pub fn deferred() -> Self {
        let provider = Self::default();
        provider.state.borrow_mut().deferred = true;
        provider
    }

    /// Make every future fetch of `product_id` fail with [`FetchError::NotFound`].
    pub fn mark_missing(&self, product_id: &str) {
        self.state.borrow_mut().missing.insert(product_id.to_string());
    }

    /// All fetches received so far, in order.
    pub fn requests(&self) -> Vec<TerrainProductMetadata> {
        self.state.borrow().requests.clone()
    }

    /// Number of fetches waiting for release in deferred mode.
    pub fn held_count(&self) -> usize {
        self.state.borrow().held.len()
    }

    /// Answer every held fetch. Returns how many were released.
    pub fn release_all(&self) -> usize {
        let held = std::mem::take(&mut self.state.borrow_mut().held);
        let count = held.len();
        for (metadata, responder) in held {
            let result = self.state.borrow_mut().resolve(&metadata);
            responder.respond(result);
        }
        count
    }

    /// Answer only the most recent held fetch (last in, first out).
    pub fn release_last(&self) -> bool {
        let entry = self.state.borrow_mut().held.pop();
        match entry {
            Some((metadata, responder)) => {
                let result = self.state.borrow_mut().resolve(&metadata);
                responder.respond(result);
                true
            }
            None => false,
        }
    }
}

impl TextureProvider for MemoryTextureProvider {
    fn fetch_texture(&mut self, metadata: &TerrainProductMetadata, responder: FetchResponder) {
        let mut state = self.state.borrow_mut();
        state.requests.push(metadata.clone());
        if state.deferred {
            state.held.push((metadata.clone(), responder));
        } else {
            let result = state.resolve(metadata);
            drop(state);
            responder.respond(result);
        }
    }
}
