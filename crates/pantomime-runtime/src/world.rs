//! The shared simulation world.
//!
//! One bundle of everything both interpreters mutate: the bytecode store,
//! global state, the sprite registry, the continuation queue and rendezvous
//! tables, the loaded-zone map, the frame surface, and the session tick
//! accumulator. Single-threaded by construction: only one interpreter step
//! runs at a time, so none of this is locked.

use log::{debug, warn};
use rustc_hash::FxHashMap;

use pantomime_core::{
    CodeOffset, CodeStore, EngineResult, GlobalState, ItemId, Palette, SpriteId, SpriteRegistry,
    Surface, SyncId, TitleConfig, ZoneId,
};

use crate::anim::{ContinuationQueue, LoopTable, SyncTable};
use crate::loader::ZoneSource;

/// The ambient verb/noun selection, set by the input layer and consumed by
/// the logic match test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    /// Selected verb.
    pub verb: i16,
    /// First selected noun.
    pub noun1: i16,
    /// Second selected noun.
    pub noun2: i16,
    /// The nouns are still selected from a previous dispatch; line patterns
    /// of −2 match only while this holds.
    pub carryover: bool,
    /// The input layer's pointer object, if any.
    pub pointer: Option<ItemId>,
}

/// Where a loaded zone's blobs sit in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneData {
    /// Base of the animation bytecode.
    pub code: CodeOffset,
    /// Bytecode length in bytes.
    pub code_len: u32,
    /// Base of the image blob.
    pub images: CodeOffset,
    /// Image blob length in bytes.
    pub images_len: u32,
}

/// Shared mutable state for one session.
#[derive(Debug)]
pub struct World {
    /// Per-title configuration and tables.
    pub config: TitleConfig,
    /// The two-region bytecode arena.
    pub store: CodeStore,
    /// Variables, flags and the item graph.
    pub state: GlobalState,
    /// Visible sprites in draw order.
    pub sprites: SpriteRegistry,
    /// Deferred resumptions.
    pub queue: ContinuationQueue,
    /// Rendezvous tables.
    pub syncs: SyncTable,
    /// Per-cursor loop counters.
    pub loops: LoopTable,
    /// Zones currently resident in the arena.
    pub zones: FxHashMap<ZoneId, ZoneData>,
    /// The frame surface.
    pub surface: Surface,
    /// The palette.
    pub palette: Palette,
    /// Ambient selection.
    pub selection: Selection,
    /// Session elapsed-tick accumulator.
    pub tick: u64,
}

impl World {
    /// Build a fresh world for one session.
    pub fn new(config: TitleConfig) -> Self {
        let store = CodeStore::with_capacity(config.arena_capacity);
        let state = GlobalState::new(
            config.variable_count,
            config.flag_count,
            config.item_count,
        );
        let surface = Surface::new(config.surface_width, config.surface_height);
        Self {
            config,
            store,
            state,
            sprites: SpriteRegistry::new(),
            queue: ContinuationQueue::new(),
            syncs: SyncTable::new(),
            loops: LoopTable::new(),
            zones: FxHashMap::default(),
            surface,
            palette: Palette::new(),
            selection: Selection::default(),
            tick: 0,
        }
    }

    /// A loaded zone's arena placement.
    #[inline]
    pub fn zone(&self, zone: ZoneId) -> Option<ZoneData> {
        self.zones.get(&zone).copied()
    }

    /// Make a zone resident, fetching its blobs on first reference. Reports
    /// whether the zone is available; an unknown zone is a logged no-op for
    /// the caller. Arena exhaustion is fatal.
    pub fn ensure_zone<Z: ZoneSource>(&mut self, src: &mut Z, zone: ZoneId) -> EngineResult<bool> {
        if self.zones.contains_key(&zone) {
            return Ok(true);
        }
        let Some(blobs) = src.zone(zone) else {
            warn!("reference to unknown {zone} ignored");
            return Ok(false);
        };
        debug!(
            "loading {zone}: {} code bytes, {} image bytes",
            blobs.code.len(),
            blobs.images.len()
        );
        let code = self.store.install(&blobs.code)?;
        let images = self.store.install(&blobs.images)?;
        self.zones.insert(
            zone,
            ZoneData {
                code,
                code_len: blobs.code.len() as u32,
                images,
                images_len: blobs.images.len() as u32,
            },
        );
        Ok(true)
    }

    /// Broadcast a rendezvous id at the current tick.
    pub fn signal(&mut self, id: SyncId) -> usize {
        self.syncs.signal(id, &mut self.queue, self.tick)
    }

    /// Broadcast a sprite's termination to its end-waiters.
    pub fn signal_end(&mut self, zone: ZoneId, sprite: SpriteId) -> usize {
        self.syncs
            .signal_end(zone, sprite, &mut self.queue, self.tick)
    }

    /// Drop every pending entry for a sprite's cursor (continuations,
    /// rendezvous waits, loop frames) without touching the registry. Used
    /// when a sprite's animation is halted or started over.
    pub fn purge_cursor(&mut self, zone: ZoneId, sprite: SpriteId) {
        self.queue.purge_sprite(zone, sprite);
        self.syncs.purge_sprite(zone, sprite);
        self.loops.clear_cursor(zone, sprite);
    }

    /// Halt a sprite: remove it from the registry and purge every
    /// continuation, rendezvous entry and loop stack referencing it, so no
    /// cursor for it can ever resume. Halting an unregistered sprite still
    /// purges; both halves are no-ops when nothing matches.
    pub fn halt_sprite(&mut self, zone: ZoneId, sprite: SpriteId) {
        if self.sprites.remove(sprite, zone).is_none() {
            warn!("halt of unregistered {sprite} in {zone}");
        }
        self.purge_cursor(zone, sprite);
    }

    /// The global reset: atomically clear the sprite registry, continuation
    /// queue, rendezvous tables and loop stacks, sparing the configured
    /// persistent sprite set.
    pub fn reset_animation(&mut self) {
        let keep = std::mem::take(&mut self.config.persistent_sprites);
        self.sprites.retain(|s| keep.contains(&s.id));
        self.queue.retain(|c| keep.contains(&c.cursor.sprite));
        self.syncs.retain_cursor(|c| keep.contains(&c.sprite));
        self.loops.retain(|_, sprite| keep.contains(&sprite));
        self.config.persistent_sprites = keep;
    }
}
