//! Visible sprites and the order-preserving sprite registry.
//!
//! The registry's invariant: it is always sorted by the effective draw key,
//! and every insert or remove preserves sortedness. The key is computed once
//! per insert; a sprite whose position or priority changes is removed and
//! reinserted. Iteration order is draw order. n is small and bounded, so the
//! O(n) sorted-vec insert is the right trade.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::ids::{ImageId, SpriteId, ZoneId};

bitflags! {
    /// Per-sprite behavior bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct SpriteFlags: u16 {
        /// Draw order comes from the explicit priority, not effective y.
        const FIXED_PRIORITY = 0x0001;
        /// Image is mirrored horizontally.
        const MIRRORED = 0x0002;
        /// Image is flipped vertically.
        const FLIPPED = 0x0004;
        /// Skipped by the compositor but still animated.
        const HIDDEN = 0x0008;
    }
}

/// One visible animation object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleSprite {
    /// Sprite id, unique within its zone.
    pub id: SpriteId,
    /// Owning zone.
    pub zone: ZoneId,
    /// Left edge in surface coordinates.
    pub x: i16,
    /// Top edge in surface coordinates.
    pub y: i16,
    /// Image width in pixels.
    pub width: u16,
    /// Image height in pixels.
    pub height: u16,
    /// Explicit draw priority, used while `FIXED_PRIORITY` is set.
    pub priority: i16,
    /// Current image handle.
    pub image: ImageId,
    /// Behavior bits.
    pub flags: SpriteFlags,
}

impl VisibleSprite {
    /// A fresh sprite at the origin with no image.
    pub fn new(id: SpriteId, zone: ZoneId) -> Self {
        Self {
            id,
            zone,
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            priority: 0,
            image: ImageId::new(0),
            flags: SpriteFlags::empty(),
        }
    }

    /// The key the registry sorts by: explicit priority when pinned,
    /// otherwise the bottom edge (effective y).
    #[inline]
    pub fn draw_key(&self) -> i16 {
        if self.flags.contains(SpriteFlags::FIXED_PRIORITY) {
            self.priority
        } else {
            self.y.saturating_add(self.height as i16)
        }
    }
}

/// The ordered collection of visible sprites.
#[derive(Debug, Clone, Default)]
pub struct SpriteRegistry {
    sprites: Vec<VisibleSprite>,
}

impl SpriteRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered sprites.
    #[inline]
    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    /// Whether the registry is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    /// Insert a sprite at its sorted position. An existing sprite with the
    /// same id and zone is replaced. Equal keys keep insertion order.
    pub fn insert(&mut self, sprite: VisibleSprite) {
        self.remove(sprite.id, sprite.zone);
        let key = sprite.draw_key();
        let at = self.sprites.partition_point(|s| s.draw_key() <= key);
        self.sprites.insert(at, sprite);
    }

    /// Find a sprite by id and zone.
    pub fn find(&self, id: SpriteId, zone: ZoneId) -> Option<&VisibleSprite> {
        self.sprites.iter().find(|s| s.id == id && s.zone == zone)
    }

    /// Remove a sprite, returning it if it was registered.
    pub fn remove(&mut self, id: SpriteId, zone: ZoneId) -> Option<VisibleSprite> {
        let at = self
            .sprites
            .iter()
            .position(|s| s.id == id && s.zone == zone)?;
        Some(self.sprites.remove(at))
    }

    /// Mutate a sprite through `f`, then restore sortedness by remove and
    /// reinsert. A reference to an unregistered sprite is a no-op and
    /// reports `false`.
    pub fn update<F>(&mut self, id: SpriteId, zone: ZoneId, f: F) -> bool
    where
        F: FnOnce(&mut VisibleSprite),
    {
        let Some(mut sprite) = self.remove(id, zone) else {
            return false;
        };
        f(&mut sprite);
        self.insert(sprite);
        true
    }

    /// Iterate in draw order.
    pub fn iter(&self) -> impl Iterator<Item = &VisibleSprite> {
        self.sprites.iter()
    }

    /// Drop every sprite not accepted by `keep`.
    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&VisibleSprite) -> bool,
    {
        self.sprites.retain(keep);
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.sprites.clear();
    }

    /// Whether the draw-key invariant currently holds.
    pub fn is_sorted(&self) -> bool {
        self.sprites.windows(2).all(|w| w[0].draw_key() <= w[1].draw_key())
    }
}
