//! The drawing pipeline behind the animation interpreter's drawing opcodes.
//!
//! An image blob holds a directory (`count:u16`, then `count` big-endian u32
//! descriptor offsets) followed by descriptors: `width:u16 height:u16
//! attr:u8 pad:u8 data`. Data is raw rows or run-length pairs depending on
//! the descriptor attr. Decoding expands into bump-allocated scratch storage
//! that the caller resets once the pixels are on the surface; mirror/flip
//! transforms are applied during expansion.
//!
//! Malformed image data is a logged no-op; the sprite simply does not draw.
//! Only *opcode* streams get the fatal malformed treatment; image blobs are
//! consumed defensively because their ids flow through shared variables.

use bumpalo::Bump;
use log::warn;

use pantomime_core::{CodeStore, ImageId, Surface, VisibleSprite, SpriteFlags};

use crate::world::ZoneData;

/// Descriptor attr bit: data is run-length pairs.
pub const IMG_RLE: u8 = 0x01;

/// A decoded image descriptor header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    /// Width in pixels.
    pub width: u16,
    /// Height in pixels.
    pub height: u16,
    /// Descriptor attr bits.
    pub attr: u8,
}

/// Decode an image's header and payload from a zone blob.
pub fn descriptor<'a>(
    store: &'a CodeStore,
    zone: ZoneData,
    image: ImageId,
) -> Option<(ImageHeader, &'a [u8])> {
    let blob = store.slice(zone.images, zone.images_len as usize).ok()?;
    let mut r = pantomime_core::StreamReader::over(blob);
    let count = r.read_u16().ok()?;
    if image.index() >= count {
        warn!("reference to unknown {image} ignored");
        return None;
    }
    r.skip(4 * image.index() as usize).ok()?;
    let start = r.read_u32().ok()? as usize;
    if start + 6 > blob.len() {
        warn!("{image} descriptor out of range");
        return None;
    }
    let header = ImageHeader {
        width: u16::from_be_bytes([blob[start], blob[start + 1]]),
        height: u16::from_be_bytes([blob[start + 2], blob[start + 3]]),
        attr: blob[start + 4],
    };
    Some((header, &blob[start + 6..]))
}

/// An image's size, used to keep sprite records in step with their image
/// handle (the draw key depends on height).
pub fn image_size(store: &CodeStore, zone: ZoneData, image: ImageId) -> Option<(u16, u16)> {
    descriptor(store, zone, image).map(|(h, _)| (h.width, h.height))
}

/// Expand a descriptor's payload into scratch storage, applying the mirror
/// and flip transforms. Returns `None` (logged) if the payload is short.
pub fn expand<'b>(
    scratch: &'b Bump,
    header: ImageHeader,
    data: &[u8],
    mirror: bool,
    flip: bool,
) -> Option<&'b [u8]> {
    let w = header.width as usize;
    let h = header.height as usize;
    let out = scratch.alloc_slice_fill_copy(w * h, 0u8);

    if header.attr & IMG_RLE != 0 {
        let mut filled = 0;
        let mut at = 0;
        while filled < out.len() {
            if at + 2 > data.len() {
                warn!("run-length image payload ends early");
                return None;
            }
            let run = data[at] as usize;
            let value = data[at + 1];
            at += 2;
            let end = (filled + run).min(out.len());
            out[filled..end].fill(value);
            filled = end;
        }
    } else {
        if data.len() < out.len() {
            warn!("raw image payload ends early");
            return None;
        }
        out.copy_from_slice(&data[..out.len()]);
    }

    if mirror {
        for row in out.chunks_exact_mut(w.max(1)) {
            row.reverse();
        }
    }
    if flip {
        let rows = h;
        for row in 0..rows / 2 {
            let (a, b) = out.split_at_mut((rows - 1 - row) * w);
            a[row * w..row * w + w].swap_with_slice(&mut b[..w]);
        }
    }
    Some(out)
}

/// Composite one sprite's current image onto the surface.
pub fn render_sprite(
    store: &CodeStore,
    zone: ZoneData,
    surface: &mut Surface,
    scratch: &Bump,
    sprite: &VisibleSprite,
) {
    let Some((header, data)) = descriptor(store, zone, sprite.image) else {
        return;
    };
    let mirror = sprite.flags.contains(SpriteFlags::MIRRORED);
    let flip = sprite.flags.contains(SpriteFlags::FLIPPED);
    let Some(pixels) = expand(scratch, header, data, mirror, flip) else {
        return;
    };
    surface.blit(sprite.x, sprite.y, header.width, header.height, pixels);
}
