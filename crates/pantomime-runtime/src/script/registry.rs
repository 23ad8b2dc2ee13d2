//! The subroutine registry and demand paging of logic program groups.
//!
//! Subroutine records live inside the bytecode store. Lines are chained
//! through arena-relative `next` offsets so that permanently-resident
//! subroutines stay valid when the swap region is replaced. The registry
//! keeps the resident index: a linear list of `(id, first line)` entries,
//! each tagged with the region it was installed into so a swap can evict
//! exactly the entries it invalidates.
//!
//! A lookup miss consults the `[min,max] -> group` range table, pages the
//! covering group into the swap region, and retries once. A second miss is
//! logged and treated as a no-op by the caller, never fatal: demand-loaded
//! content legitimately races against references to it.

use log::{debug, warn};

use pantomime_core::{
    CodeOffset, CodeStore, CodeWriter, EngineResult, StreamReader, SubroutineId, OFFSET_NONE,
};

use crate::loader::LogicSource;

/// Byte offset of a line record's `next` field.
pub const LINE_NEXT: u32 = 6;
/// Byte offset of a line record's body length field.
pub const LINE_LEN: u32 = 10;
/// Byte offset of a line record's opcode stream.
pub const LINE_BODY: u32 = 12;

/// Maps an inclusive subroutine id range to the program group that holds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupRange {
    /// Smallest id in the group.
    pub min: SubroutineId,
    /// Largest id in the group.
    pub max: SubroutineId,
    /// Range-table key handed to the [`LogicSource`].
    pub group: u16,
}

/// A resolved subroutine: its id and the arena offset of its first line (a
/// subroutine may have no lines at all).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubroutineRef {
    /// The subroutine id.
    pub id: SubroutineId,
    /// First line record, if any.
    pub first_line: Option<CodeOffset>,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    id: SubroutineId,
    first_line: Option<CodeOffset>,
    swapped: bool,
}

/// The resident subroutine index.
#[derive(Debug, Default)]
pub struct SubroutineRegistry {
    entries: Vec<Entry>,
    ranges: Vec<GroupRange>,
    current_group: Option<u16>,
    swap_epoch: u64,
}

impl SubroutineRegistry {
    /// Create a registry with the title's range table.
    pub fn new(ranges: Vec<GroupRange>) -> Self {
        Self {
            entries: Vec::new(),
            ranges,
            current_group: None,
            swap_epoch: 0,
        }
    }

    /// The group currently occupying the swap region.
    #[inline]
    pub fn current_group(&self) -> Option<u16> {
        self.current_group
    }

    /// Bumped every time the swap region is replaced. Holders of offsets
    /// into the swap region use this to notice their handles went stale.
    #[inline]
    pub fn swap_epoch(&self) -> u64 {
        self.swap_epoch
    }

    /// Number of resident subroutines.
    #[inline]
    pub fn resident_count(&self) -> usize {
        self.entries.len()
    }

    /// Install the extension space into the permanent region. Extension
    /// subroutines survive every subsequent swap.
    pub fn install_extension(&mut self, image: &[u8], store: &mut CodeStore) -> EngineResult<()> {
        debug!("installing extension space: {} bytes", image.len());
        self.install(image, store, false)
    }

    /// Resolve a subroutine id, demand-paging its group on a miss. `Ok(None)`
    /// is the recovered unknown-subroutine case.
    pub fn lookup<L: LogicSource>(
        &mut self,
        id: SubroutineId,
        store: &mut CodeStore,
        source: &mut L,
    ) -> EngineResult<Option<SubroutineRef>> {
        if let Some(found) = self.find(id) {
            return Ok(Some(found));
        }

        let Some(range) = self
            .ranges
            .iter()
            .copied()
            .find(|r| r.min <= id && id <= r.max)
        else {
            warn!("no program group covers {id}; treating as no-op");
            return Ok(None);
        };

        if self.current_group != Some(range.group) {
            let Some(image) = source.group(range.group) else {
                warn!("program group {} for {id} is unavailable", range.group);
                return Ok(None);
            };
            debug!("paging in program group {} for {id}", range.group);
            self.entries.retain(|e| !e.swapped);
            store.reset_swap();
            self.swap_epoch += 1;
            self.install(&image, store, true)?;
            self.current_group = Some(range.group);
        }

        let found = self.find(id);
        if found.is_none() {
            warn!("{id} still unknown after paging group {}; treating as no-op", range.group);
        }
        Ok(found)
    }

    fn find(&self, id: SubroutineId) -> Option<SubroutineRef> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| SubroutineRef {
                id: e.id,
                first_line: e.first_line,
            })
    }

    /// Parse a group image, build relocated line records, and install them
    /// into the chosen region.
    fn install(&mut self, image: &[u8], store: &mut CodeStore, swapped: bool) -> EngineResult<()> {
        let mut r = StreamReader::over(image);
        let count = r.read_u16()?;

        let mut w = CodeWriter::new();
        let mut subs: Vec<(SubroutineId, Option<u32>)> = Vec::with_capacity(count as usize);
        let mut links: Vec<u32> = Vec::new();

        for _ in 0..count {
            let id = SubroutineId::new(r.read_u16()?);
            let line_count = r.read_u16()?;
            let mut first: Option<u32> = None;
            let mut prev_link: Option<u32> = None;

            for _ in 0..line_count {
                w.align();
                let local = w.position();
                if first.is_none() {
                    first = Some(local);
                }
                if let Some(link) = prev_link {
                    w.patch_u32(link, local);
                    links.push(link);
                }

                let verb = r.read_i16()?;
                let noun1 = r.read_i16()?;
                let noun2 = r.read_i16()?;
                let len = r.read_u16()?;
                let body = r.read_bytes(len as usize)?;

                w.i16(verb).i16(noun1).i16(noun2);
                prev_link = Some(w.position());
                w.u32(OFFSET_NONE);
                w.u16(len);
                w.bytes(body);
            }
            subs.push((id, first));
        }

        let block = w.finish();
        let base = if swapped {
            store.install_swap(&block)?
        } else {
            store.install(&block)?
        };

        // Turn local line links into arena-relative offsets.
        for link in links {
            let at = base.add(link);
            let local = store.reader(at).read_u32()?;
            store.write_u32(at, base.index() + local);
        }

        for (id, first) in subs {
            // A reloaded id shadows nothing: ids are unique per group, and
            // permanent entries win by sitting earlier in the scan order.
            self.entries.push(Entry {
                id,
                first_line: first.map(|local| base.add(local)),
                swapped,
            });
        }
        Ok(())
    }
}
