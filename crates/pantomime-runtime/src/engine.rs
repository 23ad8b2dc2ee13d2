//! The engine facade: owns the world, the registry, both interpreters, and
//! the collaborator sources, and runs the scheduler.
//!
//! One [`Engine::tick`] is one frame's worth of orchestration:
//!
//! 1. move due continuations to the runnable list;
//! 2. resume every runnable cursor, in queue order, until it re-suspends or
//!    terminates;
//! 3. run one logic step if a dispatch or class rescan is pending;
//! 4. composite the sprite registry into the frame surface.
//!
//! There is no priority handling; fairness is exactly "ready by the time
//! the delay lapses".

use bumpalo::Bump;

use log::warn;
use pantomime_core::{
    AnimationCursor, Continuation, EngineResult, Flags, ItemGraph, Palette, SpriteFlags, SpriteId,
    SubroutineId, Surface, SyncId, TitleConfig, Variables, VisibleSprite, ZoneId,
};

use crate::anim::AnimInterp;
use crate::gfx;
use crate::loader::{LogicSource, ZoneSource};
use crate::script::{GroupRange, LogicInterp, RunOutcome, SubroutineRegistry};
use crate::snapshot::{self, Snapshot};
use crate::world::{Selection, World};

/// The assembled runtime.
#[derive(Debug)]
pub struct Engine<L: LogicSource, Z: ZoneSource> {
    world: World,
    registry: SubroutineRegistry,
    logic: LogicInterp,
    anim: AnimInterp,
    logic_source: L,
    zone_source: Z,
    scratch: Bump,
    pending_dispatch: bool,
}

impl<L: LogicSource, Z: ZoneSource> Engine<L, Z> {
    /// Build an engine: allocate the world, then load the extension space
    /// (if the title has one) into the permanent region.
    pub fn new(
        config: TitleConfig,
        ranges: Vec<GroupRange>,
        mut logic_source: L,
        zone_source: Z,
    ) -> EngineResult<Self> {
        let mut world = World::new(config);
        let mut registry = SubroutineRegistry::new(ranges);
        if let Some(extension) = logic_source.extension() {
            registry.install_extension(&extension, &mut world.store)?;
        }
        Ok(Self {
            world,
            registry,
            logic: LogicInterp::new(),
            anim: AnimInterp::new(),
            logic_source,
            zone_source,
            scratch: Bump::new(),
            pending_dispatch: false,
        })
    }

    // ---- input layer ------------------------------------------------------

    /// Set the ambient verb/noun selection.
    pub fn select(&mut self, selection: Selection) {
        self.world.selection = selection;
    }

    /// The current ambient selection.
    pub fn selection(&self) -> Selection {
        self.world.selection
    }

    /// Request a verb/noun dispatch: subroutine 0 runs on the next tick.
    pub fn dispatch(&mut self) {
        self.pending_dispatch = true;
    }

    // ---- direct driving (boot code and tests) -----------------------------

    /// Run a subroutine immediately, outside the tick cadence.
    pub fn run_subroutine(&mut self, id: SubroutineId) -> EngineResult<RunOutcome> {
        self.logic.run(
            &mut self.world,
            &mut self.registry,
            &mut self.logic_source,
            &mut self.zone_source,
            id,
        )
    }

    /// Make a zone resident. Reports whether the zone is available.
    pub fn load_zone(&mut self, zone: ZoneId) -> EngineResult<bool> {
        self.world.ensure_zone(&mut self.zone_source, zone)
    }

    /// Create a sprite and start an animation cursor at `entry` (an offset
    /// into the zone's bytecode). The cursor first runs on the next tick.
    pub fn start_animation(
        &mut self,
        zone: ZoneId,
        sprite: SpriteId,
        entry: u16,
    ) -> EngineResult<()> {
        if !self.world.ensure_zone(&mut self.zone_source, zone)? {
            return Ok(());
        }
        let zd = self.world.zone(zone).expect("zone just ensured");
        if entry as u32 >= zd.code_len {
            warn!("animation entry {entry} outside {zone} bytecode; ignored");
            return Ok(());
        }
        self.world.purge_cursor(zone, sprite);
        self.world
            .sprites
            .insert(VisibleSprite::new(sprite, zone));
        self.world.queue.push(Continuation {
            ready_tick: self.world.tick,
            cursor: AnimationCursor::new(zone, sprite, zd.code.add(entry as u32)),
        });
        Ok(())
    }

    /// Halt a sprite and purge everything referencing it.
    pub fn halt_sprite(&mut self, zone: ZoneId, sprite: SpriteId) {
        self.world.halt_sprite(zone, sprite);
    }

    // ---- the scheduler ----------------------------------------------------

    /// Advance the session by one tick.
    pub fn tick(&mut self) -> EngineResult<()> {
        self.world.tick += 1;

        let due = self.world.queue.take_due(self.world.tick);
        for cursor in due {
            self.anim.resume(&mut self.world, cursor)?;
        }

        if self.logic.rescan_pending() {
            self.logic.step(
                &mut self.world,
                &mut self.registry,
                &mut self.logic_source,
                &mut self.zone_source,
            )?;
        } else if self.pending_dispatch {
            self.pending_dispatch = false;
            self.run_subroutine(SubroutineId::new(0))?;
        }

        self.composite();
        Ok(())
    }

    fn composite(&mut self) {
        let World {
            store,
            sprites,
            surface,
            zones,
            ..
        } = &mut self.world;
        surface.clear(0);
        for sprite in sprites.iter() {
            if sprite.flags.contains(SpriteFlags::HIDDEN) {
                continue;
            }
            if let Some(zd) = zones.get(&sprite.zone) {
                gfx::render_sprite(store, *zd, surface, &self.scratch, sprite);
            }
        }
        self.scratch.reset();
    }

    // ---- renderer and state access ----------------------------------------

    /// The composited frame surface.
    pub fn surface(&self) -> &Surface {
        &self.world.surface
    }

    /// The palette.
    pub fn palette(&self) -> &Palette {
        &self.world.palette
    }

    /// The sprite registry snapshot for this frame, in draw order.
    pub fn draw_order(&self) -> Vec<VisibleSprite> {
        self.world.sprites.iter().copied().collect()
    }

    /// Find one sprite.
    pub fn sprite(&self, id: SpriteId, zone: ZoneId) -> Option<&VisibleSprite> {
        self.world.sprites.find(id, zone)
    }

    /// The global variable array.
    pub fn variables(&self) -> &Variables {
        &self.world.state.vars
    }

    /// Write one global variable.
    pub fn set_variable(&mut self, index: u16, value: i16) {
        self.world.state.vars.set(index, value);
    }

    /// Read one flag.
    pub fn flag(&self, index: u16) -> bool {
        self.world.state.flags.get(index)
    }

    /// Write one flag.
    pub fn set_flag(&mut self, index: u16, value: bool) {
        self.world.state.flags.set(index, value);
    }

    /// The flag bit array.
    pub fn flags(&self) -> &Flags {
        &self.world.state.flags
    }

    /// The item graph.
    pub fn items(&self) -> &ItemGraph {
        &self.world.state.items
    }

    /// Mutable item graph access for the embedding application.
    pub fn items_mut(&mut self) -> &mut ItemGraph {
        &mut self.world.state.items
    }

    /// The session elapsed-tick accumulator.
    pub fn current_tick(&self) -> u64 {
        self.world.tick
    }

    /// Number of pending continuations.
    pub fn pending_continuations(&self) -> usize {
        self.world.queue.len()
    }

    /// Number of cursors parked on a rendezvous id.
    pub fn sync_waiters(&self, id: SyncId) -> usize {
        self.world.syncs.waiter_count(id)
    }

    /// Number of cursors parked on a sprite's termination.
    pub fn end_waiters(&self, zone: ZoneId, sprite: SpriteId) -> usize {
        self.world.syncs.end_waiter_count(zone, sprite)
    }

    /// The group currently occupying the swap region.
    pub fn current_group(&self) -> Option<u16> {
        self.registry.current_group()
    }

    // ---- persistence ------------------------------------------------------

    /// Capture the persistable session state.
    pub fn snapshot(&self) -> Snapshot {
        snapshot::capture(&self.world)
    }

    /// Restore a snapshot, with the elapsed-tick accumulator back at zero.
    pub fn restore(&mut self, snapshot: &Snapshot) -> EngineResult<()> {
        self.pending_dispatch = false;
        self.logic = LogicInterp::new();
        snapshot::apply(snapshot, &mut self.world, &mut self.zone_source)
    }
}
