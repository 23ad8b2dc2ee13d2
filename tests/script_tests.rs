//! Logic-interpreter properties: the verb/noun match test, terminators,
//! class iteration, demand paging, and the fatal classes.

mod common;

use common::*;
use pantomime::prelude::*;

const ZONE: u16 = 1;

fn selection(verb: i16, noun1: i16, noun2: i16, carryover: bool) -> Selection {
    Selection {
        verb,
        noun1,
        noun2,
        carryover,
        pointer: None,
    }
}

// =============================================================================
// The match test
// =============================================================================

#[test]
fn gated_line_matches_wildcard_and_carryover() {
    // Subroutine 0, one line: verb 5, noun1 wildcard, noun2 "still selected".
    let group = build_group(&[(
        0,
        vec![LineSpec::gated(5, -1, -2, LogicAsm::new().set_flag(1).end())],
    )]);
    let mut eng = engine(vec![(1, group)], one_group_ranges(1), vec![]);

    // Ambient verb 5, nouns still selected from before: the body executes.
    eng.select(selection(5, 7, 7, true));
    eng.dispatch();
    eng.tick().unwrap();
    assert!(eng.flag(1));

    // Ambient verb 6: the line is skipped.
    eng.set_flag(1, false);
    eng.select(selection(6, 7, 7, true));
    eng.dispatch();
    eng.tick().unwrap();
    assert!(!eng.flag(1));

    // Verb 5 but a fresh selection: −2 no longer matches.
    eng.select(selection(5, 7, 7, false));
    eng.dispatch();
    eng.tick().unwrap();
    assert!(!eng.flag(1));
}

#[test]
fn nonzero_subroutines_ignore_the_selection() {
    let group = build_group(&[(
        2,
        vec![LineSpec::gated(5, 5, 5, LogicAsm::new().set_flag(3).end())],
    )]);
    let mut eng = engine(vec![(1, group)], one_group_ranges(1), vec![]);

    eng.select(selection(0, 0, 0, false));
    eng.run_subroutine(SubroutineId::new(2)).unwrap();
    assert!(eng.flag(3));
}

// =============================================================================
// Lines and terminators
// =============================================================================

#[test]
fn failed_condition_ends_only_its_line() {
    let group = build_group(&[(
        2,
        vec![
            LineSpec::always(LogicAsm::new().if_var_eq(0, 5).set_flag(2).end()),
            LineSpec::always(LogicAsm::new().set_flag(3).end()),
        ],
    )]);
    let mut eng = engine(vec![(1, group)], one_group_ranges(1), vec![]);
    eng.run_subroutine(SubroutineId::new(2)).unwrap();
    assert!(!eng.flag(2));
    assert!(eng.flag(3));
}

#[test]
fn restart_reenters_from_the_first_line() {
    let group = build_group(&[(
        2,
        vec![
            LineSpec::always(LogicAsm::new().if_var_eq(0, 0).set_var(0, 1).restart()),
            LineSpec::always(LogicAsm::new().set_flag(9).end()),
        ],
    )]);
    let mut eng = engine(vec![(1, group)], one_group_ranges(1), vec![]);
    eng.run_subroutine(SubroutineId::new(2)).unwrap();
    // First pass restarts after flipping var 0; second pass falls through.
    assert_eq!(eng.variables().get(0), 1);
    assert!(eng.flag(9));
}

#[test]
fn abort_cuts_the_remaining_lines() {
    let group = build_group(&[(
        2,
        vec![
            LineSpec::always(LogicAsm::new().abort()),
            LineSpec::always(LogicAsm::new().set_flag(5).end()),
        ],
    )]);
    let mut eng = engine(vec![(1, group)], one_group_ranges(1), vec![]);
    let outcome = eng.run_subroutine(SubroutineId::new(2)).unwrap();
    assert_eq!(outcome, RunOutcome::Aborted);
    assert!(!eng.flag(5));
}

#[test]
fn abort_propagates_through_call_sub() {
    let group = build_group(&[
        (
            2,
            vec![
                LineSpec::always(LogicAsm::new().call_sub(3).set_flag(1).end()),
                LineSpec::always(LogicAsm::new().set_flag(2).end()),
            ],
        ),
        (3, vec![LineSpec::always(LogicAsm::new().abort())]),
    ]);
    let mut eng = engine(vec![(1, group)], one_group_ranges(1), vec![]);
    let outcome = eng.run_subroutine(SubroutineId::new(2)).unwrap();
    assert_eq!(outcome, RunOutcome::Aborted);
    assert!(!eng.flag(1));
    assert!(!eng.flag(2));
}

// =============================================================================
// Item graph and class iteration
// =============================================================================

#[test]
fn parent_condition_and_reparenting() {
    let group = build_group(&[(
        2,
        vec![
            LineSpec::always(LogicAsm::new().set_parent(4, 2).end()),
            LineSpec::always(LogicAsm::new().if_parent(4, 2).set_flag(8).end()),
        ],
    )]);
    let mut eng = engine(vec![(1, group)], one_group_ranges(1), vec![]);
    eng.run_subroutine(SubroutineId::new(2)).unwrap();
    assert_eq!(eng.items().parent(ItemId::new(4)), Some(ItemId::new(2)));
    assert!(eng.flag(8));
}

#[test]
fn class_iteration_takes_one_subject_per_tick() {
    const MASK: u16 = 0x08;
    let group = build_group(&[(
        2,
        vec![LineSpec::always(
            LogicAsm::new().for_class(MASK).add_var(7, 1).end(),
        )],
    )]);
    let mut eng = engine(vec![(1, group)], one_group_ranges(1), vec![]);
    for id in [3u16, 5, 9] {
        eng.items_mut().set_class(ItemId::new(id), MASK);
    }

    // The first qualifying subject runs within the initiating pass.
    eng.run_subroutine(SubroutineId::new(2)).unwrap();
    assert_eq!(eng.variables().get(7), 1);

    // Each scheduler tick drains exactly one further subject.
    eng.tick().unwrap();
    assert_eq!(eng.variables().get(7), 2);
    eng.tick().unwrap();
    assert_eq!(eng.variables().get(7), 3);

    // One more tick retires the iteration; nothing runs again.
    eng.tick().unwrap();
    eng.tick().unwrap();
    assert_eq!(eng.variables().get(7), 3);
}

#[test]
fn class_iteration_with_no_subjects_fails_the_line() {
    let group = build_group(&[(
        2,
        vec![
            LineSpec::always(LogicAsm::new().for_class(0x40).set_flag(1).end()),
            LineSpec::always(LogicAsm::new().set_flag(2).end()),
        ],
    )]);
    let mut eng = engine(vec![(1, group)], one_group_ranges(1), vec![]);
    eng.run_subroutine(SubroutineId::new(2)).unwrap();
    assert!(!eng.flag(1));
    assert!(eng.flag(2));
}

// =============================================================================
// Demand paging
// =============================================================================

#[test]
fn lookup_swaps_groups_and_swaps_back() {
    let ranges = vec![
        GroupRange {
            min: SubroutineId::new(0),
            max: SubroutineId::new(99),
            group: 1,
        },
        GroupRange {
            min: SubroutineId::new(100),
            max: SubroutineId::new(199),
            group: 2,
        },
    ];
    let g1 = build_group(&[(10, vec![LineSpec::always(LogicAsm::new().add_var(1, 1).end())])]);
    let g2 = build_group(&[(110, vec![LineSpec::always(LogicAsm::new().add_var(2, 1).end())])]);
    let mut eng = engine(vec![(1, g1), (2, g2)], ranges, vec![]);

    eng.run_subroutine(SubroutineId::new(10)).unwrap();
    assert_eq!(eng.current_group(), Some(1));
    eng.run_subroutine(SubroutineId::new(110)).unwrap();
    assert_eq!(eng.current_group(), Some(2));
    eng.run_subroutine(SubroutineId::new(10)).unwrap();
    assert_eq!(eng.current_group(), Some(1));

    assert_eq!(eng.variables().get(1), 2);
    assert_eq!(eng.variables().get(2), 1);
}

#[test]
fn extension_subroutines_survive_swaps() {
    let ranges = vec![
        GroupRange {
            min: SubroutineId::new(0),
            max: SubroutineId::new(99),
            group: 1,
        },
        GroupRange {
            min: SubroutineId::new(100),
            max: SubroutineId::new(199),
            group: 2,
        },
    ];
    let g1 = build_group(&[(10, vec![LineSpec::always(LogicAsm::new().end())])]);
    let g2 = build_group(&[(110, vec![LineSpec::always(LogicAsm::new().end())])]);
    let ext = build_group(&[(900, vec![LineSpec::always(LogicAsm::new().add_var(3, 1).end())])]);

    let mut eng = engine_with(
        TitleConfig::default_title(),
        vec![(1, g1), (2, g2)],
        Some(ext),
        ranges,
        vec![],
    );

    eng.run_subroutine(SubroutineId::new(900)).unwrap();
    eng.run_subroutine(SubroutineId::new(10)).unwrap();
    eng.run_subroutine(SubroutineId::new(110)).unwrap(); // evicts group 1
    eng.run_subroutine(SubroutineId::new(900)).unwrap(); // still resident
    assert_eq!(eng.variables().get(3), 2);
}

#[test]
fn unknown_subroutine_is_a_noop() {
    let group = build_group(&[(10, vec![LineSpec::always(LogicAsm::new().end())])]);
    let mut eng = engine(
        vec![(1, group)],
        vec![GroupRange {
            min: SubroutineId::new(0),
            max: SubroutineId::new(99),
            group: 1,
        }],
        vec![],
    );

    // Covered by a range but absent from the group: recovered, not fatal.
    let outcome = eng.run_subroutine(SubroutineId::new(50)).unwrap();
    assert_eq!(outcome, RunOutcome::Completed);
    // Covered by no range at all: same.
    let outcome = eng.run_subroutine(SubroutineId::new(500)).unwrap();
    assert_eq!(outcome, RunOutcome::Completed);
}

// =============================================================================
// Driving animation from logic
// =============================================================================

#[test]
fn logic_starts_and_stops_animation_cursors() {
    let anim = AnimAsm::new().set_var(20, 1).delay(10).set_var(20, 2).stop();
    let group = build_group(&[
        (
            2,
            vec![LineSpec::always(LogicAsm::new().start_anim(ZONE, 1, 0).end())],
        ),
        (
            3,
            vec![LineSpec::always(LogicAsm::new().stop_anim(ZONE, 1).end())],
        ),
    ]);
    let mut eng = engine(
        vec![(1, group)],
        one_group_ranges(1),
        vec![(ZONE, code_zone(anim.finish()))],
    );

    eng.run_subroutine(SubroutineId::new(2)).unwrap();
    assert!(eng.sprite(SpriteId::new(1), ZoneId::new(ZONE)).is_some());
    eng.tick().unwrap();
    assert_eq!(eng.variables().get(20), 1);

    eng.run_subroutine(SubroutineId::new(3)).unwrap();
    assert!(eng.sprite(SpriteId::new(1), ZoneId::new(ZONE)).is_none());
    for _ in 0..15 {
        eng.tick().unwrap();
    }
    assert_eq!(eng.variables().get(20), 1);
}

#[test]
fn logic_signal_wakes_animation_waiters() {
    const GATE: u16 = 12;
    let anim = AnimAsm::new().wait_sync(GATE).set_var(21, 1).stop();
    let group = build_group(&[(
        2,
        vec![LineSpec::always(LogicAsm::new().send_sync(GATE).end())],
    )]);
    let mut eng = engine(
        vec![(1, group)],
        one_group_ranges(1),
        vec![(ZONE, code_zone(anim.finish()))],
    );

    eng.start_animation(ZoneId::new(ZONE), SpriteId::new(1), 0).unwrap();
    eng.tick().unwrap();
    assert_eq!(eng.sync_waiters(SyncId::new(GATE)), 1);

    eng.run_subroutine(SubroutineId::new(2)).unwrap();
    assert_eq!(eng.sync_waiters(SyncId::new(GATE)), 0);
    eng.tick().unwrap();
    assert_eq!(eng.variables().get(21), 1);
}

// =============================================================================
// Fatal classes
// =============================================================================

#[test]
fn runaway_recursion_is_fatal() {
    let group = build_group(&[(
        2,
        vec![LineSpec::always(LogicAsm::new().call_sub(2).end())],
    )]);
    let mut eng = engine(vec![(1, group)], one_group_ranges(1), vec![]);
    let err = eng.run_subroutine(SubroutineId::new(2)).unwrap_err();
    assert!(matches!(err, EngineError::RecursionLimit { .. }));
}

#[test]
fn unknown_logic_opcode_is_fatal() {
    let group = build_group(&[(
        2,
        vec![LineSpec::always(LogicAsm::new().raw(0xee).end())],
    )]);
    let mut eng = engine(vec![(1, group)], one_group_ranges(1), vec![]);
    let err = eng.run_subroutine(SubroutineId::new(2)).unwrap_err();
    assert!(matches!(err, EngineError::MalformedOpcode { opcode: 0xee, .. }));
}

#[test]
fn unknown_anim_opcode_is_fatal() {
    let code = AnimAsm::new().raw(0xee).stop().finish();
    let mut eng = engine(vec![], vec![], vec![(ZONE, code_zone(code))]);
    eng.start_animation(ZoneId::new(ZONE), SpriteId::new(1), 0).unwrap();
    let err = eng.tick().unwrap_err();
    assert!(matches!(err, EngineError::MalformedOpcode { opcode: 0xee, .. }));
}

#[test]
fn arena_exhaustion_is_fatal_at_load_time() {
    let mut config = TitleConfig::default_title();
    config.arena_capacity = 2;
    let big = AnimAsm::new().delay(1).stop().finish();
    let mut eng = engine_with(
        config,
        vec![],
        None,
        vec![],
        vec![(ZONE, code_zone(big))],
    );
    let err = eng.load_zone(ZoneId::new(ZONE)).unwrap_err();
    assert!(matches!(err, EngineError::ArenaExhausted { .. }));
}
