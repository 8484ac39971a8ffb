//! End-to-end roll scenarios driven through the aggregator.

use pixelroll_die::RollState;
use pixelroll_protocol::RollEvent;
use pixelroll_roll::{RollAggregator, RollSettings};

fn settled(face: u8) -> RollEvent {
    RollEvent::Settled { face }
}

fn moving() -> RollEvent {
    RollEvent::Moving { face: 1 }
}

fn with(formula: &str, advantage: bool, sum: bool) -> RollAggregator {
    RollAggregator::new(RollSettings {
        formula: formula.into(),
        advantage,
        sum,
    })
}

#[test]
fn test_sum_mode_two_dice_posts_total_once() {
    let mut agg = with("You rolled #face_value!", false, true);
    let a = agg.register("A", true).unwrap();
    let b = agg.register("B", true).unwrap();
    assert_eq!(agg.die(a).unwrap().token(), "#a");
    assert_eq!(agg.die(b).unwrap().token(), "#b");

    let first = agg.handle_event(a, settled(4));
    assert!(first.posts.is_empty());

    let second = agg.handle_event(b, settled(6));
    assert_eq!(second.posts, ["You rolled 10!"]);
}

#[test]
fn test_advantage_without_sum_posts_one_message_per_die() {
    let mut agg = with("You rolled #face_value!", true, false);
    let a = agg.register("A", true).unwrap();
    let b = agg.register("B", true).unwrap();

    // Pass 1.
    assert!(agg.handle_event(a, settled(3)).posts.is_empty());
    let pass1 = agg.handle_event(b, settled(5));
    assert!(pass1.posts.is_empty());
    assert!(pass1.changed.contains(&a) && pass1.changed.contains(&b));
    assert_eq!(agg.die(a).unwrap().state(), RollState::NeedsRoll);
    assert_eq!(agg.die(b).unwrap().state(), RollState::NeedsRoll);

    // Pass 2.
    agg.handle_event(a, moving());
    assert!(agg.handle_event(a, settled(6)).posts.is_empty());
    agg.handle_event(b, moving());
    let pass2 = agg.handle_event(b, settled(2));

    assert_eq!(pass2.posts, ["You rolled 3 6!", "You rolled 5 2!"]);
    assert_eq!(agg.session().pass(), 1);
}

#[test]
fn test_advantage_per_die_message_uses_that_die_name_and_tokens() {
    let mut agg = with("#die_name: #face_value (#a / #b)", true, false);
    let a = agg.register("A", true).unwrap();
    let b = agg.register("B", true).unwrap();

    agg.handle_event(a, settled(3));
    agg.handle_event(b, settled(5));
    agg.handle_event(a, settled(6));
    let report = agg.handle_event(b, settled(2));

    assert_eq!(
        report.posts,
        ["A: 3 6 (3 6 / 5 2)", "B: 5 2 (3 6 / 5 2)"]
    );
}

#[test]
fn test_disable_mid_session_unblocks_remaining_dice() {
    let mut agg = with("You rolled #face_value!", false, true);
    let a = agg.register("A", true).unwrap();
    let b = agg.register("B", true).unwrap();

    agg.handle_event(a, settled(4));
    let report = agg.set_enabled(b, false);

    assert_eq!(agg.rollset(), [a]);
    assert_eq!(report.posts, ["You rolled 4!"]);
    assert_eq!(agg.die(b).unwrap().state(), RollState::Disabled);
}

#[test]
fn test_disabled_die_rolling_does_not_block_or_count() {
    let mut agg = RollAggregator::default();
    let a = agg.register("A", true).unwrap();
    let b = agg.register("B", false).unwrap();

    let ignored = agg.handle_event(b, settled(20));
    assert!(ignored.posts.is_empty());

    assert_eq!(agg.handle_event(a, settled(7)).posts, ["ROLLED: 7"]);
}

#[test]
fn test_rollset_same_inputs_same_result_in_any_order() {
    let mut agg = with("#red and #blue", false, false);
    let red = agg.register("Red", true).unwrap();
    let _green = agg.register("Green", true).unwrap();
    let blue = agg.register("Blue", false).unwrap();
    assert_eq!(agg.rollset(), [red]);

    agg.set_enabled(blue, true);
    agg.set_enabled(red, false);
    agg.set_enabled(red, true);
    assert_eq!(agg.rollset(), [red, blue]);
}

#[test]
fn test_multiline_formula_posts_each_line_in_order() {
    let mut agg = with("Attack #a\nDamage #b", false, false);
    let a = agg.register("A", true).unwrap();
    let b = agg.register("B", true).unwrap();

    agg.handle_event(a, settled(18));
    let report = agg.handle_event(b, settled(7));

    assert_eq!(report.posts, ["Attack 18", "Damage 7"]);
}

#[test]
fn test_forced_face_blocks_completion_until_settled() {
    let mut agg = RollAggregator::default();
    let a = agg.register("A", true).unwrap();

    let forced = agg.handle_event(a, RollEvent::Forced { face: 9 });
    assert!(forced.posts.is_empty());
    assert_eq!(agg.die(a).unwrap().state(), RollState::Forced);

    agg.handle_event(a, moving());
    assert_eq!(agg.handle_event(a, settled(9)).posts, ["ROLLED: 9"]);
}

#[test]
fn test_clear_then_register_same_name_succeeds() {
    let mut agg = RollAggregator::default();
    agg.register("A", true).unwrap();
    agg.register("B", true).unwrap();

    let removed = agg.clear();
    assert_eq!(removed.len(), 2);
    assert!(agg.dice().is_empty());
    assert!(agg.rollset().is_empty());

    assert!(agg.register("A", true).is_ok());
}
