//! Executor behavior against the world model: movement failures list
//! exits, equipment round-trips, bodies persist and stay lootable, keys
//! open what they fit.

mod common;

use rand::rngs::StdRng;
use rand::SeedableRng;

use taleforge::engine::executor::{self, ActionOutcome};
use taleforge::engine::intent::{ActionIntent, ActionKind};
use taleforge::llm::ScriptedClient;
use taleforge::world::inventory;
use taleforge::world::state::WorldState;

async fn run(
    world: &mut WorldState,
    game: &taleforge::world::GameDefinition,
    intent: ActionIntent,
) -> ActionOutcome {
    let mut rng = StdRng::seed_from_u64(7);
    let client = ScriptedClient::empty();
    executor::execute(game, world, &mut rng, &client, &intent).await
}

#[tokio::test]
async fn misspelled_exit_fails_and_lists_exits() {
    let game = common::test_game();
    let mut world = WorldState::new(&game);

    let outcome = run(
        &mut world,
        &game,
        ActionIntent::with_target(ActionKind::Move, "Norht"),
    )
    .await;
    assert!(!outcome.success);
    assert!(outcome.message.contains("North"));
    assert!(outcome.message.contains("East"));
    assert_eq!(world.current_room, "square");
}

#[tokio::test]
async fn substring_exit_match_moves_the_party() {
    let game = common::test_game();
    let mut world = WorldState::new(&game);

    let outcome = run(
        &mut world,
        &game,
        ActionIntent::with_target(ActionKind::Move, "nor"),
    )
    .await;
    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(world.current_room, "den");
}

#[tokio::test]
async fn locked_exit_reports_its_reason_until_the_key_is_used() {
    let game = common::test_game();
    let mut world = WorldState::new(&game);

    let blocked = run(
        &mut world,
        &game,
        ActionIntent::with_target(ActionKind::Move, "East"),
    )
    .await;
    assert!(!blocked.success);
    assert!(blocked.message.contains("banded door is locked"));

    inventory::add_item(world.player_mut(), "vault_key", 1);
    let unlock = run(
        &mut world,
        &game,
        ActionIntent::with_target(ActionKind::Use, "vault key"),
    )
    .await;
    assert!(unlock.success, "{}", unlock.message);
    assert!(unlock.message.contains("unlocks the way East"));

    let through = run(
        &mut world,
        &game,
        ActionIntent::with_target(ActionKind::Move, "East"),
    )
    .await;
    assert!(through.success, "{}", through.message);
    assert_eq!(world.current_room, "vault");
}

#[tokio::test]
async fn equip_then_unequip_round_trips() {
    let game = common::test_game();
    let mut world = WorldState::new(&game);
    inventory::add_item(world.player_mut(), "sword", 1);

    let equip = run(
        &mut world,
        &game,
        ActionIntent::with_target(ActionKind::Equip, "iron sword"),
    )
    .await;
    assert!(equip.success, "{}", equip.message);
    assert_eq!(
        world.player().equipped.get("main_hand").map(String::as_str),
        Some("sword")
    );
    // Equipping never removes the item from the pack.
    assert_eq!(inventory::quantity_of(world.player(), "sword"), 1);

    let unequip = run(
        &mut world,
        &game,
        ActionIntent::with_target(ActionKind::Unequip, "sword"),
    )
    .await;
    assert!(unequip.success, "{}", unequip.message);
    assert!(world.player().equipped.is_empty());
    assert_eq!(inventory::quantity_of(world.player(), "sword"), 1);
}

#[tokio::test]
async fn equipping_over_an_occupied_slot_swaps_implicitly() {
    let game = common::test_game();
    let mut world = WorldState::new(&game);
    inventory::add_item(world.player_mut(), "sword", 1);
    inventory::add_item(world.player_mut(), "jerkin", 1);
    world
        .player_mut()
        .equipped
        .insert("main_hand".to_string(), "jerkin".to_string());

    let outcome = run(
        &mut world,
        &game,
        ActionIntent::with_target(ActionKind::Equip, "sword"),
    )
    .await;
    assert!(outcome.success);
    assert!(outcome.message.contains("put away the Leather Jerkin"));
    assert_eq!(
        world.player().equipped.get("main_hand").map(String::as_str),
        Some("sword")
    );
    assert_eq!(inventory::quantity_of(world.player(), "jerkin"), 1);
}

#[tokio::test]
async fn consumables_heal_and_deplete() {
    let game = common::test_game();
    let mut world = WorldState::new(&game);
    world.player_mut().health = 15;
    inventory::add_item(world.player_mut(), "draught", 2);

    let outcome = run(
        &mut world,
        &game,
        ActionIntent::with_target(ActionKind::Use, "draught"),
    )
    .await;
    assert!(outcome.success);
    assert!(outcome.message.contains("recover 10 health (25/30)"));
    assert_eq!(inventory::quantity_of(world.player(), "draught"), 1);

    // Healing clamps at max.
    let outcome = run(
        &mut world,
        &game,
        ActionIntent::with_target(ActionKind::Use, "draught"),
    )
    .await;
    assert!(outcome.message.contains("(30/30)"));
    assert_eq!(world.player().health, 30);
}

#[tokio::test]
async fn defeated_wolf_stays_examinable_and_lootable() {
    let game = common::test_game();
    let mut world = WorldState::new(&game);
    world.move_party("den");

    // Put the wolf down directly; combat behavior has its own suite.
    world.character_mut("wolf").unwrap().apply_damage(100);

    let wolf = world.character("wolf").unwrap();
    assert_eq!(wolf.health, 0);
    assert!(!wolf.can_move);
    assert!(world
        .rooms
        .get("den")
        .unwrap()
        .characters
        .iter()
        .any(|c| c == "wolf"));

    let examine = run(
        &mut world,
        &game,
        ActionIntent::with_target(ActionKind::Examine, "wolf"),
    )
    .await;
    assert!(examine.success);
    assert!(examine.message.contains("Defeated"));
    assert!(examine.message.contains("Wolf Pelt"));

    let loot = run(
        &mut world,
        &game,
        ActionIntent::with_target(ActionKind::Take, "pelt"),
    )
    .await;
    assert!(loot.success, "{}", loot.message);
    assert_eq!(inventory::quantity_of(world.player(), "pelt"), 1);
    assert_eq!(
        inventory::quantity_of(world.character("wolf").unwrap(), "pelt"),
        0
    );
}

#[tokio::test]
async fn take_and_drop_move_items_between_room_and_pack() {
    let game = common::test_game();
    let mut world = WorldState::new(&game);
    world.move_party("den");

    let take = run(
        &mut world,
        &game,
        ActionIntent::with_target(ActionKind::Take, "crown"),
    )
    .await;
    assert!(take.success, "{}", take.message);
    assert_eq!(inventory::quantity_of(world.player(), "crown"), 1);
    assert!(world.current_room().items.is_empty());

    let drop = run(
        &mut world,
        &game,
        ActionIntent::with_target(ActionKind::Drop, "crown"),
    )
    .await;
    assert!(drop.success, "{}", drop.message);
    assert_eq!(inventory::quantity_of(world.player(), "crown"), 0);
    assert_eq!(world.current_room().items.get("crown"), Some(&1));
}

#[tokio::test]
async fn attacking_a_dead_target_is_an_illegal_action() {
    let game = common::test_game();
    let mut world = WorldState::new(&game);
    world.move_party("den");
    world.character_mut("wolf").unwrap().apply_damage(100);

    let outcome = run(
        &mut world,
        &game,
        ActionIntent::with_target(ActionKind::Attack, "wolf"),
    )
    .await;
    assert!(!outcome.success);
    assert!(outcome.message.contains("already defeated"));
    assert!(!world.in_combat());
}

#[tokio::test]
async fn fleeing_outside_combat_fails() {
    let game = common::test_game();
    let mut world = WorldState::new(&game);

    let outcome = run(&mut world, &game, ActionIntent::new(ActionKind::Flee)).await;
    assert!(!outcome.success);
    assert!(outcome.message.contains("not fighting"));
}

#[tokio::test]
async fn gather_uses_skill_tool_and_charges() {
    let game = common::test_game();
    let mut world = WorldState::new(&game);
    world.move_party("den");

    // base_chance 100, no tool required: succeeds, twice, then dry.
    for _ in 0..2 {
        let outcome = run(&mut world, &game, ActionIntent::new(ActionKind::Gather)).await;
        assert!(outcome.success, "{}", outcome.message);
    }
    let outcome = run(&mut world, &game, ActionIntent::new(ActionKind::Gather)).await;
    assert!(!outcome.success);
    assert!(outcome.message.contains("picked clean"));
    assert_eq!(inventory::quantity_of(world.player(), "ore"), 2);
}
