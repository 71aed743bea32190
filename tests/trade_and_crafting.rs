//! Economy and crafting through the executor: listings, atomic trades,
//! all-or-nothing crafts.

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
    let mut rng = StdRng::seed_from_u64(11);
    let client = ScriptedClient::empty();
    executor::execute(game, world, &mut rng, &client, &intent).await
}

#[tokio::test]
async fn shop_lists_wares_with_prices() {
    let game = common::test_game();
    let mut world = WorldState::new(&game);

    let outcome = run(&mut world, &game, ActionIntent::new(ActionKind::Shop)).await;
    assert!(outcome.success);
    assert!(outcome.message.contains("Bela the Smith offers:"));
    // base 20 at the default 1.0 markup.
    assert!(outcome.message.contains("Iron Sword"));
    assert!(outcome.message.contains("You have 30g."));
}

#[tokio::test]
async fn buying_moves_coin_and_stock_together() {
    let game = common::test_game();
    let mut world = WorldState::new(&game);

    let outcome = run(
        &mut world,
        &game,
        ActionIntent::with_target(ActionKind::Buy, "iron sword"),
    )
    .await;
    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(world.player().wallet.amount, 10);
    assert_eq!(inventory::quantity_of(world.player(), "sword"), 1);
    let smith = world.character("smith").unwrap();
    assert_eq!(smith.wallet.amount, 120);
    assert_eq!(inventory::quantity_of(smith, "sword"), 0);
}

#[tokio::test]
async fn buying_beyond_your_purse_changes_nothing() {
    let game = common::test_game();
    let mut world = WorldState::new(&game);
    world.player_mut().wallet.amount = 3;

    let outcome = run(
        &mut world,
        &game,
        ActionIntent::with_target(ActionKind::Buy, "sword"),
    )
    .await;
    assert!(!outcome.success);
    assert!(outcome.message.contains("cannot afford"));
    assert_eq!(world.player().wallet.amount, 3);
    assert_eq!(inventory::quantity_of(world.player(), "sword"), 0);
    assert_eq!(
        inventory::quantity_of(world.character("smith").unwrap(), "sword"),
        1
    );
}

#[tokio::test]
async fn selling_pays_the_markdown_price() {
    let game = common::test_game();
    let mut world = WorldState::new(&game);
    inventory::add_item(world.player_mut(), "jerkin", 1);

    let outcome = run(
        &mut world,
        &game,
        ActionIntent::with_target(ActionKind::Sell, "jerkin"),
    )
    .await;
    assert!(outcome.success, "{}", outcome.message);
    // base 12 at the default 0.5 ratio.
    assert_eq!(world.player().wallet.amount, 36);
    assert_eq!(inventory::quantity_of(world.player(), "jerkin"), 0);
}

#[tokio::test]
async fn craft_fails_short_of_materials_without_mutation() {
    let game = common::test_game();
    let mut world = WorldState::new(&game);
    inventory::add_item(world.player_mut(), "ore", 2);
    let coins_before = world.player().wallet.amount;

    let outcome = run(
        &mut world,
        &game,
        ActionIntent::with_target(ActionKind::Craft, "iron sword"),
    )
    .await;
    assert!(!outcome.success);
    assert!(outcome.message.contains("3x Iron Ore"));
    assert!(outcome.message.contains("only 2"));
    assert_eq!(inventory::quantity_of(world.player(), "ore"), 2);
    assert_eq!(inventory::quantity_of(world.player(), "sword"), 0);
    assert_eq!(world.player().wallet.amount, coins_before);
}

#[tokio::test]
async fn craft_with_enough_materials_consumes_and_grants() {
    let game = common::test_game();
    let mut world = WorldState::new(&game);
    inventory::add_item(world.player_mut(), "ore", 3);

    let outcome = run(
        &mut world,
        &game,
        ActionIntent::with_target(ActionKind::Craft, "iron sword"),
    )
    .await;
    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(inventory::quantity_of(world.player(), "ore"), 0);
    assert_eq!(inventory::quantity_of(world.player(), "sword"), 1);
}

#[tokio::test]
async fn craft_without_target_lists_recipes() {
    let game = common::test_game();
    let mut world = WorldState::new(&game);

    let outcome = run(&mut world, &game, ActionIntent::new(ActionKind::Craft)).await;
    assert!(outcome.success);
    assert!(outcome.message.contains("Iron Sword"));
    assert!(outcome.message.contains("3x Iron Ore"));
}

#[tokio::test]
async fn trade_away_from_a_vendor_fails() {
    let game = common::test_game();
    let mut world = WorldState::new(&game);
    world.move_party("den");

    let outcome = run(
        &mut world,
        &game,
        ActionIntent::with_target(ActionKind::Buy, "sword"),
    )
    .await;
    assert!(!outcome.success);
    assert!(outcome.message.contains("no one here"));
}
