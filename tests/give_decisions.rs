//! The two-phase give: the service proposes, the NPC's real inventory
//! disposes. Nothing the NPC does not carry can ever change hands.

mod common;

use rand::rngs::StdRng;
use rand::SeedableRng;

use taleforge::engine::executor::{self, ActionOutcome};
use taleforge::engine::intent::{ActionIntent, ActionKind};
use taleforge::llm::{GenerativeClient, ScriptedClient};
use taleforge::world::inventory;
use taleforge::world::state::WorldState;

async fn give(
    world: &mut WorldState,
    game: &taleforge::world::GameDefinition,
    client: &dyn GenerativeClient,
    detail: &str,
) -> ActionOutcome {
    let mut rng = StdRng::seed_from_u64(3);
    let intent = ActionIntent {
        kind: ActionKind::Give,
        target: Some("smith".to_string()),
        detail: Some(detail.to_string()),
    };
    executor::execute(game, world, &mut rng, client, &intent).await
}

#[tokio::test]
async fn willing_decision_transfers_named_items() {
    let game = common::test_game();
    let mut world = WorldState::new(&game);
    let client = ScriptedClient::with_replies([
        r#"{"willing": true, "items": [{"id": "vault_key", "quantity": 1}], "reason": "You'll need this for the vault."}"#,
    ]);

    let outcome = give(&mut world, &game, &client, "the vault key").await;
    assert!(outcome.success, "{}", outcome.message);
    assert!(outcome.dialogue);
    assert!(outcome.message.contains("You'll need this for the vault."));
    assert!(outcome.message.contains("gives you Vault Key"));
    assert_eq!(inventory::quantity_of(world.player(), "vault_key"), 1);
    assert_eq!(
        inventory::quantity_of(world.character("smith").unwrap(), "vault_key"),
        0
    );
}

#[tokio::test]
async fn items_the_npc_does_not_carry_never_transfer() {
    let game = common::test_game();
    let mut world = WorldState::new(&game);
    let client = ScriptedClient::with_replies([
        r#"{"willing": true, "items": [{"id": "dragon_egg", "quantity": 1}], "reason": "Take my dragon egg!"}"#,
    ]);

    let outcome = give(&mut world, &game, &client, "a dragon egg").await;
    // The invented item grounds to nothing, so the give degrades to a
    // refusal; the player gains nothing.
    assert!(!outcome.message.contains("gives you"));
    assert!(world.player().items.is_empty());
}

#[tokio::test]
async fn quantities_clamp_to_what_the_npc_holds() {
    let game = common::test_game();
    let mut world = WorldState::new(&game);
    let client = ScriptedClient::with_replies([
        r#"{"willing": true, "items": [{"id": "draught", "quantity": 50}], "reason": "Drink up."}"#,
    ]);

    let outcome = give(&mut world, &game, &client, "all your draughts").await;
    assert!(outcome.success, "{}", outcome.message);
    // The smith carries two; two is all that moves.
    assert_eq!(inventory::quantity_of(world.player(), "draught"), 2);
    assert_eq!(
        inventory::quantity_of(world.character("smith").unwrap(), "draught"),
        0
    );
}

#[tokio::test]
async fn unwilling_decision_is_a_polite_refusal() {
    let game = common::test_game();
    let mut world = WorldState::new(&game);
    let client = ScriptedClient::with_replies([
        r#"{"willing": false, "items": [], "reason": "That sword feeds my family."}"#,
    ]);

    let outcome = give(&mut world, &game, &client, "your sword").await;
    assert!(outcome.message.contains("That sword feeds my family."));
    assert!(world.player().items.is_empty());
    assert_eq!(
        inventory::quantity_of(world.character("smith").unwrap(), "sword"),
        1
    );
}

#[tokio::test]
async fn service_failure_degrades_to_refusal() {
    let game = common::test_game();
    let mut world = WorldState::new(&game);
    let client = ScriptedClient::empty();

    let outcome = give(&mut world, &game, &client, "anything").await;
    assert!(outcome.dialogue);
    assert!(outcome.message.contains("Not today, friend."));
    assert!(world.player().items.is_empty());
}

#[tokio::test]
async fn prose_wrapped_decision_still_parses() {
    let game = common::test_game();
    let mut world = WorldState::new(&game);
    let client = ScriptedClient::with_replies([
        "Bela thinks it over. {\"willing\": true, \"items\": [{\"id\": \"draught\", \"quantity\": 1}], \"reason\": \"One for the road.\"} That is her answer.",
    ]);

    let outcome = give(&mut world, &game, &client, "a draught").await;
    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(inventory::quantity_of(world.player(), "draught"), 1);
}
