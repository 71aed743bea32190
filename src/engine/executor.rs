//! Action execution.
//!
//! One handler per action kind, exhaustively matched. Handlers mutate the
//! world directly and return a structured [`ActionOutcome`] stating what
//! mechanically happened — they never narrate. Outcomes marked as
//! dialogue (speech, combat logs) are passed to the player verbatim;
//! everything else may be rephrased by the narrator, which cannot change
//! the facts recorded here.

use log::{debug, warn};
use rand::rngs::StdRng;
use serde_json::Value;

use crate::llm::{extract_json_object, ChatMessage, ChatRequest, GenerativeClient};
use crate::world::inventory;
use crate::world::loader::GameDefinition;
use crate::world::state::{WorldState, PLAYER_ID};
use crate::world::types::{Alignment, ItemKind};

use super::combat::{self, AssistStyle, Combatant};
use super::crafting;
use super::economy;
use super::gather;
use super::intent::{ActionIntent, ActionKind};
use super::matcher::{self, Match};
use super::quests;

/// Experience awarded for defeating a character.
fn defeat_experience(max_health: i32) -> u32 {
    (10 + max_health.max(0) / 2) as u32
}

/// The mechanically-true result of one executed intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub kind: ActionKind,
    pub success: bool,
    pub message: String,
    /// Verbatim text (speech, combat log): the narrator must not touch it.
    pub dialogue: bool,
}

impl ActionOutcome {
    pub fn ok(kind: ActionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            success: true,
            message: message.into(),
            dialogue: false,
        }
    }

    pub fn ok_dialogue(kind: ActionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            success: true,
            message: message.into(),
            dialogue: true,
        }
    }

    pub fn fail(kind: ActionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            success: false,
            message: message.into(),
            dialogue: false,
        }
    }

    fn fail_dialogue(kind: ActionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            success: false,
            message: message.into(),
            dialogue: true,
        }
    }
}

/// Execute one intent against the world. Never errors: every failure is
/// an unsuccessful outcome with a specific message.
pub async fn execute(
    game: &GameDefinition,
    world: &mut WorldState,
    rng: &mut StdRng,
    llm: &dyn GenerativeClient,
    intent: &ActionIntent,
) -> ActionOutcome {
    let target = intent.target.as_deref();
    let detail = intent.detail.as_deref();
    match intent.kind {
        ActionKind::Move => handle_move(game, world, target),
        ActionKind::Look => match target {
            None => ActionOutcome::ok(ActionKind::Look, describe_room(game, world)),
            Some(t) => handle_examine(game, world, Some(t)),
        },
        ActionKind::Inventory => handle_inventory(game, world),
        ActionKind::Talk => handle_talk(game, world, llm, target, detail).await,
        ActionKind::Follow => handle_follow(world, target),
        ActionKind::Examine => handle_examine(game, world, target),
        ActionKind::Take => handle_take(game, world, target),
        ActionKind::Drop => handle_drop(game, world, target),
        ActionKind::Use => handle_use(game, world, target),
        ActionKind::Attack => handle_attack(game, world, rng, target),
        ActionKind::Give => handle_give(game, world, llm, target, detail).await,
        ActionKind::Equip => handle_equip(game, world, target),
        ActionKind::Unequip => handle_unequip(game, world, target),
        ActionKind::Buy => match target {
            Some(t) => result_outcome(ActionKind::Buy, economy::buy(world, game, t)),
            None => ActionOutcome::fail(ActionKind::Buy, "Buy what?"),
        },
        ActionKind::Sell => match target {
            Some(t) => result_outcome(ActionKind::Sell, economy::sell(world, game, t)),
            None => ActionOutcome::fail(ActionKind::Sell, "Sell what?"),
        },
        ActionKind::Shop => result_outcome(ActionKind::Shop, economy::format_wares(world, game)),
        ActionKind::Gather => handle_gather(game, world, rng, llm, target).await,
        ActionKind::Craft => match target {
            Some(t) => result_outcome(ActionKind::Craft, crafting::craft(world, game, t)),
            None => ActionOutcome::ok(ActionKind::Craft, crafting::format_recipes(world, game)),
        },
        ActionKind::Quests => {
            ActionOutcome::ok(ActionKind::Quests, quests::format_journal(world, game))
        }
        ActionKind::Flee => handle_flee(game, world, rng),
        ActionKind::Status => ActionOutcome::ok(ActionKind::Status, format_status(game, world)),
        ActionKind::Help => ActionOutcome::ok(ActionKind::Help, help_text()),
        ActionKind::Unknown => ActionOutcome::fail(
            ActionKind::Unknown,
            "You're not sure how to do that. Try 'help' for ideas.",
        ),
    }
}

fn result_outcome(kind: ActionKind, result: Result<String, String>) -> ActionOutcome {
    match result {
        Ok(message) => ActionOutcome::ok(kind, message),
        Err(message) => ActionOutcome::fail(kind, message),
    }
}

// ----------------------------------------------------------------------
// Movement
// ----------------------------------------------------------------------

fn handle_move(game: &GameDefinition, world: &mut WorldState, target: Option<&str>) -> ActionOutcome {
    let exits: Vec<(String, String)> = world
        .current_room()
        .exits
        .iter()
        .map(|e| (e.name.clone(), e.name.clone()))
        .collect();
    let exit_list = || {
        let names: Vec<&str> = world
            .current_room()
            .exits
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        if names.is_empty() {
            "There are no exits here.".to_string()
        } else {
            format!("Exits: {}.", names.join(", "))
        }
    };

    let Some(query) = target else {
        return ActionOutcome::fail(ActionKind::Move, format!("Go where? {}", exit_list()));
    };

    let exit_name = match matcher::resolve(query, &exits) {
        Match::One(name) => name,
        _ => {
            return ActionOutcome::fail(
                ActionKind::Move,
                format!("You can't go '{}'. {}", query, exit_list()),
            );
        }
    };

    let exit = world
        .current_room()
        .exits
        .iter()
        .find(|e| e.name == exit_name)
        .cloned();
    let Some(exit) = exit else {
        return ActionOutcome::fail(ActionKind::Move, exit_list());
    };

    if !exit.open {
        let reason = exit
            .closed_reason
            .clone()
            .unwrap_or_else(|| "It won't open.".to_string());
        return ActionOutcome::fail(
            ActionKind::Move,
            format!("The way {} is closed. {}", exit.name, reason),
        );
    }

    // Player and companions move together or not at all.
    world.move_party(&exit.to);
    debug!("player moved via '{}' to {}", exit.name, exit.to);

    let mut message = format!("You go {}.", exit.name);
    if !world.companions.is_empty() {
        let names: Vec<String> = world
            .companions
            .iter()
            .filter_map(|id| world.character(id).map(|c| c.name.clone()))
            .collect();
        if !names.is_empty() {
            message.push_str(&format!(" {} follow{}.", names.join(" and "), if names.len() == 1 { "s" } else { "" }));
        }
    }
    message.push('\n');
    message.push_str(&describe_room(game, world));
    ActionOutcome::ok(ActionKind::Move, message)
}

/// Mechanical room report: name, description, exits, characters, items,
/// visible resources.
pub fn describe_room(game: &GameDefinition, world: &WorldState) -> String {
    let room = world.current_room();
    let mut lines = vec![format!("== {} ==", room.name), room.description.clone()];

    let exits: Vec<String> = room
        .exits
        .iter()
        .map(|e| {
            if e.open {
                e.name.clone()
            } else {
                format!("{} (closed)", e.name)
            }
        })
        .collect();
    if !exits.is_empty() {
        lines.push(format!("Exits: {}.", exits.join(", ")));
    }

    let mut present = Vec::new();
    for id in room.characters.iter().filter(|id| id.as_str() != PLAYER_ID) {
        if let Some(character) = world.character(id) {
            if world.companions.iter().any(|c| c == id) {
                continue;
            }
            if character.is_alive() {
                present.push(character.name.clone());
            } else {
                present.push(format!("the body of {}", character.name));
            }
        }
    }
    if !present.is_empty() {
        lines.push(format!("Here: {}.", present.join(", ")));
    }

    let items: Vec<String> = room
        .items
        .iter()
        .filter_map(|(id, qty)| {
            game.items.get(id).map(|item| {
                if *qty > 1 {
                    format!("{} x{}", item.name, qty)
                } else {
                    item.name.clone()
                }
            })
        })
        .collect();
    if !items.is_empty() {
        lines.push(format!("On the ground: {}.", items.join(", ")));
    }

    let nodes: Vec<&str> = room.resources.iter().map(|n| n.name.as_str()).collect();
    if !nodes.is_empty() {
        lines.push(format!("You could gather from: {}.", nodes.join(", ")));
    }

    lines.join("\n")
}

// ----------------------------------------------------------------------
// Inventory, examination, status
// ----------------------------------------------------------------------

fn handle_inventory(game: &GameDefinition, world: &WorldState) -> ActionOutcome {
    let player = world.player();
    let mut lines = vec!["You are carrying:".to_string()];
    lines.extend(
        inventory::format_inventory(player, &game.items)
            .into_iter()
            .map(|l| format!("  {}", l)),
    );
    lines.push(format!(
        "Purse: {}.",
        game.economy.format_amount(player.wallet.amount)
    ));
    ActionOutcome::ok(ActionKind::Inventory, lines.join("\n"))
}

fn handle_examine(
    game: &GameDefinition,
    world: &WorldState,
    target: Option<&str>,
) -> ActionOutcome {
    let Some(query) = target else {
        return ActionOutcome::fail(ActionKind::Examine, "Examine what?");
    };

    // Carried and ground items.
    let mut item_candidates: Vec<(String, String)> = Vec::new();
    for id in world.player().items.keys().chain(world.current_room().items.keys()) {
        if let Some(item) = game.items.get(id) {
            item_candidates.push((id.clone(), item.name.clone()));
        }
    }
    if let Match::One(id) = matcher::resolve(query, &item_candidates) {
        if let Some(item) = game.items.get(&id) {
            let mut lines = vec![item.name.clone()];
            if !item.description.is_empty() {
                lines.push(item.description.clone());
            }
            if item.damage_bonus > 0 {
                lines.push(format!("Damage bonus: +{}.", item.damage_bonus));
            }
            if item.armor_bonus > 0 {
                lines.push(format!("Armor bonus: +{}.", item.armor_bonus));
            }
            if item.heal_amount > 0 {
                lines.push(format!("Restores {} health when used.", item.heal_amount));
            }
            if item.base_price > 0 && item.tradable {
                lines.push(format!(
                    "Worth about {}.",
                    game.economy.format_amount(item.base_price)
                ));
            }
            return ActionOutcome::ok(ActionKind::Examine, lines.join("\n"));
        }
    }

    // Characters, including bodies.
    let npc_candidates = npc_candidates(world);
    if let Match::One(id) = matcher::resolve(query, &npc_candidates) {
        if let Some(character) = world.character(&id) {
            let mut lines = vec![character.name.clone()];
            if let Some(personality) = &character.personality {
                lines.push(personality.clone());
            }
            if character.is_alive() {
                lines.push(format!(
                    "Health: {}/{}.",
                    character.health, character.max_health
                ));
            } else {
                lines.push("Defeated. The body could be searched.".to_string());
                if !character.items.is_empty() {
                    let loot: Vec<String> = character
                        .items
                        .iter()
                        .filter_map(|(iid, qty)| {
                            game.items.get(iid).map(|i| {
                                if *qty > 1 {
                                    format!("{} x{}", i.name, qty)
                                } else {
                                    i.name.clone()
                                }
                            })
                        })
                        .collect();
                    if !loot.is_empty() {
                        lines.push(format!("Carrying: {}.", loot.join(", ")));
                    }
                }
            }
            return ActionOutcome::ok(ActionKind::Examine, lines.join("\n"));
        }
    }

    // Resource nodes.
    let node_candidates: Vec<(String, String)> = world
        .current_room()
        .resources
        .iter()
        .map(|n| (n.name.clone(), n.name.clone()))
        .collect();
    if let Match::One(name) = matcher::resolve(query, &node_candidates) {
        return ActionOutcome::ok(
            ActionKind::Examine,
            format!("The {} looks like it could be gathered from.", name),
        );
    }

    ActionOutcome::fail(
        ActionKind::Examine,
        format!("You see no '{}' here.", query),
    )
}

fn format_status(game: &GameDefinition, world: &WorldState) -> String {
    let player = world.player();
    let mut lines = vec![
        format!("{}", player.name),
        format!("Health: {}/{}.", player.health, player.max_health),
        format!(
            "Strength {}, Agility {}, Armor {}.",
            player.strength, player.agility, player.armor
        ),
        format!(
            "Experience: {}. Purse: {}.",
            player.experience,
            game.economy.format_amount(player.wallet.amount)
        ),
    ];
    if !player.equipped.is_empty() {
        let mut gear: Vec<String> = player
            .equipped
            .iter()
            .map(|(slot, id)| {
                let name = game
                    .items
                    .get(id)
                    .map(|i| i.name.clone())
                    .unwrap_or_else(|| id.clone());
                format!("{}: {}", slot, name)
            })
            .collect();
        gear.sort();
        lines.push(format!("Equipped: {}.", gear.join(", ")));
    }
    if !world.companions.is_empty() {
        let names: Vec<String> = world
            .companions
            .iter()
            .filter_map(|id| world.character(id).map(|c| c.name.clone()))
            .collect();
        lines.push(format!("Travelling with: {}.", names.join(", ")));
    }
    if let Some(opponent) = world.combat_opponent() {
        if let Some(enemy) = world.character(opponent) {
            lines.push(format!(
                "In combat with {} ({}/{}).",
                enemy.name, enemy.health, enemy.max_health
            ));
        }
    }
    lines.join("\n")
}

fn help_text() -> String {
    [
        "Speak naturally; the world will try to keep up. Some things that work:",
        "  go north / enter the cave / follow the road",
        "  look / examine the altar / check my inventory / status",
        "  talk to the smith / ask the guard for the key",
        "  take the sword / drop the torch / use the potion / equip the mail",
        "  attack the goblin / flee",
        "  shop / buy a sword / sell the pelt / craft / gather / quests",
        "Type 'quit' to leave the game.",
    ]
    .join("\n")
}

// ----------------------------------------------------------------------
// Take / drop / use / equip
// ----------------------------------------------------------------------

fn handle_take(game: &GameDefinition, world: &mut WorldState, target: Option<&str>) -> ActionOutcome {
    let Some(query) = target else {
        return ActionOutcome::fail(ActionKind::Take, "Take what?");
    };

    // Ground items first, then the belongings of the fallen.
    let ground: Vec<(String, String)> = world
        .current_room()
        .items
        .keys()
        .filter_map(|id| game.items.get(id).map(|i| (id.clone(), i.name.clone())))
        .collect();
    if let Match::One(item_id) = matcher::resolve(query, &ground) {
        let qty = world
            .current_room()
            .items
            .get(&item_id)
            .copied()
            .unwrap_or(0);
        if qty > 0 {
            world.current_room_mut().items.remove(&item_id);
            inventory::add_item(world.player_mut(), &item_id, qty);
            let name = game
                .items
                .get(&item_id)
                .map(|i| i.name.clone())
                .unwrap_or_else(|| item_id.clone());
            let message = if qty > 1 {
                format!("You take {}x {}.", qty, name)
            } else {
                format!("You take the {}.", name)
            };
            return ActionOutcome::ok(ActionKind::Take, message);
        }
    }

    // Lootable bodies.
    let bodies: Vec<String> = world
        .npcs_in_current_room()
        .into_iter()
        .filter(|id| world.character(id).map(|c| !c.is_alive()).unwrap_or(false))
        .collect();
    for body_id in bodies {
        let carried: Vec<(String, String)> = world
            .character(&body_id)
            .map(|c| {
                c.items
                    .keys()
                    .filter_map(|id| game.items.get(id).map(|i| (id.clone(), i.name.clone())))
                    .collect()
            })
            .unwrap_or_default();
        if let Match::One(item_id) = matcher::resolve(query, &carried) {
            let qty = world
                .character(&body_id)
                .map(|c| inventory::quantity_of(c, &item_id))
                .unwrap_or(0);
            if qty == 0 {
                continue;
            }
            if let Some(body) = world.character_mut(&body_id) {
                inventory::remove_item(body, &item_id, qty);
            }
            inventory::add_item(world.player_mut(), &item_id, qty);
            let item_name = game
                .items
                .get(&item_id)
                .map(|i| i.name.clone())
                .unwrap_or_else(|| item_id.clone());
            let body_name = world
                .character(&body_id)
                .map(|c| c.name.clone())
                .unwrap_or_default();
            return ActionOutcome::ok(
                ActionKind::Take,
                format!("You take the {} from {}'s body.", item_name, body_name),
            );
        }
    }

    ActionOutcome::fail(
        ActionKind::Take,
        format!("There is no '{}' here to take.", query),
    )
}

fn handle_drop(game: &GameDefinition, world: &mut WorldState, target: Option<&str>) -> ActionOutcome {
    let Some(query) = target else {
        return ActionOutcome::fail(ActionKind::Drop, "Drop what?");
    };

    let carried: Vec<(String, String)> = world
        .player()
        .items
        .keys()
        .filter_map(|id| game.items.get(id).map(|i| (id.clone(), i.name.clone())))
        .collect();
    let item_id = match matcher::resolve(query, &carried) {
        Match::One(id) => id,
        _ => {
            return ActionOutcome::fail(
                ActionKind::Drop,
                format!("You are not carrying '{}'.", query),
            );
        }
    };

    // Dropping something equipped unequips it first.
    let player = world.player_mut();
    player.equipped.retain(|_, id| *id != item_id);
    let removed = inventory::remove_item(player, &item_id, 1);
    if removed == 0 {
        return ActionOutcome::fail(
            ActionKind::Drop,
            format!("You are not carrying '{}'.", query),
        );
    }
    *world
        .current_room_mut()
        .items
        .entry(item_id.clone())
        .or_insert(0) += 1;

    let name = game
        .items
        .get(&item_id)
        .map(|i| i.name.clone())
        .unwrap_or_else(|| item_id.clone());
    ActionOutcome::ok(ActionKind::Drop, format!("You drop the {}.", name))
}

fn handle_use(game: &GameDefinition, world: &mut WorldState, target: Option<&str>) -> ActionOutcome {
    let Some(query) = target else {
        return ActionOutcome::fail(ActionKind::Use, "Use what?");
    };

    let carried: Vec<(String, String)> = world
        .player()
        .items
        .keys()
        .filter_map(|id| game.items.get(id).map(|i| (id.clone(), i.name.clone())))
        .collect();
    let item_id = match matcher::resolve(query, &carried) {
        Match::One(id) => id,
        _ => {
            return ActionOutcome::fail(
                ActionKind::Use,
                format!("You are not carrying '{}'.", query),
            );
        }
    };
    let Some(item) = game.items.get(&item_id) else {
        return ActionOutcome::fail(ActionKind::Use, "That item does not exist.");
    };

    match item.kind {
        ItemKind::Consumable => {
            let healed = world.player_mut().heal(item.heal_amount);
            inventory::remove_item(world.player_mut(), &item_id, 1);
            let player = world.player();
            ActionOutcome::ok(
                ActionKind::Use,
                format!(
                    "You use the {}. You recover {} health ({}/{}).",
                    item.name, healed, player.health, player.max_health
                ),
            )
        }
        ItemKind::Teleport => {
            let Some(destination) = &item.teleport_to else {
                return ActionOutcome::fail(
                    ActionKind::Use,
                    format!("The {} hums but nothing happens.", item.name),
                );
            };
            if world.in_combat() {
                return ActionOutcome::fail(
                    ActionKind::Use,
                    "You can't concentrate enough to use that while fighting.",
                );
            }
            world.move_party(destination);
            let mut message = format!("The {} flares and the world shifts.\n", item.name);
            message.push_str(&describe_room(game, world));
            ActionOutcome::ok(ActionKind::Use, message)
        }
        ItemKind::Key => {
            let exit_name = world
                .current_room()
                .exits
                .iter()
                .find(|e| !e.open && e.key_item.as_deref() == Some(item_id.as_str()))
                .map(|e| e.name.clone());
            match exit_name {
                Some(exit_name) => {
                    let room = world.current_room_mut();
                    if let Some(exit) = room.exits.iter_mut().find(|e| e.name == exit_name) {
                        exit.open = true;
                        exit.closed_reason = None;
                    }
                    ActionOutcome::ok(
                        ActionKind::Use,
                        format!("The {} unlocks the way {}.", item.name, exit_name),
                    )
                }
                None => ActionOutcome::fail(
                    ActionKind::Use,
                    format!("The {} doesn't fit anything here.", item.name),
                ),
            }
        }
        _ => ActionOutcome::fail(
            ActionKind::Use,
            format!("You can't think of a way to use the {}.", item.name),
        ),
    }
}

fn handle_equip(game: &GameDefinition, world: &mut WorldState, target: Option<&str>) -> ActionOutcome {
    let Some(query) = target else {
        return ActionOutcome::fail(ActionKind::Equip, "Equip what?");
    };

    let carried: Vec<(String, String)> = world
        .player()
        .items
        .keys()
        .filter_map(|id| game.items.get(id).map(|i| (id.clone(), i.name.clone())))
        .collect();
    let item_id = match matcher::resolve(query, &carried) {
        Match::One(id) => id,
        _ => {
            return ActionOutcome::fail(
                ActionKind::Equip,
                format!("You are not carrying '{}'.", query),
            );
        }
    };
    let Some(item) = game.items.get(&item_id) else {
        return ActionOutcome::fail(ActionKind::Equip, "That item does not exist.");
    };
    if !item.is_equippable() {
        return ActionOutcome::fail(
            ActionKind::Equip,
            format!("The {} cannot be equipped.", item.name),
        );
    }
    let Some(slot) = game.equipment.slot_for(item) else {
        return ActionOutcome::fail(
            ActionKind::Equip,
            format!("There is nowhere to wear the {}.", item.name),
        );
    };

    let previous = world.player().equipped.get(&slot).cloned();
    world
        .player_mut()
        .equipped
        .insert(slot.clone(), item_id.clone());

    let mut message = format!("You equip the {} ({}).", item.name, slot);
    if let Some(previous_id) = previous {
        if previous_id != item_id {
            let previous_name = game
                .items
                .get(&previous_id)
                .map(|i| i.name.clone())
                .unwrap_or_else(|| previous_id.clone());
            message.push_str(&format!(" You put away the {}.", previous_name));
        }
    }
    ActionOutcome::ok(ActionKind::Equip, message)
}

fn handle_unequip(
    game: &GameDefinition,
    world: &mut WorldState,
    target: Option<&str>,
) -> ActionOutcome {
    let Some(query) = target else {
        return ActionOutcome::fail(ActionKind::Unequip, "Unequip what?");
    };

    let equipped: Vec<(String, String)> = world
        .player()
        .equipped
        .values()
        .filter_map(|id| game.items.get(id).map(|i| (id.clone(), i.name.clone())))
        .collect();
    let item_id = match matcher::resolve(query, &equipped) {
        Match::One(id) => id,
        _ => {
            return ActionOutcome::fail(
                ActionKind::Unequip,
                format!("You don't have '{}' equipped.", query),
            );
        }
    };

    world.player_mut().equipped.retain(|_, id| *id != item_id);
    let name = game
        .items
        .get(&item_id)
        .map(|i| i.name.clone())
        .unwrap_or_else(|| item_id.clone());
    ActionOutcome::ok(
        ActionKind::Unequip,
        format!("You put away the {}. It stays in your pack.", name),
    )
}

// ----------------------------------------------------------------------
// Combat
// ----------------------------------------------------------------------

fn handle_attack(
    game: &GameDefinition,
    world: &mut WorldState,
    rng: &mut StdRng,
    target: Option<&str>,
) -> ActionOutcome {
    // In combat, every swing lands on the current opponent.
    let opponent_id = if let Some(id) = world.combat_opponent() {
        id.to_string()
    } else {
        let candidates = npc_candidates(world);
        let Some(query) = target else {
            return ActionOutcome::fail(ActionKind::Attack, "Attack whom?");
        };
        match matcher::resolve(query, &candidates) {
            Match::One(id) => id,
            Match::Ambiguous(ids) => {
                let names: Vec<String> = ids
                    .iter()
                    .filter_map(|id| world.character(id).map(|c| c.name.clone()))
                    .collect();
                return ActionOutcome::fail(
                    ActionKind::Attack,
                    format!("Attack which: {}?", names.join(", ")),
                );
            }
            Match::NotFound => {
                return ActionOutcome::fail(
                    ActionKind::Attack,
                    format!("There is no '{}' here to fight.", query),
                );
            }
        }
    };

    let Some(opponent) = world.character(&opponent_id) else {
        return ActionOutcome::fail(ActionKind::Attack, "Your target is gone.");
    };
    if !opponent.is_alive() {
        return ActionOutcome::fail(
            ActionKind::Attack,
            format!("{} is already defeated.", opponent.name),
        );
    }
    if world.companions.iter().any(|c| *c == opponent_id) {
        return ActionOutcome::fail(
            ActionKind::Attack,
            format!("{} is travelling with you.", opponent.name),
        );
    }

    let entering = !world.in_combat();
    if entering {
        world.enter_combat(&opponent_id);
    }

    let mut log: Vec<String> = Vec::new();
    if entering {
        let name = world.character(&opponent_id).map(|c| c.name.clone()).unwrap_or_default();
        log.push(format!("You square off against {}!", name));
    }

    // Player swing, with companion assistance.
    let attacker = Combatant::from_character(world.player(), &game.items);
    let defender_snapshot = match world.character(&opponent_id) {
        Some(c) => Combatant::from_character(c, &game.items),
        None => return ActionOutcome::fail(ActionKind::Attack, "Your target is gone."),
    };
    let roll = combat::resolve_attack(&attacker, &defender_snapshot, rng);

    if roll.hit {
        let mut damage = roll.damage;
        for companion_id in world.companions.clone() {
            let Some(companion) = world.character(&companion_id) else {
                continue;
            };
            if !companion.is_alive() {
                continue;
            }
            let snapshot = Combatant::from_character(companion, &game.items);
            let (bonus, style) = combat::companion_assist(&snapshot);
            if bonus > 0 {
                damage += bonus;
                log.push(match style {
                    AssistStyle::Mighty => format!(
                        "{} throws its weight behind your attack (+{} damage).",
                        companion.name, bonus
                    ),
                    AssistStyle::Swift => format!(
                        "{} darts in with a quick strike (+{} damage).",
                        companion.name, bonus
                    ),
                });
            }
        }

        let opponent_name = defender_snapshot.name.clone();
        if roll.critical {
            log.push(format!(
                "Critical hit! You strike {} for {} damage.",
                opponent_name, damage
            ));
        } else {
            log.push(format!("You hit {} for {} damage.", opponent_name, damage));
        }

        let defeated = world
            .character_mut(&opponent_id)
            .map(|c| c.apply_damage(damage))
            .unwrap_or(false);

        if defeated {
            let (loot, experience, name) = match world.character_mut(&opponent_id) {
                Some(opponent) => {
                    let loot = opponent.wallet.amount;
                    opponent.wallet = Default::default();
                    (loot, defeat_experience(opponent.max_health), opponent.name.clone())
                }
                None => (0, 0, String::new()),
            };
            let player = world.player_mut();
            player.wallet.receive(loot);
            player.experience += experience;
            world.clear_combat();

            let mut line = format!("{} falls. You gain {} experience", name, experience);
            if loot > 0 {
                line.push_str(&format!(" and {}", game.economy.format_amount(loot)));
            }
            line.push('.');
            log.push(line);
            log.push("The body remains; it could be searched.".to_string());
            return ActionOutcome::ok_dialogue(ActionKind::Attack, log.join("\n"));
        }
    } else {
        log.push(format!("You swing at {} and miss.", defender_snapshot.name));
    }

    // Counter-attack from the surviving opponent.
    log.push(counter_attack(game, world, rng, &opponent_id));

    // Bystanders may take notice; they do not join the fight.
    log.extend(bystander_warnings(world, &opponent_id));

    if !world.player().is_alive() {
        log.push(game.meta.defeat_message.clone());
    }

    ActionOutcome::ok_dialogue(ActionKind::Attack, log.join("\n"))
}

/// One free swing from the opponent at the player. Returns the log line.
fn counter_attack(
    game: &GameDefinition,
    world: &mut WorldState,
    rng: &mut StdRng,
    opponent_id: &str,
) -> String {
    let Some(opponent) = world.character(opponent_id) else {
        return String::new();
    };
    let attacker = Combatant::from_character(opponent, &game.items);
    let defender = Combatant::from_character(world.player(), &game.items);
    let roll = combat::resolve_attack(&attacker, &defender, rng);

    if roll.hit {
        world.player_mut().apply_damage(roll.damage);
        let player = world.player();
        if roll.critical {
            format!(
                "{} lands a vicious blow for {} damage ({}/{}).",
                attacker.name, roll.damage, player.health, player.max_health
            )
        } else {
            format!(
                "{} hits you for {} damage ({}/{}).",
                attacker.name, roll.damage, player.health, player.max_health
            )
        }
    } else {
        format!("{}'s attack misses you.", attacker.name)
    }
}

/// Warning lines for bystanders who disapprove: hostile-aligned NPCs and
/// anyone related to the defender. Warning-only; nobody joins the fight.
fn bystander_warnings(world: &WorldState, opponent_id: &str) -> Vec<String> {
    let mut warnings = Vec::new();
    for id in world.npcs_in_current_room() {
        if id == opponent_id || world.companions.iter().any(|c| *c == id) {
            continue;
        }
        let Some(bystander) = world.character(&id) else {
            continue;
        };
        if !bystander.is_alive() {
            continue;
        }
        if bystander.relationships.iter().any(|r| r == opponent_id) {
            warnings.push(format!(
                "{} watches you with murder in their eyes.",
                bystander.name
            ));
        } else if bystander.alignment == Alignment::Hostile {
            warnings.push(format!("{} bristles at the violence.", bystander.name));
        }
    }
    warnings
}

fn handle_flee(game: &GameDefinition, world: &mut WorldState, rng: &mut StdRng) -> ActionOutcome {
    let Some(opponent_id) = world.combat_opponent().map(str::to_string) else {
        return ActionOutcome::fail(ActionKind::Flee, "You are not fighting anyone.");
    };

    let player_agility = world.player().agility;
    let opponent_agility = world
        .character(&opponent_id)
        .map(|c| c.agility)
        .unwrap_or(10);

    if combat::attempt_flee(player_agility, opponent_agility, rng) {
        world.clear_combat();
        return ActionOutcome::ok_dialogue(ActionKind::Flee, "You break away from the fight.");
    }

    let mut log = vec!["You try to flee but can't break away!".to_string()];
    log.push(counter_attack(game, world, rng, &opponent_id));
    if !world.player().is_alive() {
        log.push(game.meta.defeat_message.clone());
    }
    ActionOutcome::fail_dialogue(ActionKind::Flee, log.join("\n"))
}

// ----------------------------------------------------------------------
// Social: talk, follow, give
// ----------------------------------------------------------------------

fn npc_candidates(world: &WorldState) -> Vec<(String, String)> {
    world
        .npcs_in_current_room()
        .into_iter()
        .filter_map(|id| world.character(&id).map(|c| (id.clone(), c.name.clone())))
        .collect()
}

async fn handle_talk(
    game: &GameDefinition,
    world: &mut WorldState,
    llm: &dyn GenerativeClient,
    target: Option<&str>,
    detail: Option<&str>,
) -> ActionOutcome {
    let Some(query) = target else {
        return ActionOutcome::fail(ActionKind::Talk, "Talk to whom?");
    };
    let candidates = npc_candidates(world);
    let npc_id = match matcher::resolve(query, &candidates) {
        Match::One(id) => id,
        Match::Ambiguous(ids) => {
            let names: Vec<String> = ids
                .iter()
                .filter_map(|id| world.character(id).map(|c| c.name.clone()))
                .collect();
            return ActionOutcome::fail(
                ActionKind::Talk,
                format!("Talk to which: {}?", names.join(", ")),
            );
        }
        Match::NotFound => {
            return ActionOutcome::fail(ActionKind::Talk, format!("There is no '{}' here.", query));
        }
    };

    let Some(npc) = world.character(&npc_id) else {
        return ActionOutcome::fail(ActionKind::Talk, "They are gone.");
    };
    if !npc.is_alive() {
        return ActionOutcome::fail(
            ActionKind::Talk,
            format!("{} is beyond conversation.", npc.name),
        );
    }

    let npc_name = npc.name.clone();
    let reply = npc_dialogue_line(world, llm, &npc_id, detail).await;

    world.note_talked_to(&npc_id);
    let mut lines = vec![format!("{} says: \"{}\"", npc_name, reply)];

    // Givers hand out their quests on first contact.
    for quest_id in quests::offerable_by(world, game, &npc_id) {
        if let Some(quest) = game.quests.get(&quest_id) {
            world.accept_quest(&quest_id);
            lines.push(format!(
                "New quest: {} - {}",
                quest.name, quest.description
            ));
        }
    }
    lines.extend(quests::sweep_active_quests(world, game));

    ActionOutcome::ok_dialogue(ActionKind::Talk, lines.join("\n"))
}

/// One in-character line from an NPC: generative when the service is up,
/// a persona-flavored canned line otherwise.
async fn npc_dialogue_line(
    world: &WorldState,
    llm: &dyn GenerativeClient,
    npc_id: &str,
    said: Option<&str>,
) -> String {
    let Some(npc) = world.character(npc_id) else {
        return "...".to_string();
    };
    let persona = npc
        .personality
        .clone()
        .unwrap_or_else(|| "a plain-spoken local".to_string());
    let room = world.current_room();
    let prompt = format!(
        "You are {}, {}. You are in {} ({}). The adventurer {} speaks to you. \
         Reply with one or two short sentences of in-character speech only — \
         no quotation marks, no narration, no stage directions. Mention only \
         people and places that exist here.",
        npc.name,
        persona,
        room.name,
        room.description,
        world.player().name,
    );
    let user = said.unwrap_or("Hello.").to_string();
    let request = ChatRequest::new(vec![ChatMessage::system(prompt), ChatMessage::user(user)])
        .with_temperature(0.8)
        .with_max_tokens(120);

    match llm.chat(request).await {
        Ok(reply) => {
            let line = reply.trim().trim_matches('"').to_string();
            if line.is_empty() {
                canned_dialogue(npc.vendor)
            } else {
                line
            }
        }
        Err(e) => {
            debug!("dialogue service unavailable for {}: {}", npc_id, e);
            canned_dialogue(npc.vendor)
        }
    }
}

fn canned_dialogue(vendor: bool) -> String {
    if vendor {
        "Welcome. Have a look at my wares if you're buying.".to_string()
    } else {
        "Well met, traveler.".to_string()
    }
}

fn handle_follow(world: &mut WorldState, target: Option<&str>) -> ActionOutcome {
    let Some(query) = target else {
        return ActionOutcome::fail(ActionKind::Follow, "Who should join you?");
    };
    let candidates = npc_candidates(world);
    let npc_id = match matcher::resolve(query, &candidates) {
        Match::One(id) => id,
        _ => {
            return ActionOutcome::fail(
                ActionKind::Follow,
                format!("There is no '{}' here.", query),
            );
        }
    };
    let Some(npc) = world.character(&npc_id) else {
        return ActionOutcome::fail(ActionKind::Follow, "They are gone.");
    };
    if !npc.is_alive() {
        return ActionOutcome::fail(ActionKind::Follow, format!("{} cannot follow anyone now.", npc.name));
    }
    if world.companions.iter().any(|c| *c == npc_id) {
        return ActionOutcome::fail(
            ActionKind::Follow,
            format!("{} is already travelling with you.", npc.name),
        );
    }
    if !npc.will_join_party {
        return ActionOutcome::ok_dialogue(
            ActionKind::Follow,
            format!("{} says: \"My place is here. I'll not wander off with you.\"", npc.name),
        );
    }

    let name = npc.name.clone();
    world.companions.push(npc_id);
    ActionOutcome::ok_dialogue(
        ActionKind::Follow,
        format!("{} says: \"Lead on, then.\" They fall in beside you.", name),
    )
}

/// Two-phase give: ask the service what the NPC is willing to hand over,
/// then transfer only items the NPC verifiably carries.
async fn handle_give(
    game: &GameDefinition,
    world: &mut WorldState,
    llm: &dyn GenerativeClient,
    target: Option<&str>,
    detail: Option<&str>,
) -> ActionOutcome {
    let Some(query) = target else {
        return ActionOutcome::fail(ActionKind::Give, "Ask whom?");
    };
    let candidates = npc_candidates(world);
    let npc_id = match matcher::resolve(query, &candidates) {
        Match::One(id) => id,
        _ => {
            return ActionOutcome::fail(ActionKind::Give, format!("There is no '{}' here.", query));
        }
    };
    let Some(npc) = world.character(&npc_id) else {
        return ActionOutcome::fail(ActionKind::Give, "They are gone.");
    };
    if !npc.is_alive() {
        return ActionOutcome::fail(
            ActionKind::Give,
            format!("{} has nothing more to give.", npc.name),
        );
    }

    let npc_name = npc.name.clone();
    if npc.items.is_empty() {
        return ActionOutcome::ok_dialogue(
            ActionKind::Give,
            format!("{} says: \"I have nothing to spare.\"", npc_name),
        );
    }

    // Phase one: a structured decision, constrained to the NPC's actual
    // belongings.
    let decision = request_give_decision(game, world, llm, &npc_id, detail).await;

    // Phase two: deterministic transfer of exactly what was validated.
    match decision {
        GiveDecision::Refuse(reason) => ActionOutcome::ok_dialogue(
            ActionKind::Give,
            format!("{} says: \"{}\"", npc_name, reason),
        ),
        GiveDecision::Grant { items, reason } => {
            let mut granted = Vec::new();
            for (item_id, quantity) in items {
                let available = world
                    .character(&npc_id)
                    .map(|c| inventory::quantity_of(c, &item_id))
                    .unwrap_or(0);
                let quantity = quantity.min(available);
                if quantity == 0 {
                    continue;
                }
                if let Some(npc) = world.character_mut(&npc_id) {
                    inventory::remove_item(npc, &item_id, quantity);
                }
                inventory::add_item(world.player_mut(), &item_id, quantity);
                let name = game
                    .items
                    .get(&item_id)
                    .map(|i| i.name.clone())
                    .unwrap_or_else(|| item_id.clone());
                granted.push(if quantity > 1 {
                    format!("{}x {}", quantity, name)
                } else {
                    name
                });
            }
            if granted.is_empty() {
                return ActionOutcome::ok_dialogue(
                    ActionKind::Give,
                    format!("{} says: \"I have nothing like that to give.\"", npc_name),
                );
            }
            let mut lines = vec![format!("{} says: \"{}\"", npc_name, reason)];
            lines.push(format!(
                "{} gives you {}.",
                npc_name,
                granted.join(", ")
            ));
            ActionOutcome::ok_dialogue(ActionKind::Give, lines.join("\n"))
        }
    }
}

enum GiveDecision {
    Refuse(String),
    Grant {
        items: Vec<(String, u32)>,
        reason: String,
    },
}

async fn request_give_decision(
    game: &GameDefinition,
    world: &WorldState,
    llm: &dyn GenerativeClient,
    npc_id: &str,
    request: Option<&str>,
) -> GiveDecision {
    let refuse = |reason: &str| GiveDecision::Refuse(reason.to_string());
    let Some(npc) = world.character(npc_id) else {
        return refuse("I have nothing for you.");
    };

    let carried: Vec<String> = npc
        .items
        .iter()
        .filter_map(|(id, qty)| {
            game.items
                .get(id)
                .map(|item| format!("{} (id: {}, carried: {})", item.name, id, qty))
        })
        .collect();
    let persona = npc
        .personality
        .clone()
        .unwrap_or_else(|| "a plain-spoken local".to_string());
    let wanted = request.unwrap_or("anything you can spare");

    let prompt = format!(
        "You decide for {}, {}, whether to hand items to the adventurer {}. \
         You carry ONLY these items: {}. \
         The adventurer asks for: {}. \
         Respond with ONLY a JSON object: {{\"willing\": bool, \
         \"items\": [{{\"id\": <item id from the list>, \"quantity\": <int>}}], \
         \"reason\": <one short in-character sentence>}}. \
         Never name an item that is not in the list. Refuse anything precious \
         unless there is a good reason to part with it.",
        npc.name,
        persona,
        world.player().name,
        carried.join("; "),
        wanted,
    );

    let reply = match llm
        .chat(ChatRequest::new(vec![ChatMessage::system(prompt)]).with_temperature(0.3))
        .await
    {
        Ok(reply) => reply,
        Err(e) => {
            debug!("give decision service unavailable: {}", e);
            return refuse("Not today, friend.");
        }
    };

    let Some(object) = extract_json_object(&reply) else {
        warn!("give decision was not valid JSON, refusing");
        return refuse("Not today, friend.");
    };

    let willing = object
        .get("willing")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let reason = object
        .get("reason")
        .and_then(Value::as_str)
        .unwrap_or("Here, take this.")
        .to_string();
    if !willing {
        let reason = if reason.is_empty() {
            "Not today, friend.".to_string()
        } else {
            reason
        };
        return GiveDecision::Refuse(reason);
    }

    // Ground every named item against the NPC's true inventory. Names
    // the service invents are dropped, not trusted.
    let mut items = Vec::new();
    if let Some(list) = object.get("items").and_then(Value::as_array) {
        for entry in list {
            let Some(raw_id) = entry.get("id").and_then(Value::as_str) else {
                continue;
            };
            let quantity = entry
                .get("quantity")
                .and_then(Value::as_u64)
                .unwrap_or(1)
                .min(99) as u32;
            let carried_pairs: Vec<(String, String)> = npc
                .items
                .keys()
                .filter_map(|id| game.items.get(id).map(|i| (id.clone(), i.name.clone())))
                .collect();
            match matcher::resolve(raw_id, &carried_pairs) {
                Match::One(item_id) => items.push((item_id, quantity.max(1))),
                other => {
                    debug!("give decision named unusable item '{}': {:?}", raw_id, other);
                }
            }
        }
    }

    if items.is_empty() {
        GiveDecision::Refuse(reason)
    } else {
        GiveDecision::Grant { items, reason }
    }
}

// ----------------------------------------------------------------------
// Gathering
// ----------------------------------------------------------------------

async fn handle_gather(
    game: &GameDefinition,
    world: &mut WorldState,
    rng: &mut StdRng,
    llm: &dyn GenerativeClient,
    target: Option<&str>,
) -> ActionOutcome {
    if !world.current_room().resources.is_empty() {
        return result_outcome(
            ActionKind::Gather,
            gather::gather_from_node(world, game, target, rng),
        );
    }

    if !game.authority.dynamic_gathering {
        return ActionOutcome::fail(ActionKind::Gather, "There is nothing to gather here.");
    }

    let (room_name, room_description) = {
        let room = world.current_room();
        (room.name.clone(), room.description.clone())
    };
    let judgement =
        match gather::judge_dynamic_gather(llm, game, &room_name, &room_description, target).await {
            Ok(judgement) => judgement,
            Err(e) => {
                debug!("dynamic gather judgement unavailable: {}", e);
                return ActionOutcome::fail(
                    ActionKind::Gather,
                    "You search around but find nothing useful.",
                );
            }
        };

    match judgement.item_id {
        Some(item_id) if judgement.allow => {
            inventory::add_item(world.player_mut(), &item_id, judgement.quantity);
            let name = game
                .items
                .get(&item_id)
                .map(|i| i.name.clone())
                .unwrap_or_else(|| item_id.clone());
            let what = if judgement.quantity > 1 {
                format!("{}x {}", judgement.quantity, name)
            } else {
                name
            };
            ActionOutcome::ok(ActionKind::Gather, format!("You gather {}.", what))
        }
        _ => {
            let reason = if judgement.reason.is_empty() {
                "You find nothing worth taking.".to_string()
            } else {
                judgement.reason
            };
            ActionOutcome::fail(ActionKind::Gather, reason)
        }
    }
}
