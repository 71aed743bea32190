//! Quest tracking and win-condition evaluation.
//!
//! Quests are accepted by talking to their giver and complete on their
//! own the moment the objective holds; rewards land immediately.
//! Win conditions are global and checked after every turn, whatever the
//! turn did.

use crate::world::inventory;
use crate::world::loader::GameDefinition;
use crate::world::state::WorldState;
use crate::world::types::{QuestObjective, QuestRecord, WinCondition};

/// Whether a quest's objective currently holds.
pub fn objective_met(world: &WorldState, quest: &QuestRecord) -> bool {
    match &quest.objective {
        QuestObjective::ReachRoom { room_id } => world.current_room == *room_id,
        QuestObjective::ObtainItem { item_id, quantity } => {
            inventory::has_item(world.player(), item_id, (*quantity).max(1))
        }
        QuestObjective::DefeatCharacter { character_id } => world
            .character(character_id)
            .map(|c| !c.is_alive())
            .unwrap_or(false),
        QuestObjective::TalkTo { character_id } => {
            world.talked_to.iter().any(|c| c == character_id)
        }
    }
}

/// Sweep active quests, completing any whose objective holds and paying
/// rewards. Returns one message per completed quest.
pub fn sweep_active_quests(world: &mut WorldState, game: &GameDefinition) -> Vec<String> {
    let completable: Vec<String> = world
        .active_quests
        .iter()
        .filter(|id| {
            game.quests
                .get(*id)
                .map(|q| objective_met(world, q))
                .unwrap_or(false)
        })
        .cloned()
        .collect();

    let mut messages = Vec::new();
    for quest_id in completable {
        let Some(quest) = game.quests.get(&quest_id) else {
            continue;
        };
        world.complete_quest(&quest_id);
        let player = world.player_mut();
        player.wallet.receive(quest.reward_currency);
        player.experience += quest.reward_experience;
        for (item_id, qty) in &quest.reward_items {
            inventory::add_item(player, item_id, *qty);
        }

        let mut rewards = Vec::new();
        if quest.reward_currency > 0 {
            rewards.push(game.economy.format_amount(quest.reward_currency));
        }
        if quest.reward_experience > 0 {
            rewards.push(format!("{} experience", quest.reward_experience));
        }
        for (item_id, qty) in &quest.reward_items {
            let name = game
                .items
                .get(item_id)
                .map(|i| i.name.clone())
                .unwrap_or_else(|| item_id.clone());
            rewards.push(if *qty > 1 {
                format!("{}x {}", qty, name)
            } else {
                name
            });
        }
        let mut message = format!("Quest complete: {}.", quest.name);
        if !rewards.is_empty() {
            message.push_str(&format!(" You receive {}.", rewards.join(", ")));
        }
        messages.push(message);
    }
    messages
}

/// Quests `giver` can offer that the player has neither taken nor done.
pub fn offerable_by(world: &WorldState, game: &GameDefinition, giver: &str) -> Vec<String> {
    let mut ids: Vec<String> = game
        .quests
        .values()
        .filter(|q| q.giver.as_deref() == Some(giver))
        .filter(|q| !world.quest_active(&q.id) && !world.quest_completed(&q.id))
        .map(|q| q.id.clone())
        .collect();
    ids.sort();
    ids
}

/// Format the quest journal.
pub fn format_journal(world: &WorldState, game: &GameDefinition) -> String {
    if world.active_quests.is_empty() && world.completed_quests.is_empty() {
        return "Your journal is empty.".to_string();
    }
    let mut lines = Vec::new();
    if !world.active_quests.is_empty() {
        lines.push("Active quests:".to_string());
        for id in &world.active_quests {
            if let Some(quest) = game.quests.get(id) {
                lines.push(format!("  {} - {}", quest.name, describe_objective(game, quest)));
            }
        }
    }
    let finished: Vec<&str> = world
        .completed_quests
        .iter()
        .filter(|id| game.quests.contains_key(*id))
        .map(String::as_str)
        .collect();
    if !finished.is_empty() {
        lines.push("Completed:".to_string());
        for id in finished {
            if let Some(quest) = game.quests.get(id) {
                lines.push(format!("  {} (done)", quest.name));
            }
        }
    }
    lines.join("\n")
}

fn describe_objective(game: &GameDefinition, quest: &QuestRecord) -> String {
    match &quest.objective {
        QuestObjective::ReachRoom { room_id } => {
            let name = game
                .rooms
                .get(room_id)
                .map(|r| r.name.clone())
                .unwrap_or_else(|| room_id.clone());
            format!("reach {}", name)
        }
        QuestObjective::ObtainItem { item_id, quantity } => {
            let name = game
                .items
                .get(item_id)
                .map(|i| i.name.clone())
                .unwrap_or_else(|| item_id.clone());
            if *quantity > 1 {
                format!("obtain {}x {}", quantity, name)
            } else {
                format!("obtain {}", name)
            }
        }
        QuestObjective::DefeatCharacter { character_id } => {
            let name = game
                .characters
                .get(character_id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| character_id.clone());
            format!("defeat {}", name)
        }
        QuestObjective::TalkTo { character_id } => {
            let name = game
                .characters
                .get(character_id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| character_id.clone());
            format!("talk to {}", name)
        }
    }
}

/// Evaluate the game's win conditions; the first satisfied one wins.
pub fn check_win(world: &WorldState, game: &GameDefinition) -> Option<String> {
    for condition in &game.win_conditions {
        let met = match condition {
            WinCondition::RoomReached { room_id } => world.current_room == *room_id,
            WinCondition::ItemHeld { item_id } => {
                inventory::has_item(world.player(), item_id, 1)
            }
            WinCondition::CharacterDefeated { character_id } => world
                .character(character_id)
                .map(|c| !c.is_alive())
                .unwrap_or(false),
            WinCondition::QuestComplete { quest_id } => world.quest_completed(quest_id),
        };
        if met {
            return Some(game.meta.victory_message.clone());
        }
    }
    None
}
