//! Mutable per-session world state.
//!
//! Each session owns an independent [`WorldState`]: a mutable copy of the
//! game's room and character tables plus the session-scoped fields
//! (current room, combat opponent, companions, command history, quest
//! progress). The immutable item/quest/recipe tables stay on the
//! [`GameDefinition`] and are only referenced.
//!
//! Invariant: the combat opponent is set iff combat mode is active, and
//! clearing one always clears the other. Room membership tracks every
//! character, dead or alive — defeat makes a body, not a vacancy.

use std::collections::HashMap;

use log::debug;

use super::loader::GameDefinition;
use super::types::{CharacterRecord, RoomRecord, Wallet};

/// Id under which the player character is stored in the character table.
pub const PLAYER_ID: &str = "player";

/// How many raw utterances the command history retains.
const HISTORY_LIMIT: usize = 200;

/// A depleted resource node waiting to respawn.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingRespawn {
    room_id: String,
    node_index: usize,
    ready_at_turn: u64,
    charges: u32,
}

/// Mutable world + session state, owned by one session.
#[derive(Debug, Clone)]
pub struct WorldState {
    pub rooms: HashMap<String, RoomRecord>,
    pub characters: HashMap<String, CharacterRecord>,
    pub current_room: String,
    /// Opponent id while in combat.
    combat_opponent: Option<String>,
    /// Ids of NPCs travelling with the player.
    pub companions: Vec<String>,
    /// Raw player utterances, oldest first.
    pub history: Vec<String>,
    pub active_quests: Vec<String>,
    pub completed_quests: Vec<String>,
    /// Ids of NPCs the player has spoken with; feeds talk-to objectives.
    pub talked_to: Vec<String>,
    /// Monotonic turn counter; drives resource respawns.
    pub turn: u64,
    respawns: Vec<PendingRespawn>,
    /// Charges each resource node started with, keyed by room id; used
    /// when a depleted node respawns.
    initial_charges: HashMap<String, Vec<u32>>,
}

impl WorldState {
    /// Build the initial state for a game: clone the mutable tables and
    /// materialize the player from the template into the starting room.
    pub fn new(game: &GameDefinition) -> Self {
        let mut characters = game.characters.clone();

        let template = &game.player;
        let mut player = CharacterRecord::new(
            PLAYER_ID,
            &template.name,
            template.health,
            template.strength,
            template.agility,
        );
        player.armor = template.armor;
        player.wallet = Wallet::new(template.currency);
        player.items = template.items.clone();
        player.skills = template.skills.clone();
        characters.insert(PLAYER_ID.to_string(), player);

        let mut rooms = game.rooms.clone();
        if let Some(room) = rooms.get_mut(&game.meta.starting_room) {
            if !room.characters.iter().any(|c| c == PLAYER_ID) {
                room.characters.push(PLAYER_ID.to_string());
            }
        }

        let initial_charges = rooms
            .iter()
            .map(|(id, room)| {
                (
                    id.clone(),
                    room.resources.iter().map(|n| n.charges).collect(),
                )
            })
            .collect();

        Self {
            rooms,
            characters,
            current_room: game.meta.starting_room.clone(),
            combat_opponent: None,
            companions: Vec::new(),
            history: Vec::new(),
            active_quests: Vec::new(),
            completed_quests: Vec::new(),
            talked_to: Vec::new(),
            turn: 0,
            respawns: Vec::new(),
            initial_charges,
        }
    }

    pub fn player(&self) -> &CharacterRecord {
        self.characters
            .get(PLAYER_ID)
            .expect("player character missing from world state")
    }

    pub fn player_mut(&mut self) -> &mut CharacterRecord {
        self.characters
            .get_mut(PLAYER_ID)
            .expect("player character missing from world state")
    }

    pub fn character(&self, id: &str) -> Option<&CharacterRecord> {
        self.characters.get(id)
    }

    pub fn character_mut(&mut self, id: &str) -> Option<&mut CharacterRecord> {
        self.characters.get_mut(id)
    }

    pub fn current_room(&self) -> &RoomRecord {
        self.rooms
            .get(&self.current_room)
            .expect("current room missing from world state")
    }

    pub fn current_room_mut(&mut self) -> &mut RoomRecord {
        let id = self.current_room.clone();
        self.rooms
            .get_mut(&id)
            .expect("current room missing from world state")
    }

    /// Ids of NPCs (everyone but the player) in the current room.
    pub fn npcs_in_current_room(&self) -> Vec<String> {
        self.current_room()
            .characters
            .iter()
            .filter(|id| id.as_str() != PLAYER_ID)
            .cloned()
            .collect()
    }

    /// Relocate a character between rooms, maintaining membership sets.
    /// Unknown source/destination ids are ignored rather than panicking;
    /// the loader guarantees they exist for well-formed games.
    pub fn relocate(&mut self, character_id: &str, to_room: &str) {
        for room in self.rooms.values_mut() {
            room.characters.retain(|c| c != character_id);
        }
        if let Some(room) = self.rooms.get_mut(to_room) {
            room.characters.push(character_id.to_string());
        }
        if character_id == PLAYER_ID {
            self.current_room = to_room.to_string();
        }
    }

    /// Move the player and every companion to `to_room` as one step.
    pub fn move_party(&mut self, to_room: &str) {
        self.relocate(PLAYER_ID, to_room);
        let companions = self.companions.clone();
        for id in companions {
            self.relocate(&id, to_room);
        }
    }

    // ------------------------------------------------------------------
    // Combat mode
    // ------------------------------------------------------------------

    /// The current opponent, if combat mode is active and the opponent
    /// still lives. A dead or vanished opponent reads as "not in combat".
    pub fn combat_opponent(&self) -> Option<&str> {
        let id = self.combat_opponent.as_deref()?;
        match self.characters.get(id) {
            Some(c) if c.is_alive() => Some(id),
            _ => None,
        }
    }

    pub fn in_combat(&self) -> bool {
        self.combat_opponent().is_some()
    }

    pub fn enter_combat(&mut self, opponent_id: &str) {
        debug!("entering combat with {}", opponent_id);
        self.combat_opponent = Some(opponent_id.to_string());
    }

    /// Leave combat mode. Flee, victory, and defeat all funnel through
    /// here so the flag and the opponent id always clear together.
    pub fn clear_combat(&mut self) {
        if let Some(id) = self.combat_opponent.take() {
            debug!("leaving combat with {}", id);
        }
    }

    // ------------------------------------------------------------------
    // History and turns
    // ------------------------------------------------------------------

    /// Remember that the player has spoken with an NPC.
    pub fn note_talked_to(&mut self, character_id: &str) {
        if !self.talked_to.iter().any(|c| c == character_id) {
            self.talked_to.push(character_id.to_string());
        }
    }

    pub fn record_command(&mut self, utterance: &str) {
        self.history.push(utterance.to_string());
        if self.history.len() > HISTORY_LIMIT {
            let excess = self.history.len() - HISTORY_LIMIT;
            self.history.drain(..excess);
        }
    }

    /// Advance the turn counter and restore any resource nodes whose
    /// respawn timer has elapsed.
    pub fn tick_turn(&mut self) {
        self.turn += 1;
        let turn = self.turn;
        let mut ready = Vec::new();
        self.respawns.retain(|pending| {
            if pending.ready_at_turn <= turn {
                ready.push(pending.clone());
                false
            } else {
                true
            }
        });
        for pending in ready {
            if let Some(room) = self.rooms.get_mut(&pending.room_id) {
                if let Some(node) = room.resources.get_mut(pending.node_index) {
                    node.charges = pending.charges;
                    debug!(
                        "resource '{}' in {} respawned with {} charges",
                        node.name, pending.room_id, pending.charges
                    );
                }
            }
        }
    }

    /// Consume one charge of a resource node in the current room,
    /// scheduling a respawn when the node supports one. Returns false if
    /// the node is exhausted.
    pub fn consume_resource_charge(&mut self, node_index: usize) -> bool {
        let turn = self.turn;
        let room_id = self.current_room.clone();
        let refill = self
            .initial_charges
            .get(&room_id)
            .and_then(|charges| charges.get(node_index))
            .copied()
            .unwrap_or(0);
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return false;
        };
        let Some(node) = room.resources.get_mut(node_index) else {
            return false;
        };
        if node.renewable {
            return true;
        }
        if node.charges == 0 {
            return false;
        }
        node.charges -= 1;
        if node.charges == 0 && node.respawn_turns > 0 {
            self.respawns.push(PendingRespawn {
                room_id,
                node_index,
                ready_at_turn: turn + node.respawn_turns as u64,
                charges: refill,
            });
        }
        true
    }

    // ------------------------------------------------------------------
    // Quests
    // ------------------------------------------------------------------

    pub fn quest_active(&self, quest_id: &str) -> bool {
        self.active_quests.iter().any(|q| q == quest_id)
    }

    pub fn quest_completed(&self, quest_id: &str) -> bool {
        self.completed_quests.iter().any(|q| q == quest_id)
    }

    pub fn accept_quest(&mut self, quest_id: &str) {
        if !self.quest_active(quest_id) && !self.quest_completed(quest_id) {
            self.active_quests.push(quest_id.to_string());
        }
    }

    pub fn complete_quest(&mut self, quest_id: &str) {
        self.active_quests.retain(|q| q != quest_id);
        if !self.quest_completed(quest_id) {
            self.completed_quests.push(quest_id.to_string());
        }
    }
}
