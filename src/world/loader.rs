//! Game-definition loading.
//!
//! A game lives in a directory: `game.toml` carries metadata and the
//! per-game schemas (player template, equipment slots, economy, authority,
//! win conditions) while the entity tables are JSON files alongside it
//! (`rooms.json`, `items.json`, `characters.json`, `quests.json`,
//! `recipes.json`). Everything loads into read-only id-keyed maps; the
//! session makes its own mutable copy.
//!
//! Loading ends with cross-reference validation so a broken world fails
//! fast with a named culprit instead of surfacing mid-session.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;
use thiserror::Error;

use super::types::{
    AuthorityProfile, CharacterRecord, CraftingRecipe, EconomySchema, EquipmentSchema, ItemRecord,
    QuestObjective, QuestRecord, RoomRecord, WinCondition,
};

/// Errors raised while loading or validating a game definition.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("duplicate {entity} id: {id}")]
    DuplicateId { entity: &'static str, id: String },

    #[error("{referrer} references unknown room '{room}'")]
    UnknownRoom { referrer: String, room: String },

    #[error("{referrer} references unknown item '{item}'")]
    UnknownItem { referrer: String, item: String },

    #[error("{referrer} references unknown character '{character}'")]
    UnknownCharacter { referrer: String, character: String },

    #[error("{referrer} references unknown quest '{quest}'")]
    UnknownQuest { referrer: String, quest: String },

    #[error("starting room '{0}' does not exist")]
    MissingStartingRoom(String),
}

/// Game metadata from the `[meta]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct GameMeta {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub starting_room: String,
    #[serde(default = "default_victory_message")]
    pub victory_message: String,
    #[serde(default = "default_defeat_message")]
    pub defeat_message: String,
}

fn default_victory_message() -> String {
    "You have won.".to_string()
}

fn default_defeat_message() -> String {
    "You have been defeated. Your story ends here.".to_string()
}

/// Player template from the `[player]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerTemplate {
    pub name: String,
    pub health: i32,
    pub strength: i32,
    pub agility: i32,
    #[serde(default)]
    pub armor: i32,
    #[serde(default)]
    pub currency: i64,
    #[serde(default)]
    pub items: HashMap<String, u32>,
    #[serde(default)]
    pub skills: HashMap<String, i32>,
}

#[derive(Debug, Deserialize)]
struct GameManifest {
    meta: GameMeta,
    player: PlayerTemplate,
    #[serde(default)]
    equipment: Option<EquipmentSchema>,
    #[serde(default)]
    economy: Option<EconomySchema>,
    #[serde(default)]
    authority: AuthorityProfile,
    #[serde(default)]
    win_conditions: Vec<WinCondition>,
}

/// A fully loaded, validated, immutable game definition.
#[derive(Debug, Clone)]
pub struct GameDefinition {
    pub meta: GameMeta,
    pub player: PlayerTemplate,
    pub rooms: HashMap<String, RoomRecord>,
    pub items: HashMap<String, ItemRecord>,
    pub characters: HashMap<String, CharacterRecord>,
    pub quests: HashMap<String, QuestRecord>,
    pub recipes: HashMap<String, CraftingRecipe>,
    pub equipment: EquipmentSchema,
    pub economy: EconomySchema,
    pub authority: AuthorityProfile,
    pub win_conditions: Vec<WinCondition>,
}

impl GameDefinition {
    /// Load a game from a directory and validate every cross-reference.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, LoadError> {
        let dir = dir.as_ref();

        let manifest_path = dir.join("game.toml");
        let manifest_text = read(&manifest_path)?;
        let manifest: GameManifest =
            toml::from_str(&manifest_text).map_err(|e| LoadError::Parse {
                path: manifest_path,
                message: e.to_string(),
            })?;

        let rooms = index("room", load_json::<RoomRecord>(&dir.join("rooms.json"))?, |r| {
            r.id.clone()
        })?;
        let items = index("item", load_json::<ItemRecord>(&dir.join("items.json"))?, |i| {
            i.id.clone()
        })?;
        let characters = index(
            "character",
            load_json::<CharacterRecord>(&dir.join("characters.json"))?,
            |c| c.id.clone(),
        )?;
        let quests = index(
            "quest",
            load_json_optional::<QuestRecord>(&dir.join("quests.json"))?,
            |q| q.id.clone(),
        )?;
        let recipes = index(
            "recipe",
            load_json_optional::<CraftingRecipe>(&dir.join("recipes.json"))?,
            |r| r.id.clone(),
        )?;

        let game = Self {
            meta: manifest.meta,
            player: manifest.player,
            rooms,
            items,
            characters,
            quests,
            recipes,
            equipment: manifest.equipment.unwrap_or_default(),
            economy: manifest.economy.unwrap_or_default(),
            authority: manifest.authority,
            win_conditions: manifest.win_conditions,
        };
        game.validate()?;

        info!(
            "loaded game '{}': {} rooms, {} items, {} characters, {} quests, {} recipes",
            game.meta.name,
            game.rooms.len(),
            game.items.len(),
            game.characters.len(),
            game.quests.len(),
            game.recipes.len()
        );
        Ok(game)
    }

    /// Check every cross-reference in the loaded tables.
    pub fn validate(&self) -> Result<(), LoadError> {
        if !self.rooms.contains_key(&self.meta.starting_room) {
            return Err(LoadError::MissingStartingRoom(
                self.meta.starting_room.clone(),
            ));
        }

        for room in self.rooms.values() {
            for exit in &room.exits {
                if !self.rooms.contains_key(&exit.to) {
                    return Err(LoadError::UnknownRoom {
                        referrer: format!("exit '{}' of room '{}'", exit.name, room.id),
                        room: exit.to.clone(),
                    });
                }
                if let Some(key) = &exit.key_item {
                    self.check_item(key, || {
                        format!("exit '{}' of room '{}'", exit.name, room.id)
                    })?;
                }
            }
            for id in &room.characters {
                if !self.characters.contains_key(id) {
                    return Err(LoadError::UnknownCharacter {
                        referrer: format!("room '{}'", room.id),
                        character: id.clone(),
                    });
                }
            }
            for item_id in room.items.keys() {
                self.check_item(item_id, || format!("room '{}'", room.id))?;
            }
            for node in &room.resources {
                self.check_item(&node.item_id, || {
                    format!("resource '{}' in room '{}'", node.name, room.id)
                })?;
                if let Some(tool) = &node.required_tool {
                    self.check_item(tool, || {
                        format!("resource '{}' in room '{}'", node.name, room.id)
                    })?;
                }
            }
        }

        for character in self.characters.values() {
            for item_id in character.items.keys() {
                self.check_item(item_id, || format!("character '{}'", character.id))?;
            }
            for related in &character.relationships {
                if !self.characters.contains_key(related) {
                    return Err(LoadError::UnknownCharacter {
                        referrer: format!("relationships of character '{}'", character.id),
                        character: related.clone(),
                    });
                }
            }
        }

        for item in self.items.values() {
            if let Some(room) = &item.teleport_to {
                if !self.rooms.contains_key(room) {
                    return Err(LoadError::UnknownRoom {
                        referrer: format!("teleport item '{}'", item.id),
                        room: room.clone(),
                    });
                }
            }
        }

        for recipe in self.recipes.values() {
            self.check_item(&recipe.result_item_id, || format!("recipe '{}'", recipe.id))?;
            for material in &recipe.materials {
                self.check_item(&material.item_id, || format!("recipe '{}'", recipe.id))?;
            }
        }

        for quest in self.quests.values() {
            let referrer = || format!("quest '{}'", quest.id);
            match &quest.objective {
                QuestObjective::ReachRoom { room_id } => {
                    if !self.rooms.contains_key(room_id) {
                        return Err(LoadError::UnknownRoom {
                            referrer: referrer(),
                            room: room_id.clone(),
                        });
                    }
                }
                QuestObjective::ObtainItem { item_id, .. } => {
                    self.check_item(item_id, referrer)?;
                }
                QuestObjective::DefeatCharacter { character_id }
                | QuestObjective::TalkTo { character_id } => {
                    self.check_character(character_id, referrer)?;
                }
            }
            if let Some(giver) = &quest.giver {
                self.check_character(giver, referrer)?;
            }
            for item_id in quest.reward_items.keys() {
                self.check_item(item_id, referrer)?;
            }
        }

        for (idx, condition) in self.win_conditions.iter().enumerate() {
            let referrer = || format!("win condition #{}", idx + 1);
            match condition {
                WinCondition::RoomReached { room_id } => {
                    if !self.rooms.contains_key(room_id) {
                        return Err(LoadError::UnknownRoom {
                            referrer: referrer(),
                            room: room_id.clone(),
                        });
                    }
                }
                WinCondition::ItemHeld { item_id } => self.check_item(item_id, referrer)?,
                WinCondition::CharacterDefeated { character_id } => {
                    self.check_character(character_id, referrer)?
                }
                WinCondition::QuestComplete { quest_id } => {
                    if !self.quests.contains_key(quest_id) {
                        return Err(LoadError::UnknownQuest {
                            referrer: referrer(),
                            quest: quest_id.clone(),
                        });
                    }
                }
            }
        }

        for item_id in self.player.items.keys() {
            self.check_item(item_id, || "player template".to_string())?;
        }

        Ok(())
    }

    fn check_item(&self, id: &str, referrer: impl FnOnce() -> String) -> Result<(), LoadError> {
        if self.items.contains_key(id) {
            Ok(())
        } else {
            Err(LoadError::UnknownItem {
                referrer: referrer(),
                item: id.to_string(),
            })
        }
    }

    fn check_character(
        &self,
        id: &str,
        referrer: impl FnOnce() -> String,
    ) -> Result<(), LoadError> {
        if self.characters.contains_key(id) {
            Ok(())
        } else {
            Err(LoadError::UnknownCharacter {
                referrer: referrer(),
                character: id.to_string(),
            })
        }
    }
}

fn read(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn load_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, LoadError> {
    let text = read(path)?;
    serde_json::from_str(&text).map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Like [`load_json`] but a missing file is an empty table. Quests and
/// recipes are optional; rooms, items, and characters are not.
fn load_json_optional<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, LoadError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    load_json(path)
}

fn index<T>(
    entity: &'static str,
    records: Vec<T>,
    id_of: impl Fn(&T) -> String,
) -> Result<HashMap<String, T>, LoadError> {
    let mut map = HashMap::with_capacity(records.len());
    for record in records {
        let id = id_of(&record);
        if map.insert(id.clone(), record).is_some() {
            return Err(LoadError::DuplicateId { entity, id });
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::types::{ExitRecord, ItemKind};

    fn minimal_game() -> GameDefinition {
        let mut rooms = HashMap::new();
        rooms.insert(
            "square".to_string(),
            RoomRecord::new("square", "Town Square", "A quiet square."),
        );
        GameDefinition {
            meta: GameMeta {
                name: "Test".to_string(),
                description: String::new(),
                starting_room: "square".to_string(),
                victory_message: default_victory_message(),
                defeat_message: default_defeat_message(),
            },
            player: PlayerTemplate {
                name: "Hero".to_string(),
                health: 30,
                strength: 10,
                agility: 10,
                armor: 0,
                currency: 0,
                items: HashMap::new(),
                skills: HashMap::new(),
            },
            rooms,
            items: HashMap::new(),
            characters: HashMap::new(),
            quests: HashMap::new(),
            recipes: HashMap::new(),
            equipment: EquipmentSchema::default(),
            economy: EconomySchema::default(),
            authority: AuthorityProfile::default(),
            win_conditions: Vec::new(),
        }
    }

    #[test]
    fn minimal_game_validates() {
        assert!(minimal_game().validate().is_ok());
    }

    #[test]
    fn dangling_exit_is_rejected() {
        let mut game = minimal_game();
        game.rooms
            .get_mut("square")
            .unwrap()
            .exits
            .push(ExitRecord::new("North", "nowhere"));

        match game.validate() {
            Err(LoadError::UnknownRoom { room, .. }) => assert_eq!(room, "nowhere"),
            other => panic!("expected UnknownRoom, got {:?}", other),
        }
    }

    #[test]
    fn missing_starting_room_is_rejected() {
        let mut game = minimal_game();
        game.meta.starting_room = "void".to_string();
        assert!(matches!(
            game.validate(),
            Err(LoadError::MissingStartingRoom(_))
        ));
    }

    #[test]
    fn recipe_with_unknown_material_is_rejected() {
        let mut game = minimal_game();
        game.items.insert(
            "blade".to_string(),
            ItemRecord::new("blade", "Blade", ItemKind::Weapon),
        );
        game.recipes.insert(
            "blade".to_string(),
            CraftingRecipe::new("blade", "Blade", "blade").with_material("iron_ore", 3),
        );
        assert!(matches!(
            game.validate(),
            Err(LoadError::UnknownItem { item, .. }) if item == "iron_ore"
        ));
    }

    #[test]
    fn character_in_room_must_exist() {
        let mut game = minimal_game();
        game.rooms.get_mut("square").unwrap().characters.push("ghost".to_string());
        assert!(matches!(
            game.validate(),
            Err(LoadError::UnknownCharacter { character, .. }) if character == "ghost"
        ));
    }
}
