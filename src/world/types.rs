//! Core world records: rooms, characters, items, quests, recipes, and the
//! per-game schemas (equipment slots, economy, authority) that the loader
//! assembles into a [`crate::world::loader::GameDefinition`].
//!
//! Records are plain serde structs. Item records are immutable templates;
//! quantities are tracked by whoever holds them. Characters are mutable and
//! never destroyed: a defeated character stays in its room as an immobile,
//! lootable body.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Character alignment, used by the bystander-intervention heuristic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Friendly,
    #[default]
    Neutral,
    Hostile,
}

/// Item categories. The closed set drives handler behavior: consumables
/// heal, keys unlock, teleport items relocate, materials feed recipes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Weapon,
    Armor,
    Key,
    Teleport,
    Consumable,
    Quest,
    Material,
    Tool,
    Misc,
}

/// An exit from a room. Availability may toggle at runtime (locks);
/// `closed_reason` is shown when a player tries a closed exit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExitRecord {
    /// Display name the player refers to ("North", "Old Oak Door").
    pub name: String,
    /// Destination room id. Must resolve to an existing room.
    pub to: String,
    #[serde(default = "default_true")]
    pub open: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_reason: Option<String>,
    /// Item id of the key that opens this exit, if locked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_item: Option<String>,
}

fn default_true() -> bool {
    true
}

impl ExitRecord {
    pub fn new(name: &str, to: &str) -> Self {
        Self {
            name: name.to_string(),
            to: to.to_string(),
            open: true,
            closed_reason: None,
            key_item: None,
        }
    }

    pub fn locked(name: &str, to: &str, reason: &str, key_item: &str) -> Self {
        Self {
            name: name.to_string(),
            to: to.to_string(),
            open: false,
            closed_reason: Some(reason.to_string()),
            key_item: Some(key_item.to_string()),
        }
    }
}

/// A gatherable resource node declared by a room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceNode {
    /// Item granted on a successful gather.
    pub item_id: String,
    /// Display name ("iron vein", "bramble of ripe berries").
    pub name: String,
    /// Base success chance in percent, before skill bonus.
    pub base_chance: i32,
    /// Skill whose level adds to the success chance, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill: Option<String>,
    /// Tool item that must be carried to attempt the gather.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_tool: Option<String>,
    /// Renewable nodes never deplete; non-renewable ones count down
    /// `charges` and respawn after `respawn_turns` world turns.
    #[serde(default)]
    pub renewable: bool,
    #[serde(default = "default_charges")]
    pub charges: u32,
    #[serde(default)]
    pub respawn_turns: u32,
}

fn default_charges() -> u32 {
    3
}

/// A room: description, exits, present characters, gatherable resources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub exits: Vec<ExitRecord>,
    /// Ids of characters currently in the room. Mutates as characters
    /// move; defeated characters stay listed.
    #[serde(default)]
    pub characters: Vec<String>,
    /// Loose items on the ground: item id -> quantity. Dropped items
    /// land here and can be taken back.
    #[serde(default)]
    pub items: HashMap<String, u32>,
    /// Free-form metadata ("station" = "forge", "shop" = "smithy", ...).
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub resources: Vec<ResourceNode>,
}

impl RoomRecord {
    pub fn new(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            exits: Vec::new(),
            characters: Vec::new(),
            items: HashMap::new(),
            metadata: HashMap::new(),
            resources: Vec::new(),
        }
    }

    pub fn with_exit(mut self, exit: ExitRecord) -> Self {
        self.exits.push(exit);
        self
    }

    pub fn with_character(mut self, id: &str) -> Self {
        if !self.characters.iter().any(|c| c == id) {
            self.characters.push(id.to_string());
        }
        self
    }

    /// Station declared by this room's metadata, if any. Recipes that
    /// require a station can only be crafted where one is present.
    pub fn station(&self) -> Option<&str> {
        self.metadata.get("station").map(String::as_str)
    }
}

/// A currency wallet: a normalized integer amount. Display (name,
/// symbol) comes from the game's [`EconomySchema`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Wallet {
    pub amount: i64,
}

impl Wallet {
    pub fn new(amount: i64) -> Self {
        Self { amount }
    }

    pub fn can_afford(&self, cost: i64) -> bool {
        self.amount >= cost
    }

    /// Deduct `cost`; returns false (and leaves the wallet untouched)
    /// when funds are insufficient.
    pub fn spend(&mut self, cost: i64) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        self.amount -= cost;
        true
    }

    pub fn receive(&mut self, amount: i64) {
        self.amount = self.amount.saturating_add(amount.max(0));
    }
}

/// A character: the player or any NPC. Mutated by combat, trade, loot,
/// and equip operations; never removed from the world.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CharacterRecord {
    pub id: String,
    pub name: String,
    pub health: i32,
    pub max_health: i32,
    pub strength: i32,
    pub agility: i32,
    /// Base armor before equipped bonuses.
    pub armor: i32,
    /// Carried items: item id -> quantity.
    #[serde(default)]
    pub items: HashMap<String, u32>,
    /// Equipped gear: slot name -> item id.
    #[serde(default)]
    pub equipped: HashMap<String, String>,
    #[serde(default)]
    pub wallet: Wallet,
    #[serde(default)]
    pub alignment: Alignment,
    /// Cleared on defeat; a body cannot wander off.
    #[serde(default = "default_true")]
    pub can_move: bool,
    /// Whether this NPC is willing to join the player's party.
    #[serde(default)]
    pub will_join_party: bool,
    /// Vendors trade with the player; their carried items are the stock.
    #[serde(default)]
    pub vendor: bool,
    /// Persona hint handed to the dialogue prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality: Option<String>,
    /// Ids of characters this one will defend when attacked.
    #[serde(default)]
    pub relationships: Vec<String>,
    /// Skill name -> level, feeds gathering bonuses.
    #[serde(default)]
    pub skills: HashMap<String, i32>,
    #[serde(default)]
    pub experience: u32,
}

impl CharacterRecord {
    pub fn new(id: &str, name: &str, health: i32, strength: i32, agility: i32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            health,
            max_health: health,
            strength,
            agility,
            armor: 0,
            items: HashMap::new(),
            equipped: HashMap::new(),
            wallet: Wallet::default(),
            alignment: Alignment::Neutral,
            can_move: true,
            will_join_party: false,
            vendor: false,
            personality: None,
            relationships: Vec::new(),
            skills: HashMap::new(),
            experience: 0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Apply damage, clamping health to [0, max]. Returns true when the
    /// blow was fatal. A freshly defeated character loses its ability to
    /// move but keeps everything it carries.
    pub fn apply_damage(&mut self, damage: i32) -> bool {
        let was_alive = self.is_alive();
        self.health = (self.health - damage.max(0)).clamp(0, self.max_health);
        if was_alive && !self.is_alive() {
            self.can_move = false;
            true
        } else {
            false
        }
    }

    /// Heal, clamping to max health. Returns the amount actually healed.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.health;
        self.health = (self.health + amount.max(0)).clamp(0, self.max_health);
        self.health - before
    }

    pub fn skill_level(&self, skill: &str) -> i32 {
        self.skills.get(skill).copied().unwrap_or(0)
    }

    /// Id of the item equipped in `slot`, if any.
    pub fn equipped_in(&self, slot: &str) -> Option<&str> {
        self.equipped.get(slot).map(String::as_str)
    }
}

/// An immutable item template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub kind: ItemKind,
    #[serde(default)]
    pub damage_bonus: i32,
    #[serde(default)]
    pub armor_bonus: i32,
    /// Base price in normalized currency units.
    #[serde(default)]
    pub base_price: i64,
    #[serde(default = "default_true")]
    pub tradable: bool,
    /// Explicit equip slot. When absent, the equipment schema's keyword
    /// table decides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<String>,
    /// Health restored when consumed.
    #[serde(default)]
    pub heal_amount: i32,
    /// Destination room for teleport items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teleport_to: Option<String>,
    #[serde(default = "default_true")]
    pub stackable: bool,
}

impl ItemRecord {
    pub fn new(id: &str, name: &str, kind: ItemKind) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            kind,
            damage_bonus: 0,
            armor_bonus: 0,
            base_price: 0,
            tradable: true,
            slot: None,
            heal_amount: 0,
            teleport_to: None,
            stackable: true,
        }
    }

    pub fn is_equippable(&self) -> bool {
        matches!(self.kind, ItemKind::Weapon | ItemKind::Armor) || self.slot.is_some()
    }
}

/// What a quest asks the player to do.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum QuestObjective {
    ReachRoom { room_id: String },
    ObtainItem { item_id: String, quantity: u32 },
    DefeatCharacter { character_id: String },
    TalkTo { character_id: String },
}

/// A quest definition with its rewards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// NPC that hands the quest out, when talked to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub giver: Option<String>,
    pub objective: QuestObjective,
    #[serde(default)]
    pub reward_currency: i64,
    #[serde(default)]
    pub reward_items: HashMap<String, u32>,
    #[serde(default)]
    pub reward_experience: u32,
}

/// One ingredient line of a crafting recipe. Tools are checked but not
/// consumed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeMaterial {
    pub item_id: String,
    pub quantity: u32,
    #[serde(default = "default_true")]
    pub consumed: bool,
}

/// A crafting recipe: materials in, result out, optionally gated on a
/// room station.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CraftingRecipe {
    pub id: String,
    pub name: String,
    pub result_item_id: String,
    #[serde(default = "default_result_quantity")]
    pub result_quantity: u32,
    #[serde(default)]
    pub materials: Vec<RecipeMaterial>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_station: Option<String>,
    #[serde(default)]
    pub description: String,
}

fn default_result_quantity() -> u32 {
    1
}

impl CraftingRecipe {
    pub fn new(id: &str, name: &str, result_item_id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            result_item_id: result_item_id.to_string(),
            result_quantity: 1,
            materials: Vec::new(),
            requires_station: None,
            description: String::new(),
        }
    }

    pub fn with_material(mut self, item_id: &str, quantity: u32) -> Self {
        self.materials.push(RecipeMaterial {
            item_id: item_id.to_string(),
            quantity,
            consumed: true,
        });
        self
    }

    pub fn with_tool(mut self, item_id: &str) -> Self {
        self.materials.push(RecipeMaterial {
            item_id: item_id.to_string(),
            quantity: 1,
            consumed: false,
        });
        self
    }

    pub fn with_station(mut self, station: &str) -> Self {
        self.requires_station = Some(station.to_string());
        self
    }
}

/// Equipment-slot schema: the slot names a game uses plus keyword hints
/// for items that don't declare an explicit slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EquipmentSchema {
    pub slots: Vec<String>,
    /// slot name -> keywords matched against item names ("sword" ->
    /// "main_hand").
    #[serde(default)]
    pub keywords: HashMap<String, Vec<String>>,
}

impl Default for EquipmentSchema {
    fn default() -> Self {
        let mut keywords = HashMap::new();
        keywords.insert(
            "main_hand".to_string(),
            vec![
                "sword".to_string(),
                "axe".to_string(),
                "dagger".to_string(),
                "staff".to_string(),
                "club".to_string(),
            ],
        );
        keywords.insert(
            "body".to_string(),
            vec![
                "armor".to_string(),
                "mail".to_string(),
                "robe".to_string(),
                "tunic".to_string(),
            ],
        );
        Self {
            slots: vec!["main_hand".to_string(), "body".to_string()],
            keywords,
        }
    }
}

impl EquipmentSchema {
    /// Resolve the slot for an item: explicit slot first, then the first
    /// slot whose keyword list matches the item name, falling back on
    /// the item kind's natural slot.
    pub fn slot_for(&self, item: &ItemRecord) -> Option<String> {
        if let Some(slot) = &item.slot {
            return Some(slot.clone());
        }
        let name = item.name.to_lowercase();
        for slot in &self.slots {
            if let Some(words) = self.keywords.get(slot) {
                if words.iter().any(|w| name.contains(w.as_str())) {
                    return Some(slot.clone());
                }
            }
        }
        match item.kind {
            ItemKind::Weapon => self.slots.first().cloned(),
            ItemKind::Armor => self.slots.get(1).cloned().or_else(|| self.slots.first().cloned()),
            _ => None,
        }
    }
}

/// Economy schema: currency display plus the sell-back ratio applied
/// when the player sells to a vendor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EconomySchema {
    pub currency_name: String,
    pub currency_symbol: String,
    /// Vendors pay base_price * sell_ratio when buying from the player.
    pub sell_ratio: f64,
    /// Vendors charge base_price * buy_markup when selling to the player.
    pub buy_markup: f64,
}

impl Default for EconomySchema {
    fn default() -> Self {
        Self {
            currency_name: "gold".to_string(),
            currency_symbol: "g".to_string(),
            sell_ratio: 0.5,
            buy_markup: 1.0,
        }
    }
}

impl EconomySchema {
    pub fn format_amount(&self, amount: i64) -> String {
        format!("{}{}", amount, self.currency_symbol)
    }
}

/// Authority profile: how much the engine may invent beyond predefined
/// data when asked for something the tables don't cover.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AuthorityProfile {
    /// Allow the generative service to judge gather attempts in rooms
    /// with no declared resource nodes.
    #[serde(default)]
    pub dynamic_gathering: bool,
}

/// A global win condition checked after every turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum WinCondition {
    RoomReached { room_id: String },
    ItemHeld { item_id: String },
    CharacterDefeated { character_id: String },
    QuestComplete { quest_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damage_clamps_at_zero_and_reports_defeat() {
        let mut npc = CharacterRecord::new("goblin", "Goblin", 10, 8, 12);
        assert!(!npc.apply_damage(4));
        assert_eq!(npc.health, 6);
        assert!(npc.apply_damage(100));
        assert_eq!(npc.health, 0);
        assert!(!npc.is_alive());
        assert!(!npc.can_move);
        // Further damage is not a second defeat.
        assert!(!npc.apply_damage(5));
        assert_eq!(npc.health, 0);
    }

    #[test]
    fn heal_clamps_at_max() {
        let mut c = CharacterRecord::new("p", "P", 20, 10, 10);
        c.health = 15;
        assert_eq!(c.heal(50), 5);
        assert_eq!(c.health, 20);
    }

    #[test]
    fn wallet_spend_is_all_or_nothing() {
        let mut w = Wallet::new(10);
        assert!(!w.spend(11));
        assert_eq!(w.amount, 10);
        assert!(w.spend(10));
        assert_eq!(w.amount, 0);
    }

    #[test]
    fn slot_resolution_prefers_explicit_slot() {
        let schema = EquipmentSchema::default();
        let mut item = ItemRecord::new("ring", "Plain Ring", ItemKind::Misc);
        item.slot = Some("finger".to_string());
        assert_eq!(schema.slot_for(&item), Some("finger".to_string()));
    }

    #[test]
    fn slot_resolution_uses_keywords_then_kind() {
        let schema = EquipmentSchema::default();
        let sword = ItemRecord::new("s", "Rusty Sword", ItemKind::Weapon);
        assert_eq!(schema.slot_for(&sword), Some("main_hand".to_string()));

        let robe = ItemRecord::new("r", "Traveler's Robe", ItemKind::Armor);
        assert_eq!(schema.slot_for(&robe), Some("body".to_string()));

        // No keyword match: kind decides.
        let flail = ItemRecord::new("f", "Morningstar", ItemKind::Weapon);
        assert_eq!(schema.slot_for(&flail), Some("main_hand".to_string()));

        let potion = ItemRecord::new("p", "Potion", ItemKind::Consumable);
        assert_eq!(schema.slot_for(&potion), None);
    }

    #[test]
    fn locked_exit_round_trips_through_serde() {
        let exit = ExitRecord::locked("Iron Gate", "crypt", "The gate is chained shut.", "iron_key");
        let json = serde_json::to_string(&exit).unwrap();
        let back: ExitRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(exit, back);
        assert!(!back.open);
    }
}
