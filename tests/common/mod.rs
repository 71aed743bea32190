//! Shared fixtures for the integration suites: a small, fully
//! cross-referenced game definition built in code.

use std::collections::HashMap;

use taleforge::world::loader::{GameDefinition, GameMeta, PlayerTemplate};
use taleforge::world::types::{
    Alignment, AuthorityProfile, CharacterRecord, CraftingRecipe, EconomySchema, EquipmentSchema,
    ExitRecord, ItemKind, ItemRecord, QuestObjective, QuestRecord, ResourceNode, RoomRecord,
    Wallet, WinCondition,
};

/// A two-room test world: a square with a smith vendor and a wolf den
/// with a hostile wolf. The crown in the den is the win condition.
pub fn test_game() -> GameDefinition {
    let mut rooms = HashMap::new();
    rooms.insert(
        "square".to_string(),
        RoomRecord::new("square", "Square", "A small cobbled square.")
            .with_exit(ExitRecord::new("North", "den"))
            .with_exit(ExitRecord::locked(
                "East",
                "vault",
                "A banded door is locked.",
                "vault_key",
            ))
            .with_character("smith"),
    );
    let mut den = RoomRecord::new("den", "Wolf Den", "Bones and grey fur everywhere.")
        .with_exit(ExitRecord::new("South", "square"))
        .with_character("wolf");
    den.items.insert("crown".to_string(), 1);
    den.resources.push(ResourceNode {
        item_id: "ore".to_string(),
        name: "ore seam".to_string(),
        base_chance: 100,
        skill: Some("mining".to_string()),
        required_tool: None,
        renewable: false,
        charges: 2,
        respawn_turns: 4,
    });
    rooms.insert("den".to_string(), den);
    rooms.insert(
        "vault".to_string(),
        RoomRecord::new("vault", "Vault", "Dust and empty shelves."),
    );

    let mut items = HashMap::new();
    let mut sword = ItemRecord::new("sword", "Iron Sword", ItemKind::Weapon);
    sword.damage_bonus = 4;
    sword.base_price = 20;
    items.insert("sword".to_string(), sword);

    let mut jerkin = ItemRecord::new("jerkin", "Leather Jerkin", ItemKind::Armor);
    jerkin.armor_bonus = 4;
    jerkin.base_price = 12;
    items.insert("jerkin".to_string(), jerkin);

    let mut draught = ItemRecord::new("draught", "Healing Draught", ItemKind::Consumable);
    draught.heal_amount = 10;
    draught.base_price = 6;
    items.insert("draught".to_string(), draught);

    let mut key = ItemRecord::new("vault_key", "Vault Key", ItemKind::Key);
    key.tradable = false;
    items.insert("vault_key".to_string(), key);

    let mut crown = ItemRecord::new("crown", "Old Crown", ItemKind::Quest);
    crown.tradable = false;
    items.insert("crown".to_string(), crown);

    items.insert(
        "ore".to_string(),
        ItemRecord::new("ore", "Iron Ore", ItemKind::Material),
    );
    items.insert(
        "pelt".to_string(),
        ItemRecord::new("pelt", "Wolf Pelt", ItemKind::Material),
    );

    let mut characters = HashMap::new();
    let mut smith = CharacterRecord::new("smith", "Bela the Smith", 22, 13, 9);
    smith.vendor = true;
    smith.will_join_party = false;
    smith.alignment = Alignment::Friendly;
    smith.wallet = Wallet::new(100);
    smith.items.insert("sword".to_string(), 1);
    smith.items.insert("jerkin".to_string(), 1);
    smith.items.insert("draught".to_string(), 2);
    smith.items.insert("vault_key".to_string(), 1);
    characters.insert("smith".to_string(), smith);

    let mut wolf = CharacterRecord::new("wolf", "Grey Wolf", 14, 9, 11);
    wolf.alignment = Alignment::Hostile;
    wolf.armor = 1;
    wolf.wallet = Wallet::new(7);
    wolf.items.insert("pelt".to_string(), 1);
    characters.insert("wolf".to_string(), wolf);

    let mut quests = HashMap::new();
    quests.insert(
        "crown_quest".to_string(),
        QuestRecord {
            id: "crown_quest".to_string(),
            name: "The Old Crown".to_string(),
            description: "Bring back the crown from the den.".to_string(),
            giver: Some("smith".to_string()),
            objective: QuestObjective::ObtainItem {
                item_id: "crown".to_string(),
                quantity: 1,
            },
            reward_currency: 25,
            reward_items: HashMap::new(),
            reward_experience: 10,
        },
    );

    let mut recipes = HashMap::new();
    recipes.insert(
        "sword".to_string(),
        CraftingRecipe::new("sword", "Iron Sword", "sword").with_material("ore", 3),
    );

    GameDefinition {
        meta: GameMeta {
            name: "Testfall".to_string(),
            description: "A test world.".to_string(),
            starting_room: "square".to_string(),
            victory_message: "The crown is yours. You have won.".to_string(),
            defeat_message: "You have been defeated.".to_string(),
        },
        player: PlayerTemplate {
            name: "Hero".to_string(),
            health: 30,
            strength: 12,
            agility: 12,
            armor: 0,
            currency: 30,
            items: HashMap::new(),
            skills: {
                let mut skills = HashMap::new();
                skills.insert("mining".to_string(), 5);
                skills
            },
        },
        rooms,
        items,
        characters,
        quests,
        recipes,
        equipment: EquipmentSchema::default(),
        economy: EconomySchema::default(),
        authority: AuthorityProfile {
            dynamic_gathering: false,
        },
        win_conditions: vec![WinCondition::ItemHeld {
            item_id: "crown".to_string(),
        }],
    }
}
