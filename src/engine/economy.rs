//! Vendor trade: shop listings, buying, selling.
//!
//! A vendor is any NPC with the vendor flag; its carried items are its
//! stock and its wallet is its till. Prices come from the item table and
//! the game's economy schema (markup when the player buys, sell-back
//! ratio when the player sells). Every trade verifies funds and stock
//! first and only then moves anything, so a failed trade changes nothing.

use crate::world::inventory;
use crate::world::loader::GameDefinition;
use crate::world::state::WorldState;

use super::matcher::{self, Match};

/// First living vendor in the current room, if any.
pub fn vendor_in_room(world: &WorldState) -> Option<String> {
    world
        .npcs_in_current_room()
        .into_iter()
        .find(|id| {
            world
                .character(id)
                .map(|c| c.vendor && c.is_alive())
                .unwrap_or(false)
        })
}

/// Price the player pays per unit when buying.
pub fn buy_price(game: &GameDefinition, base_price: i64) -> i64 {
    ((base_price as f64) * game.economy.buy_markup).round() as i64
}

/// Price the vendor pays per unit when the player sells.
pub fn sell_price(game: &GameDefinition, base_price: i64) -> i64 {
    ((base_price as f64) * game.economy.sell_ratio).floor() as i64
}

/// List the wares of the vendor in the current room.
pub fn format_wares(world: &WorldState, game: &GameDefinition) -> Result<String, String> {
    let vendor_id = vendor_in_room(world).ok_or("There is no one here to trade with.")?;
    let vendor = world
        .character(&vendor_id)
        .ok_or("There is no one here to trade with.")?;

    let mut lines = vec![format!("{} offers:", vendor.name)];
    let mut stock: Vec<(&String, &u32)> = vendor.items.iter().collect();
    stock.sort_by_key(|(id, _)| {
        game.items
            .get(*id)
            .map(|i| i.name.clone())
            .unwrap_or_else(|| (*id).clone())
    });

    let mut any = false;
    for (item_id, qty) in stock {
        let Some(item) = game.items.get(item_id) else {
            continue;
        };
        if !item.tradable {
            continue;
        }
        any = true;
        lines.push(format!(
            "  {} x{} - {} each",
            item.name,
            qty,
            game.economy.format_amount(buy_price(game, item.base_price))
        ));
    }
    if !any {
        lines.push("  (nothing for sale)".to_string());
    }
    lines.push(format!(
        "You have {}.",
        game.economy.format_amount(world.player().wallet.amount)
    ));
    Ok(lines.join("\n"))
}

/// Buy one unit of an item from the vendor in the current room.
pub fn buy(world: &mut WorldState, game: &GameDefinition, query: &str) -> Result<String, String> {
    let vendor_id = vendor_in_room(world).ok_or("There is no one here to sell to you.")?;
    let vendor = world
        .character(&vendor_id)
        .ok_or("There is no one here to sell to you.")?;

    let stock: Vec<(String, String)> = vendor
        .items
        .keys()
        .filter_map(|id| {
            game.items
                .get(id)
                .map(|item| (id.clone(), item.name.clone()))
        })
        .collect();

    let item_id = match matcher::resolve(query, &stock) {
        Match::One(id) => id,
        Match::Ambiguous(ids) => {
            let names: Vec<String> = ids
                .iter()
                .filter_map(|id| game.items.get(id).map(|i| i.name.clone()))
                .collect();
            return Err(format!(
                "Which one do you mean: {}?",
                names.join(", ")
            ));
        }
        Match::NotFound => {
            let vendor_name = vendor.name.clone();
            return Err(format!("{} has no '{}' for sale.", vendor_name, query));
        }
    };

    let item = game
        .items
        .get(&item_id)
        .ok_or("That item does not exist.")?;
    if !item.tradable {
        return Err(format!("The {} is not for sale.", item.name));
    }
    let price = buy_price(game, item.base_price);
    if !world.player().wallet.can_afford(price) {
        return Err(format!(
            "You cannot afford the {} ({}; you have {}).",
            item.name,
            game.economy.format_amount(price),
            game.economy.format_amount(world.player().wallet.amount)
        ));
    }

    // Checks passed: move the money, then the goods.
    if !world.player_mut().wallet.spend(price) {
        return Err("You cannot afford that.".to_string());
    }
    if let Some(vendor) = world.character_mut(&vendor_id) {
        vendor.wallet.receive(price);
        inventory::remove_item(vendor, &item_id, 1);
    }
    inventory::add_item(world.player_mut(), &item_id, 1);

    Ok(format!(
        "You buy the {} for {}.",
        item.name,
        game.economy.format_amount(price)
    ))
}

/// Sell one unit of a carried item to the vendor in the current room.
pub fn sell(world: &mut WorldState, game: &GameDefinition, query: &str) -> Result<String, String> {
    let vendor_id = vendor_in_room(world).ok_or("There is no one here to buy from you.")?;

    let carried: Vec<(String, String)> = world
        .player()
        .items
        .keys()
        .filter_map(|id| {
            game.items
                .get(id)
                .map(|item| (id.clone(), item.name.clone()))
        })
        .collect();

    let item_id = match matcher::resolve(query, &carried) {
        Match::One(id) => id,
        Match::Ambiguous(ids) => {
            let names: Vec<String> = ids
                .iter()
                .filter_map(|id| game.items.get(id).map(|i| i.name.clone()))
                .collect();
            return Err(format!("Which one do you mean: {}?", names.join(", ")));
        }
        Match::NotFound => return Err(format!("You are not carrying '{}'.", query)),
    };

    let item = game
        .items
        .get(&item_id)
        .ok_or("That item does not exist.")?;
    if !item.tradable {
        return Err(format!("No one will buy the {}.", item.name));
    }
    let price = sell_price(game, item.base_price);

    let vendor_can_pay = world
        .character(&vendor_id)
        .map(|v| v.wallet.can_afford(price))
        .unwrap_or(false);
    if !vendor_can_pay {
        let vendor_name = world
            .character(&vendor_id)
            .map(|v| v.name.clone())
            .unwrap_or_default();
        return Err(format!("{} cannot afford your {}.", vendor_name, item.name));
    }

    // Checks passed: goods first, then payment.
    if inventory::remove_item(world.player_mut(), &item_id, 1) == 0 {
        return Err(format!("You are not carrying '{}'.", query));
    }
    if let Some(vendor) = world.character_mut(&vendor_id) {
        vendor.wallet.spend(price);
        inventory::add_item(vendor, &item_id, 1);
    }
    world.player_mut().wallet.receive(price);

    Ok(format!(
        "You sell the {} for {}.",
        item.name,
        game.economy.format_amount(price)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::loader::{GameMeta, PlayerTemplate};
    use crate::world::types::{
        AuthorityProfile, CharacterRecord, EconomySchema, EquipmentSchema, ItemKind, ItemRecord,
        RoomRecord, Wallet,
    };
    use std::collections::HashMap;

    fn game_with_vendor() -> GameDefinition {
        let mut rooms = HashMap::new();
        rooms.insert(
            "market".to_string(),
            RoomRecord::new("market", "Market", "Stalls everywhere.").with_character("vendor"),
        );

        let mut items = HashMap::new();
        let mut sword = ItemRecord::new("sword", "Iron Sword", ItemKind::Weapon);
        sword.base_price = 10;
        items.insert("sword".to_string(), sword);
        let mut relic = ItemRecord::new("relic", "Family Relic", ItemKind::Quest);
        relic.base_price = 100;
        relic.tradable = false;
        items.insert("relic".to_string(), relic);

        let mut vendor = CharacterRecord::new("vendor", "Odric", 20, 10, 10);
        vendor.vendor = true;
        vendor.wallet = Wallet::new(50);
        vendor.items.insert("sword".to_string(), 2);
        let mut characters = HashMap::new();
        characters.insert("vendor".to_string(), vendor);

        GameDefinition {
            meta: GameMeta {
                name: "Test".to_string(),
                description: String::new(),
                starting_room: "market".to_string(),
                victory_message: "win".to_string(),
                defeat_message: "lose".to_string(),
            },
            player: PlayerTemplate {
                name: "Hero".to_string(),
                health: 30,
                strength: 10,
                agility: 10,
                armor: 0,
                currency: 15,
                items: HashMap::new(),
                skills: HashMap::new(),
            },
            rooms,
            items,
            characters,
            quests: HashMap::new(),
            recipes: HashMap::new(),
            equipment: EquipmentSchema::default(),
            economy: EconomySchema::default(),
            authority: AuthorityProfile::default(),
            win_conditions: Vec::new(),
        }
    }

    #[test]
    fn buy_moves_money_and_goods_atomically() {
        let game = game_with_vendor();
        let mut world = WorldState::new(&game);

        let msg = buy(&mut world, &game, "iron sword").unwrap();
        assert!(msg.contains("Iron Sword"));
        assert_eq!(world.player().wallet.amount, 5);
        assert_eq!(inventory::quantity_of(world.player(), "sword"), 1);
        let vendor = world.character("vendor").unwrap();
        assert_eq!(vendor.wallet.amount, 60);
        assert_eq!(inventory::quantity_of(vendor, "sword"), 1);
    }

    #[test]
    fn buy_fails_without_funds_and_mutates_nothing() {
        let game = game_with_vendor();
        let mut world = WorldState::new(&game);
        world.player_mut().wallet = Wallet::new(3);

        let err = buy(&mut world, &game, "sword").unwrap_err();
        assert!(err.contains("cannot afford"));
        assert_eq!(world.player().wallet.amount, 3);
        assert_eq!(inventory::quantity_of(world.player(), "sword"), 0);
        assert_eq!(
            inventory::quantity_of(world.character("vendor").unwrap(), "sword"),
            2
        );
    }

    #[test]
    fn sell_pays_the_sell_ratio() {
        let game = game_with_vendor();
        let mut world = WorldState::new(&game);
        inventory::add_item(world.player_mut(), "sword", 1);

        let msg = sell(&mut world, &game, "sword").unwrap();
        // base 10 at the default 0.5 ratio.
        assert!(msg.contains("5g"));
        assert_eq!(world.player().wallet.amount, 20);
        assert_eq!(inventory::quantity_of(world.player(), "sword"), 0);
    }

    #[test]
    fn non_tradable_items_are_refused() {
        let game = game_with_vendor();
        let mut world = WorldState::new(&game);
        inventory::add_item(world.player_mut(), "relic", 1);

        let err = sell(&mut world, &game, "relic").unwrap_err();
        assert!(err.contains("No one will buy"));
        assert_eq!(inventory::quantity_of(world.player(), "relic"), 1);
    }

    #[test]
    fn no_vendor_means_no_trade() {
        let mut game = game_with_vendor();
        game.rooms.get_mut("market").unwrap().characters.clear();
        let mut world = WorldState::new(&game);

        assert!(buy(&mut world, &game, "sword").is_err());
        assert!(sell(&mut world, &game, "sword").is_err());
        assert!(format_wares(&world, &game).is_err());
    }

    #[test]
    fn wares_listing_shows_prices_and_wallet() {
        let game = game_with_vendor();
        let world = WorldState::new(&game);
        let listing = format_wares(&world, &game).unwrap();
        assert!(listing.contains("Odric offers:"));
        assert!(listing.contains("Iron Sword x2 - 10g each"));
        assert!(listing.contains("You have 15g."));
    }
}
