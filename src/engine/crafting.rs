//! Recipe crafting.
//!
//! Recipes come from the game definition. Crafting verifies everything
//! first — materials, tools, station — and only then consumes and
//! grants, so a failed craft leaves the inventory untouched.

use crate::world::inventory;
use crate::world::loader::GameDefinition;
use crate::world::state::WorldState;
use crate::world::types::CraftingRecipe;

use super::matcher::{self, Match};

/// List every recipe the game defines, marking the ones craftable here.
pub fn format_recipes(world: &WorldState, game: &GameDefinition) -> String {
    if game.recipes.is_empty() {
        return "You don't know any recipes.".to_string();
    }
    let station = world.current_room().station().map(str::to_string);
    let mut recipes: Vec<&CraftingRecipe> = game.recipes.values().collect();
    recipes.sort_by(|a, b| a.name.cmp(&b.name));

    let mut lines = vec!["You know these recipes:".to_string()];
    for recipe in recipes {
        let materials: Vec<String> = recipe
            .materials
            .iter()
            .map(|m| {
                let name = game
                    .items
                    .get(&m.item_id)
                    .map(|i| i.name.clone())
                    .unwrap_or_else(|| m.item_id.clone());
                let suffix = if m.consumed { "" } else { " (tool)" };
                format!("{}x {}{}", m.quantity, name, suffix)
            })
            .collect();
        let mut line = format!("  {} <- {}", recipe.name, materials.join(", "));
        if let Some(required) = &recipe.requires_station {
            if station.as_deref() != Some(required.as_str()) {
                line.push_str(&format!(" [needs {}]", required));
            }
        }
        lines.push(line);
    }
    lines.join("\n")
}

/// Craft a recipe by name. All-or-nothing: any missing precondition
/// aborts before a single item moves.
pub fn craft(world: &mut WorldState, game: &GameDefinition, query: &str) -> Result<String, String> {
    let candidates: Vec<(String, String)> = game
        .recipes
        .values()
        .map(|r| (r.id.clone(), r.name.clone()))
        .collect();

    let recipe_id = match matcher::resolve(query, &candidates) {
        Match::One(id) => id,
        Match::Ambiguous(ids) => {
            let names: Vec<String> = ids
                .iter()
                .filter_map(|id| game.recipes.get(id).map(|r| r.name.clone()))
                .collect();
            return Err(format!("Which recipe: {}?", names.join(", ")));
        }
        Match::NotFound => return Err(format!("You don't know how to make '{}'.", query)),
    };
    let recipe = game
        .recipes
        .get(&recipe_id)
        .ok_or("That recipe does not exist.")?;

    // Station gate.
    if let Some(required) = &recipe.requires_station {
        if world.current_room().station() != Some(required.as_str()) {
            return Err(format!(
                "You need a {} to make the {}.",
                required, recipe.name
            ));
        }
    }

    // Verify every material before consuming any.
    let player = world.player();
    for material in &recipe.materials {
        let held = inventory::quantity_of(player, &material.item_id);
        if held < material.quantity {
            let name = game
                .items
                .get(&material.item_id)
                .map(|i| i.name.clone())
                .unwrap_or_else(|| material.item_id.clone());
            return Err(format!(
                "You need {}x {} but have only {}.",
                material.quantity, name, held
            ));
        }
    }

    // All present: consume, then grant.
    for material in &recipe.materials {
        if material.consumed {
            inventory::remove_item(world.player_mut(), &material.item_id, material.quantity);
        }
    }
    inventory::add_item(
        world.player_mut(),
        &recipe.result_item_id,
        recipe.result_quantity,
    );

    let result_name = game
        .items
        .get(&recipe.result_item_id)
        .map(|i| i.name.clone())
        .unwrap_or_else(|| recipe.result_item_id.clone());
    Ok(if recipe.result_quantity > 1 {
        format!("You craft {}x {}.", recipe.result_quantity, result_name)
    } else {
        format!("You craft the {}.", result_name)
    })
}
