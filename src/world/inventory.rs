//! Inventory operations over a character's id -> quantity map.
//!
//! Quantities are non-negative by construction. Over-removal is a silent
//! no-op: removing 5 of something the character holds 2 of removes the 2
//! and reports what was actually removed. Zero-quantity entries are
//! dropped so the map never accumulates ghosts.

use std::collections::HashMap;

use super::types::{CharacterRecord, ItemRecord};

/// Add `quantity` of an item to a character's carried items.
pub fn add_item(character: &mut CharacterRecord, item_id: &str, quantity: u32) {
    if quantity == 0 {
        return;
    }
    *character.items.entry(item_id.to_string()).or_insert(0) += quantity;
}

/// Remove up to `quantity` of an item. Returns the quantity actually
/// removed (0 when the character holds none).
pub fn remove_item(character: &mut CharacterRecord, item_id: &str, quantity: u32) -> u32 {
    if quantity == 0 {
        return 0;
    }
    let Some(held) = character.items.get_mut(item_id) else {
        return 0;
    };
    let removed = quantity.min(*held);
    *held -= removed;
    if *held == 0 {
        character.items.remove(item_id);
    }
    removed
}

/// Quantity of an item the character carries.
pub fn quantity_of(character: &CharacterRecord, item_id: &str) -> u32 {
    character.items.get(item_id).copied().unwrap_or(0)
}

/// Whether the character carries at least `quantity` of an item.
pub fn has_item(character: &CharacterRecord, item_id: &str, quantity: u32) -> bool {
    quantity_of(character, item_id) >= quantity
}

/// Move up to `quantity` of an item from one character to another.
/// Returns the quantity actually transferred.
pub fn transfer_item(
    from: &mut CharacterRecord,
    to: &mut CharacterRecord,
    item_id: &str,
    quantity: u32,
) -> u32 {
    let moved = remove_item(from, item_id, quantity);
    add_item(to, item_id, moved);
    moved
}

/// Format a character's carried items for display, sorted by item name.
/// Unknown ids (not in the item table) fall back on the raw id.
pub fn format_inventory(
    character: &CharacterRecord,
    items: &HashMap<String, ItemRecord>,
) -> Vec<String> {
    if character.items.is_empty() {
        return vec!["(nothing)".to_string()];
    }

    let mut lines: Vec<(String, String)> = character
        .items
        .iter()
        .map(|(id, qty)| {
            let name = items
                .get(id)
                .map(|i| i.name.clone())
                .unwrap_or_else(|| id.clone());
            let equipped = character.equipped.values().any(|e| e == id);
            let mut line = if *qty > 1 {
                format!("{} x{}", name, qty)
            } else {
                name.clone()
            };
            if equipped {
                line.push_str(" (equipped)");
            }
            (name, line)
        })
        .collect();
    lines.sort_by(|(a, _), (b, _)| a.cmp(b));
    lines.into_iter().map(|(_, line)| line).collect()
}
