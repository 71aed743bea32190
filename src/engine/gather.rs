//! Resource gathering.
//!
//! Two paths. Rooms that declare resource nodes roll deterministically:
//! base chance plus a related-skill bonus, gated by a required tool and
//! by the node's charge counter (non-renewable nodes deplete and respawn
//! on a turn timer). Rooms without nodes may, when the game's authority
//! profile allows it, defer to the generative service for a bounded
//! yes/no + item + quantity judgement — which is then validated against
//! the item table before anything is granted. The service proposes; the
//! tables dispose.

use log::debug;
use rand::Rng;
use serde_json::Value;

use crate::llm::{extract_json_object, ChatMessage, ChatRequest, GenerativeClient, LlmError};
use crate::world::inventory;
use crate::world::loader::GameDefinition;
use crate::world::state::WorldState;

use super::matcher::{self, Match};

/// Bounds on the gather success chance after bonuses. A node declared at
/// 100 is a sure thing; the skill bonus cannot push past certainty.
const MAX_GATHER_CHANCE: i32 = 100;

/// Most units a dynamic gather judgement may grant at once.
const MAX_DYNAMIC_QUANTITY: u32 = 3;

/// Gather from a declared resource node in the current room.
pub fn gather_from_node(
    world: &mut WorldState,
    game: &GameDefinition,
    target: Option<&str>,
    rng: &mut impl Rng,
) -> Result<String, String> {
    let nodes: Vec<(String, String)> = world
        .current_room()
        .resources
        .iter()
        .enumerate()
        .map(|(idx, node)| (idx.to_string(), node.name.clone()))
        .collect();
    if nodes.is_empty() {
        return Err("There is nothing to gather here.".to_string());
    }

    let node_index = match target {
        None => 0,
        Some(query) => match matcher::resolve(query, &nodes) {
            Match::One(idx) => idx.parse::<usize>().unwrap_or(0),
            Match::Ambiguous(_) => {
                let names: Vec<&str> = world
                    .current_room()
                    .resources
                    .iter()
                    .map(|n| n.name.as_str())
                    .collect();
                return Err(format!("Gather which: {}?", names.join(", ")));
            }
            Match::NotFound => {
                return Err(format!("There is no '{}' to gather here.", query));
            }
        },
    };

    let node = world.current_room().resources[node_index].clone();

    // Tool gate before any roll.
    if let Some(tool_id) = &node.required_tool {
        if !inventory::has_item(world.player(), tool_id, 1) {
            let tool_name = game
                .items
                .get(tool_id)
                .map(|i| i.name.clone())
                .unwrap_or_else(|| tool_id.clone());
            return Err(format!(
                "You need a {} to gather from the {}.",
                tool_name, node.name
            ));
        }
    }

    // Depletion gate.
    if !node.renewable && node.charges == 0 {
        return Err(format!("The {} is picked clean for now.", node.name));
    }

    let skill_bonus = node
        .skill
        .as_deref()
        .map(|skill| world.player().skill_level(skill))
        .unwrap_or(0);
    let chance = (node.base_chance + skill_bonus).clamp(0, MAX_GATHER_CHANCE);

    if rng.gen_range(0..100) >= chance {
        return Err(format!(
            "You work at the {} but come away with nothing.",
            node.name
        ));
    }

    world.consume_resource_charge(node_index);
    inventory::add_item(world.player_mut(), &node.item_id, 1);

    let item_name = game
        .items
        .get(&node.item_id)
        .map(|i| i.name.clone())
        .unwrap_or_else(|| node.item_id.clone());
    Ok(format!("You gather {} from the {}.", item_name, node.name))
}

/// A validated dynamic-gather judgement from the generative service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatherJudgement {
    pub allow: bool,
    /// Resolved item id — guaranteed to exist in the item table.
    pub item_id: Option<String>,
    pub quantity: u32,
    pub reason: String,
}

/// Ask the generative service whether an undeclared gather attempt
/// succeeds, then validate the answer against the item table.
pub async fn judge_dynamic_gather(
    llm: &dyn GenerativeClient,
    game: &GameDefinition,
    room_name: &str,
    room_description: &str,
    target: Option<&str>,
) -> Result<GatherJudgement, LlmError> {
    let wanted = target.unwrap_or("whatever can be found");
    let prompt = format!(
        "A player tries to gather resources. Decide if the location would \
         plausibly yield anything. Respond with ONLY a JSON object: \
         {{\"allow\": bool, \"item\": <item name or null>, \
         \"quantity\": <1-{}>, \"reason\": <short string>}}. \
         The item MUST be one of: {}. Deny anything implausible.\n\
         Location: {} - {}\nThe player wants: {}",
        MAX_DYNAMIC_QUANTITY,
        item_names(game),
        room_name,
        room_description,
        wanted,
    );

    let reply = llm
        .chat(
            ChatRequest::new(vec![ChatMessage::system(prompt)]).with_temperature(0.2),
        )
        .await?;

    let object = extract_json_object(&reply)
        .ok_or_else(|| LlmError::InvalidResponse("no JSON object in judgement".to_string()))?;
    Ok(validate_judgement(&object, game))
}

/// Clamp and ground a raw judgement: unknown item names become a denial,
/// quantities are capped, and a missing item on an allow is a denial.
fn validate_judgement(object: &Value, game: &GameDefinition) -> GatherJudgement {
    let allow = object
        .get("allow")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let reason = object
        .get("reason")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    let quantity = object
        .get("quantity")
        .and_then(Value::as_u64)
        .unwrap_or(1)
        .clamp(1, MAX_DYNAMIC_QUANTITY as u64) as u32;

    if !allow {
        return GatherJudgement {
            allow: false,
            item_id: None,
            quantity: 0,
            reason,
        };
    }

    let named = object.get("item").and_then(Value::as_str).unwrap_or("");
    let candidates: Vec<(String, String)> = game
        .items
        .values()
        .map(|i| (i.id.clone(), i.name.clone()))
        .collect();
    match matcher::resolve(named, &candidates) {
        Match::One(item_id) => GatherJudgement {
            allow: true,
            item_id: Some(item_id),
            quantity,
            reason,
        },
        other => {
            debug!("dynamic gather named unusable item '{}': {:?}", named, other);
            GatherJudgement {
                allow: false,
                item_id: None,
                quantity: 0,
                reason,
            }
        }
    }
}

fn item_names(game: &GameDefinition) -> String {
    let mut names: Vec<&str> = game.items.values().map(|i| i.name.as_str()).collect();
    names.sort_unstable();
    names.join(", ")
}
