//! Intent interpretation: free text in, ordered structured intents out.
//!
//! The primary path asks the generative service to translate the
//! utterance into a JSON intent list, resolving fuzzy references against
//! a read-only world snapshot. The fallback path is a deterministic
//! parser over a fixed synonym table plus exit/NPC name matching; it runs
//! whenever the service errors, times out, or produces nothing usable.
//!
//! Neither path mutates anything. An empty result means "didn't
//! understand" and the caller must short-circuit without executing.

use log::debug;
use serde_json::Value;

use crate::llm::{extract_json_array, ChatMessage, ChatRequest, GenerativeClient};
use crate::logutil::preview;

use super::matcher::{self, Match};

/// The closed set of things a player can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Move,
    Look,
    Inventory,
    Talk,
    Follow,
    Examine,
    Take,
    Drop,
    Use,
    Attack,
    Give,
    Equip,
    Unequip,
    Buy,
    Sell,
    Shop,
    Gather,
    Craft,
    Quests,
    Flee,
    Status,
    Help,
    Unknown,
}

impl ActionKind {
    /// Parse the wire name the interpreter prompt asks the service to
    /// emit. Anything unrecognized maps to `Unknown`.
    pub fn from_wire(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "move" | "go" => Self::Move,
            "look" => Self::Look,
            "inventory" => Self::Inventory,
            "talk" => Self::Talk,
            "follow" => Self::Follow,
            "examine" => Self::Examine,
            "take" => Self::Take,
            "drop" => Self::Drop,
            "use" => Self::Use,
            "attack" => Self::Attack,
            "give" => Self::Give,
            "equip" => Self::Equip,
            "unequip" => Self::Unequip,
            "buy" => Self::Buy,
            "sell" => Self::Sell,
            "shop" => Self::Shop,
            "gather" => Self::Gather,
            "craft" => Self::Craft,
            "quests" => Self::Quests,
            "flee" | "stop" => Self::Flee,
            "status" => Self::Status,
            "help" => Self::Help,
            _ => Self::Unknown,
        }
    }

    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Look => "look",
            Self::Inventory => "inventory",
            Self::Talk => "talk",
            Self::Follow => "follow",
            Self::Examine => "examine",
            Self::Take => "take",
            Self::Drop => "drop",
            Self::Use => "use",
            Self::Attack => "attack",
            Self::Give => "give",
            Self::Equip => "equip",
            Self::Unequip => "unequip",
            Self::Buy => "buy",
            Self::Sell => "sell",
            Self::Shop => "shop",
            Self::Gather => "gather",
            Self::Craft => "craft",
            Self::Quests => "quests",
            Self::Flee => "flee",
            Self::Status => "status",
            Self::Help => "help",
            Self::Unknown => "unknown",
        }
    }
}

/// One structured intent: what to do, to what, with what detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionIntent {
    pub kind: ActionKind,
    pub target: Option<String>,
    pub detail: Option<String>,
}

impl ActionIntent {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            target: None,
            detail: None,
        }
    }

    pub fn with_target(kind: ActionKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: Some(target.into()),
            detail: None,
        }
    }
}

/// Read-only view of the world handed to the interpreter.
#[derive(Debug, Clone, Default)]
pub struct WorldSnapshot {
    /// (id, display name) of the current room's exits. For exits the id
    /// is the display name itself.
    pub exits: Vec<(String, String)>,
    /// (id, display name) of NPCs in the current room.
    pub npcs: Vec<(String, String)>,
    /// (id, display name) of items the player carries.
    pub items: Vec<(String, String)>,
    pub in_combat: bool,
    pub opponent_name: Option<String>,
}

/// Interpret an utterance: primary generative path with deterministic
/// fallback. Always returns within the service timeout; never errors.
pub async fn interpret(
    llm: &dyn GenerativeClient,
    utterance: &str,
    snapshot: &WorldSnapshot,
) -> Vec<ActionIntent> {
    match primary_interpret(llm, utterance, snapshot).await {
        Some(intents) if !intents.is_empty() => intents,
        _ => {
            debug!(
                "primary interpretation empty for '{}', using fallback",
                preview(utterance)
            );
            fallback_parse(utterance, snapshot)
        }
    }
}

async fn primary_interpret(
    llm: &dyn GenerativeClient,
    utterance: &str,
    snapshot: &WorldSnapshot,
) -> Option<Vec<ActionIntent>> {
    let request = ChatRequest::new(vec![
        ChatMessage::system(interpreter_prompt(snapshot)),
        ChatMessage::user(utterance.to_string()),
    ])
    .with_temperature(0.0);

    let reply = match llm.chat(request).await {
        Ok(reply) => reply,
        Err(e) => {
            debug!("interpreter service call failed: {}", e);
            return None;
        }
    };

    let array = extract_json_array(&reply)?;
    let intents: Vec<ActionIntent> = array
        .as_array()?
        .iter()
        .filter_map(parse_intent_entry)
        .filter(|intent| intent.kind != ActionKind::Unknown)
        .collect();
    Some(intents)
}

fn parse_intent_entry(entry: &Value) -> Option<ActionIntent> {
    let action = entry.get("action")?.as_str()?;
    let target = entry
        .get("target")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);
    let detail = entry
        .get("detail")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);
    Some(ActionIntent {
        kind: ActionKind::from_wire(action),
        target,
        detail,
    })
}

fn interpreter_prompt(snapshot: &WorldSnapshot) -> String {
    let exits: Vec<&str> = snapshot.exits.iter().map(|(_, n)| n.as_str()).collect();
    let npcs: Vec<&str> = snapshot.npcs.iter().map(|(_, n)| n.as_str()).collect();
    let items: Vec<&str> = snapshot.items.iter().map(|(_, n)| n.as_str()).collect();

    let mut prompt = String::from(
        "You translate a player's message into game actions. \
         Respond with ONLY a JSON array, no prose. Each element is \
         {\"action\": <kind>, \"target\": <string or null>, \"detail\": <string or null>}. \
         Valid kinds: move, look, inventory, talk, follow, examine, take, drop, use, \
         attack, give, equip, unequip, buy, sell, shop, gather, craft, quests, flee, \
         status, help. \
         Resolve targets against the lists below, copying names exactly. \
         Emit only actions the player explicitly asked for; never invent extras. \
         If the message is not a game action, respond with [].\n",
    );
    prompt.push_str(&format!("Exits: {}\n", join_or_none(&exits)));
    prompt.push_str(&format!("Characters here: {}\n", join_or_none(&npcs)));
    prompt.push_str(&format!("Carried items: {}\n", join_or_none(&items)));
    if snapshot.in_combat {
        let opponent = snapshot.opponent_name.as_deref().unwrap_or("an enemy");
        prompt.push_str(&format!("The player is in combat with {}.\n", opponent));
    }
    prompt
}

fn join_or_none(names: &[&str]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

// ----------------------------------------------------------------------
// Deterministic fallback parser
// ----------------------------------------------------------------------

/// Verb synonyms, scanned longest-first against the start of the
/// utterance. Order within a kind does not matter; first hit wins.
const VERB_SYNONYMS: &[(&str, ActionKind)] = &[
    ("pick up", ActionKind::Take),
    ("take off", ActionKind::Unequip),
    ("talk to", ActionKind::Talk),
    ("talk with", ActionKind::Talk),
    ("speak to", ActionKind::Talk),
    ("speak with", ActionKind::Talk),
    ("look at", ActionKind::Examine),
    ("look", ActionKind::Look),
    ("flee", ActionKind::Flee),
    ("run", ActionKind::Flee),
    ("attack", ActionKind::Attack),
    ("fight", ActionKind::Attack),
    ("kill", ActionKind::Attack),
    ("hit", ActionKind::Attack),
    ("strike", ActionKind::Attack),
    ("talk", ActionKind::Talk),
    ("speak", ActionKind::Talk),
    ("ask", ActionKind::Give),
    ("greet", ActionKind::Talk),
    ("follow", ActionKind::Follow),
    ("examine", ActionKind::Examine),
    ("inspect", ActionKind::Examine),
    ("take", ActionKind::Take),
    ("get", ActionKind::Take),
    ("grab", ActionKind::Take),
    ("loot", ActionKind::Take),
    ("drop", ActionKind::Drop),
    ("discard", ActionKind::Drop),
    ("use", ActionKind::Use),
    ("drink", ActionKind::Use),
    ("eat", ActionKind::Use),
    ("read", ActionKind::Use),
    ("equip", ActionKind::Equip),
    ("wear", ActionKind::Equip),
    ("wield", ActionKind::Equip),
    ("unequip", ActionKind::Unequip),
    ("remove", ActionKind::Unequip),
    ("buy", ActionKind::Buy),
    ("purchase", ActionKind::Buy),
    ("sell", ActionKind::Sell),
    ("craft", ActionKind::Craft),
    ("make", ActionKind::Craft),
    ("forge", ActionKind::Craft),
    ("brew", ActionKind::Craft),
    ("gather", ActionKind::Gather),
    ("mine", ActionKind::Gather),
    ("forage", ActionKind::Gather),
    ("harvest", ActionKind::Gather),
    ("collect", ActionKind::Gather),
    ("go", ActionKind::Move),
    ("walk", ActionKind::Move),
    ("head", ActionKind::Move),
    ("move", ActionKind::Move),
];

/// Whole-utterance commands that need no target.
const BARE_COMMANDS: &[(&str, ActionKind)] = &[
    ("look", ActionKind::Look),
    ("l", ActionKind::Look),
    ("inventory", ActionKind::Inventory),
    ("inv", ActionKind::Inventory),
    ("i", ActionKind::Inventory),
    ("status", ActionKind::Status),
    ("stats", ActionKind::Status),
    ("hp", ActionKind::Status),
    ("quests", ActionKind::Quests),
    ("journal", ActionKind::Quests),
    ("shop", ActionKind::Shop),
    ("wares", ActionKind::Shop),
    ("browse", ActionKind::Shop),
    ("flee", ActionKind::Flee),
    ("run", ActionKind::Flee),
    ("stop", ActionKind::Flee),
    ("escape", ActionKind::Flee),
    ("retreat", ActionKind::Flee),
    ("gather", ActionKind::Gather),
    ("help", ActionKind::Help),
];

/// Filler words stripped from extracted targets.
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "at", "to", "with", "for", "on", "my", "me", "some", "of", "up", "from",
    "around", "please",
];

/// Deterministic parse: synonym table + exit/NPC name matching +
/// keyword-exclusion target extraction. Returns an empty list when
/// nothing matches; the caller reports "didn't understand".
pub fn fallback_parse(utterance: &str, snapshot: &WorldSnapshot) -> Vec<ActionIntent> {
    let text = utterance.trim().to_lowercase();
    if text.is_empty() {
        return Vec::new();
    }

    // Whole-utterance commands first.
    for (word, kind) in BARE_COMMANDS {
        if text == *word {
            return vec![ActionIntent::new(*kind)];
        }
    }

    // Leading verb from the synonym table.
    for (verb, kind) in VERB_SYNONYMS {
        let Some(rest) = strip_verb(&text, verb) else {
            continue;
        };
        let target = extract_target(rest);
        let mut intent = ActionIntent::new(*kind);
        if *kind == ActionKind::Give {
            // "ask <npc> for <thing>": the NPC is the target, the thing
            // is the detail.
            let (npc, thing) = split_give_request(&target, snapshot);
            intent.target = npc;
            intent.detail = thing;
            if intent.target.is_none() {
                // No NPC named; treat it as conversation instead.
                intent.kind = ActionKind::Talk;
                intent.target = if target.is_empty() {
                    None
                } else {
                    Some(target)
                };
            }
        } else if !target.is_empty() {
            intent.target = Some(target);
        }
        return vec![intent];
    }

    // No verb: a bare exit name is a move, a bare NPC name a greeting.
    if let Match::One(exit) = matcher::resolve(&text, &snapshot.exits) {
        return vec![ActionIntent::with_target(ActionKind::Move, exit)];
    }
    if let Match::One(npc) = matcher::resolve(&text, &snapshot.npcs) {
        return vec![ActionIntent::with_target(ActionKind::Talk, npc)];
    }

    Vec::new()
}

/// Strip a leading verb (as whole words) from the utterance, returning
/// the remainder.
fn strip_verb<'a>(text: &'a str, verb: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(verb)?;
    if rest.is_empty() {
        return Some(rest);
    }
    // Must end on a word boundary: "use" must not match "used".
    rest.starts_with(char::is_whitespace).then_some(rest)
}

/// Keyword-exclusion heuristic: the target is whatever remains after the
/// verb, minus filler words.
fn extract_target(rest: &str) -> String {
    rest.split_whitespace()
        .filter(|word| !STOPWORDS.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split an "ask X for Y" request into NPC and item halves.
///
/// The NPC is whichever present character shares the most name words
/// with the request; the leftover words are the thing being asked for.
fn split_give_request(target: &str, snapshot: &WorldSnapshot) -> (Option<String>, Option<String>) {
    let target_words: Vec<&str> = target.split_whitespace().collect();
    if target_words.is_empty() {
        return (None, None);
    }

    let mut best: Option<(usize, &str, Vec<String>)> = None;
    for (id, name) in &snapshot.npcs {
        let name_words: Vec<String> = name
            .to_lowercase()
            .split_whitespace()
            .filter(|w| !STOPWORDS.contains(w))
            .map(String::from)
            .collect();
        let overlap = name_words
            .iter()
            .filter(|w| target_words.contains(&w.as_str()))
            .count();
        if overlap > 0 && best.as_ref().map_or(true, |(b, _, _)| overlap > *b) {
            best = Some((overlap, id, name_words));
        }
    }

    match best {
        Some((_, id, name_words)) => {
            let remainder = target_words
                .iter()
                .filter(|w| !name_words.iter().any(|n| n == *w))
                .copied()
                .collect::<Vec<_>>()
                .join(" ");
            let thing = if remainder.is_empty() {
                None
            } else {
                Some(remainder)
            };
            (Some(id.to_string()), thing)
        }
        None => (None, None),
    }
}
