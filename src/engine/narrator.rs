//! Outcome narration.
//!
//! Mechanics first, prose second. The executor's structured outcomes are
//! the truth; this module only decides how they read. Dialogue-bearing
//! outcomes (speech, combat logs, give replies) pass through verbatim —
//! they already contain correctly-resolved text. Everything else may be
//! rephrased by the generative service under a hard constraint: only
//! entities already present may be referenced, and success/failure must
//! be preserved. When the service is down or misbehaves, the mechanical
//! messages are returned unchanged; narration can fail, truth cannot.

use log::debug;

use crate::llm::{ChatMessage, ChatRequest, GenerativeClient};
use crate::logutil::preview;

use super::executor::ActionOutcome;

/// What the narrator is allowed to talk about.
#[derive(Debug, Clone, Default)]
pub struct NarrationContext {
    pub room_name: String,
    pub room_description: String,
    /// Names of characters and notable items present.
    pub entities: Vec<String>,
    pub player_name: String,
}

/// Assemble the player-facing response for a turn's outcomes.
pub async fn narrate(
    llm: &dyn GenerativeClient,
    utterance: &str,
    outcomes: &[ActionOutcome],
    context: &NarrationContext,
) -> String {
    if outcomes.is_empty() {
        return "Nothing happens.".to_string();
    }

    // Fast path: pure dialogue turns need no narration at all.
    if outcomes.iter().all(|o| o.dialogue) {
        return join_messages(outcomes);
    }

    let plain: Vec<&ActionOutcome> = outcomes.iter().filter(|o| !o.dialogue).collect();
    let narrated = narrate_plain(llm, utterance, &plain, context).await;

    // Reassemble in order: verbatim blocks stay put, the narration
    // replaces the run of plain outcomes.
    let mut parts = Vec::new();
    let mut narration_placed = false;
    for outcome in outcomes {
        if outcome.dialogue {
            parts.push(outcome.message.clone());
        } else if !narration_placed {
            parts.push(narrated.clone());
            narration_placed = true;
        }
    }
    parts.retain(|p| !p.trim().is_empty());
    parts.join("\n")
}

/// Narrate the non-dialogue outcomes, falling back to their mechanical
/// messages when the service fails or returns nothing.
async fn narrate_plain(
    llm: &dyn GenerativeClient,
    utterance: &str,
    plain: &[&ActionOutcome],
    context: &NarrationContext,
) -> String {
    let mechanical = plain
        .iter()
        .map(|o| o.message.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let facts = plain
        .iter()
        .map(|o| {
            format!(
                "- [{}] {}",
                if o.success { "ok" } else { "failed" },
                o.message.replace('\n', " ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let entities = if context.entities.is_empty() {
        "none".to_string()
    } else {
        context.entities.join(", ")
    };

    let prompt = format!(
        "You narrate a text adventure in second person, past-free present \
         tense. Rewrite the factual events below as two to four sentences of \
         atmospheric prose. Hard rules: mention ONLY people, places, and \
         things listed here; invent NO new characters, rooms, items, or \
         events; an event marked failed must read as a failure; keep every \
         number (damage, prices, quantities) exactly as given.\n\
         Location: {} - {}\n\
         Present: {}\n\
         The player ({}) said: {}\n\
         Events:\n{}",
        context.room_name,
        context.room_description,
        entities,
        context.player_name,
        utterance,
        facts,
    );

    let request = ChatRequest::new(vec![ChatMessage::system(prompt)])
        .with_temperature(0.7)
        .with_max_tokens(300);

    match llm.chat(request).await {
        Ok(reply) => {
            let reply = reply.trim();
            if reply.is_empty() {
                debug!("narrator returned empty reply, using mechanical text");
                mechanical
            } else {
                reply.to_string()
            }
        }
        Err(e) => {
            debug!(
                "narrator unavailable ({}), using mechanical text for '{}'",
                e,
                preview(utterance)
            );
            mechanical
        }
    }
}

fn join_messages(outcomes: &[ActionOutcome]) -> String {
    outcomes
        .iter()
        .map(|o| o.message.as_str())
        .filter(|m| !m.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::intent::ActionKind;
    use crate::llm::ScriptedClient;

    fn context() -> NarrationContext {
        NarrationContext {
            room_name: "Town Square".to_string(),
            room_description: "A quiet square.".to_string(),
            entities: vec!["Mira the Smith".to_string()],
            player_name: "Hero".to_string(),
        }
    }

    #[tokio::test]
    async fn dialogue_passes_through_verbatim() {
        // The scripted client would reply if asked; a pure-dialogue turn
        // must never ask.
        let client = ScriptedClient::with_replies(["SHOULD NOT APPEAR"]);
        let outcomes = vec![ActionOutcome::ok_dialogue(
            ActionKind::Talk,
            "Mira says: \"Well met.\"",
        )];
        let out = narrate(&client, "talk to mira", &outcomes, &context()).await;
        assert_eq!(out, "Mira says: \"Well met.\"");
        assert_eq!(client.remaining(), 1);
    }

    #[tokio::test]
    async fn plain_outcomes_are_narrated() {
        let client = ScriptedClient::with_replies(["You step into the square as bells ring."]);
        let outcomes = vec![ActionOutcome::ok(ActionKind::Move, "You go North.")];
        let out = narrate(&client, "go north", &outcomes, &context()).await;
        assert_eq!(out, "You step into the square as bells ring.");
    }

    #[tokio::test]
    async fn service_failure_keeps_mechanical_truth() {
        let client = ScriptedClient::empty();
        let outcomes = vec![
            ActionOutcome::ok(ActionKind::Take, "You take the Rusty Sword."),
            ActionOutcome::fail(ActionKind::Move, "You can't go 'Norht'. Exits: North, East."),
        ];
        let out = narrate(&client, "grab sword and go norht", &outcomes, &context()).await;
        assert!(out.contains("You take the Rusty Sword."));
        assert!(out.contains("Exits: North, East."));
    }

    #[tokio::test]
    async fn mixed_turn_keeps_dialogue_order() {
        let client = ScriptedClient::with_replies(["The square hums with evening light."]);
        let outcomes = vec![
            ActionOutcome::ok_dialogue(ActionKind::Attack, "You hit Goblin for 5 damage."),
            ActionOutcome::ok(ActionKind::Look, "== Town Square =="),
        ];
        let out = narrate(&client, "attack then look", &outcomes, &context()).await;
        let combat_pos = out.find("You hit Goblin").unwrap();
        let prose_pos = out.find("evening light").unwrap();
        assert!(combat_pos < prose_pos);
    }

    #[tokio::test]
    async fn empty_turn_reports_nothing_happened() {
        let client = ScriptedClient::empty();
        let out = narrate(&client, "hm", &[], &context()).await;
        assert_eq!(out, "Nothing happens.");
    }
}
