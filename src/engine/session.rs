//! Session orchestration: the per-turn control loop.
//!
//! A session owns one world, one RNG, and one client to the generative
//! service. Each turn runs the fixed pipeline — record, interpret,
//! execute, check win conditions, narrate, assemble — and nothing
//! overlaps: the world only mutates inside execution, never during a
//! service call.
//!
//! Two states: exploring and in-combat. Combat mode forces attacks onto
//! the current opponent and gives flee/status intents priority over
//! anything else the interpreter produced. Player defeat is the only
//! terminal failure; a satisfied win condition is the terminal success.

use chrono::{DateTime, Utc};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use uuid::Uuid;

use crate::llm::GenerativeClient;
use crate::logutil::preview;
use crate::world::loader::GameDefinition;
use crate::world::state::WorldState;

use super::executor::{self, ActionOutcome};
use super::intent::{self, ActionIntent, ActionKind, WorldSnapshot};
use super::narrator::{self, NarrationContext};
use super::quests;

/// Upper bound on intents executed per utterance; anything past this is
/// dropped so one message cannot spiral into a marathon.
const MAX_INTENTS_PER_TURN: usize = 5;

/// Width of the footer health bars.
const HEALTH_BAR_WIDTH: usize = 20;

/// The full response to one player utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutput {
    pub response: String,
    pub game_over: bool,
}

/// One playthrough: world, dice, and the service client.
pub struct Session {
    id: Uuid,
    started_at: DateTime<Utc>,
    game: GameDefinition,
    world: WorldState,
    rng: StdRng,
    llm: Box<dyn GenerativeClient>,
    game_over: bool,
}

impl Session {
    /// Start a session. A fixed `rng_seed` makes the whole playthrough
    /// deterministic; `None` seeds from the OS.
    pub fn new(game: GameDefinition, llm: Box<dyn GenerativeClient>, rng_seed: Option<u64>) -> Self {
        let rng = match rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let world = WorldState::new(&game);
        let session = Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            game,
            world,
            rng,
            llm,
            game_over: false,
        };
        info!(
            "session {} started: game='{}' at {}",
            session.id, session.game.meta.name, session.started_at
        );
        session
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn game(&self) -> &GameDefinition {
        &self.game
    }

    pub fn is_over(&self) -> bool {
        self.game_over
    }

    /// Opening text: title, premise, the first look, the footer.
    pub fn intro(&self) -> String {
        let mut out = format!("*** {} ***\n", self.game.meta.name);
        if !self.game.meta.description.is_empty() {
            out.push_str(&self.game.meta.description);
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&executor::describe_room(&self.game, &self.world));
        out.push('\n');
        out.push_str(&self.footer());
        out
    }

    /// Resolve one utterance completely and return the full response.
    pub async fn process_turn(&mut self, utterance: &str) -> TurnOutput {
        if self.game_over {
            return TurnOutput {
                response: "The story has ended. Start a new session to play again.".to_string(),
                game_over: true,
            };
        }

        let utterance = utterance.trim();
        if utterance.is_empty() {
            return TurnOutput {
                response: format!("Say something.\n{}", self.footer()),
                game_over: false,
            };
        }

        debug!("session {} turn {}: '{}'", self.id, self.world.turn, preview(utterance));
        self.world.record_command(utterance);
        self.world.tick_turn();

        // Interpret against a read-only snapshot.
        let snapshot = self.snapshot();
        let mut intents = intent::interpret(self.llm.as_ref(), utterance, &snapshot).await;
        if intents.len() > MAX_INTENTS_PER_TURN {
            debug!(
                "session {}: truncating {} intents to {}",
                self.id,
                intents.len(),
                MAX_INTENTS_PER_TURN
            );
            intents.truncate(MAX_INTENTS_PER_TURN);
        }

        if intents.is_empty() {
            return TurnOutput {
                response: format!(
                    "You're not sure how to go about that. (Try 'help'.)\n{}",
                    self.footer()
                ),
                game_over: false,
            };
        }

        // Combat mode gives flee and status priority over everything
        // else the interpreter produced.
        if self.world.in_combat() {
            if let Some(priority) = intents
                .iter()
                .find(|i| matches!(i.kind, ActionKind::Flee | ActionKind::Status))
                .cloned()
            {
                intents = vec![priority];
            }
        }

        // Execute in order. Defeat cuts the turn short.
        let mut outcomes: Vec<ActionOutcome> = Vec::new();
        for intent in &intents {
            let outcome = executor::execute(
                &self.game,
                &mut self.world,
                &mut self.rng,
                self.llm.as_ref(),
                intent,
            )
            .await;
            outcomes.push(outcome);
            if !self.world.player().is_alive() {
                break;
            }
        }

        // Quests can complete on any action; rewards land now.
        for message in quests::sweep_active_quests(&mut self.world, &self.game) {
            outcomes.push(ActionOutcome::ok(ActionKind::Quests, message));
        }

        // Terminal checks: defeat first, then victory.
        let mut victory = None;
        if self.world.player().is_alive() {
            victory = quests::check_win(&self.world, &self.game);
        } else {
            self.game_over = true;
            self.world.clear_combat();
        }
        if let Some(message) = &victory {
            self.game_over = true;
            outcomes.push(ActionOutcome::ok(ActionKind::Quests, message.clone()));
            info!("session {}: victory after {} turns", self.id, self.world.turn);
        }

        // Narration never changes what happened above.
        let context = self.narration_context();
        let mut response =
            narrator::narrate(self.llm.as_ref(), utterance, &outcomes, &context).await;
        response.push('\n');
        response.push_str(&self.footer());

        TurnOutput {
            response,
            game_over: self.game_over,
        }
    }

    /// Execute a single pre-built intent, bypassing interpretation. The
    /// console uses this for the reserved `help` word.
    pub async fn process_intent(&mut self, intent: ActionIntent) -> String {
        let outcome = executor::execute(
            &self.game,
            &mut self.world,
            &mut self.rng,
            self.llm.as_ref(),
            &intent,
        )
        .await;
        outcome.message
    }

    fn snapshot(&self) -> WorldSnapshot {
        let room = self.world.current_room();
        let exits = room
            .exits
            .iter()
            .map(|e| (e.name.clone(), e.name.clone()))
            .collect();
        let npcs = self
            .world
            .npcs_in_current_room()
            .into_iter()
            .filter_map(|id| {
                self.world
                    .character(&id)
                    .map(|c| (id.clone(), c.name.clone()))
            })
            .collect();
        let items = self
            .world
            .player()
            .items
            .keys()
            .filter_map(|id| {
                self.game
                    .items
                    .get(id)
                    .map(|item| (id.clone(), item.name.clone()))
            })
            .collect();
        let opponent_name = self
            .world
            .combat_opponent()
            .and_then(|id| self.world.character(id))
            .map(|c| c.name.clone());
        WorldSnapshot {
            exits,
            npcs,
            items,
            in_combat: self.world.in_combat(),
            opponent_name,
        }
    }

    fn narration_context(&self) -> NarrationContext {
        let room = self.world.current_room();
        let mut entities: Vec<String> = self
            .world
            .npcs_in_current_room()
            .iter()
            .filter_map(|id| self.world.character(id).map(|c| c.name.clone()))
            .collect();
        entities.extend(
            room.items
                .keys()
                .filter_map(|id| self.game.items.get(id).map(|i| i.name.clone())),
        );
        entities.extend(
            self.world
                .player()
                .items
                .keys()
                .filter_map(|id| self.game.items.get(id).map(|i| i.name.clone())),
        );
        entities.extend(room.exits.iter().map(|e| e.name.clone()));
        entities.sort();
        entities.dedup();
        NarrationContext {
            room_name: room.name.clone(),
            room_description: room.description.clone(),
            entities,
            player_name: self.world.player().name.clone(),
        }
    }

    /// The status footer: combat health bars while fighting, otherwise a
    /// one-line location summary.
    fn footer(&self) -> String {
        if let Some(opponent_id) = self.world.combat_opponent() {
            if let Some(opponent) = self.world.character(opponent_id) {
                let player = self.world.player();
                return format!(
                    "{}\n{}",
                    health_bar(&player.name, player.health, player.max_health),
                    health_bar(&opponent.name, opponent.health, opponent.max_health),
                );
            }
        }

        let room = self.world.current_room();
        let player = self.world.player();
        let exits: Vec<&str> = room.exits.iter().map(|e| e.name.as_str()).collect();
        let here: Vec<String> = self
            .world
            .npcs_in_current_room()
            .iter()
            .filter_map(|id| self.world.character(id))
            .map(|c| {
                if c.is_alive() {
                    c.name.clone()
                } else {
                    format!("{} (dead)", c.name)
                }
            })
            .collect();

        let mut parts = vec![
            room.name.clone(),
            format!("HP {}/{}", player.health, player.max_health),
        ];
        if !exits.is_empty() {
            parts.push(format!("Exits: {}", exits.join(", ")));
        }
        if !here.is_empty() {
            parts.push(format!("Here: {}", here.join(", ")));
        }
        parts.push(format!(
            "Pack: {} kinds, {}",
            player.items.len(),
            self.game.economy.format_amount(player.wallet.amount)
        ));
        format!("-- {}", parts.join(" | "))
    }
}

/// Render `name [#####-----] cur/max`, clamping into the bar's range.
fn health_bar(name: &str, current: i32, max: i32) -> String {
    let max = max.max(1);
    let current = current.clamp(0, max);
    let filled =
        ((current as f64 / max as f64) * HEALTH_BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(HEALTH_BAR_WIDTH);
    format!(
        "{:<12}[{}{}] {}/{}",
        name,
        "#".repeat(filled),
        "-".repeat(HEALTH_BAR_WIDTH - filled),
        current,
        max
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_bar_renders_proportionally() {
        let bar = health_bar("Hero", 15, 30);
        assert!(bar.contains("15/30"));
        assert!(bar.contains(&"#".repeat(10)));
        assert!(!bar.contains(&"#".repeat(11)));
    }

    #[test]
    fn health_bar_clamps_out_of_range_values() {
        let empty = health_bar("Hero", -5, 30);
        assert!(empty.contains("0/30"));
        assert!(empty.contains(&"-".repeat(HEALTH_BAR_WIDTH)));

        let full = health_bar("Hero", 99, 30);
        assert!(full.contains("30/30"));
        assert!(full.contains(&"#".repeat(HEALTH_BAR_WIDTH)));
    }
}
