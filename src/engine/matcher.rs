//! Fuzzy reference resolution.
//!
//! Player references ("the goblin", "north", "rusty key") are resolved
//! against candidate (id, display name) pairs with a fixed precedence:
//!
//! 1. **Exact**: the whole query equals the candidate's name or id.
//! 2. **Keyword**: the candidate's name appears inside the query
//!    ("attack the goblin chief" names the Goblin Chief). Longest
//!    matching name wins, so "goblin chief" beats "goblin".
//! 3. **Substring**: the query appears inside the candidate's name
//!    ("gob" finds the Goblin).
//!
//! All comparison is case-insensitive and whitespace-normalized. This is
//! the fallback path when the generative interpreter is down, so it is
//! deliberately boring and exhaustively tested.

/// Result of resolving a player-supplied reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Match {
    /// A single winner: the candidate's id.
    One(String),
    /// Several candidates tied at the same precedence level.
    Ambiguous(Vec<String>),
    NotFound,
}

impl Match {
    pub fn found(&self) -> Option<&str> {
        match self {
            Match::One(id) => Some(id),
            _ => None,
        }
    }
}

/// Normalize for comparison: lowercase, trimmed, single-spaced.
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolve `query` against `(id, display name)` candidates.
pub fn resolve(query: &str, candidates: &[(String, String)]) -> Match {
    let query = normalize(query);
    if query.is_empty() {
        return Match::NotFound;
    }

    // Exact name or id.
    let exact: Vec<&(String, String)> = candidates
        .iter()
        .filter(|(id, name)| normalize(name) == query || normalize(id) == query)
        .collect();
    if let Some(result) = pick(&exact) {
        return result;
    }

    // Candidate name used as a keyword inside the query. Longest name
    // wins so compound names beat their prefixes.
    let mut keyword: Vec<&(String, String)> = candidates
        .iter()
        .filter(|(_, name)| {
            let name = normalize(name);
            !name.is_empty() && query.contains(&name)
        })
        .collect();
    if !keyword.is_empty() {
        let longest = keyword
            .iter()
            .map(|(_, name)| normalize(name).len())
            .max()
            .unwrap_or(0);
        keyword.retain(|(_, name)| normalize(name).len() == longest);
        if let Some(result) = pick(&keyword) {
            return result;
        }
    }

    // Query as a substring of the candidate name.
    let partial: Vec<&(String, String)> = candidates
        .iter()
        .filter(|(_, name)| normalize(name).contains(&query))
        .collect();
    if let Some(result) = pick(&partial) {
        return result;
    }

    Match::NotFound
}

fn pick(matches: &[&(String, String)]) -> Option<Match> {
    // Duplicate ids (an id listed twice) collapse to one winner.
    let mut ids: Vec<String> = matches.iter().map(|(id, _)| id.clone()).collect();
    ids.dedup();
    match ids.len() {
        0 => None,
        1 => Some(Match::One(ids.remove(0))),
        _ => Some(Match::Ambiguous(ids)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(id, name)| (id.to_string(), name.to_string()))
            .collect()
    }

    #[test]
    fn exact_match_beats_substring() {
        let c = candidates(&[("north", "North"), ("northeast", "Northeast")]);
        assert_eq!(resolve("north", &c), Match::One("north".to_string()));
    }

    #[test]
    fn exact_match_is_case_and_space_insensitive() {
        let c = candidates(&[("gate", "Old  Iron Gate")]);
        assert_eq!(resolve("  old iron GATE ", &c), Match::One("gate".to_string()));
    }

    #[test]
    fn id_counts_as_exact() {
        let c = candidates(&[("iron_key", "Rusty Key")]);
        assert_eq!(resolve("iron_key", &c), Match::One("iron_key".to_string()));
    }

    #[test]
    fn keyword_in_command_finds_target() {
        let c = candidates(&[("goblin", "Goblin"), ("mira", "Mira the Smith")]);
        assert_eq!(
            resolve("attack the goblin right now", &c),
            Match::One("goblin".to_string())
        );
    }

    #[test]
    fn longest_keyword_wins() {
        let c = candidates(&[("goblin", "Goblin"), ("chief", "Goblin Chief")]);
        assert_eq!(
            resolve("fight the goblin chief", &c),
            Match::One("chief".to_string())
        );
    }

    #[test]
    fn substring_matches_partial_names() {
        let c = candidates(&[("goblin", "Goblin"), ("mira", "Mira the Smith")]);
        assert_eq!(resolve("gob", &c), Match::One("goblin".to_string()));
        assert_eq!(resolve("smith", &c), Match::One("mira".to_string()));
    }

    #[test]
    fn misspelling_finds_nothing() {
        let c = candidates(&[("north", "North"), ("east", "East")]);
        assert_eq!(resolve("Norht", &c), Match::NotFound);
    }

    #[test]
    fn ambiguity_is_reported_not_guessed() {
        let c = candidates(&[("key_iron", "Iron Key"), ("key_brass", "Brass Key")]);
        match resolve("key", &c) {
            Match::Ambiguous(ids) => {
                assert_eq!(ids.len(), 2);
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn empty_query_finds_nothing() {
        let c = candidates(&[("north", "North")]);
        assert_eq!(resolve("", &c), Match::NotFound);
        assert_eq!(resolve("   ", &c), Match::NotFound);
    }

    #[test]
    fn empty_candidate_list_finds_nothing() {
        assert_eq!(resolve("anything", &[]), Match::NotFound);
    }
}
