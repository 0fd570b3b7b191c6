//! On-call rotation.

use thiserror::Error;

use teamops_types::{OnCallSchedule, RosterEntry};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RotationError {
    #[error("On-call roster is empty. Cannot notify anyone.")]
    EmptyRoster,
}

/// Pick whose turn it is and compute the state for the following cycle.
///
/// A stale index past the end of the roster (the roster shrank since the last
/// save) starts over from the first entry. The input is never modified.
pub fn advance(state: &OnCallSchedule) -> Result<(RosterEntry, OnCallSchedule), RotationError> {
    let len = state.roster.len();
    if len == 0 {
        return Err(RotationError::EmptyRoster);
    }

    let index = if state.current_index >= len {
        0
    } else {
        state.current_index
    };
    let selected = state.roster[index].clone();
    let next = OnCallSchedule {
        current_index: (index + 1) % len,
        roster: state.roster.clone(),
    };
    Ok((selected, next))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(names: &[&str]) -> Vec<RosterEntry> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| RosterEntry {
                name: name.to_string(),
                slack_user_id: format!("U{i:03}"),
            })
            .collect()
    }

    #[test]
    fn test_wraps_to_start() {
        let state = OnCallSchedule {
            current_index: 1,
            roster: roster(&["Alice", "Bob"]),
        };
        let (selected, next) = advance(&state).unwrap();
        assert_eq!(selected.name, "Bob");
        assert_eq!(next.current_index, 0);
        assert_eq!(next.roster, state.roster);
    }

    #[test]
    fn test_empty_roster() {
        let state = OnCallSchedule::default();
        assert_eq!(advance(&state), Err(RotationError::EmptyRoster));
        assert_eq!(state, OnCallSchedule::default());
    }

    #[test]
    fn test_out_of_range_index_resets() {
        let state = OnCallSchedule {
            current_index: 5,
            roster: roster(&["Alice", "Bob"]),
        };
        let (selected, next) = advance(&state).unwrap();
        assert_eq!(selected.name, "Alice");
        assert_eq!(next.current_index, 1);
    }

    #[test]
    fn test_full_cycle_visits_everyone_in_order() {
        let mut state = OnCallSchedule {
            current_index: 0,
            roster: roster(&["Alice", "Bob", "Carol"]),
        };
        let mut seen = Vec::new();
        for _ in 0..4 {
            let (selected, next) = advance(&state).unwrap();
            seen.push(selected.name);
            state = next;
        }
        assert_eq!(seen, ["Alice", "Bob", "Carol", "Alice"]);
        assert_eq!(state.current_index, 1);
    }

    #[test]
    fn test_duplicate_entries_take_separate_turns() {
        let state = OnCallSchedule {
            current_index: 0,
            roster: roster(&["Alice", "Alice"]),
        };
        let (_, next) = advance(&state).unwrap();
        assert_eq!(next.current_index, 1);
    }

    #[test]
    fn test_single_entry_stays_at_zero() {
        let state = OnCallSchedule {
            current_index: 0,
            roster: roster(&["Alice"]),
        };
        let (selected, next) = advance(&state).unwrap();
        assert_eq!(selected.name, "Alice");
        assert_eq!(next.current_index, 0);
    }
}
