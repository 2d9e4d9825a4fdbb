//! Action kinds, default priorities and input restriction categories.

/// Input restriction class of an action.
///
/// The game rejects pointer actions while the character is mid-step, so the
/// scheduler has to know which input channel an action impersonates.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ActionCategory {
    /// Keyboard-equivalent input, accepted while moving.
    Keyboard,
    /// Pointer-equivalent input, rejected while moving.
    Mouse,
    /// No movement restriction and no capability gate.
    Any,
}

impl ActionCategory {
    /// Returns true if the game rejects this category while the character walks.
    pub const fn restricted_while_moving(self) -> bool {
        matches!(self, Self::Mouse)
    }
}

/// Every kind of operation a producer module can request.
///
/// Each kind carries a fixed default priority; lower values are served first.
/// The ordering is total: no two kinds share a priority.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ActionType {
    // Privileged: executed on the caller's task, never queued.
    EmergencyStop,
    AlarmResponse,

    // Combat
    Heal,
    Attack,
    CastSpell,
    Follow,

    // Navigation
    Walk,
    WalkTo,

    // Item manipulation
    UseItem,
    UseItemOn,
    MoveItem,
    Loot,

    // Consumption
    Eat,
    UseHotkey,

    // Utility
    Say,
    Look,
}

impl ActionType {
    /// Default priority of this kind (lower = served first).
    pub const fn priority(self) -> u32 {
        match self {
            Self::EmergencyStop => 0,
            Self::AlarmResponse => 1,
            Self::Heal => 50,
            Self::Attack => 100,
            Self::CastSpell => 110,
            Self::Follow => 150,
            Self::Walk => 200,
            Self::WalkTo => 210,
            Self::UseItem => 300,
            Self::UseItemOn => 310,
            Self::MoveItem => 320,
            Self::Loot => 330,
            Self::Eat => 400,
            Self::UseHotkey => 410,
            Self::Say => 500,
            Self::Look => 510,
        }
    }

    /// Input restriction class of this kind.
    pub const fn category(self) -> ActionCategory {
        match self {
            Self::EmergencyStop | Self::AlarmResponse => ActionCategory::Any,
            Self::Heal
            | Self::CastSpell
            | Self::Walk
            | Self::Eat
            | Self::UseHotkey
            | Self::Say => ActionCategory::Keyboard,
            Self::Attack
            | Self::Follow
            | Self::WalkTo
            | Self::UseItem
            | Self::UseItemOn
            | Self::MoveItem
            | Self::Loot
            | Self::Look => ActionCategory::Mouse,
        }
    }

    /// Returns true for the safety-critical kinds that bypass the queue.
    pub const fn is_immediate(self) -> bool {
        matches!(self, Self::EmergencyStop | Self::AlarmResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn priorities_form_a_total_order() {
        let priorities: HashSet<u32> = ActionType::iter().map(ActionType::priority).collect();
        assert_eq!(priorities.len(), ActionType::iter().count());

        let mut sorted: Vec<ActionType> = ActionType::iter().collect();
        sorted.sort_by_key(|kind| kind.priority());
        assert_eq!(sorted, ActionType::iter().collect::<Vec<_>>());
    }

    #[test]
    fn only_safety_kinds_are_immediate() {
        let immediate: Vec<ActionType> = ActionType::iter().filter(|k| k.is_immediate()).collect();
        assert_eq!(
            immediate,
            vec![ActionType::EmergencyStop, ActionType::AlarmResponse]
        );
        assert!(
            immediate
                .iter()
                .all(|kind| kind.category() == ActionCategory::Any)
        );
    }

    #[test]
    fn pointer_actions_are_mouse_category() {
        assert_eq!(ActionType::Attack.category(), ActionCategory::Mouse);
        assert_eq!(ActionType::UseItem.category(), ActionCategory::Mouse);
        assert_eq!(ActionType::Walk.category(), ActionCategory::Keyboard);
        assert!(ActionCategory::Mouse.restricted_while_moving());
        assert!(!ActionCategory::Keyboard.restricted_while_moving());
    }

    #[test]
    fn names_are_snake_case() {
        assert_eq!(ActionType::UseItemOn.to_string(), "use_item_on");
        assert_eq!(ActionType::from_str("CAST_SPELL").unwrap(), ActionType::CastSpell);
        assert_eq!(ActionCategory::Mouse.as_ref(), "mouse");
    }
}
