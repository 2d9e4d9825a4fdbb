//! Static module → group table.
//!
//! Modules in the same group are one logical actor split across files: they
//! may borrow each other's held lock and skip the inter-module cooldown.

use std::collections::HashMap;

/// Group name that never shares, whatever its membership.
pub const SOLO_GROUP: &str = "solo";

#[derive(Clone, Debug, Default)]
pub struct ModuleGroups {
    by_module: HashMap<String, String>,
}

impl ModuleGroups {
    /// An empty table: every module is solo.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The groups shipped with the bot.
    pub fn builtin() -> Self {
        Self::empty()
            .with_group("fishing", ["fisher", "stacker"])
            .with_group("runecraft", ["runemaker", "rune_stacker"])
            .with_group("cavebot", ["cavebot", "navigator"])
            .with_group("looting", ["looter", "depositor"])
    }

    /// Declares `members` as one group. A module can belong to one group;
    /// re-declaring it moves it.
    pub fn with_group<I, S>(mut self, group: &str, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for member in members {
            self.by_module.insert(member.into(), group.to_owned());
        }
        self
    }

    pub fn group_of(&self, module: &str) -> Option<&str> {
        self.by_module.get(module).map(String::as_str)
    }

    /// True if both modules are declared in the same non-solo group.
    pub fn same_group(&self, a: &str, b: &str) -> bool {
        match (self.group_of(a), self.group_of(b)) {
            (Some(ga), Some(gb)) => ga == gb && ga != SOLO_GROUP,
            _ => false,
        }
    }
}
