use serde::{Deserialize, Serialize};

/// Placeholder name for machines that never declared one.
pub const DEFAULT_MACHINE_NAME: &str = "Default";

/// A named unit (game, BIOS set, or device) owning zero or more items.
///
/// The `clone_of`/`rom_of`/`sample_of` relations are weak name references,
/// resolved through a name lookup at use time. A reference to an absent
/// machine is allowed and treated as a no-op by every consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub name: Option<String>,
    pub description: Option<String>,
    pub clone_of: Option<String>,
    pub rom_of: Option<String>,
    pub sample_of: Option<String>,
    pub is_bios: bool,
    pub is_device: bool,
}

impl Machine {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// The machine name, or [`DEFAULT_MACHINE_NAME`] if none was declared.
    pub fn name_or_default(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_MACHINE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_or_default() {
        assert_eq!(Machine::named("pacman").name_or_default(), "pacman");
        assert_eq!(Machine::default().name_or_default(), "Default");
    }
}
