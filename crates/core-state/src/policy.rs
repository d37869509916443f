//! Edit interpretation policy: delete units per input verb and beforeinput pairing.

use core_text::DeleteUnit;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditPolicy {
    /// When set, an `input` that repeats the verb of the `beforeinput` just applied
    /// confirms that edit instead of applying it a second time.
    pub pair_beforeinput: bool,
    overrides: HashMap<String, DeleteUnit>,
}

impl Default for EditPolicy {
    fn default() -> Self {
        Self {
            pair_beforeinput: true,
            overrides: HashMap::new(),
        }
    }
}

impl EditPolicy {
    pub fn new(pair_beforeinput: bool) -> Self {
        Self {
            pair_beforeinput,
            ..Self::default()
        }
    }

    pub fn with_unit(mut self, input_type: impl Into<String>, unit: DeleteUnit) -> Self {
        self.set_unit(input_type, unit);
        self
    }

    pub fn set_unit(&mut self, input_type: impl Into<String>, unit: DeleteUnit) {
        self.overrides.insert(input_type.into(), unit);
    }

    /// Unit removed by a collapsed-selection delete for `input_type`.
    pub fn unit_for(&self, input_type: &str) -> DeleteUnit {
        self.overrides
            .get(input_type)
            .copied()
            .unwrap_or_else(|| default_unit(input_type))
    }
}

/// Built-in mapping used when no override is configured.
pub fn default_unit(input_type: &str) -> DeleteUnit {
    match input_type {
        "deleteContentBackward" | "deleteContentForward" => DeleteUnit::Grapheme,
        "deleteWordBackward" | "deleteWordForward" => DeleteUnit::Word,
        v if v.starts_with("deleteSoftLine") || v.starts_with("deleteHardLine") => {
            DeleteUnit::Line
        }
        _ => DeleteUnit::Char,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_by_verb_family() {
        let p = EditPolicy::default();
        assert_eq!(p.unit_for("deleteContentBackward"), DeleteUnit::Grapheme);
        assert_eq!(p.unit_for("deleteWordForward"), DeleteUnit::Word);
        assert_eq!(p.unit_for("deleteSoftLineBackward"), DeleteUnit::Line);
        assert_eq!(p.unit_for("deleteHardLineForward"), DeleteUnit::Line);
        assert_eq!(p.unit_for("deleteSomethingNew"), DeleteUnit::Char);
        assert!(p.pair_beforeinput);
    }

    #[test]
    fn override_wins() {
        let p = EditPolicy::default().with_unit("deleteContentBackward", DeleteUnit::Char);
        assert_eq!(p.unit_for("deleteContentBackward"), DeleteUnit::Char);
        assert_eq!(p.unit_for("deleteContentForward"), DeleteUnit::Grapheme);
    }

    #[test]
    fn new_keeps_default_units() {
        let p = EditPolicy::new(false);
        assert!(!p.pair_beforeinput);
        assert_eq!(p.unit_for("deleteWordBackward"), DeleteUnit::Word);
    }
}
