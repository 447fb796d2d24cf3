//! Key validation.
//!
//! Guards against free-text keys leaking into billed, cardinality-limited
//! analytics backends. Validation is advisory plumbing: failures are logged
//! by the router and, at the strictest level, the offending operation is
//! dropped. Nothing propagates to the application.

use crate::error::RouterError;
use bc_common::Event;
use regex::Regex;

/// Configured strictness of key validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationLevel {
    /// No key is inspected.
    #[default]
    None,
    /// Invalid keys are logged; the operation proceeds.
    LogOnly,
    /// Invalid keys are logged; the operation is dropped.
    Abort,
}

/// Result of validating a set of keys or a full event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    NotPerformed,
    Valid,
    InvalidContinue,
    InvalidAbort,
}

impl ValidationOutcome {
    pub fn is_invalid(self) -> bool {
        matches!(self, Self::InvalidContinue | Self::InvalidAbort)
    }

    pub fn is_abort(self) -> bool {
        self == Self::InvalidAbort
    }
}

/// Validates event names and property keys against a naming pattern.
///
/// The pattern is anchored: a key is valid only when the whole key matches,
/// never when a substring does.
#[derive(Debug, Clone)]
pub struct KeyValidator {
    pattern: Regex,
    level: ValidationLevel,
}

impl KeyValidator {
    pub fn new(pattern: &str, level: ValidationLevel) -> Result<Self, RouterError> {
        let pattern = Regex::new(&format!("^(?:{pattern})$"))?;
        Ok(Self { pattern, level })
    }

    /// Validator that never inspects anything.
    pub fn disabled() -> Self {
        Self {
            pattern: Regex::new("^$").expect("static pattern"),
            level: ValidationLevel::None,
        }
    }

    pub fn level(&self) -> ValidationLevel {
        self.level
    }

    /// Validates every key in `keys`. At [`ValidationLevel::None`] no key is
    /// inspected.
    pub fn validate_keys<'a, I>(&self, keys: I) -> ValidationOutcome
    where
        I: IntoIterator<Item = &'a str>,
    {
        match self.level {
            ValidationLevel::None => ValidationOutcome::NotPerformed,
            _ => self.outcome(keys.into_iter().all(|key| self.is_valid(key))),
        }
    }

    /// Validates the event name, the identity key, the event's own property
    /// keys, and every key of the embedded persistent/profile sub-objects,
    /// stopping at the first failing bucket.
    ///
    /// Expects the event's identity to be assigned already; the router stamps
    /// it before validating.
    pub fn validate_event(&self, event: &Event) -> ValidationOutcome {
        if self.level == ValidationLevel::None {
            return ValidationOutcome::NotPerformed;
        }

        let mut valid = self.is_valid(event.name())
            && self.is_valid(&event.identity().0)
            && self.keys_valid(event.properties().keys());
        if valid {
            if let Some(persistent) = event.persistent() {
                valid = self.keys_valid(persistent.properties().keys())
                    && self.keys_valid(persistent.one_time_properties().keys())
                    && self.keys_valid(persistent.incremental_properties().keys());
            }
        }
        if valid {
            if let Some(profile) = event.profile() {
                valid = self.keys_valid(profile.properties().keys())
                    && self.keys_valid(profile.one_time_properties().keys())
                    && self.keys_valid(profile.incremental_properties().keys());
            }
        }
        self.outcome(valid)
    }

    fn keys_valid<'a, I>(&self, keys: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        keys.into_iter().all(|key| self.is_valid(key))
    }

    fn is_valid(&self, key: &str) -> bool {
        self.pattern.is_match(key)
    }

    fn outcome(&self, valid: bool) -> ValidationOutcome {
        match (valid, self.level) {
            (true, _) => ValidationOutcome::Valid,
            (false, ValidationLevel::LogOnly) => ValidationOutcome::InvalidContinue,
            (false, _) => ValidationOutcome::InvalidAbort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TITLE_CASE: &str = r"[A-Z][a-z]*(\s[A-Z][a-z]*)*";

    #[test]
    fn level_none_skips_inspection() {
        let validator = KeyValidator::new(TITLE_CASE, ValidationLevel::None).unwrap();
        assert_eq!(
            validator.validate_keys(["definitely not valid!!"]),
            ValidationOutcome::NotPerformed
        );
    }

    #[test]
    fn abort_level_flags_invalid_keys_for_abort() {
        let validator = KeyValidator::new(TITLE_CASE, ValidationLevel::Abort).unwrap();
        assert_eq!(
            validator.validate_keys(["button clicked"]),
            ValidationOutcome::InvalidAbort
        );
        assert_eq!(
            validator.validate_keys(["Button Clicked"]),
            ValidationOutcome::Valid
        );
    }

    #[test]
    fn log_only_level_flags_invalid_keys_for_continue() {
        let validator = KeyValidator::new(TITLE_CASE, ValidationLevel::LogOnly).unwrap();
        assert_eq!(
            validator.validate_keys(["button clicked"]),
            ValidationOutcome::InvalidContinue
        );
    }

    #[test]
    fn match_is_anchored_not_substring() {
        let validator = KeyValidator::new(TITLE_CASE, ValidationLevel::Abort).unwrap();
        // "Clicked" alone matches, but the surrounding junk must fail it.
        assert_eq!(
            validator.validate_keys(["xx Clicked yy"]),
            ValidationOutcome::InvalidAbort
        );
    }

    #[test]
    fn event_validation_covers_embedded_buckets() {
        let validator = KeyValidator::new(TITLE_CASE, ValidationLevel::Abort).unwrap();

        let event = bc_common::Event::builder("Button Clicked")
            .property("Button Text", "Send")
            .one_time_persistent_property("bad key", 1)
            .build();
        event.assign_identity(("Event Id".to_string(), "id-1".to_string()));
        assert_eq!(validator.validate_event(&event), ValidationOutcome::InvalidAbort);

        let event = bc_common::Event::builder("Button Clicked")
            .property("Button Text", "Send")
            .one_time_persistent_property("First Click", 1)
            .build();
        event.assign_identity(("Event Id".to_string(), "id-2".to_string()));
        assert_eq!(validator.validate_event(&event), ValidationOutcome::Valid);
    }

    #[test]
    fn invalid_identity_key_fails_the_event() {
        let validator = KeyValidator::new(TITLE_CASE, ValidationLevel::LogOnly).unwrap();
        let event = bc_common::Event::builder("Button Clicked").build();
        event.assign_identity(("event_id".to_string(), "id-3".to_string()));
        assert_eq!(
            validator.validate_event(&event),
            ValidationOutcome::InvalidContinue
        );
    }
}
