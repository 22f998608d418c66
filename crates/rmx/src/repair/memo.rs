//! 🧠 DecisionMemo — ask the operator once, remember forever*.
//!
//! (*forever = until the process exits. A new invocation starts with an
//! empty memo. There is no persistence, and that's a feature: yesterday's
//! "yes" to deleting a field should not silently apply to today's run.)
//!
//! A multi-thousand-document transfer can fail the same way thousands of
//! times. Prompting per document would be operator abuse, so answers are
//! memoized across two independent keyspaces:
//!
//! - **error-type keys** — "should I attempt any repair for this class of
//!   error at all?"
//! - **field-name keys** — "should I specifically remove this field?"
//!
//! The orchestrator consults them in that order, short-circuiting on the
//! first no. The memo never re-prompts a decided key; `yes_all` pre-seeds
//! every answer to yes without prompting at all.

use std::collections::HashMap;

use tracing::debug;

use crate::confirm::Confirm;

/// Process-lifetime cache of operator yes/no answers.
///
/// Constructed per invocation and passed by reference into the repair
/// orchestrator — no global mutable state, no hidden dictionaries.
pub struct DecisionMemo {
    yes_all: bool,
    type_acks: HashMap<String, bool>,
    field_acks: HashMap<String, bool>,
    confirm: Box<dyn Confirm>,
}

impl std::fmt::Debug for DecisionMemo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // confirm is a trait object, and prompts don't Debug anyway
        f.debug_struct("DecisionMemo")
            .field("yes_all", &self.yes_all)
            .field("type_acks", &self.type_acks)
            .field("field_acks", &self.field_acks)
            .finish()
    }
}

impl DecisionMemo {
    pub fn new(yes_all: bool, confirm: Box<dyn Confirm>) -> Self {
        Self {
            yes_all,
            type_acks: HashMap::new(),
            field_acks: HashMap::new(),
            confirm,
        }
    }

    /// Gate one: should we attempt repairs for this error class at all?
    ///
    /// `record_id` is only prompt dressing — the memo key is the error
    /// type, so one answer covers every record failing the same way.
    pub fn should_attempt_type(&mut self, err_type: &str, record_id: &str) -> bool {
        let question = format!(
            "Record {record_id} has an error of type '{err_type}', \
             do you want me to try to fix this kind of error?"
        );
        Self::resolve(
            &mut self.type_acks,
            self.yes_all,
            self.confirm.as_mut(),
            err_type,
            &question,
        )
    }

    /// Gate two: should we remove this specific field? The question spells
    /// out the risk, because "fix" here means "delete".
    pub fn should_fix_field(&mut self, field: &str) -> bool {
        let question = format!(
            "Do you want me to try to automatically fix bad field '{field}'? \
             I might delete it"
        );
        Self::resolve(
            &mut self.field_acks,
            self.yes_all,
            self.confirm.as_mut(),
            field,
            &question,
        )
    }

    fn resolve(
        acks: &mut HashMap<String, bool>,
        yes_all: bool,
        confirm: &mut dyn Confirm,
        key: &str,
        question: &str,
    ) -> bool {
        if let Some(&decided) = acks.get(key) {
            debug!("🧠 memoized decision for '{key}': {decided}");
            return decided;
        }

        let answer = if yes_all {
            true
        } else {
            confirm.confirm(question)
        };
        acks.insert(key.to_string(), answer);
        answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::AutoYes;

    /// Scripted confirmer: pops answers front-to-back. Panics when asked
    /// more questions than it has answers — which is exactly the property
    /// the prompt-count tests lean on.
    struct Scripted {
        answers: Vec<bool>,
    }

    impl Scripted {
        fn new(answers: &[bool]) -> Self {
            Self {
                answers: answers.to_vec(),
            }
        }
    }

    impl Confirm for Scripted {
        fn confirm(&mut self, _question: &str) -> bool {
            self.answers.remove(0)
        }
    }

    #[test]
    fn the_one_where_the_operator_is_asked_exactly_once_per_key() {
        let mut memo = DecisionMemo::new(false, Box::new(Scripted::new(&[true])));

        assert!(memo.should_fix_field("meta.bad_field"));
        // Same key again: memoized, the script has no second answer to give
        // and removing from an empty Vec would panic — so passing proves
        // we never prompted twice.
        assert!(memo.should_fix_field("meta.bad_field"));
        assert!(memo.should_fix_field("meta.bad_field"));
    }

    #[test]
    fn the_one_where_no_is_remembered_just_as_well_as_yes() {
        let mut memo = DecisionMemo::new(false, Box::new(Scripted::new(&[false])));

        assert!(!memo.should_attempt_type("illegal_argument_exception", "1"));
        // Different record, same error class: still no, still no prompt.
        assert!(!memo.should_attempt_type("illegal_argument_exception", "2"));
    }

    #[test]
    fn the_one_where_the_keyspaces_do_not_bleed_into_each_other() {
        let mut memo = DecisionMemo::new(false, Box::new(Scripted::new(&[true, false])));

        // A field literally named like an error type must not inherit the
        // type-gate answer.
        assert!(memo.should_attempt_type("illegal_argument_exception", "1"));
        assert!(!memo.should_fix_field("illegal_argument_exception"));
    }

    #[test]
    fn the_one_where_yes_all_never_even_rings_the_doorbell() {
        // NeverYes would answer false if consulted; yes_all must win
        // without consulting anyone.
        let mut memo = DecisionMemo::new(true, Box::new(crate::confirm::NeverYes));

        assert!(memo.should_attempt_type("mapper_parsing_exception", "9"));
        assert!(memo.should_fix_field("anything.at.all"));
    }

    #[test]
    fn the_one_where_auto_yes_plays_nicely_without_yes_all() {
        // AutoYes as the confirmer (not yes_all mode): every first ask is a
        // yes, and it still gets memoized like any other answer.
        let mut memo = DecisionMemo::new(false, Box::new(AutoYes));
        assert!(memo.should_fix_field("meta.bad_field"));
        assert!(memo.should_fix_field("meta.bad_field"));
    }
}
