//! ❓ The confirmation port — yes/no questions as a trait seam.
//!
//! Destructive phases (delete an index, strip a field, repopulate from a
//! tmp index) only proceed past a human saying "y". But business logic that
//! reads from a terminal is untestable business logic, so the prompt lives
//! behind this one-method trait: the CLI injects the real stdin
//! implementation, tests inject scripted answers, and `--yes-all` runs
//! inject [`AutoYes`] and never stop to chat.

/// A thing that can answer a yes/no question. `&mut self` because some
/// implementations (scripted test doubles, mostly) consume answers in order.
pub trait Confirm: Send {
    fn confirm(&mut self, question: &str) -> bool;
}

/// 🟢 Answers yes to everything. The `--yes-all` personality.
///
/// Also the right collaborator for `force-migrate`, where the operator
/// already said yes by typing the command out in full.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoYes;

impl Confirm for AutoYes {
    fn confirm(&mut self, _question: &str) -> bool {
        true
    }
}

/// 🔴 Answers no to everything. Useful for non-interactive runs that should
/// never do anything destructive, and for tests of the "operator declined"
/// paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverYes;

impl Confirm for NeverYes {
    fn confirm(&mut self, _question: &str) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_yes_agrees_to_anything() {
        let mut c = AutoYes;
        assert!(c.confirm("delete the production index?"));
    }

    #[test]
    fn never_yes_is_the_designated_driver() {
        let mut c = NeverYes;
        assert!(!c.confirm("one more destructive operation?"));
    }
}
