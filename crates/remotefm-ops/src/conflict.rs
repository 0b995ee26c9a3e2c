//! Conflict resolution for planned destinations.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use strum::Display;

/// What to do with a destination that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConflictAction {
    /// Delete the existing item, then write the new one.
    Overwrite,
    /// Leave this item out of the plan.
    Skip,
    /// Ask for another name and check again.
    Rename,
    /// Abort building the whole plan.
    Cancel,
}

/// One answer from a [`ConflictResolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictDecision {
    pub action: ConflictAction,
    /// Reuse `action` for every remaining conflict of the same build.
    pub apply_to_all: bool,
}

impl ConflictDecision {
    /// A decision for this conflict only.
    pub fn once(action: ConflictAction) -> Self {
        Self {
            action,
            apply_to_all: false,
        }
    }

    /// A decision remembered for the rest of the build.
    pub fn for_all(action: ConflictAction) -> Self {
        Self {
            action,
            apply_to_all: true,
        }
    }
}

/// Source of conflict decisions, usually a dialog.
///
/// Implementations only solicit answers; they never touch the backend.
pub trait ConflictResolver {
    /// Decide what to do about an existing `destination`.
    fn resolve(&mut self, destination: &str) -> ConflictDecision;

    /// Ask for a replacement name inside `destination_dir`.
    ///
    /// `None` means the user declined; the item is then skipped.
    fn prompt_rename(&mut self, destination_dir: &str, current_name: &str) -> Option<String>;
}

/// Whether conflicts are still asked about within one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionPolicy {
    /// Prompt for each conflict.
    #[default]
    Ask,
    /// Reuse this action without prompting.
    Sticky(ConflictAction),
}

impl ResolutionPolicy {
    /// Obtain the action for `destination`, returning the policy for the
    /// next conflict of the same build.
    pub fn decide(
        self,
        resolver: &mut dyn ConflictResolver,
        destination: &str,
    ) -> (ConflictAction, ResolutionPolicy) {
        match self {
            Self::Sticky(action) => (action, self),
            Self::Ask => {
                let decision = resolver.resolve(destination);
                let next = if decision.apply_to_all {
                    Self::Sticky(decision.action)
                } else {
                    Self::Ask
                };
                (decision.action, next)
            }
        }
    }
}

/// Resolver that always gives the same answer.
///
/// With [`ConflictAction::Rename`] it proposes "name (1).ext",
/// "name (2).ext", ... for repeated prompts about the same item.
#[derive(Debug, Clone)]
pub struct FixedResolver {
    action: ConflictAction,
    attempts: HashMap<String, u32>,
}

impl FixedResolver {
    /// Create a resolver answering `action` for every conflict.
    pub fn new(action: ConflictAction) -> Self {
        Self {
            action,
            attempts: HashMap::new(),
        }
    }
}

impl ConflictResolver for FixedResolver {
    fn resolve(&mut self, _destination: &str) -> ConflictDecision {
        ConflictDecision::for_all(self.action)
    }

    fn prompt_rename(&mut self, destination_dir: &str, current_name: &str) -> Option<String> {
        let key = format!("{destination_dir}\0{current_name}");
        let attempt = self.attempts.entry(key).or_insert(0);
        *attempt += 1;
        Some(auto_rename_name(current_name, *attempt))
    }
}

/// Resolver answering from prepared queues, recording every prompt.
///
/// Once the decision queue runs dry every further conflict is cancelled.
#[derive(Debug, Clone, Default)]
pub struct ScriptedResolver {
    decisions: VecDeque<ConflictDecision>,
    names: VecDeque<Option<String>>,
    /// Destinations passed to `resolve`, in order.
    pub prompts: Vec<String>,
    /// `(dir, name)` pairs passed to `prompt_rename`, in order.
    pub rename_prompts: Vec<(String, String)>,
}

impl ScriptedResolver {
    /// Create a resolver with the given decisions.
    pub fn new(decisions: impl IntoIterator<Item = ConflictDecision>) -> Self {
        Self {
            decisions: decisions.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Queue answers for rename prompts.
    pub fn with_names(mut self, names: impl IntoIterator<Item = Option<String>>) -> Self {
        self.names = names.into_iter().collect();
        self
    }
}

impl ConflictResolver for ScriptedResolver {
    fn resolve(&mut self, destination: &str) -> ConflictDecision {
        self.prompts.push(destination.to_string());
        self.decisions
            .pop_front()
            .unwrap_or(ConflictDecision::once(ConflictAction::Cancel))
    }

    fn prompt_rename(&mut self, destination_dir: &str, current_name: &str) -> Option<String> {
        self.rename_prompts
            .push((destination_dir.to_string(), current_name.to_string()));
        self.names.pop_front().flatten()
    }
}

/// Generate the `attempt`-th alternative for `name`.
///
/// For "file.txt" yields "file (1).txt", "file (2).txt", etc.
fn auto_rename_name(name: &str, attempt: u32) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem} ({attempt}).{ext}"),
        _ => format!("{name} ({attempt})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_rename_name() {
        assert_eq!(auto_rename_name("test.txt", 1), "test (1).txt");
        assert_eq!(auto_rename_name("testfile", 2), "testfile (2)");
        assert_eq!(auto_rename_name(".bashrc", 1), ".bashrc (1)");
    }

    #[test]
    fn test_policy_becomes_sticky() {
        let mut resolver = ScriptedResolver::new([ConflictDecision::for_all(ConflictAction::Skip)]);

        let (action, policy) = ResolutionPolicy::Ask.decide(&mut resolver, "/a");
        assert_eq!(action, ConflictAction::Skip);
        assert_eq!(policy, ResolutionPolicy::Sticky(ConflictAction::Skip));

        let (action, _) = policy.decide(&mut resolver, "/b");
        assert_eq!(action, ConflictAction::Skip);
        assert_eq!(resolver.prompts, vec!["/a"]);
    }

    #[test]
    fn test_policy_stays_ask_for_single_decisions() {
        let mut resolver = ScriptedResolver::new([
            ConflictDecision::once(ConflictAction::Overwrite),
            ConflictDecision::once(ConflictAction::Skip),
        ]);
        let (first, policy) = ResolutionPolicy::Ask.decide(&mut resolver, "/a");
        let (second, _) = policy.decide(&mut resolver, "/b");
        assert_eq!((first, second), (ConflictAction::Overwrite, ConflictAction::Skip));
        assert_eq!(resolver.prompts.len(), 2);
    }

    #[test]
    fn test_fixed_resolver_renames_incrementally() {
        let mut resolver = FixedResolver::new(ConflictAction::Rename);
        assert!(resolver.resolve("/x/a.txt").apply_to_all);
        assert_eq!(resolver.prompt_rename("/x", "a.txt").as_deref(), Some("a (1).txt"));
        assert_eq!(resolver.prompt_rename("/x", "a.txt").as_deref(), Some("a (2).txt"));
        assert_eq!(resolver.prompt_rename("/x", "b.txt").as_deref(), Some("b (1).txt"));
    }

    #[test]
    fn test_scripted_resolver_cancels_when_exhausted() {
        let mut resolver = ScriptedResolver::default();
        assert_eq!(resolver.resolve("/a").action, ConflictAction::Cancel);
    }
}
