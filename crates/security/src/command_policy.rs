//! Command deny-list: patterns the agent must never run against itself.
//!
//! Checked against the literal command string before it reaches the
//! execution backend. A match means the command is not executed at all.

use regex::Regex;

/// A single forbidden command pattern.
#[derive(Debug, Clone)]
pub struct DenyRule {
    /// Rule identifier, used in audit entries.
    pub id: &'static str,
    /// Human-readable description, shown to the agent when blocked.
    pub description: &'static str,
    pattern: Regex,
}

impl DenyRule {
    fn new(id: &'static str, description: &'static str, pattern: &str) -> Self {
        Self {
            id,
            description,
            pattern: Regex::new(pattern).expect("Invalid deny-list regex"),
        }
    }

    pub fn matches(&self, command: &str) -> bool {
        self.pattern.is_match(command)
    }
}

/// The static deny-list.
#[derive(Debug, Clone)]
pub struct CommandPolicy {
    rules: Vec<DenyRule>,
}

impl CommandPolicy {
    /// The built-in self-preservation rules.
    pub fn builtin() -> Self {
        let rules = vec![
            DenyRule::new(
                "delete_config_root",
                "Self-destruction: deleting the automaton config directory",
                concat!(
                    r#"\brm\s+(?:-\S+\s+)*[^;&|]*\.automaton/?["']?(?:/?\*)?(?:\s|$|[;&|])"#,
                    r#"|\bfind\s+["']?[^\s;&|]*\.automaton/?["']?(?:\s|$)[^;&|]*(?:-delete\b|-exec\s+rm\b)"#,
                ),
            ),
            DenyRule::new(
                "delete_state_db",
                "Self-destruction: deleting the state database",
                r"\b(?:rm|shred|truncate|unlink)\b[^;&|]*\bstate\.db\b",
            ),
            DenyRule::new(
                "delete_wallet",
                "Self-destruction: deleting the wallet",
                r"\b(?:rm|shred|truncate|unlink)\b[^;&|]*\bwallet\.json\b",
            ),
            DenyRule::new(
                "kill_self",
                "Self-harm: killing the automaton process",
                r"\b(?:kill|pkill|killall)\b[^;&|]*\bautomaton\b",
            ),
            DenyRule::new(
                "drop_tables",
                "Self-harm: dropping state tables",
                r"(?i)\bDROP\s+TABLE\b|\bDELETE\s+FROM\s+(?:turns|kv|agent_state|inbox_messages|identity|action_results)\b",
            ),
            DenyRule::new(
                "fork_bomb",
                "Resource exhaustion: fork bomb",
                r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:",
            ),
            DenyRule::new(
                "wipe_root",
                "Destruction: deleting the root filesystem",
                r"\brm\s+(?:-\S+\s+)*/\*?(?:\s|$|[;&|])|--no-preserve-root",
            ),
        ];
        Self { rules }
    }

    /// First rule the command violates, if any.
    pub fn check(&self, command: &str) -> Option<&DenyRule> {
        self.rules.iter().find(|rule| rule.matches(command))
    }

    pub fn is_blocked(&self, command: &str) -> bool {
        self.check(command).is_some()
    }

    pub fn rules(&self) -> &[DenyRule] {
        &self.rules
    }
}

impl Default for CommandPolicy {
    fn default() -> Self {
        Self::builtin()
    }
}
