//! Rule registry.

use crate::report::{Severity, ValidationCategory};
use crate::rules::{compliance, format, hierarchy, material, mesh, performance, texture, ValidationRule};
use std::collections::HashSet;

/// Ordered catalog of validation rules.
pub struct RuleRegistry {
    rules: Vec<Box<dyn ValidationRule>>,
    disabled_rules: HashSet<String>,
    enabled_only: Option<HashSet<String>>,
}

impl RuleRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            disabled_rules: HashSet::new(),
            enabled_only: None,
        }
    }

    /// Creates a registry with every built-in rule in execution order.
    pub fn default_rules() -> Self {
        let mut registry = Self::new();
        let categories = [
            format::all_rules(),
            mesh::all_rules(),
            material::all_rules(),
            texture::all_rules(),
            hierarchy::all_rules(),
            performance::all_rules(),
            compliance::all_rules(),
        ];
        for rule in categories.into_iter().flatten() {
            registry.register(rule);
        }
        registry
    }

    /// Appends a rule; it runs after every rule registered before it.
    pub fn register(&mut self, rule: Box<dyn ValidationRule>) {
        self.rules.push(rule);
    }

    /// Disables a rule by ID.
    pub fn disable_rule(&mut self, rule_id: &str) {
        self.disabled_rules.insert(rule_id.to_string());
    }

    /// Enables only the specified rules (disables all others).
    pub fn enable_only(&mut self, rule_ids: &[&str]) {
        self.enabled_only = Some(rule_ids.iter().map(|s| s.to_string()).collect());
    }

    pub fn rules(&self) -> &[Box<dyn ValidationRule>] {
        &self.rules
    }

    /// Enabled rules in execution order.
    pub fn enabled_rules(&self) -> impl Iterator<Item = &dyn ValidationRule> + '_ {
        self.rules
            .iter()
            .map(|r| r.as_ref())
            .filter(|r| self.is_rule_enabled(r.id()))
    }

    /// Returns rule metadata for documentation and listing.
    pub fn rule_metadata(&self) -> Vec<RuleMetadata> {
        self.rules
            .iter()
            .map(|r| RuleMetadata {
                id: r.id().to_string(),
                description: r.description().to_string(),
                category: r.category(),
                severity: r.default_severity(),
                enabled: self.is_rule_enabled(r.id()),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Checks if a rule is enabled.
    pub fn is_rule_enabled(&self, rule_id: &str) -> bool {
        if self.disabled_rules.contains(rule_id) {
            return false;
        }
        if let Some(ref enabled) = self.enabled_only {
            return enabled.contains(rule_id);
        }
        true
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::default_rules()
    }
}

/// Metadata about a rule for listing.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RuleMetadata {
    pub id: String,
    pub description: String,
    pub category: ValidationCategory,
    pub severity: Severity,
    pub enabled: bool,
}
