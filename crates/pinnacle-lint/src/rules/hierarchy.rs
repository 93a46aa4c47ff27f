//! Node hierarchy rules.

use crate::report::{Severity, ValidationCategory, ValidationIssue};
use crate::rules::{issue, CheckError, RuleContext, ValidationRule};
use std::collections::HashMap;

pub struct DepthRule;

impl ValidationRule for DepthRule {
    fn id(&self) -> &'static str {
        "hierarchy/depth"
    }

    fn description(&self) -> &'static str {
        "Detects node hierarchies deeper than the configured maximum"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Hierarchy
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        if ctx.scene.find_cycle().is_some() {
            return Err(CheckError::Failed("hierarchy contains a cycle".to_string()));
        }
        let depth = ctx.statistics.max_hierarchy_depth;
        let max = ctx.options.max_hierarchy_depth;
        if depth <= max {
            return Ok(vec![]);
        }
        Ok(vec![issue(
            self,
            "Deep hierarchy",
            format!("Node hierarchy is {} levels deep (limit {})", depth, max),
        )
        .with_suggestion("Flatten the hierarchy in the optimizer")])
    }
}

pub struct CycleRule;

impl ValidationRule for CycleRule {
    fn id(&self) -> &'static str {
        "hierarchy/cycle"
    }

    fn description(&self) -> &'static str {
        "Detects nodes that are their own ancestors"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Hierarchy
    }

    fn default_severity(&self) -> Severity {
        Severity::Critical
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        let Some(index) = ctx.scene.find_cycle() else {
            return Ok(vec![]);
        };
        let name = ctx
            .scene
            .nodes
            .get(index)
            .map(|n| n.name.clone())
            .unwrap_or_else(|| format!("node {index}"));
        Ok(vec![issue(
            self,
            "Hierarchy cycle",
            format!("Node '{}' is reachable from its own descendants", name),
        )
        .with_object(name)])
    }
}

/// Empty or repeated node names.
pub struct NamingRule;

impl ValidationRule for NamingRule {
    fn id(&self) -> &'static str {
        "hierarchy/naming"
    }

    fn description(&self) -> &'static str {
        "Detects unnamed and duplicate node names"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Hierarchy
    }

    fn default_severity(&self) -> Severity {
        Severity::Info
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        let mut issues = Vec::new();
        let unnamed = ctx.scene.nodes.iter().filter(|n| n.name.trim().is_empty()).count();
        if unnamed > 0 {
            issues.push(
                issue(self, "Unnamed nodes", format!("{} node(s) have no name", unnamed))
                    .with_suggestion("Name nodes so they can be found in engines and tools"),
            );
        }

        let mut seen: HashMap<&str, usize> = HashMap::new();
        for node in ctx.scene.nodes.iter().filter(|n| !n.name.trim().is_empty()) {
            *seen.entry(node.name.as_str()).or_insert(0) += 1;
        }
        let mut repeated: Vec<(&str, usize)> = seen.into_iter().filter(|(_, count)| *count > 1).collect();
        repeated.sort();
        for (name, count) in repeated {
            issues.push(
                issue(self, "Duplicate node name", format!("{} nodes are named '{}'", count, name)).with_object(name),
            );
        }
        Ok(issues)
    }
}

/// Returns this category's rules in execution order.
pub fn all_rules() -> Vec<Box<dyn ValidationRule>> {
    vec![
        Box::new(DepthRule),
        Box::new(CycleRule),
        Box::new(NamingRule),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ValidationOptions;
    use crate::test_support::{run, run_with};
    use pinnacle_scene::{NodeRecord, SceneModel};

    fn chain(depth: usize) -> SceneModel {
        let mut scene = SceneModel::new();
        for i in 0..depth {
            let mut node = NodeRecord::new(format!("n{i}"));
            if i + 1 < depth {
                node = node.with_child(i + 1);
            }
            scene.nodes.push(node);
        }
        scene.roots = vec![0];
        scene
    }

    #[test]
    fn test_depth() {
        assert!(run(&DepthRule, &chain(10)).is_empty());
        let issues = run(&DepthRule, &chain(11));
        assert_eq!(issues.len(), 1);

        let options = ValidationOptions {
            max_hierarchy_depth: 3,
            ..Default::default()
        };
        assert_eq!(run_with(&DepthRule, &chain(4), &options).unwrap().len(), 1);
    }

    #[test]
    fn test_cycle() {
        let mut scene = chain(3);
        assert!(run(&CycleRule, &scene).is_empty());
        scene.nodes[2].children.push(0);
        let issues = run(&CycleRule, &scene);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Critical);
        assert!(run_with(&DepthRule, &scene, &ValidationOptions::default()).is_err());
    }

    #[test]
    fn test_naming() {
        let mut scene = SceneModel::new();
        scene.nodes.push(NodeRecord::new("Chair"));
        scene.nodes.push(NodeRecord::new("Chair"));
        scene.nodes.push(NodeRecord::new(""));
        let issues = run(&NamingRule, &scene);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[1].object_name.as_deref(), Some("Chair"));
    }
}
