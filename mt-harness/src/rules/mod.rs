//! Relation files
//!
//! A relation file holds one rule per line:
//!
//! ```text
//! # comment
//! out:e1l1 == 1 or out:e2l1 == 1 -> out:alarm == 1
//! out:r2 == 0 or out:l2 == 0
//! ```
//!
//! The part before `->` is the precondition; without `->` the rule is
//! checked at every instant. Each side is parsed once into an expression tree
//! whose `in:<port>` / `out:<port>` leaves bind to the current port values.

mod eval;
mod lexer;
mod parser;
mod value;

pub use parser::{parse_expr, ArithOp, CompareOp, Expr, UnaryOp};
pub use value::Value;

use crate::config::HarnessConfig;
use crate::snapshot::Snapshot;
use crate::types::{HarnessError, PortKind, Result};
use regex::Regex;
use std::fs;
use std::path::Path;

/// Textual pattern of a port placeholder
const PORT_REFERENCE_PATTERN: &str = r"(in|out):([A-Za-z0-9_-]+)";

/// Ports referenced by one side of a rule, in order of first appearance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

impl Dependencies {
    fn extract(pattern: &Regex, src: &str) -> Self {
        let mut deps = Self::default();
        for caps in pattern.captures_iter(src) {
            let list = match &caps[1] {
                "in" => &mut deps.inputs,
                _ => &mut deps.outputs,
            };
            let name = &caps[2];
            if !list.iter().any(|n| n == name) {
                list.push(name.to_string());
            }
        }
        deps
    }
}

/// One side of a rule: source text, parsed tree and referenced ports
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    source: String,
    expr: Expr,
    dependencies: Dependencies,
}

impl Condition {
    fn parse(pattern: &Regex, src: &str, line: usize) -> Result<Self> {
        let expr = parse_expr(src).map_err(|message| HarnessError::RuleParse {
            line,
            message: format!("{} in `{}`", message, src),
        })?;
        Ok(Self {
            source: src.to_string(),
            expr,
            dependencies: Dependencies::extract(pattern, src),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn dependencies(&self) -> &Dependencies {
        &self.dependencies
    }

    /// Evaluate to a boolean
    pub fn holds(&self, snapshot: &Snapshot<'_>) -> Result<bool> {
        eval::evaluate(&self.expr, snapshot)
            .map(|v| v.is_truthy())
            .map_err(|message| HarnessError::RuleEvaluation {
                expression: self.source.clone(),
                message,
            })
    }
}

/// A `precondition -> postcondition` pair
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// 1-based line in the relation file
    pub line: usize,
    /// None means the rule always applies
    pub precondition: Option<Condition>,
    pub postcondition: Condition,
}

impl Rule {
    /// Check the rule; fails if the precondition holds and the postcondition does not
    pub fn check(&self, snapshot: &Snapshot<'_>) -> Result<()> {
        if let Some(pre) = &self.precondition {
            if !pre.holds(snapshot)? {
                return Ok(());
            }
        }

        if self.postcondition.holds(snapshot)? {
            return Ok(());
        }

        Err(HarnessError::RuleViolated {
            line: self.line,
            postcondition: self.postcondition.source.clone(),
            precondition: self.precondition.as_ref().map(|p| p.source.clone()),
        })
    }
}

/// Rules loaded from one relation file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Load and parse a relation file
    pub fn load(path: &Path) -> Result<Self> {
        log::info!("Loading relation file: {:?}", path);
        let content = fs::read_to_string(path)?;
        let rules = Self::parse(&content)?;
        log::info!("Loaded {} rules from {:?}", rules.len(), path);
        Ok(rules)
    }

    /// Parse relation-file text
    pub fn parse(content: &str) -> Result<Self> {
        let pattern = Regex::new(PORT_REFERENCE_PATTERN)
            .map_err(|e| HarnessError::Config(format!("Invalid port pattern: {}", e)))?;

        let mut rules = Vec::new();
        for (idx, raw) in content.lines().enumerate() {
            let line = idx + 1;
            let text = raw.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }

            let (pre, post) = match split_rule(text) {
                Some((pre, post)) => (Some(pre.trim()), post.trim()),
                None => (None, text),
            };

            if post.is_empty() {
                return Err(HarnessError::RuleParse {
                    line,
                    message: "missing postcondition".to_string(),
                });
            }

            let precondition = match pre {
                Some(src) if !src.is_empty() => Some(Condition::parse(&pattern, src, line)?),
                _ => None,
            };
            let postcondition = Condition::parse(&pattern, post, line)?;

            log::debug!(
                "Rule {}: [{}] -> [{}]",
                line,
                precondition.as_ref().map(|p| p.source()).unwrap_or(""),
                postcondition.source()
            );

            rules.push(Rule {
                line,
                precondition,
                postcondition,
            });
        }

        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Fail if a rule references a port the configuration does not declare
    pub fn check_ports(&self, config: &HarnessConfig) -> Result<()> {
        for rule in &self.rules {
            let sides = rule.precondition.iter().chain(std::iter::once(&rule.postcondition));
            for condition in sides {
                for (kind, name) in condition.expr.ports() {
                    let declared = match kind {
                        PortKind::Input => config.inputs.contains_key(name),
                        PortKind::Output => config.outputs.contains_key(name),
                    };
                    if !declared {
                        return Err(HarnessError::UnknownPort {
                            kind,
                            name: name.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Check every rule in file order, stopping at the first violation
    pub fn evaluate(&self, snapshot: &Snapshot<'_>) -> Result<()> {
        for rule in &self.rules {
            log::trace!("Checking rule at line {}", rule.line);
            rule.check(snapshot)?;
        }
        Ok(())
    }
}

/// Split a rule at the first `->` outside a quoted literal
fn split_rule(text: &str) -> Option<(&str, &str)> {
    let mut quote = None;
    let mut escaped = false;
    for (idx, c) in text.char_indices() {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if text[idx..].starts_with("->") => {
                return Some((&text[..idx], &text[idx + 2..]));
            }
            None => {}
        }
    }
    None
}
