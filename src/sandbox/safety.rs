//! Pre-execution lexical safety filter for JavaScript.
//!
//! This is a coarse denylist over the source text, not a proof of non-escape.
//! The isolation boundary is the worker context plus the timeouts; this layer only
//! turns away obviously hostile or runaway code before a worker is spawned.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyPolicy {
    /// Skip the unbounded-loop class (`while(true)`, `for(;;)`). The engine's loop
    /// iteration limit and the timeouts still apply.
    pub allow_unbounded_loops: bool,
}

#[derive(Debug, Clone)]
pub struct CodeAnalysisResult {
    pub is_safe: bool,
    pub violations: Vec<CodeViolation>,
}

#[derive(Debug, Clone)]
pub struct CodeViolation {
    pub kind: ViolationKind,
    /// 1-based (line, column) of the match
    pub location: (usize, usize),
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    DynamicExecution,
    HostGlobal,
    Network,
    ModuleLoading,
    PrototypeTampering,
    Timer,
    InfiniteLoopRisk,
}

pub trait CodeAnalyzer: Send + Sync {
    fn analyze(&self, code: &str) -> CodeAnalysisResult;
}

struct Rule {
    kind: ViolationKind,
    description: &'static str,
    pattern: Regex,
}

// Identifiers below are only flagged when not reached through a member access,
// so `user.location` or `page.history` stay legal.
const NOT_MEMBER: &str = r"(?:^|[^.\w$])";

fn rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        let table: &[(ViolationKind, &str, String)] = &[
            (ViolationKind::DynamicExecution, "eval", r"\beval\b".into()),
            (
                ViolationKind::DynamicExecution,
                "Function constructor",
                r"\bnew\s+Function\b|\bFunction\s*\(".into(),
            ),
            (
                ViolationKind::DynamicExecution,
                "string timer callback",
                r#"\bset(?:Timeout|Immediate)\s*\(\s*["'`]"#.into(),
            ),
            (ViolationKind::Timer, "setInterval", r"\bsetInterval\b".into()),
            (
                ViolationKind::HostGlobal,
                "host global",
                format!(
                    r"{NOT_MEMBER}(?:document|window|globalThis|navigator|localStorage|sessionStorage|indexedDB|opener)\b"
                ),
            ),
            (
                ViolationKind::HostGlobal,
                "navigation",
                format!(r"{NOT_MEMBER}(?:location|history)\s*[.\[=]"),
            ),
            (
                ViolationKind::Network,
                "network primitive",
                r"\b(?:fetch|XMLHttpRequest|WebSocket|EventSource|sendBeacon)\b".into(),
            ),
            (
                ViolationKind::ModuleLoading,
                "dynamic import",
                r"\bimport\s*\(".into(),
            ),
            (
                ViolationKind::ModuleLoading,
                "static import",
                r#"(?m)^\s*import\s+[\w${*'"]"#.into(),
            ),
            (
                ViolationKind::ModuleLoading,
                "require",
                r"\b(?:require\s*\(|importScripts\b)".into(),
            ),
            (ViolationKind::PrototypeTampering, "__proto__", r"__proto__".into()),
            (
                ViolationKind::PrototypeTampering,
                "constructor access",
                r#"\.\s*constructor\s*[.(\[]|\[\s*["'`]constructor["'`]\s*\]"#.into(),
            ),
            (
                ViolationKind::PrototypeTampering,
                "setPrototypeOf",
                r"\bsetPrototypeOf\b".into(),
            ),
            (
                ViolationKind::PrototypeTampering,
                "built-in prototype write",
                r"\b(?:Object|Array|Function|String|Number|Boolean|Promise|RegExp|Date|Map|Set|Error|Symbol|JSON|Math)\s*\.\s*prototype\s*(?:\.\s*[\w$]+|\[[^\]]*\])?\s*=[^=]".into(),
            ),
            (
                ViolationKind::InfiniteLoopRisk,
                "while(true)",
                r"\bwhile\s*\(\s*(?:true|1|!0|!false)\s*\)".into(),
            ),
            (
                ViolationKind::InfiniteLoopRisk,
                "for(;;)",
                r"\bfor\s*\(\s*;\s*;\s*\)".into(),
            ),
        ];
        table
            .iter()
            .filter_map(|(kind, description, pattern)| match Regex::new(pattern) {
                Ok(pattern) => Some(Rule {
                    kind: *kind,
                    description: *description,
                    pattern,
                }),
                Err(e) => {
                    tracing::error!(description = *description, error = %e, "invalid safety pattern");
                    None
                }
            })
            .collect()
    })
}

fn line_col(code: &str, offset: usize) -> (usize, usize) {
    let before = &code[..offset];
    let line = before.matches('\n').count() + 1;
    let column = before
        .rfind('\n')
        .map_or(before.chars().count(), |nl| before[nl + 1..].chars().count())
        + 1;
    (line, column)
}

/// The regex denylist.
#[derive(Debug, Clone, Default)]
pub struct DenylistAnalyzer {
    policy: SafetyPolicy,
}

impl DenylistAnalyzer {
    pub fn new(policy: SafetyPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &SafetyPolicy {
        &self.policy
    }
}

impl CodeAnalyzer for DenylistAnalyzer {
    fn analyze(&self, code: &str) -> CodeAnalysisResult {
        let violations: Vec<CodeViolation> = rules()
            .iter()
            .filter(|rule| {
                !(self.policy.allow_unbounded_loops && rule.kind == ViolationKind::InfiniteLoopRisk)
            })
            .filter_map(|rule| {
                rule.pattern.find(code).map(|m| CodeViolation {
                    kind: rule.kind,
                    location: line_col(code, m.start()),
                    description: rule.description.to_string(),
                })
            })
            .collect();
        CodeAnalysisResult {
            is_safe: violations.is_empty(),
            violations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(code: &str) -> Vec<ViolationKind> {
        DenylistAnalyzer::default()
            .analyze(code)
            .violations
            .into_iter()
            .map(|v| v.kind)
            .collect()
    }

    #[test]
    fn test_detects_dynamic_execution() {
        assert_eq!(kinds("eval(1)"), vec![ViolationKind::DynamicExecution]);
        assert_eq!(
            kinds("const f = new Function('return 1');"),
            vec![ViolationKind::DynamicExecution]
        );
        assert_eq!(
            kinds("setTimeout(\"alert(1)\", 10)"),
            vec![ViolationKind::DynamicExecution]
        );
    }

    #[test]
    fn test_set_interval_is_blocked_for_any_delay() {
        assert_eq!(kinds("setInterval(tick, 100)"), vec![ViolationKind::Timer]);
        assert_eq!(kinds("const d = 5; setInterval(tick, d)"), vec![ViolationKind::Timer]);
    }

    #[test]
    fn test_detects_host_and_network() {
        assert_eq!(kinds("document.body.innerHTML = ''"), vec![ViolationKind::HostGlobal]);
        assert_eq!(kinds("window.alert(1)"), vec![ViolationKind::HostGlobal]);
        assert_eq!(kinds("location.href = 'x'"), vec![ViolationKind::HostGlobal]);
        assert_eq!(kinds("fetch('/api')"), vec![ViolationKind::Network]);
        assert_eq!(kinds("new WebSocket(url)"), vec![ViolationKind::Network]);
    }

    #[test]
    fn test_detects_module_loading() {
        assert_eq!(kinds("import('fs')"), vec![ViolationKind::ModuleLoading]);
        assert_eq!(kinds("import fs from 'fs';"), vec![ViolationKind::ModuleLoading]);
        assert_eq!(kinds("const fs = require('fs')"), vec![ViolationKind::ModuleLoading]);
    }

    #[test]
    fn test_detects_prototype_tampering() {
        assert_eq!(kinds("({}).__proto__"), vec![ViolationKind::PrototypeTampering]);
        assert_eq!(
            kinds("[].constructor.constructor('x')"),
            vec![ViolationKind::PrototypeTampering]
        );
        assert_eq!(
            kinds("Array.prototype.map = null"),
            vec![ViolationKind::PrototypeTampering]
        );
        assert_eq!(
            kinds("Object.setPrototypeOf(a, b)"),
            vec![ViolationKind::PrototypeTampering]
        );
    }

    #[test]
    fn test_unbounded_loops_and_relaxed_policy() {
        assert_eq!(kinds("while (true) {}"), vec![ViolationKind::InfiniteLoopRisk]);
        assert_eq!(kinds("for(;;){}"), vec![ViolationKind::InfiniteLoopRisk]);
        assert_eq!(kinds("do {} while(1)"), vec![ViolationKind::InfiniteLoopRisk]);

        let relaxed = DenylistAnalyzer::new(SafetyPolicy {
            allow_unbounded_loops: true,
        });
        assert!(relaxed.analyze("while(true){}").is_safe);
        assert!(!relaxed.analyze("while(true){ eval('1') }").is_safe);
    }

    #[test]
    fn test_ordinary_code_is_safe() {
        let code = r#"
class Stack {
  constructor() { this.items = []; }
  push(x) { this.items.push(x); }
}
function Dog(name) { this.name = name; }
Dog.prototype.bark = function () { return this.name + " says woof"; };
const user = { location: "Paris", history: [] };
console.log(user.location, user.history.length, evaluate(2));
for (let i = 0; i < 3; i++) { while (i < 0) {} }
const fetchedAt = Date.now();
function evaluate(x) { return x * 2; }
"#;
        let result = DenylistAnalyzer::default().analyze(code);
        assert!(result.is_safe, "unexpected violations: {:?}", result.violations);
    }

    #[test]
    fn test_violation_location() {
        let result = DenylistAnalyzer::default().analyze("let a = 1;\n  eval(a)");
        assert_eq!(result.violations[0].location, (2, 3));
    }
}
