//! Static script validation: ordered substring denylist.
//!
//! Exact, case-sensitive substring matching, first-match-wins in denylist
//! order. This is defense-in-depth, not a security boundary: trivially
//! obfuscated scripts slip through, which is why every accepted script
//! still runs inside the container sandbox. Both layers stay on.

use serde::{Deserialize, Serialize};

use crate::domain::PolicyViolation;

/// Outcome of evaluating a script against a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyVerdict {
    /// The script may proceed to persistence and execution.
    Accepted,
    /// The script matched a forbidden pattern and must be discarded.
    Rejected { pattern: String },
}

impl PolicyVerdict {
    /// Returns `true` when the verdict is `Accepted`.
    pub fn is_accepted(&self) -> bool {
        matches!(self, PolicyVerdict::Accepted)
    }

    /// Convert to a result, surfacing the violation for the error path.
    pub fn into_result(self) -> Result<(), PolicyViolation> {
        match self {
            PolicyVerdict::Accepted => Ok(()),
            PolicyVerdict::Rejected { pattern } => Err(PolicyViolation { pattern }),
        }
    }
}

/// Capability interface for script validation.
///
/// The pipeline only assumes `evaluate`; a stronger static analyzer or an
/// AST-level checker can replace the denylist without touching anything
/// else.
pub trait ScriptPolicy: Send + Sync {
    /// Scan the script and produce a verdict.
    fn evaluate(&self, source_text: &str) -> PolicyVerdict;
}

/// An ordered denylist of forbidden substrings, scanned first-match-wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenyPatternSet {
    pub patterns: Vec<String>,
}

impl DenyPatternSet {
    /// Create an empty set (everything accepted).
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Append a pattern and return `self` (builder pattern).
    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.patterns.push(pattern.to_string());
        self
    }

    /// The standard denylist: capabilities a renderer script has no
    /// business using (host module imports, process spawning, raw
    /// sockets, outbound HTTP).
    pub fn standard() -> Self {
        Self {
            patterns: vec![
                "import os".to_string(),
                "import sys".to_string(),
                "subprocess".to_string(),
                "socket".to_string(),
                "requests".to_string(),
            ],
        }
    }
}

impl ScriptPolicy for DenyPatternSet {
    fn evaluate(&self, source_text: &str) -> PolicyVerdict {
        for pattern in &self.patterns {
            if source_text.contains(pattern.as_str()) {
                return PolicyVerdict::Rejected {
                    pattern: pattern.clone(),
                };
            }
        }
        PolicyVerdict::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAN: &str = "import bpy\nimport math\n\
        bpy.ops.object.select_all(action='SELECT')\n\
        bpy.ops.object.delete()\n\
        bpy.ops.mesh.primitive_cube_add(location=(0,0,0))\n";

    #[test]
    fn test_clean_script_accepted() {
        let verdict = DenyPatternSet::standard().evaluate(CLEAN);
        assert!(verdict.is_accepted());
        assert!(verdict.into_result().is_ok());
    }

    #[test]
    fn test_every_standard_pattern_rejects() {
        let policy = DenyPatternSet::standard();
        for pattern in &policy.patterns {
            let script = format!("{CLEAN}\n{pattern}\n");
            match policy.evaluate(&script) {
                PolicyVerdict::Rejected { pattern: hit } => assert_eq!(&hit, pattern),
                other => panic!("expected Rejected for {pattern:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_first_match_wins_in_denylist_order() {
        // "socket" appears earlier in the text, "import os" earlier in the
        // denylist. Denylist order decides.
        let script = format!("{CLEAN}\nsocket.create_connection(...)\nimport os\n");
        match DenyPatternSet::standard().evaluate(&script) {
            PolicyVerdict::Rejected { pattern } => assert_eq!(pattern, "import os"),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let script = format!("{CLEAN}\nIMPORT OS\n");
        assert!(DenyPatternSet::standard().evaluate(&script).is_accepted());
    }

    #[test]
    fn test_empty_set_accepts_everything() {
        let verdict = DenyPatternSet::empty().evaluate("import os");
        assert!(verdict.is_accepted());
    }

    #[test]
    fn test_with_pattern_appends() {
        let policy = DenyPatternSet::standard().with_pattern("eval(");
        match policy.evaluate(&format!("{CLEAN}\neval('1+1')\n")) {
            PolicyVerdict::Rejected { pattern } => assert_eq!(pattern, "eval("),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn test_rejection_converts_to_violation() {
        let verdict = DenyPatternSet::standard().evaluate("import os");
        let err = verdict.into_result().unwrap_err();
        assert_eq!(err.pattern, "import os");
    }

    #[test]
    fn test_verdict_serde_roundtrip() {
        let verdict = PolicyVerdict::Rejected {
            pattern: "subprocess".to_string(),
        };
        let json = serde_json::to_string(&verdict).unwrap();
        let back: PolicyVerdict = serde_json::from_str(&json).unwrap();
        assert_eq!(verdict, back);
    }
}
