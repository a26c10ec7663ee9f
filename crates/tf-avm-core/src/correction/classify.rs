//! Error-kind classification and code-block extraction.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Closed set of structural error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingArgument,
    UndefinedReference,
    InvalidValue,
    MissingModuleSource,
    SyntaxError,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MissingArgument => "missing_argument",
            ErrorKind::UndefinedReference => "undefined_reference",
            ErrorKind::InvalidValue => "invalid_value",
            ErrorKind::MissingModuleSource => "missing_module_source",
            ErrorKind::SyntaxError => "syntax_error",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// Fix hint handed to the collaborator. `None` for unknown problems.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            ErrorKind::MissingArgument => Some("Add the missing required argument to the block"),
            ErrorKind::UndefinedReference => {
                Some("Declare the referenced resource or module, or fix the reference name")
            }
            ErrorKind::InvalidValue => Some("Replace the empty or invalid value with a valid one"),
            ErrorKind::MissingModuleSource => {
                Some("Add a source argument pointing at the registry module")
            }
            ErrorKind::SyntaxError => Some("Fix the syntax error at the reported location"),
            ErrorKind::Unknown => None,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: ErrorKind,
    pub file: String,
    pub message: String,
    pub line: Option<u32>,
    pub suggestion: Option<String>,
}

lazy_regex!(MISSING_ARGUMENT, r#"Missing required argument: "([^"]+)""#);
lazy_regex!(UNDEFINED_REFERENCE, r#"Reference to undefined resource "([^"]+)""#);
lazy_regex!(INVALID_VALUE, r#"Invalid value for variable "([^"]+)""#);
lazy_regex!(MISSING_MODULE_SOURCE, r#"Module "([^"]+)" not found"#);
lazy_regex!(
    SYNTAX_ERROR,
    r"Expected (?:'=' after argument name|expression)|Unbalanced|Unterminated"
);
lazy_regex!(LINE_NUMBER, r"\bline (\d+)\b");

lazy_regex!(FENCE_HCL, r"(?s)```hcl\n(.*?)```");
lazy_regex!(FENCE_TERRAFORM, r"(?s)```terraform\n(.*?)```");
lazy_regex!(FENCE_PLAIN, r"(?s)```\n(.*?)```");

/// Patterns in priority order; the first match decides the kind.
static PATTERNS: [(&LazyLock<Option<Regex>>, ErrorKind); 5] = [
    (&MISSING_ARGUMENT, ErrorKind::MissingArgument),
    (&UNDEFINED_REFERENCE, ErrorKind::UndefinedReference),
    (&INVALID_VALUE, ErrorKind::InvalidValue),
    (&MISSING_MODULE_SOURCE, ErrorKind::MissingModuleSource),
    (&SYNTAX_ERROR, ErrorKind::SyntaxError),
];

static FENCES: [&LazyLock<Option<Regex>>; 3] = [&FENCE_HCL, &FENCE_TERRAFORM, &FENCE_PLAIN];

/// Classify a validator failure message. Empty messages produce no issue;
/// unmatched ones are `Unknown`.
pub fn classify(file: &str, message: &str) -> Option<ValidationIssue> {
    if message.trim().is_empty() {
        return None;
    }

    let kind = PATTERNS
        .iter()
        .find(|(re, _)| re.as_ref().is_some_and(|re| re.is_match(message)))
        .map(|(_, kind)| *kind)
        .unwrap_or(ErrorKind::Unknown);

    let line = LINE_NUMBER
        .as_ref()
        .and_then(|re| re.captures(message))
        .and_then(|caps| caps[1].parse().ok());

    Some(ValidationIssue {
        kind,
        file: file.to_string(),
        message: message.to_string(),
        line,
        suggestion: kind.suggestion().map(str::to_string),
    })
}

/// First fenced code block in a response, by fence priority. Blank blocks
/// count as absent.
pub fn extract_code_block(response: &str) -> Option<String> {
    FENCES.iter().find_map(|fence| {
        fence
            .as_ref()
            .and_then(|re| re.captures(response))
            .map(|caps| caps[1].trim().to_string())
            .filter(|code| !code.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(message: &str) -> Option<ErrorKind> {
        classify("main.tf", message).map(|i| i.kind)
    }

    #[test]
    fn test_kinds_by_pattern() {
        assert_eq!(
            kind("Missing required argument: \"version\" in module \"web\""),
            Some(ErrorKind::MissingArgument)
        );
        assert_eq!(
            kind("Reference to undefined resource \"plan\" (module.plan) at line 4"),
            Some(ErrorKind::UndefinedReference)
        );
        assert_eq!(
            kind("Invalid value for variable \"name\" at line 2"),
            Some(ErrorKind::InvalidValue)
        );
        assert_eq!(
            kind("Module \"web\" not found: block has no source"),
            Some(ErrorKind::MissingModuleSource)
        );
        assert_eq!(
            kind("Expected '=' after argument name at line 3"),
            Some(ErrorKind::SyntaxError)
        );
        assert_eq!(kind("Unbalanced braces: 2 opening, 1 closing"), Some(ErrorKind::SyntaxError));
        assert_eq!(kind("No top-level blocks found"), Some(ErrorKind::Unknown));
        assert_eq!(kind("   "), None);
    }

    #[test]
    fn test_hyphenated_names_keep_their_kind() {
        assert_eq!(
            kind("Module \"web-app\" not found: block has no source"),
            Some(ErrorKind::MissingModuleSource)
        );
        assert_eq!(
            kind("Missing required argument: \"version\" in module \"web-app\""),
            Some(ErrorKind::MissingArgument)
        );
        assert_eq!(
            kind("Reference to undefined resource \"web-app\" (module.web-app) at line 7"),
            Some(ErrorKind::UndefinedReference)
        );
        assert_eq!(
            kind("Invalid value for variable \"tags-x\" at line 2"),
            Some(ErrorKind::InvalidValue)
        );
    }

    #[test]
    fn test_validator_messages_round_trip_through_classify() {
        use crate::generator::validate_structure;

        let cases = [
            ("module \"web-app\" {\n  version = \"1.0\"\n}\n", ErrorKind::MissingModuleSource),
            (
                "module \"web-app\" {\n  source = \"Azure/avm-res-web-site/azurerm\"\n}\n",
                ErrorKind::MissingArgument,
            ),
            (
                "module \"web-app\" {\n  source  = \"Azure/avm-res-web-site/azurerm\"\n  version = \"\"\n}\n",
                ErrorKind::InvalidValue,
            ),
            (
                "module \"app\" {\n  source = \"./app\"\n  plan_id = module.web-plan.id\n}\n",
                ErrorKind::UndefinedReference,
            ),
        ];
        for (content, expected) in cases {
            let check = validate_structure(content);
            assert!(!check.valid, "{content}");
            assert_eq!(kind(&check.message), Some(expected), "{}", check.message);
        }
    }

    #[test]
    fn test_priority_order_wins() {
        let msg = "Missing required argument: \"x\"; Reference to undefined resource \"y\"";
        assert_eq!(kind(msg), Some(ErrorKind::MissingArgument));
    }

    #[test]
    fn test_line_and_suggestion_are_filled() {
        let issue = classify("main.tf", "Expected expression after '=' at line 12").unwrap();
        assert_eq!(issue.line, Some(12));
        assert!(issue.suggestion.is_some());

        let unknown = classify("main.tf", "something odd").unwrap();
        assert_eq!(unknown.line, None);
        assert_eq!(unknown.suggestion, None);
    }

    #[test]
    fn test_extract_prefers_hcl_fence() {
        let response = "```\nplain\n```\n```terraform\ntf\n```\n```hcl\nhcl\n```";
        assert_eq!(extract_code_block(response).as_deref(), Some("hcl"));
    }

    #[test]
    fn test_extract_falls_back_in_order() {
        assert_eq!(
            extract_code_block("x\n```terraform\nresource {}\n```").as_deref(),
            Some("resource {}")
        );
        assert_eq!(extract_code_block("```\nplain\n```").as_deref(), Some("plain"));
        assert_eq!(extract_code_block("```python\nprint()\n```"), None);
        assert_eq!(extract_code_block("no fences"), None);
        assert_eq!(extract_code_block("```hcl\n   \n```"), None);
    }
}
