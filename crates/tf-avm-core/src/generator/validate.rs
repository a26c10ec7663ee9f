//! Heuristic structural validation of generated configuration text.
//!
//! This is a fast pre-filter, not a grammar. Checks run in a fixed order and
//! the first failure wins. Comments and string contents are blanked before
//! any structural check so that braces or keywords inside them are ignored.
//! Failure messages are phrased so that [`crate::correction::classify`] maps
//! them to the right error kind.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_regex!(TOP_LEVEL_BLOCK, r"^\s*(terraform|provider|resource|module|data|variable|output|locals)\b");
lazy_regex!(BARE_ARGUMENT, r"^[A-Za-z_][\w-]*\s+[^\s]");
lazy_regex!(MODULE_HEADER, r#"^\s*module\s+"([^"]*)""#);
lazy_regex!(RESOURCE_HEADER, r#"^\s*resource\s+"([^"]+)"\s+"([^"]+)""#);
lazy_regex!(DATA_HEADER, r#"^\s*data\s+"([^"]+)"\s+"([^"]+)""#);
lazy_regex!(SOURCE_ATTR, r#"(?:^|[\s{;,])source\s*=\s*"([^"]*)""#);
lazy_regex!(VERSION_ATTR, r"(?:^|[\s{;,])version\s*=");
lazy_regex!(EMPTY_MODULE_ARGUMENT, r#"(?:^|[\s{;,])(source|version)\s*=\s*""\s*(?:$|[,;}])"#);
lazy_regex!(DYNAMIC_HEADER, r#"^\s*dynamic\s+"([^"]+)""#);
lazy_regex!(ITERATOR_ATTR, r"^\s*iterator\s*=\s*([A-Za-z_][\w-]*)");
lazy_regex!(
    FOR_BINDING,
    r"\bfor\s+([A-Za-z_][\w-]*)(?:\s*,\s*([A-Za-z_][\w-]*))?\s+in\b"
);
lazy_regex!(HEREDOC_START, r"<<-?\s*([A-Za-z_]\w*)\s*$");
lazy_regex!(
    REFERENCE,
    r"(?:^|[^\w.])(?:data\.([A-Za-z_][\w-]*)\.([A-Za-z_][\w-]*)|module\.([A-Za-z_][\w-]*)|([a-z][a-z0-9]*_[\w-]*)\.([A-Za-z_][\w-]*))"
);

/// Result of [`validate_structure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureCheck {
    pub valid: bool,
    pub message: String,
}

impl StructureCheck {
    fn pass() -> Self {
        Self {
            valid: true,
            message: "Configuration structure is valid".to_string(),
        }
    }

    fn fail(message: String) -> Self {
        Self {
            valid: false,
            message,
        }
    }
}

/// One source line after comment stripping.
struct Line {
    number: usize,
    /// Comment-free text, strings intact.
    code: String,
    /// Comment-free text with string contents blanked.
    masked: String,
    /// Brace depth at the start of the line.
    depth: i32,
    /// Bracket and parenthesis depth at the start of the line.
    nesting: i32,
}

struct ModuleBlock {
    name: String,
    source: Option<String>,
    has_version: bool,
    /// First `source` or `version` set to `""`, with its line number.
    empty_argument: Option<(String, usize)>,
}

/// Validate configuration text structurally.
pub fn validate_structure(content: &str) -> StructureCheck {
    if content.trim().is_empty() {
        return StructureCheck::fail("Configuration is empty".to_string());
    }

    let lines = match scan(content).and_then(|mut lines| {
        measure_depths(&mut lines)?;
        Ok(lines)
    }) {
        Ok(lines) => lines,
        Err(message) => return StructureCheck::fail(message),
    };

    let checks: [fn(&[Line]) -> Option<String>; 7] = [
        check_top_level_blocks,
        check_bare_arguments,
        check_dangling_assignments,
        check_module_sources,
        check_module_versions,
        check_empty_values,
        check_references,
    ];
    for check in checks {
        if let Some(message) = check(&lines) {
            return StructureCheck::fail(message);
        }
    }

    StructureCheck::pass()
}

fn scan(content: &str) -> Result<Vec<Line>, String> {
    let mut lines = Vec::new();
    let mut heredoc: Option<String> = None;
    let mut in_block_comment = false;

    for (idx, raw) in content.lines().enumerate() {
        let number = idx + 1;
        if let Some(terminator) = &heredoc {
            if raw.trim() == terminator {
                heredoc = None;
            }
            lines.push(Line::blank(number));
            continue;
        }

        let (code, masked, still_in_comment) = mask_line(raw, in_block_comment)
            .ok_or_else(|| format!("Unterminated string literal at line {number}"))?;
        in_block_comment = still_in_comment;

        if let Some(caps) = HEREDOC_START.as_ref().and_then(|re| re.captures(&masked)) {
            heredoc = Some(caps[1].to_string());
        }

        lines.push(Line {
            number,
            code,
            masked,
            depth: 0,
            nesting: 0,
        });
    }

    Ok(lines)
}

/// Lexical context inside a quoted string.
#[derive(Clone, Copy)]
enum Quoted {
    Text,
    /// `${ ... }` or `%{ ... }` with its brace depth.
    Template(u32),
}

/// Strip comments and blank string contents, template sequences included.
/// `None` when a string is left open at the end of the line.
fn mask_line(raw: &str, mut in_block_comment: bool) -> Option<(String, String, bool)> {
    let mut code = String::with_capacity(raw.len());
    let mut masked = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    let mut stack: Vec<Quoted> = Vec::new();

    while let Some(c) = chars.next() {
        if in_block_comment {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                in_block_comment = false;
            }
            continue;
        }

        match stack.last().copied() {
            Some(Quoted::Text) => {
                code.push(c);
                match c {
                    '\\' => {
                        masked.push(' ');
                        if let Some(escaped) = chars.next() {
                            code.push(escaped);
                            masked.push(' ');
                        }
                    }
                    '"' => {
                        stack.pop();
                        masked.push(if stack.is_empty() { '"' } else { ' ' });
                    }
                    // `$${` and `%%{` are literal.
                    '$' | '%' if chars.peek() == Some(&c) => {
                        chars.next();
                        code.push(c);
                        masked.push_str("  ");
                    }
                    '$' | '%' if chars.peek() == Some(&'{') => {
                        chars.next();
                        code.push('{');
                        masked.push_str("  ");
                        stack.push(Quoted::Template(1));
                    }
                    _ => masked.push(' '),
                }
            }
            Some(Quoted::Template(depth)) => {
                code.push(c);
                masked.push(' ');
                match c {
                    '"' => stack.push(Quoted::Text),
                    '{' => {
                        stack.pop();
                        stack.push(Quoted::Template(depth + 1));
                    }
                    '}' => {
                        stack.pop();
                        if depth > 1 {
                            stack.push(Quoted::Template(depth - 1));
                        }
                    }
                    _ => {}
                }
            }
            None => match c {
                '#' => break,
                '/' if chars.peek() == Some(&'/') => break,
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    in_block_comment = true;
                }
                '"' => {
                    stack.push(Quoted::Text);
                    code.push(c);
                    masked.push(c);
                }
                _ => {
                    code.push(c);
                    masked.push(c);
                }
            },
        }
    }

    if !stack.is_empty() {
        return None;
    }
    Some((code, masked, in_block_comment))
}

fn measure_depths(lines: &mut [Line]) -> Result<(), String> {
    let mut braces = Counter::new("braces", '{', '}');
    let mut brackets = Counter::new("brackets", '[', ']');
    let mut parens = Counter::new("parentheses", '(', ')');

    for line in lines.iter_mut() {
        line.depth = braces.depth;
        line.nesting = brackets.depth + parens.depth;
        for c in line.masked.chars() {
            braces.feed(c, line.number)?;
            brackets.feed(c, line.number)?;
            parens.feed(c, line.number)?;
        }
    }

    braces.finish()?;
    brackets.finish()?;
    parens.finish()
}

struct Counter {
    label: &'static str,
    open: char,
    close: char,
    opened: usize,
    closed: usize,
    depth: i32,
}

impl Counter {
    fn new(label: &'static str, open: char, close: char) -> Self {
        Self {
            label,
            open,
            close,
            opened: 0,
            closed: 0,
            depth: 0,
        }
    }

    fn feed(&mut self, c: char, line: usize) -> Result<(), String> {
        if c == self.open {
            self.opened += 1;
            self.depth += 1;
        } else if c == self.close {
            self.closed += 1;
            self.depth -= 1;
            if self.depth < 0 {
                return Err(format!(
                    "Unbalanced {}: unexpected '{}' at line {}",
                    self.label, self.close, line
                ));
            }
        }
        Ok(())
    }

    fn finish(&self) -> Result<(), String> {
        if self.depth != 0 {
            return Err(format!(
                "Unbalanced {}: {} opening, {} closing",
                self.label, self.opened, self.closed
            ));
        }
        Ok(())
    }
}

impl Line {
    fn blank(number: usize) -> Self {
        Self {
            number,
            code: String::new(),
            masked: String::new(),
            depth: 0,
            nesting: 0,
        }
    }

    fn is_top_level(&self) -> bool {
        self.depth == 0 && self.nesting == 0
    }

    /// A line directly inside a block body, outside any list or call.
    fn is_block_body(&self) -> bool {
        self.depth > 0 && self.nesting == 0
    }
}

fn check_top_level_blocks(lines: &[Line]) -> Option<String> {
    let re = TOP_LEVEL_BLOCK.as_ref()?;
    let found = lines
        .iter()
        .any(|l| l.is_top_level() && re.is_match(&l.masked));
    (!found).then(|| "No top-level blocks found".to_string())
}

fn check_bare_arguments(lines: &[Line]) -> Option<String> {
    let re = BARE_ARGUMENT.as_ref()?;
    lines
        .iter()
        .filter(|l| l.is_block_body())
        .find(|l| {
            let t = l.masked.trim();
            !t.contains('=') && !t.contains('{') && re.is_match(t)
        })
        .map(|l| format!("Expected '=' after argument name at line {}", l.number))
}

fn check_dangling_assignments(lines: &[Line]) -> Option<String> {
    lines
        .iter()
        .find(|l| {
            let t = l.masked.trim_end();
            t.ends_with('=')
                && !["==", "!=", "<=", ">="].iter().any(|op| t.ends_with(op))
        })
        .map(|l| format!("Expected expression after '=' at line {}", l.number))
}

fn module_blocks(lines: &[Line]) -> Vec<ModuleBlock> {
    let (Some(header_re), Some(source_re), Some(version_re), Some(empty_re)) = (
        MODULE_HEADER.as_ref(),
        SOURCE_ATTR.as_ref(),
        VERSION_ATTR.as_ref(),
        EMPTY_MODULE_ARGUMENT.as_ref(),
    ) else {
        return Vec::new();
    };

    let mut blocks = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        if !line.is_top_level() {
            continue;
        }
        let Some(caps) = header_re.captures(&line.code) else {
            continue;
        };

        // (line number, code, masked) for the header remainder and each
        // top-level argument line of the body.
        let mut body: Vec<(usize, &str, &str)> = Vec::new();
        if let (Some((_, code)), Some((_, masked))) =
            (line.code.split_once('{'), line.masked.split_once('{'))
        {
            body.push((line.number, code, masked));
        }
        body.extend(
            lines[idx + 1..]
                .iter()
                .take_while(|l| l.depth > 0)
                .filter(|l| l.depth == 1 && l.nesting == 0)
                .map(|l| (l.number, l.code.as_str(), l.masked.as_str())),
        );

        blocks.push(ModuleBlock {
            name: caps[1].to_string(),
            source: body
                .iter()
                .find_map(|(_, code, _)| source_re.captures(code).map(|c| c[1].to_string())),
            has_version: body.iter().any(|(_, code, _)| version_re.is_match(code)),
            empty_argument: body.iter().find_map(|(number, _, masked)| {
                empty_re
                    .captures(masked)
                    .map(|c| (c[1].to_string(), *number))
            }),
        });
    }
    blocks
}

fn is_registry_source(source: &str) -> bool {
    !source.starts_with('.')
        && !source.contains("::")
        && !source.contains("://")
        && source.split('/').count() == 3
}

fn check_module_sources(lines: &[Line]) -> Option<String> {
    module_blocks(lines)
        .into_iter()
        .find(|m| m.source.as_deref().map_or(true, |s| s.trim().is_empty()))
        .map(|m| format!("Module \"{}\" not found: block has no source", m.name))
}

fn check_module_versions(lines: &[Line]) -> Option<String> {
    module_blocks(lines)
        .into_iter()
        .find(|m| !m.has_version && m.source.as_deref().is_some_and(is_registry_source))
        .map(|m| {
            format!(
                "Missing required argument: \"version\" in module \"{}\"",
                m.name
            )
        })
}

/// Only module `source` and `version` are checked; an empty string is a
/// legitimate value for most other arguments.
fn check_empty_values(lines: &[Line]) -> Option<String> {
    module_blocks(lines)
        .into_iter()
        .find_map(|m| m.empty_argument)
        .map(|(argument, number)| {
            format!("Invalid value for variable \"{argument}\" at line {number}")
        })
}

/// Names bound by `dynamic` blocks, their `iterator` overrides and `for`
/// expressions. References through them are not resource references.
fn local_bindings(lines: &[Line]) -> HashSet<String> {
    let mut names = HashSet::new();
    for line in lines {
        if let Some(caps) = DYNAMIC_HEADER.as_ref().and_then(|re| re.captures(&line.code)) {
            names.insert(caps[1].to_string());
        }
        if let Some(caps) = ITERATOR_ATTR.as_ref().and_then(|re| re.captures(&line.masked)) {
            names.insert(caps[1].to_string());
        }
        if let Some(re) = FOR_BINDING.as_ref() {
            for caps in re.captures_iter(&line.masked) {
                names.extend(
                    [caps.get(1), caps.get(2)]
                        .into_iter()
                        .flatten()
                        .map(|m| m.as_str().to_string()),
                );
            }
        }
    }
    names
}

fn check_references(lines: &[Line]) -> Option<String> {
    let reference_re = REFERENCE.as_ref()?;

    let mut declared: HashSet<String> = HashSet::new();
    for line in lines.iter().filter(|l| l.is_top_level()) {
        if let Some(caps) = RESOURCE_HEADER.as_ref().and_then(|re| re.captures(&line.code)) {
            declared.insert(format!("{}.{}", &caps[1], &caps[2]));
        }
        if let Some(caps) = DATA_HEADER.as_ref().and_then(|re| re.captures(&line.code)) {
            declared.insert(format!("data.{}.{}", &caps[1], &caps[2]));
        }
        if let Some(caps) = MODULE_HEADER.as_ref().and_then(|re| re.captures(&line.code)) {
            declared.insert(format!("module.{}", &caps[1]));
        }
    }
    let locals = local_bindings(lines);

    for line in lines {
        for caps in reference_re.captures_iter(&line.masked) {
            let (full, name) = if let (Some(kind), Some(name)) = (caps.get(1), caps.get(2)) {
                (
                    format!("data.{}.{}", kind.as_str(), name.as_str()),
                    name.as_str(),
                )
            } else if let Some(name) = caps.get(3) {
                (format!("module.{}", name.as_str()), name.as_str())
            } else if let (Some(kind), Some(name)) = (caps.get(4), caps.get(5)) {
                if locals.contains(kind.as_str()) {
                    continue;
                }
                (format!("{}.{}", kind.as_str(), name.as_str()), name.as_str())
            } else {
                continue;
            };

            if !declared.contains(&full) {
                return Some(format!(
                    "Reference to undefined resource \"{}\" ({}) at line {}",
                    name, full, line.number
                ));
            }
        }
    }
    None
}
