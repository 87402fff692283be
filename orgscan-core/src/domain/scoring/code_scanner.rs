// orgscan-core/src/domain/scoring/code_scanner.rs

use regex::Regex;

use crate::domain::error::DomainError;

/// Static analysis helpers over Apex bodies and formulas.
/// Every regex is compiled once when the scanner is built.
pub struct CodeScanner {
    comments: Regex,
    hard_coded_url: Regex,
    hard_coded_id: Regex,
    system_assert: Regex,
    soql: Regex,
    dml: Regex,
    sharing: Regex,
    see_all_data: Regex,
    test_annotation: Regex,
    declaration: Regex,
}

/// Facts extracted from an Apex class body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApexFacts {
    pub is_test: bool,
    pub is_test_see_all_data: bool,
    pub is_abstract: bool,
    pub is_interface: bool,
    pub is_enum: bool,
    pub nb_system_asserts: u32,
    pub specified_sharing: Option<String>,
    pub has_soql: bool,
    pub has_dml: bool,
    pub hard_coded_urls: Vec<String>,
    pub hard_coded_ids: Vec<String>,
}

fn compile(name: &str, pattern: &str) -> Result<Regex, DomainError> {
    Regex::new(pattern).map_err(|e| DomainError::InvalidProperties {
        entity: format!("CodeScanner::{}", name),
        reason: e.to_string(),
    })
}

impl CodeScanner {
    pub fn new() -> Result<Self, DomainError> {
        Ok(Self {
            comments: compile("comments", r"(?s)/\*.*?\*/|//[^\n]*")?,
            hard_coded_url: compile(
                "hard_coded_url",
                r"(?i)\b[a-z0-9-]+(?:\.[a-z0-9-]+)*\.(?:my\.salesforce|salesforce|force|visualforce|lightning\.force)\.com\b",
            )?,
            hard_coded_id: compile(
                "hard_coded_id",
                r#"['"]([a-zA-Z0-9]{5}0[a-zA-Z0-9]{9}(?:[a-zA-Z0-9]{3})?)['"]"#,
            )?,
            system_assert: compile(
                "system_assert",
                r"(?i)\b(?:System\.assert(?:Equals|NotEquals)?|Assert\.[a-z]+)\s*\(",
            )?,
            soql: compile("soql", r"(?i)\[\s*SELECT\s")?,
            dml: compile(
                "dml",
                r"(?i)(?:\b(?:insert|update|upsert|delete|undelete|merge)\s+[a-z_]|\bDatabase\.(?:insert|update|upsert|delete|undelete|merge)\s*\()",
            )?,
            sharing: compile("sharing", r"(?i)\b(with|without|inherited)\s+sharing\b")?,
            see_all_data: compile("see_all_data", r"(?i)@isTest\s*\(\s*SeeAllData\s*=\s*true\s*\)")?,
            test_annotation: compile("test_annotation", r"(?i)@isTest\b")?,
            declaration: compile(
                "declaration",
                r"(?i)\b((?:(?:abstract|virtual|global|public|private|with\s+sharing|without\s+sharing|inherited\s+sharing)\s+)*)(class|interface|enum)\s+\w+",
            )?,
        })
    }

    pub fn strip_comments(&self, source: &str) -> String {
        self.comments.replace_all(source, "").into_owned()
    }

    pub fn hard_coded_urls(&self, text: &str) -> Vec<String> {
        let mut found: Vec<String> = self
            .hard_coded_url
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .collect();
        found.sort();
        found.dedup();
        found
    }

    pub fn hard_coded_ids(&self, text: &str) -> Vec<String> {
        let mut found: Vec<String> = self
            .hard_coded_id
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|candidate| crate::domain::ids::looks_like_record_id(candidate))
            .collect();
        found.sort();
        found.dedup();
        found
    }

    pub fn has_soql(&self, source: &str) -> bool {
        self.soql.is_match(source)
    }

    pub fn has_dml(&self, source: &str) -> bool {
        self.dml.is_match(source)
    }

    pub fn scan_apex(&self, source: &str) -> ApexFacts {
        let code = self.strip_comments(source);
        // The first declaration is the top-level type.
        let (modifiers, kind) = self
            .declaration
            .captures(&code)
            .map(|c| {
                (
                    c.get(1).map_or(String::new(), |m| m.as_str().to_lowercase()),
                    c.get(2).map_or(String::new(), |m| m.as_str().to_lowercase()),
                )
            })
            .unwrap_or_default();
        ApexFacts {
            is_test: self.test_annotation.is_match(&code),
            is_test_see_all_data: self.see_all_data.is_match(&code),
            is_abstract: modifiers.split_whitespace().any(|m| m == "abstract"),
            is_interface: kind == "interface",
            is_enum: kind == "enum",
            nb_system_asserts: self.system_assert.find_iter(&code).count() as u32,
            specified_sharing: self
                .sharing
                .captures(&code)
                .and_then(|c| c.get(1))
                .map(|m| format!("{} sharing", m.as_str().to_lowercase())),
            has_soql: self.has_soql(&code),
            has_dml: self.has_dml(&code),
            hard_coded_urls: self.hard_coded_urls(&code),
            hard_coded_ids: self.hard_coded_ids(&code),
        }
    }
}
