//! # Document Linter
//!
//! Checks a built document for problems the builder cannot rule out on its
//! own, mostly around `$ref` pointers added through raw components.
//!
//! ## Checks Performed
//!
//! 1. **Reference resolution** - every `$ref` must be well-formed and resolve
//! 2. **Operation messages** - an operation's messages should live in its channel
//! 3. **Missing payloads** - messages without a payload schema
//! 4. **Unused schemas** - component schemas nothing points at
//!
//! ## Usage
//!
//! ```rust
//! use sio_asyncapi::{AsyncApiDoc, DocConfig};
//! use sio_asyncapi::linter::{lint_document, print_lint_issues};
//!
//! let doc = AsyncApiDoc::default_init(&DocConfig::default());
//! let issues = lint_document(&doc);
//! print_lint_issues(&issues);
//! ```

use crate::document::{AsyncApiDoc, NO_SPEC};
use crate::error::DocError;
use crate::reference::{collect_refs, RefOr};
use std::collections::HashSet;
use std::fmt;


/// Severity level for lint issues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintSeverity {
    /// Serialization of the document will fail
    Error,
    /// The document serializes but consumers may reject it
    Warning,
    /// Best practice suggestion
    Info,
}

impl fmt::Display for LintSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LintSeverity::Error => write!(f, "error"),
            LintSeverity::Warning => write!(f, "warning"),
            LintSeverity::Info => write!(f, "info"),
        }
    }
}

/// A lint issue found in a document
#[derive(Debug, Clone)]
pub struct LintIssue {
    /// Where the issue occurred, as a document path (e.g. `/operations/chat/message`)
    pub location: String,
    pub severity: LintSeverity,
    /// Type of lint issue (e.g. "broken_reference", "unused_schema")
    pub kind: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl LintIssue {
    pub fn new(
        location: impl Into<String>,
        severity: LintSeverity,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        LintIssue {
            location: location.into(),
            severity,
            kind: kind.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Run every check against `doc`
pub fn lint_document(doc: &AsyncApiDoc) -> Vec<LintIssue> {
    let mut issues = check_references(doc);
    lint_operations(doc, &mut issues);
    lint_payloads(doc, &mut issues);
    lint_unused_schemas(doc, &mut issues);
    issues
}

/// Report every `$ref` that is malformed or does not resolve
pub fn check_references(doc: &AsyncApiDoc) -> Vec<LintIssue> {
    let value = match doc.to_value() {
        Ok(value) => value,
        Err(e) => {
            return vec![LintIssue::new("/", LintSeverity::Error, e.kind(), e.to_string())];
        }
    };

    let mut issues = Vec::new();
    for (location, pointer) in collect_refs(&value) {
        let Err(err) = doc.resolve_ref(pointer.as_str()) else {
            continue;
        };
        let issue = LintIssue::new(&location, LintSeverity::Error, err.kind(), err.to_string());
        let issue = match &err {
            DocError::MalformedReference(_) => {
                issue.with_suggestion(format!("Write the pointer as '#/{}'", pointer.trim_start_matches(['#', '/'])))
            }
            DocError::BrokenReference { segment, .. } => issue.with_suggestion(format!(
                "Register '{}' before referencing it, or fix the pointer",
                segment
            )),
            _ => issue,
        };
        issues.push(issue);
    }
    issues
}

fn lint_operations(doc: &AsyncApiDoc, issues: &mut Vec<LintIssue>) {
    for (id, op) in &doc.spec().operations {
        let channel_prefix = format!("{}/messages/", op.channel.pointer());
        let replies = op
            .reply
            .as_ref()
            .and_then(RefOr::object)
            .map(|r| r.messages.as_slice())
            .unwrap_or_default();
        for msg in op.messages.iter().chain(replies) {
            if !msg.pointer().starts_with(&channel_prefix) {
                issues.push(
                    LintIssue::new(
                        format!("/operations/{id}"),
                        LintSeverity::Warning,
                        "message_outside_channel",
                        format!(
                            "Message '{}' is not defined in channel '{}'",
                            msg.pointer(),
                            op.channel.pointer()
                        ),
                    )
                    .with_suggestion("Reference messages from the operation's own channel"),
                );
            }
        }
    }
}

fn lint_payloads(doc: &AsyncApiDoc, issues: &mut Vec<LintIssue>) {
    let spec = doc.spec();
    let channel_messages = spec.channels.iter().flat_map(|(cid, ch)| {
        ch.messages
            .iter()
            .map(move |(mid, m)| (format!("/channels/{cid}/messages/{mid}"), m))
    });
    let component_messages = spec
        .components
        .messages
        .iter()
        .filter_map(|(mid, m)| Some((format!("/components/messages/{mid}"), m.message()?)));

    for (location, message) in channel_messages.chain(component_messages) {
        if message.payload.is_none() {
            issues.push(
                LintIssue::new(
                    location,
                    LintSeverity::Info,
                    "missing_payload",
                    "Message has no payload schema",
                )
                .with_suggestion(format!(
                    "Supply a payload model, or NotProvided to point at {NO_SPEC}"
                )),
            );
        }
    }
}

fn lint_unused_schemas(doc: &AsyncApiDoc, issues: &mut Vec<LintIssue>) {
    let Ok(value) = doc.to_value() else {
        return;
    };
    let referenced: HashSet<String> = collect_refs(&value)
        .into_iter()
        .filter_map(|(_, p)| {
            p.strip_prefix("#/components/schemas/")
                .and_then(|rest| rest.split('/').next())
                .map(str::to_string)
        })
        .collect();

    for name in doc.spec().components.schemas.keys() {
        if name != NO_SPEC && !referenced.contains(name) {
            issues.push(LintIssue::new(
                format!("/components/schemas/{name}"),
                LintSeverity::Info,
                "unused_schema",
                format!("Schema '{}' is not referenced anywhere", name),
            ));
        }
    }
}

/// Print lint issues grouped by severity
pub fn print_lint_issues(issues: &[LintIssue]) {
    if issues.is_empty() {
        println!("✅ No lint issues found!");
        return;
    }

    let groups = [
        (LintSeverity::Error, "❌ Errors (must fix):"),
        (LintSeverity::Warning, "⚠️  Warnings (should fix):"),
        (LintSeverity::Info, "ℹ️  Info (best practices):"),
    ];
    let count = |sev: LintSeverity| issues.iter().filter(|i| i.severity == sev).count();

    println!("\n📋 Lint Results:");
    println!(
        "   {} error(s), {} warning(s), {} info(s)\n",
        count(LintSeverity::Error),
        count(LintSeverity::Warning),
        count(LintSeverity::Info)
    );

    for (severity, heading) in groups {
        let group: Vec<_> = issues.iter().filter(|i| i.severity == severity).collect();
        if group.is_empty() {
            continue;
        }
        println!("{}", heading);
        for issue in group {
            println!("   [{}] {}", issue.kind, issue.location);
            println!("      {}", issue.message);
            if let Some(suggestion) = &issue.suggestion {
                println!("      💡 Suggestion: {}", suggestion);
            }
        }
        println!();
    }
}

/// True if any issue is error-level
pub fn has_errors(issues: &[LintIssue]) -> bool {
    issues.iter().any(|i| i.severity == LintSeverity::Error)
}

/// Exit with error code if there are any error-level lint issues
pub fn fail_if_errors(issues: &[LintIssue]) {
    if has_errors(issues) {
        print_lint_issues(issues);
        std::process::exit(1);
    }
}
