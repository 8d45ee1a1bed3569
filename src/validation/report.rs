//! Validation report types.

use std::fmt;

use serde::Serialize;

use crate::ir::BoxId;

/// Everything found while validating one annotation document.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == severity)
            .count()
    }

    /// True if there are no errors.
    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    /// True if there are no issues at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Machine-readable form: counts plus every issue.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "error_count": self.error_count(),
            "warning_count": self.warning_count(),
            "issues": self.issues,
        })
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return writeln!(f, "Validation passed: no issues found");
        }

        writeln!(
            f,
            "Validation completed with {} error(s) and {} warning(s):",
            self.error_count(),
            self.warning_count()
        )?;
        writeln!(f)?;

        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,

    /// Stable code for filtering and scripting.
    pub code: IssueCode,

    pub message: String,

    /// Where the issue was found.
    pub context: IssueContext,
}

impl ValidationIssue {
    pub fn error(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            context,
        }
    }

    pub fn warning(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            context,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN ",
        };
        write!(
            f,
            "[{}] {:?} in {}: {}",
            severity, self.code, self.context, self.message
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Severity {
    /// Suspicious but usable.
    Warning,
    /// The entry cannot be used as-is.
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum IssueCode {
    /// Two boxes on one image share an id.
    DuplicateBoxId,
    /// A box id has no successor, so no further box could be created.
    BoxIdExhausted,
    /// A box coordinate is NaN or infinite.
    BBoxNotFinite,
    /// A box has zero or negative width or height.
    NonPositiveGeometry,
    /// A box extends outside its image.
    BBoxOutOfBounds,
    /// The document has an entry keyed by the empty string.
    EmptyImageId,
    /// A box carries neither recognized nor user text.
    EmptyBox,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueContext {
    Document,
    Image { id: String },
    Box { image: String, id: BoxId },
}

impl fmt::Display for IssueContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueContext::Document => write!(f, "document"),
            IssueContext::Image { id } => write!(f, "image '{}'", id),
            IssueContext::Box { image, id } => write!(f, "box {} of '{}'", id, image),
        }
    }
}
