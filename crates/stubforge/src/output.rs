//! Structured output types for CLI responses.
//!
//! The generate command can report its per-module results as JSON
//! (`--format json`). These types define that schema; `status` is always
//! the first field and optional fields are absent rather than null.

use std::io::{self, Write};

use serde::Serialize;

/// Status value for a successful run or module.
pub const STATUS_OK: &str = "ok";
/// Status value for a failed run or module.
pub const STATUS_ERROR: &str = "error";

// ============================================================================
// Generate Response Types
// ============================================================================

/// Per-module outcome of a generation run.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleReport {
    /// Module the stubs were generated for.
    pub module: String,
    /// `ok` or `error`.
    pub status: String,
    /// Path of the finished stub file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stub_path: Option<String>,
    /// Failure message when status is `error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ModuleReport {
    /// Create a success report for a module.
    pub fn ok(module: impl Into<String>, stub_path: impl Into<String>) -> Self {
        ModuleReport {
            module: module.into(),
            status: STATUS_OK.to_string(),
            stub_path: Some(stub_path.into()),
            error: None,
        }
    }

    /// Create a failure report for a module.
    pub fn failed(module: impl Into<String>, error: impl Into<String>) -> Self {
        ModuleReport {
            module: module.into(),
            status: STATUS_ERROR.to_string(),
            stub_path: None,
            error: Some(error.into()),
        }
    }

    /// Whether this module generated successfully.
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// Summary of one generation run across the selected modules.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateSummary {
    /// `ok` when the run succeeded under the active failure policy.
    pub status: String,
    /// Per-module results in generation order.
    pub modules: Vec<ModuleReport>,
}

impl GenerateSummary {
    /// Build a summary, deriving overall status from the failure policy.
    ///
    /// With `require_all` every module must succeed; otherwise the run
    /// only fails when no module succeeded.
    pub fn new(modules: Vec<ModuleReport>, require_all: bool) -> Self {
        let failed = modules.iter().filter(|m| !m.is_ok()).count();
        let ok = failed == 0 || (!require_all && failed < modules.len());
        GenerateSummary {
            status: if ok { STATUS_OK } else { STATUS_ERROR }.to_string(),
            modules,
        }
    }

    /// Whether the run succeeded overall.
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Number of modules that failed.
    pub fn failed(&self) -> usize {
        self.modules.iter().filter(|m| !m.is_ok()).count()
    }

    /// Number of modules attempted.
    pub fn total(&self) -> usize {
        self.modules.len()
    }
}

// ============================================================================
// Response Emission
// ============================================================================

/// Emit a response as pretty-printed JSON to a writer.
///
/// Single output path for JSON mode; same input produces identical bytes.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================
