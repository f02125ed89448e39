//! Stub generator backends.
//!
//! The driver talks to a [`StubBackend`]; the production backend shells
//! out to mypy's stubgen and then runs the injected signature rewriter
//! over the produced files. Tests substitute a scripted backend.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use stubforge_core::pyi;
use stubforge_core::rewrite::SignatureRewriter;

use crate::error::StubforgeError;

/// Interpreter names probed on PATH, in order.
pub const PYTHON_NAMES: &[&str] = &["python3", "python"];

/// Resolve the Python interpreter used to drive the external tools.
///
/// An explicit path wins; otherwise the first PATH hit from
/// [`PYTHON_NAMES`].
pub fn resolve_python(explicit: Option<PathBuf>) -> Result<PathBuf, StubforgeError> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    for name in PYTHON_NAMES {
        if let Ok(path) = which::which(name) {
            debug!(python = %path.display(), "resolved interpreter from PATH");
            return Ok(path);
        }
    }
    Err(StubforgeError::interpreter_not_found(PYTHON_NAMES))
}

// ============================================================================
// Backend Trait
// ============================================================================

/// A stub generator the driver can run for one module.
///
/// The rewriter is an explicit parameter so backends never reach for
/// shared mutable state; a scripted test backend can ignore it or apply
/// it to canned text.
pub trait StubBackend {
    /// Generate stubs for `module` into `<out_dir>/<module>/`, with the
    /// rewriter applied to every produced `.pyi` file.
    fn generate(
        &self,
        module: &str,
        out_dir: &Path,
        rewriter: &SignatureRewriter,
    ) -> Result<(), StubforgeError>;
}

// ============================================================================
// mypy.stubgen Backend
// ============================================================================

/// Production backend: `python -m mypy.stubgen` in inspect mode.
pub struct MypyStubgen {
    python: PathBuf,
}

impl MypyStubgen {
    /// Create a backend driving the given interpreter.
    pub fn new(python: PathBuf) -> Self {
        MypyStubgen { python }
    }
}

impl StubBackend for MypyStubgen {
    fn generate(
        &self,
        module: &str,
        out_dir: &Path,
        rewriter: &SignatureRewriter,
    ) -> Result<(), StubforgeError> {
        let command_desc = format!("{} -m mypy.stubgen -p {}", self.python.display(), module);
        info!(module, "running mypy.stubgen");
        let status = Command::new(&self.python)
            .arg("-m")
            .arg("mypy.stubgen")
            .arg("-p")
            .arg(module)
            .arg("-o")
            .arg(out_dir)
            .arg("--inspect-mode")
            .status()
            .map_err(|e| StubforgeError::tool_spawn(&command_desc, e))?;
        if !status.success() {
            return Err(StubforgeError::tool_failed(
                &command_desc,
                status.code().unwrap_or(-1),
            ));
        }
        rewrite_produced_stubs(module, out_dir, rewriter)
    }
}

/// Run the signature rewriter over every `.pyi` file the generator wrote.
fn rewrite_produced_stubs(
    module: &str,
    out_dir: &Path,
    rewriter: &SignatureRewriter,
) -> Result<(), StubforgeError> {
    let module_dir = out_dir.join(module);
    if !module_dir.is_dir() {
        // The driver reports the missing stub with more context.
        return Ok(());
    }
    for entry in fs::read_dir(&module_dir).map_err(|e| StubforgeError::io(&module_dir, e))? {
        let entry = entry.map_err(|e| StubforgeError::io(&module_dir, e))?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("pyi") {
            continue;
        }
        let content = fs::read_to_string(&path).map_err(|e| StubforgeError::io(&path, e))?;
        let rewritten = pyi::rewrite_stub(&content, module, rewriter);
        if rewritten != content {
            debug!(file = %path.display(), "rewrote signatures");
            fs::write(&path, rewritten).map_err(|e| StubforgeError::io(&path, e))?;
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
