//! Stub generation driver.
//!
//! Runs the per-module pipeline: wipe the previous package directory,
//! invoke the backend, locate the produced stub, promote it to
//! `__init__.pyi`, prepend the header, run the profile's repair passes,
//! delete unwanted files, and drop the `py.typed` marker. Failures are
//! isolated per module so one broken target never blocks the other.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use stubforge_core::rewrite::SignatureRewriter;

use crate::error::StubforgeError;
use crate::output::{GenerateSummary, ModuleReport};
use crate::profiles::ModuleProfile;
use crate::stubgen::StubBackend;

/// Name every finished stub file is promoted to.
const INIT_STUB: &str = "__init__.pyi";

/// Package marker telling type checkers the stubs are usable.
const PY_TYPED_MARKER: &str = "py.typed";

/// Options for one generation run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Directory receiving one package subdirectory per module.
    pub out_dir: PathBuf,
    /// Fail the run when any module fails, not only when all do.
    pub require_all: bool,
}

// ============================================================================
// Run Driver
// ============================================================================

/// Generate stub packages for every profile, isolating failures.
///
/// Returns the per-module summary; only errors that prevent the run from
/// starting at all (an unwritable output directory) surface as `Err`.
pub fn generate_all(
    profiles: &[ModuleProfile],
    backend: &dyn StubBackend,
    options: &GenerateOptions,
) -> Result<GenerateSummary, StubforgeError> {
    fs::create_dir_all(&options.out_dir).map_err(|e| StubforgeError::io(&options.out_dir, e))?;

    let mut reports = Vec::with_capacity(profiles.len());
    for profile in profiles {
        info!(module = %profile.module, "generating stubs");
        match generate_module(profile, backend, &options.out_dir) {
            Ok(stub) => {
                info!(module = %profile.module, stub = %stub.display(), "stub package complete");
                reports.push(ModuleReport::ok(&profile.module, stub.display().to_string()));
            }
            Err(err) => {
                warn!(module = %profile.module, error = %err, "stub generation failed");
                reports.push(ModuleReport::failed(&profile.module, err.to_string()));
            }
        }
    }
    Ok(GenerateSummary::new(reports, options.require_all))
}

/// Run the full pipeline for one module and return the finished stub path.
pub fn generate_module(
    profile: &ModuleProfile,
    backend: &dyn StubBackend,
    out_dir: &Path,
) -> Result<PathBuf, StubforgeError> {
    let module_dir = out_dir.join(&profile.module);
    if module_dir.exists() {
        debug!(dir = %module_dir.display(), "clearing previous stubs");
        fs::remove_dir_all(&module_dir).map_err(|e| StubforgeError::io(&module_dir, e))?;
    }

    let rewriter = SignatureRewriter::new(profile.overrides.clone());
    backend.generate(&profile.module, out_dir, &rewriter)?;

    let source = locate_stub(&profile.module, &module_dir)?;
    let stub = promote_to_init(&module_dir, &source)?;

    let raw = fs::read_to_string(&stub).map_err(|e| StubforgeError::io(&stub, e))?;
    let mut content = format!(
        "# Auto-generated stubs for {}\n# Generated with stubforge\n\n{}",
        profile.module, raw
    );
    for pass in &profile.repair_passes {
        content = pass.apply(&content);
    }
    fs::write(&stub, content).map_err(|e| StubforgeError::io(&stub, e))?;

    remove_cleanup_files(&module_dir, &profile.cleanup_files)?;

    let marker = module_dir.join(PY_TYPED_MARKER);
    fs::write(&marker, "").map_err(|e| StubforgeError::io(&marker, e))?;

    Ok(stub)
}

// ============================================================================
// Pipeline Steps
// ============================================================================

/// Find the stub file the generator produced for a module.
///
/// Prefers `<module>.pyi`; otherwise the lexically first other `.pyi`
/// that is not already `__init__.pyi`.
fn locate_stub(module: &str, module_dir: &Path) -> Result<PathBuf, StubforgeError> {
    let exact = module_dir.join(format!("{}.pyi", module));
    if exact.is_file() {
        return Ok(exact);
    }
    let mut candidates: Vec<PathBuf> = Vec::new();
    if module_dir.is_dir() {
        for entry in fs::read_dir(module_dir).map_err(|e| StubforgeError::io(module_dir, e))? {
            let entry = entry.map_err(|e| StubforgeError::io(module_dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("pyi") {
                candidates.push(path);
            }
        }
    }
    candidates.sort();
    candidates
        .into_iter()
        .find(|p| p.file_name().and_then(|n| n.to_str()) != Some(INIT_STUB))
        .ok_or_else(|| StubforgeError::stub_missing(module, module_dir))
}

/// Rename the located stub to `__init__.pyi`.
fn promote_to_init(module_dir: &Path, source: &Path) -> Result<PathBuf, StubforgeError> {
    let dest = module_dir.join(INIT_STUB);
    if source == dest {
        return Ok(dest);
    }
    // Windows refuses to rename over an existing file.
    if dest.exists() {
        fs::remove_file(&dest).map_err(|e| StubforgeError::io(&dest, e))?;
    }
    debug!(from = %source.display(), to = %dest.display(), "promoting stub");
    fs::rename(source, &dest).map_err(|e| StubforgeError::io(source, e))?;
    Ok(dest)
}

/// Delete the profile's unwanted files from the package directory.
fn remove_cleanup_files(module_dir: &Path, names: &[String]) -> Result<(), StubforgeError> {
    for name in names {
        let path = module_dir.join(name);
        if path.exists() {
            debug!(file = %path.display(), "removing unwanted file");
            fs::remove_file(&path).map_err(|e| StubforgeError::io(&path, e))?;
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use stubforge_core::overrides::SigOverrides;
    use stubforge_core::repair::RepairPass;

    use crate::error::ErrorCode;

    /// Backend writing canned files instead of running stubgen.
    struct CannedBackend {
        files: Vec<(String, String)>,
        fail_for: Option<String>,
    }

    impl CannedBackend {
        fn with_files(files: &[(&str, &str)]) -> Self {
            CannedBackend {
                files: files
                    .iter()
                    .map(|(n, c)| (n.to_string(), c.to_string()))
                    .collect(),
                fail_for: None,
            }
        }

        fn failing_for(mut self, module: &str) -> Self {
            self.fail_for = Some(module.to_string());
            self
        }
    }

    impl StubBackend for CannedBackend {
        fn generate(
            &self,
            module: &str,
            out_dir: &Path,
            _rewriter: &SignatureRewriter,
        ) -> Result<(), StubforgeError> {
            if self.fail_for.as_deref() == Some(module) {
                return Err(StubforgeError::tool_failed("stubgen", 1));
            }
            let dir = out_dir.join(module);
            fs::create_dir_all(&dir).unwrap();
            for (name, content) in &self.files {
                fs::write(dir.join(name), content).unwrap();
            }
            Ok(())
        }
    }

    fn profile(module: &str) -> ModuleProfile {
        ModuleProfile {
            module: module.to_string(),
            overrides: SigOverrides::new(),
            repair_passes: vec![RepairPass::BufferImport],
            cleanup_files: vec!["_tool_wrapper.pyi".to_string()],
        }
    }

    mod module_pipeline {
        use super::*;

        #[test]
        fn finished_package_has_init_header_marker_and_no_leftovers() {
            let tmp = tempfile::tempdir().unwrap();
            let backend = CannedBackend::with_files(&[
                ("OpenImageIO.pyi", "import typing\n\nclass ROI: ...\n"),
                ("_tool_wrapper.pyi", "def wrapped(): ...\n"),
            ]);

            let stub = generate_module(&profile("OpenImageIO"), &backend, tmp.path()).unwrap();

            let module_dir = tmp.path().join("OpenImageIO");
            assert_eq!(stub, module_dir.join("__init__.pyi"));
            let content = fs::read_to_string(&stub).unwrap();
            assert!(content.starts_with("# Auto-generated stubs for OpenImageIO\n"));
            assert!(content.contains("# Generated with stubforge\n\nimport typing"));
            assert!(module_dir.join("py.typed").is_file());
            assert!(!module_dir.join("OpenImageIO.pyi").exists());
            assert!(!module_dir.join("_tool_wrapper.pyi").exists());
        }

        #[test]
        fn alternate_stub_name_is_promoted() {
            let tmp = tempfile::tempdir().unwrap();
            let backend = CannedBackend::with_files(&[("_core.pyi", "class ROI: ...\n")]);

            let stub = generate_module(&profile("OpenImageIO"), &backend, tmp.path()).unwrap();

            assert_eq!(stub, tmp.path().join("OpenImageIO").join("__init__.pyi"));
            assert!(fs::read_to_string(&stub).unwrap().contains("class ROI"));
        }

        #[test]
        fn previous_package_directory_is_cleared_first() {
            let tmp = tempfile::tempdir().unwrap();
            let module_dir = tmp.path().join("OpenImageIO");
            fs::create_dir_all(&module_dir).unwrap();
            fs::write(module_dir.join("stale.pyi"), "stale\n").unwrap();

            let backend = CannedBackend::with_files(&[("OpenImageIO.pyi", "class ROI: ...\n")]);
            generate_module(&profile("OpenImageIO"), &backend, tmp.path()).unwrap();

            assert!(!module_dir.join("stale.pyi").exists());
        }

        #[test]
        fn backend_without_stub_output_reports_missing_stub() {
            let tmp = tempfile::tempdir().unwrap();
            let backend = CannedBackend::with_files(&[("notes.txt", "not a stub\n")]);

            let err = generate_module(&profile("OpenImageIO"), &backend, tmp.path()).unwrap_err();
            assert_eq!(err.error_code(), ErrorCode::MissingOutput);
        }

        #[test]
        fn repair_passes_run_after_the_header_is_added() {
            let tmp = tempfile::tempdir().unwrap();
            let backend = CannedBackend::with_files(&[(
                "OpenImageIO.pyi",
                "import typing\n\ndef write(pixels: Buffer) -> bool: ...\n",
            )]);

            let stub = generate_module(&profile("OpenImageIO"), &backend, tmp.path()).unwrap();

            let content = fs::read_to_string(&stub).unwrap();
            let lines: Vec<&str> = content.lines().collect();
            // Header stays on top; the Buffer import lands after the imports.
            assert_eq!(lines[0], "# Auto-generated stubs for OpenImageIO");
            let import_idx = lines.iter().position(|l| *l == "import typing").unwrap();
            let buffer_idx = lines
                .iter()
                .position(|l| *l == "from typing_extensions import Buffer")
                .unwrap();
            assert!(buffer_idx > import_idx);
        }
    }

    mod failure_isolation {
        use super::*;

        #[test]
        fn one_failing_module_does_not_block_the_other() {
            let tmp = tempfile::tempdir().unwrap();
            let backend = CannedBackend::with_files(&[("OpenImageIO.pyi", "class ROI: ...\n")])
                .failing_for("OpenImageIO");
            let profiles = vec![profile("OpenImageIO"), profile("PyOpenColorIO")];
            let options = GenerateOptions {
                out_dir: tmp.path().to_path_buf(),
                require_all: true,
            };

            let summary = generate_all(&profiles, &backend, &options).unwrap();

            assert!(!summary.is_ok());
            assert_eq!(summary.failed(), 1);
            assert!(!summary.modules[0].is_ok());
            assert!(summary.modules[1].is_ok());
            assert!(tmp.path().join("PyOpenColorIO").join("py.typed").is_file());
        }

        #[test]
        fn best_effort_run_succeeds_with_one_good_module() {
            let tmp = tempfile::tempdir().unwrap();
            let backend = CannedBackend::with_files(&[("OpenImageIO.pyi", "class ROI: ...\n")])
                .failing_for("PyOpenColorIO");
            let profiles = vec![profile("OpenImageIO"), profile("PyOpenColorIO")];
            let options = GenerateOptions {
                out_dir: tmp.path().to_path_buf(),
                require_all: false,
            };

            let summary = generate_all(&profiles, &backend, &options).unwrap();
            assert!(summary.is_ok());
        }
    }
}
