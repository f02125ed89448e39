//! CLI end-to-end tests for the generate command.
//!
//! These tests spawn the actual `stubforge` binary and validate stdout,
//! exit codes, and the finished package layout. Runs that need a working
//! stub generator script one up instead, so no Python installation is
//! required.
//!
//! Exit code expectations:
//! - 0: Success
//! - 2: Invalid arguments (unknown module)
//! - 4: Missing output (failed modules under the active policy)

use std::process::Command;

use serde_json::Value;

/// Run stubforge with given arguments and return (stdout, stderr, exit_code).
fn run_stubforge(args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_stubforge"))
        .args(args)
        .output()
        .expect("failed to execute stubforge");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    (stdout, stderr, exit_code)
}

// ============================================================================
// Argument and Failure Handling
// ============================================================================

/// `generate --only` with an unknown module fails before anything runs.
#[test]
fn unknown_module_returns_exit_2() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = tmp.path().join("stubs");
    let out_arg = out.display().to_string();

    let (stdout, stderr, exit_code) =
        run_stubforge(&["generate", "--only", "NumPy", "--out-path", &out_arg]);

    assert_eq!(exit_code, 2, "stderr: {}", stderr);
    assert!(stderr.contains("unknown module 'NumPy'"));
    assert!(stderr.contains("OpenImageIO, PyOpenColorIO"));
    assert!(stdout.is_empty(), "stdout: {}", stdout);
    assert!(!out.exists(), "nothing should have been written");
}

/// An interpreter that cannot be spawned fails every module; under the
/// default policy that fails the run with exit code 4.
#[test]
fn unspawnable_interpreter_fails_both_modules_with_exit_4() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out_arg = tmp.path().join("stubs").display().to_string();

    let (stdout, stderr, exit_code) = run_stubforge(&[
        "generate",
        "--python",
        "/nonexistent/stubforge-python",
        "--out-path",
        &out_arg,
    ]);

    assert_eq!(exit_code, 4, "stderr: {}", stderr);
    assert!(stdout.contains("✗ Failed to generate OpenImageIO stubs:"));
    assert!(stdout.contains("✗ Failed to generate PyOpenColorIO stubs:"));
    assert!(stdout.contains("✗ Some stub generation tasks failed"));
    assert!(stderr.contains("stub generation failed for 2 of 2 modules"));
}

/// `--format json` reports per-module errors as a structured response.
#[test]
fn json_format_reports_per_module_errors() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out_arg = tmp.path().join("stubs").display().to_string();

    let (stdout, _stderr, exit_code) = run_stubforge(&[
        "generate",
        "--python",
        "/nonexistent/stubforge-python",
        "--out-path",
        &out_arg,
        "--format",
        "json",
    ]);

    assert_eq!(exit_code, 4);
    let json: Value = serde_json::from_str(&stdout).expect("stdout should be valid JSON");
    assert_eq!(json["status"], "error");
    let modules = json["modules"].as_array().expect("modules array");
    assert_eq!(modules.len(), 2);
    for module in modules {
        assert_eq!(module["status"], "error");
        let message = module["error"].as_str().expect("error message");
        assert!(message.contains("failed to run"), "message: {}", message);
    }
}

// ============================================================================
// Scripted Interpreter Runs (unix)
// ============================================================================

#[cfg(unix)]
mod with_fake_interpreter {
    use std::fs;
    use std::path::Path;

    use super::run_stubforge;

    /// Interpreter stand-in emitting fixture stubs for both modules. The
    /// backend invokes it as `python -m mypy.stubgen -p M -o OUT
    /// --inspect-mode`, so the module is `$4` and the output directory `$6`.
    const GENERATING_INTERPRETER: &str = r#"#!/bin/sh
module="$4"
out="$6"
mkdir -p "$out/$module"
case "$module" in
OpenImageIO)
cat > "$out/$module/$module.pyi" <<'EOF'
from typing import overload

class ROI:
    @overload
    def __eq__(self, arg0: ROI) -> bool: ...
    @overload
    def __eq__(self, arg0: object) -> bool: ...

class ImageOutput:
    def write_image(self, pixels: Buffer) -> bool: ...
EOF
;;
PyOpenColorIO)
cat > "$out/$module/$module.pyi" <<'EOF'
import typing

class Exception(Exception): ...

class Config:
    def __ne__(self, arg0: object) -> bool: ...
EOF
;;
esac
"#;

    /// Interpreter stand-in that fails for PyOpenColorIO only.
    const HALF_FAILING_INTERPRETER: &str = r#"#!/bin/sh
module="$4"
out="$6"
if [ "$module" = "PyOpenColorIO" ]; then
    exit 1
fi
mkdir -p "$out/$module"
cat > "$out/$module/$module.pyi" <<'EOF'
class ROI: ...
EOF
"#;

    fn write_script(path: &Path, body: &str) {
        use std::os::unix::fs::PermissionsExt;
        fs::write(path, body).expect("write script");
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("chmod script");
    }

    /// Full text-mode run over both modules: signatures rewritten, repair
    /// passes applied, packages laid out with headers and markers.
    #[test]
    fn generated_packages_are_rewritten_and_marked() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let python = tmp.path().join("python");
        write_script(&python, GENERATING_INTERPRETER);
        let out = tmp.path().join("stubs");
        let python_arg = python.display().to_string();
        let out_arg = out.display().to_string();

        let (stdout, stderr, exit_code) =
            run_stubforge(&["generate", "--python", &python_arg, "--out-path", &out_arg]);

        assert_eq!(exit_code, 0, "stderr: {}", stderr);
        assert!(stdout.contains("✓ Generated OpenImageIO stubs:"));
        assert!(stdout.contains("✓ Generated PyOpenColorIO stubs:"));
        assert!(stdout.contains("✓ Stub generation completed successfully!"));

        let oiio_dir = out.join("OpenImageIO");
        let oiio = fs::read_to_string(oiio_dir.join("__init__.pyi")).expect("OpenImageIO stub");
        assert!(oiio.starts_with("# Auto-generated stubs for OpenImageIO\n"));
        assert_eq!(oiio.matches("def __eq__").count(), 1);
        assert!(oiio.contains("def __eq__(self, other: object) -> bool: ..."));
        assert!(oiio.contains("def write_image(self, pixels: numpy.ndarray) -> bool: ..."));
        // Every buffer parameter was rewritten, so the import is not needed.
        assert!(!oiio.contains("Buffer"));
        assert!(oiio_dir.join("py.typed").is_file());
        assert!(!oiio_dir.join("OpenImageIO.pyi").exists());

        let ocio_dir = out.join("PyOpenColorIO");
        let ocio = fs::read_to_string(ocio_dir.join("__init__.pyi")).expect("PyOpenColorIO stub");
        assert!(ocio.contains("from builtins import Exception as _BuiltinException"));
        assert!(ocio.contains("class Exception(_BuiltinException): ..."));
        assert!(ocio.contains("def __ne__(self, other: object) -> bool: ..."));
        assert!(ocio_dir.join("py.typed").is_file());
    }

    /// `--only` restricts the run and the JSON response reports it.
    #[test]
    fn only_flag_restricts_the_run_to_one_module() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let python = tmp.path().join("python");
        write_script(&python, GENERATING_INTERPRETER);
        let out = tmp.path().join("stubs");
        let python_arg = python.display().to_string();
        let out_arg = out.display().to_string();

        let (stdout, stderr, exit_code) = run_stubforge(&[
            "generate",
            "--only",
            "OpenImageIO",
            "--python",
            &python_arg,
            "--out-path",
            &out_arg,
            "--format",
            "json",
        ]);

        assert_eq!(exit_code, 0, "stderr: {}", stderr);
        let json: serde_json::Value =
            serde_json::from_str(&stdout).expect("stdout should be valid JSON");
        assert_eq!(json["status"], "ok");
        let modules = json["modules"].as_array().expect("modules array");
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0]["module"], "OpenImageIO");
        let stub_path = modules[0]["stub_path"].as_str().expect("stub path");
        assert!(stub_path.ends_with("__init__.pyi"), "path: {}", stub_path);
        assert!(!out.join("PyOpenColorIO").exists());
    }

    /// One failing module fails the run by default; `--best-effort`
    /// accepts the partial result.
    #[test]
    fn failing_module_fails_the_run_unless_best_effort() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let python = tmp.path().join("python");
        write_script(&python, HALF_FAILING_INTERPRETER);
        let python_arg = python.display().to_string();

        let strict_out = tmp.path().join("strict");
        let strict_arg = strict_out.display().to_string();
        let (stdout, stderr, exit_code) = run_stubforge(&[
            "generate",
            "--python",
            &python_arg,
            "--out-path",
            &strict_arg,
        ]);
        assert_eq!(exit_code, 4, "stderr: {}", stderr);
        assert!(stdout.contains("✓ Generated OpenImageIO stubs:"));
        assert!(stdout.contains("✗ Failed to generate PyOpenColorIO stubs:"));
        assert!(stderr.contains("stub generation failed for 1 of 2 modules"));

        let lenient_out = tmp.path().join("lenient");
        let lenient_arg = lenient_out.display().to_string();
        let (stdout, stderr, exit_code) = run_stubforge(&[
            "generate",
            "--python",
            &python_arg,
            "--out-path",
            &lenient_arg,
            "--best-effort",
        ]);
        assert_eq!(exit_code, 0, "stderr: {}", stderr);
        assert!(stdout.contains("✓ Stub generation completed successfully!"));
        assert!(lenient_out.join("OpenImageIO").join("py.typed").is_file());
    }
}
