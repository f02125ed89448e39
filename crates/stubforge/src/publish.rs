//! Publish driver for the stub package.
//!
//! Mirrors the release flow of the package: clean old build artifacts,
//! point the README image links at the raw GitHub URLs while the sdist is
//! built, upload with twine after an explicit confirmation, and always
//! put the README back, SIGINT included.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, LazyLock, Mutex};

use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::{ErrorCode, StubforgeError};

/// Raw-content base URL the README image links are rewritten to.
pub const GITHUB_RAW_URL: &str =
    "https://raw.githubusercontent.com/pypoulp/types-oiio-python/main/";

/// Production package index.
pub const RELEASE_REPOSITORY: &str = "pypi";
/// Default package index.
pub const TEST_REPOSITORY: &str = "testpypi";

/// Confirmation shown before a production upload is prepared.
pub const RELEASE_PROMPT: &str = "Using RELEASE mode, do you want to continue? (yes/no): ";
/// Confirmation shown before the actual upload.
pub const UPLOAD_PROMPT: &str = "Are you sure you want to publish to PyPI? (yes/no): ";

/// Relative image links of the form `![alt](img/file)`.
static IMAGE_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\(img/([^)]+)\)").unwrap());

/// Options for one publish run.
#[derive(Debug, Clone)]
pub struct PublishOptions {
    /// Upload to the production index instead of the test index.
    pub release: bool,
    /// Directory holding `README.md`, `dist/`, and `build/`.
    pub project_root: PathBuf,
    /// Interpreter used to run the build tool.
    pub python: PathBuf,
}

/// How a publish run ended when it did not error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Uploaded to the named repository.
    Published {
        repository: &'static str,
        artifacts: usize,
    },
    /// The user declined one of the confirmations.
    Declined,
    /// The build produced nothing to upload.
    NothingToPublish,
}

// ============================================================================
// Confirmation
// ============================================================================

/// Yes/no confirmation the publish flow asks through.
///
/// Object-safe so tests can inject scripted deciders.
pub trait Confirm: Send + Sync {
    /// Ask the user; `true` means proceed.
    fn ask_confirm(&self, prompt: &str) -> Result<bool, StubforgeError>;
}

/// Production confirmer reading one line from stdin.
///
/// Accepts exactly `yes`, trimmed and case-insensitive; anything else
/// (including EOF) declines.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn ask_confirm(&self, prompt: &str) -> Result<bool, StubforgeError> {
        print!("{}", prompt);
        io::stdout()
            .flush()
            .map_err(|e| StubforgeError::internal(format!("flush stdout: {}", e)))?;
        let mut answer = String::new();
        io::stdin()
            .lock()
            .read_line(&mut answer)
            .map_err(|e| StubforgeError::internal(format!("read stdin: {}", e)))?;
        Ok(answer.trim().eq_ignore_ascii_case("yes"))
    }
}

// ============================================================================
// README Restore
// ============================================================================

struct ReadmeSnapshot {
    path: PathBuf,
    original: String,
}

/// Shared restore state both the guard and the interrupt handler reach.
///
/// Restoring is one-shot: whichever side gets there first writes the
/// original content back and disarms the other.
#[derive(Clone, Default)]
pub struct RestorePoint {
    inner: Arc<Mutex<Option<ReadmeSnapshot>>>,
}

impl RestorePoint {
    fn arm(&self, path: PathBuf, original: String) {
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(ReadmeSnapshot { path, original });
    }

    /// Write the original README back if still armed.
    pub fn restore_now(&self) {
        let snapshot = match self.inner.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(snapshot) = snapshot {
            match fs::write(&snapshot.path, &snapshot.original) {
                Ok(()) => info!(path = %snapshot.path.display(), "restored README"),
                Err(err) => {
                    warn!(path = %snapshot.path.display(), error = %err, "failed to restore README")
                }
            }
        }
    }
}

/// Install a SIGINT handler that restores the README and exits.
///
/// Installed once per process, before the publish flow starts.
pub fn install_interrupt_handler(restore: &RestorePoint) -> Result<(), StubforgeError> {
    let restore = restore.clone();
    ctrlc::set_handler(move || {
        restore.restore_now();
        eprintln!("\n✗ Publishing interrupted by user");
        std::process::exit(i32::from(ErrorCode::Interrupted.code()));
    })
    .map_err(|e| StubforgeError::internal(format!("failed to install interrupt handler: {}", e)))
}

/// Rewrites the README image links for the upload and restores the
/// original on drop.
struct ReadmeGuard {
    restore: RestorePoint,
}

impl ReadmeGuard {
    fn rewrite_images(path: &Path, restore: &RestorePoint) -> Result<Self, StubforgeError> {
        let original = fs::read_to_string(path).map_err(|e| StubforgeError::io(path, e))?;
        let rewritten = rewrite_image_links(&original);
        // Arm before touching the file so an interrupt mid-write restores.
        restore.arm(path.to_path_buf(), original.clone());
        if rewritten != original {
            fs::write(path, rewritten).map_err(|e| StubforgeError::io(path, e))?;
            info!(path = %path.display(), "rewrote README image links for the package index");
        }
        Ok(ReadmeGuard {
            restore: restore.clone(),
        })
    }
}

impl Drop for ReadmeGuard {
    fn drop(&mut self) {
        self.restore.restore_now();
    }
}

/// Replace relative `img/` links with absolute raw-GitHub links.
fn rewrite_image_links(content: &str) -> String {
    IMAGE_LINK_RE
        .replace_all(content, format!("![${{1}}]({}img/${{2}})", GITHUB_RAW_URL))
        .into_owned()
}

// ============================================================================
// Publish Flow
// ============================================================================

/// Build the package and upload it to the selected index.
///
/// Declining a confirmation or an empty `dist/` are clean outcomes, not
/// errors. The README is restored on every exit path.
pub fn publish(
    options: &PublishOptions,
    restore: &RestorePoint,
    confirm: &dyn Confirm,
) -> Result<PublishOutcome, StubforgeError> {
    let readme = options.project_root.join("README.md");
    if !readme.is_file() {
        return Err(StubforgeError::invalid_args(format!(
            "no README.md under {}",
            options.project_root.display()
        )));
    }

    let repository = if options.release {
        if !confirm.ask_confirm(RELEASE_PROMPT)? {
            info!("release publish declined");
            return Ok(PublishOutcome::Declined);
        }
        RELEASE_REPOSITORY
    } else {
        TEST_REPOSITORY
    };

    clean_build_artifacts(&options.project_root)?;

    let _guard = ReadmeGuard::rewrite_images(&readme, restore)?;

    info!(repository, "building distribution");
    let build_desc = format!("{} -m build", options.python.display());
    run_tool(
        Command::new(&options.python)
            .arg("-m")
            .arg("build")
            .current_dir(&options.project_root),
        &build_desc,
    )?;

    let artifacts = list_dist_files(&options.project_root)?;

    println!("Publishing to {}...", repository);
    println!("{}", "=".repeat(80));
    println!("Publishing {} files to PyPI: {}", artifacts.len(), repository);
    for file in &artifacts {
        println!("{}", file.display());
    }
    println!("{}", "=".repeat(80));

    if !confirm.ask_confirm(UPLOAD_PROMPT)? {
        info!("upload declined");
        return Ok(PublishOutcome::Declined);
    }

    if artifacts.is_empty() {
        return Ok(PublishOutcome::NothingToPublish);
    }

    let upload_desc = format!("twine upload --repository {}", repository);
    run_tool(
        Command::new("twine")
            .arg("upload")
            .arg("--repository")
            .arg(repository)
            .args(&artifacts)
            .current_dir(&options.project_root),
        &upload_desc,
    )?;

    Ok(PublishOutcome::Published {
        repository,
        artifacts: artifacts.len(),
    })
}

/// Remove `dist/` and `build/` leftovers from earlier runs.
fn clean_build_artifacts(project_root: &Path) -> Result<(), StubforgeError> {
    for name in ["dist", "build"] {
        let dir = project_root.join(name);
        if dir.exists() {
            debug!(dir = %dir.display(), "removing build artifacts");
            fs::remove_dir_all(&dir).map_err(|e| StubforgeError::io(&dir, e))?;
        }
    }
    Ok(())
}

/// List the files in `dist/`, sorted; an absent directory is empty.
fn list_dist_files(project_root: &Path) -> Result<Vec<PathBuf>, StubforgeError> {
    let dist = project_root.join("dist");
    if !dist.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(&dist).map_err(|e| StubforgeError::io(&dist, e))? {
        let entry = entry.map_err(|e| StubforgeError::io(&dist, e))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn run_tool(command: &mut Command, desc: &str) -> Result<(), StubforgeError> {
    debug!(command = desc, "running external tool");
    let status = command
        .status()
        .map_err(|e| StubforgeError::tool_spawn(desc, e))?;
    if !status.success() {
        return Err(StubforgeError::tool_failed(
            desc,
            status.code().unwrap_or(-1),
        ));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
