//! Line-oriented repair passes for generated stub files.
//!
//! Each pass is an independent, idempotent transform over the full text
//! of one interface file, targeting a specific artifact of the stub
//! generator's output shape. Lines that do not match the expected shape
//! pass through unchanged; no pass ever fails.
//!
//! The scan windows are heuristics tuned against the generator's actual
//! line ordering, kept as named constants.

use crate::sig::{split_top_level, top_level_eq, DEF_LINE_RE};

/// Lines scanned above an `@overload` for the widened numeric sibling.
pub const NUMERIC_SCAN_BEFORE: usize = 4;
/// Lines scanned below an `@overload` for the widened numeric sibling.
pub const NUMERIC_SCAN_AFTER: usize = 6;
/// Half-window scanned around an `@overload` for a covering union sibling.
pub const UNION_SCAN_WINDOW: usize = 10;

/// Import line the exception-cycle fix introduces.
pub const BUILTIN_EXCEPTION_IMPORT: &str = "from builtins import Exception as _BuiltinException";

/// Import line the buffer fix ensures when the sentinel type appears.
pub const BUFFER_IMPORT: &str = "from typing_extensions import Buffer";

/// Sentinel type name the generator leaves for buffer-protocol values.
const BUFFER_SENTINEL: &str = "Buffer";

// ============================================================================
// Pass selection
// ============================================================================

/// One repair pass, as selected by a module profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairPass {
    /// Drop overloads made redundant by a widened or union sibling.
    RedundantOverloads,
    /// Break the self-inheriting `class Exception(Exception):` cycle.
    ExceptionCycle,
    /// Ensure the buffer-protocol import accompanies the sentinel type.
    BufferImport,
    /// Strip defaults when a defaulted parameter precedes a required one.
    DefaultOrder,
}

impl RepairPass {
    pub fn apply(self, content: &str) -> String {
        match self {
            RepairPass::RedundantOverloads => drop_redundant_overloads(content),
            RepairPass::ExceptionCycle => fix_exception_cycle(content),
            RepairPass::BufferImport => ensure_buffer_import(content),
            RepairPass::DefaultOrder => fix_default_order(content),
        }
    }
}

// ============================================================================
// Redundant overload removal
// ============================================================================

/// Remove overloads that conflict with a sibling declaration.
///
/// Two generator artifacts are handled:
/// - an `int`-typed value-argument overload next to the `float` version
///   of the same callable (`int` is a subtype of `float` for the type
///   checker, so the pair is ambiguous);
/// - a standalone one-argument constructor overload whose argument type
///   is already a member of a union-typed sibling constructor.
///
/// In both cases the narrow overload and its `@overload` decorator line
/// are dropped together.
pub fn drop_redundant_overloads(content: &str) -> String {
    let lines: Vec<&str> = content.split('\n').collect();
    let mut kept: Vec<&str> = Vec::with_capacity(lines.len());
    let mut skip_next = false;
    for i in 0..lines.len() {
        if skip_next {
            skip_next = false;
            continue;
        }
        let line = lines[i];
        if line.contains("@overload") && i + 1 < lines.len() {
            let next = lines[i + 1];
            if is_narrow_numeric_overload(next) {
                let lo = i.saturating_sub(NUMERIC_SCAN_BEFORE);
                let hi = (i + NUMERIC_SCAN_AFTER).min(lines.len());
                if (lo..hi).any(|j| j != i + 1 && lines[j].contains("arg1: float")) {
                    skip_next = true;
                    continue;
                }
            }
            if is_union_covered_overload(next) {
                let lo = i.saturating_sub(UNION_SCAN_WINDOW);
                let hi = (i + UNION_SCAN_WINDOW).min(lines.len());
                if (lo..hi)
                    .any(|j| j != i + 1 && lines[j].contains("arg0: TypeDesc | BASETYPE | str"))
                {
                    skip_next = true;
                    continue;
                }
            }
        }
        kept.push(line);
    }
    kept.join("\n")
}

// The binding layer names the value argument of attribute setters `arg1`
// (`arg0` is the attribute name).
fn is_narrow_numeric_overload(line: &str) -> bool {
    line.contains("arg1: int")
        && (line.contains("def attribute(") || line.contains("def __init__("))
}

fn is_union_covered_overload(line: &str) -> bool {
    line.contains("def __init__(self, arg0: BASETYPE, /)")
        || line.contains("def __init__(self, arg0: str, /)")
}

// ============================================================================
// Exception cycle
// ============================================================================

/// Rewrite a self-inheriting `class Exception(Exception):` declaration to
/// inherit from the aliased builtin, importing the alias once after the
/// first existing import line. Classes inheriting from the module's own
/// `Exception` are left alone.
pub fn fix_exception_cycle(content: &str) -> String {
    if !content.contains("class Exception(Exception):") {
        return content.to_string();
    }
    let mut out: Vec<String> = Vec::new();
    let mut inserted = content.contains(BUILTIN_EXCEPTION_IMPORT);
    for line in content.split('\n') {
        if line.contains("class Exception(Exception):") {
            out.push("class Exception(_BuiltinException): ...".to_string());
            continue;
        }
        let is_import = line.starts_with("import ") || line.starts_with("from ");
        out.push(line.to_string());
        if !inserted && is_import {
            out.push(BUILTIN_EXCEPTION_IMPORT.to_string());
            inserted = true;
        }
    }
    if !inserted {
        // No import lines to anchor on; the alias still has to exist.
        out.insert(0, BUILTIN_EXCEPTION_IMPORT.to_string());
    }
    out.join("\n")
}

// ============================================================================
// Buffer import
// ============================================================================

/// Insert the buffer-protocol import after the leading import block when
/// the sentinel type name appears anywhere without it. At most one import
/// is ever added, however often the sentinel occurs.
pub fn ensure_buffer_import(content: &str) -> String {
    if !content.contains(BUFFER_SENTINEL) || content.contains(BUFFER_IMPORT) {
        return content.to_string();
    }
    let mut lines: Vec<&str> = content.split('\n').collect();
    let mut insert_at = 0;
    for (i, line) in lines.iter().enumerate() {
        if line.starts_with("import ") || line.starts_with("from ") {
            insert_at = i + 1;
        } else if insert_at > 0 && !line.is_empty() && !line.starts_with(' ') {
            break;
        }
    }
    lines.insert(insert_at, BUFFER_IMPORT);
    lines.join("\n")
}

// ============================================================================
// Default ordering
// ============================================================================

/// Make `def` lines legal when the generator placed a defaulted parameter
/// before a required one: every defaulted parameter in the positional
/// section loses its default expression, order untouched. Keyword-only
/// parameters (after `*` or `*args`) may keep defaults in any order and
/// are never altered.
pub fn fix_default_order(content: &str) -> String {
    content
        .split('\n')
        .map(|line| strip_misplaced_defaults(line).unwrap_or_else(|| line.to_string()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `None` means the line needs no change (or is not a def line).
fn strip_misplaced_defaults(line: &str) -> Option<String> {
    let caps = DEF_LINE_RE.captures(line)?;
    let args = &caps["args"];
    if args.trim().is_empty() {
        return None;
    }
    let pieces: Vec<&str> = split_top_level(args).into_iter().map(str::trim).collect();

    // Only the positional section participates.
    let positional_end = pieces
        .iter()
        .position(|p| p.starts_with('*'))
        .unwrap_or(pieces.len());
    let positional = &pieces[..positional_end];

    let mut seen_default = false;
    let mut misordered = false;
    for piece in positional {
        if *piece == "/" {
            continue;
        }
        if top_level_eq(piece).is_some() {
            seen_default = true;
        } else if seen_default {
            misordered = true;
            break;
        }
    }
    if !misordered {
        return None;
    }

    let fixed: Vec<String> = pieces
        .iter()
        .enumerate()
        .map(|(i, piece)| {
            if i < positional_end {
                match top_level_eq(piece) {
                    Some(pos) => piece[..pos].trim_end().to_string(),
                    None => piece.to_string(),
                }
            } else {
                piece.to_string()
            }
        })
        .collect();

    let ret = caps
        .name("ret")
        .map_or(String::new(), |m| format!(" -> {}", m.as_str()));
    Some(format!(
        "{}{}def {}({}){}:{}",
        &caps["indent"],
        caps.name("async").map_or("", |m| m.as_str()),
        &caps["name"],
        fixed.join(", "),
        ret,
        &caps["tail"],
    ))
}

// ============================================================================
// Tests
// ============================================================================
