//! Callable signature model for generator-shaped stub text.
//!
//! Parses and re-renders the one signature shape the stub generator
//! emits: `(name: type = default, *args, kw: type) -> return`. This is
//! not a Python parser; text outside that shape is rejected with `None`
//! and callers pass the original line through unchanged.

use std::sync::LazyLock;

use regex::Regex;

/// Fixed-format `def` line shape: indent, optional `async`, name,
/// argument text, optional return annotation, everything after the colon.
pub static DEF_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<indent>\s*)(?P<async>async )?def (?P<name>\w+)\((?P<args>.*)\)(?: -> (?P<ret>[^:]+))?:(?P<tail>.*)$")
        .unwrap()
});

// ============================================================================
// Model
// ============================================================================

/// How a parameter may be supplied at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Ordinary positional-or-keyword parameter.
    Positional,
    /// Declared after a bare `*` separator.
    KeywordOnly,
    /// `*args` catch-all.
    VarArgs,
    /// `**kwargs` catch-all.
    KwArgs,
}

/// One parameter of a generated signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub annotation: Option<String>,
    pub default: Option<String>,
    pub kind: ParamKind,
    /// Rendered before the `/` separator when set.
    pub positional_only: bool,
}

impl Param {
    pub fn new(name: &str) -> Self {
        Param {
            name: name.to_string(),
            annotation: None,
            default: None,
            kind: ParamKind::Positional,
            positional_only: false,
        }
    }

    /// Inferred type text for override matching; empty when unannotated.
    pub fn type_text(&self) -> &str {
        self.annotation.as_deref().unwrap_or("")
    }
}

/// A parsed callable signature: ordered parameters plus return type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FunctionSig {
    pub params: Vec<Param>,
    pub return_type: Option<String>,
}

// ============================================================================
// Parsing
// ============================================================================

/// Split on commas at bracket depth zero, so nested generics like
/// `dict[str, int]` survive as one piece. Pieces keep their surrounding
/// whitespace.
pub fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, ch) in text.char_indices() {
        match ch {
            '[' | '(' | '{' => depth += 1,
            ']' | ')' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Byte offset of the first `=` at bracket depth zero, if any.
pub fn top_level_eq(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, ch) in text.char_indices() {
        match ch {
            '[' | '(' | '{' => depth += 1,
            ']' | ')' | '}' => depth = depth.saturating_sub(1),
            '=' if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse full signature text of the form `(params)` or `(params) -> ret`.
///
/// This is the shape whole-signature override replacements use. Returns
/// `None` for anything else.
pub fn parse_sig(text: &str) -> Option<FunctionSig> {
    let text = text.trim();
    let rest = text.strip_prefix('(')?;
    let (args, ret) = match rest.rfind(") -> ") {
        Some(pos) => (&rest[..pos], Some(rest[pos + ") -> ".len()..].trim())),
        None => (rest.strip_suffix(')')?, None),
    };
    let params = parse_params(args)?;
    Some(FunctionSig {
        params,
        return_type: ret.map(str::to_string),
    })
}

/// Parse the comma-separated argument text of one signature.
///
/// Handles the `/` and `*` separators by marking the surrounding
/// parameters rather than representing the separators themselves.
pub fn parse_params(args: &str) -> Option<Vec<Param>> {
    let mut params: Vec<Param> = Vec::new();
    let mut keyword_only = false;
    if args.trim().is_empty() {
        return Some(params);
    }
    for piece in split_top_level(args) {
        let piece = piece.trim();
        if piece.is_empty() {
            return None;
        }
        if piece == "/" {
            for param in &mut params {
                param.positional_only = true;
            }
            continue;
        }
        if piece == "*" {
            keyword_only = true;
            continue;
        }
        let (kind, body) = if let Some(rest) = piece.strip_prefix("**") {
            (ParamKind::KwArgs, rest)
        } else if let Some(rest) = piece.strip_prefix('*') {
            // Named params after a *args catch-all are keyword-only.
            keyword_only = true;
            (ParamKind::VarArgs, rest)
        } else if keyword_only {
            (ParamKind::KeywordOnly, piece)
        } else {
            (ParamKind::Positional, piece)
        };

        let (head, default) = match top_level_eq(body) {
            Some(pos) => (
                body[..pos].trim_end(),
                Some(body[pos + 1..].trim_start().to_string()),
            ),
            None => (body, None),
        };
        let (name, annotation) = match head.find(':') {
            Some(pos) => (
                head[..pos].trim_end(),
                Some(head[pos + 1..].trim().to_string()),
            ),
            None => (head.trim(), None),
        };
        if !is_identifier(name) {
            return None;
        }
        params.push(Param {
            name: name.to_string(),
            annotation,
            default,
            kind,
            positional_only: false,
        });
    }
    Some(params)
}

// ============================================================================
// Rendering
// ============================================================================

impl FunctionSig {
    /// Re-emit generator-shaped signature text.
    ///
    /// The `/` separator follows the last positional-only parameter; a
    /// bare `*` precedes the first keyword-only parameter when no
    /// `*args` catch-all already marks the boundary.
    pub fn render(&self) -> String {
        let has_varargs = self.params.iter().any(|p| p.kind == ParamKind::VarArgs);
        let mut pieces: Vec<String> = Vec::with_capacity(self.params.len() + 2);
        let mut star_emitted = has_varargs;
        for (i, param) in self.params.iter().enumerate() {
            if param.kind == ParamKind::KeywordOnly && !star_emitted {
                pieces.push("*".to_string());
                star_emitted = true;
            }
            pieces.push(render_param(param));
            let next_pos_only = self
                .params
                .get(i + 1)
                .is_some_and(|next| next.positional_only);
            if param.positional_only && !next_pos_only {
                pieces.push("/".to_string());
            }
        }
        let args = pieces.join(", ");
        match &self.return_type {
            Some(ret) => format!("({}) -> {}", args, ret),
            None => format!("({})", args),
        }
    }
}

fn render_param(param: &Param) -> String {
    let mut out = String::new();
    match param.kind {
        ParamKind::VarArgs => out.push('*'),
        ParamKind::KwArgs => out.push_str("**"),
        ParamKind::Positional | ParamKind::KeywordOnly => {}
    }
    out.push_str(&param.name);
    if let Some(annotation) = &param.annotation {
        out.push_str(": ");
        out.push_str(annotation);
    }
    if let Some(default) = &param.default {
        // `x: int = 0` with an annotation, `x=0` without.
        if param.annotation.is_some() {
            out.push_str(" = ");
        } else {
            out.push('=');
        }
        out.push_str(default);
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
