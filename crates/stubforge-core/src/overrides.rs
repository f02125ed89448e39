//! Override tables for generated stub signatures.
//!
//! A stub generator inspecting a native extension module gets many types
//! wrong in predictable ways. The tables in this module hold the manual
//! corrections: ordered rules matching a candidate (scope path, slot name,
//! inferred type) against glob patterns and yielding replacement text.
//!
//! Rules live in four independent tables:
//! - whole-signature overrides, keyed by the callable's scope path
//! - parameter-type overrides, keyed by (scope, parameter name, type)
//! - result-type overrides, keyed by (scope, return type)
//! - property-type overrides, keyed by (scope, property type)
//!
//! Within a table the first matching rule wins, so more specific rules
//! must be listed before broader ones. Tables are built once and never
//! mutated afterwards.

use globset::{Glob, GlobMatcher};
use tracing::warn;

// ============================================================================
// Pattern
// ============================================================================

/// A glob pattern matched against dotted stub text.
///
/// Candidates are dotted scope paths (`OpenImageIO.ImageBuf.__eq__`),
/// parameter names, or inferred type text. Candidates never contain `/`,
/// so `*` spans any run of characters: `*.__eq__` matches the slot at any
/// nesting depth.
///
/// A pattern that fails to compile is kept but never matches; the failure
/// is logged once at construction and is not an error.
#[derive(Debug, Clone)]
pub struct Pattern {
    text: String,
    matcher: Option<GlobMatcher>,
}

impl Pattern {
    /// Compile a pattern from glob text.
    pub fn new(text: &str) -> Self {
        let matcher = match Glob::new(&escape_brackets(text)) {
            Ok(glob) => Some(glob.compile_matcher()),
            Err(err) => {
                warn!(pattern = %text, error = %err, "ignoring malformed override pattern");
                None
            }
        };
        Pattern {
            text: text.to_string(),
            matcher,
        }
    }

    /// Test a candidate string against this pattern.
    ///
    /// An empty candidate (an unannotated slot) matches only the bare
    /// wildcard pattern.
    pub fn matches(&self, candidate: &str) -> bool {
        if candidate.is_empty() {
            return self.text == "*";
        }
        self.matcher
            .as_ref()
            .is_some_and(|m| m.is_match(candidate))
    }

    /// The original pattern text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Make `[` literal before glob compilation.
///
/// Inferred type text uses square brackets for generics (`list[ImageSpec]`),
/// but `[` opens a character class in glob syntax. A lone `]` outside a
/// class is already literal.
fn escape_brackets(text: &str) -> String {
    text.replace('[', "[[]")
}

// ============================================================================
// Rules
// ============================================================================

#[derive(Debug, Clone)]
struct SigRule {
    scope: Pattern,
    replacement: String,
}

#[derive(Debug, Clone)]
struct ParamRule {
    scope: Pattern,
    name: Pattern,
    ty: Pattern,
    replacement: String,
}

/// Shared shape for result-type and property-type rules.
#[derive(Debug, Clone)]
struct SlotRule {
    scope: Pattern,
    ty: Pattern,
    replacement: String,
}

// ============================================================================
// Override Tables
// ============================================================================

/// The four override tables consulted by the signature rewriter.
///
/// Built with the chained constructors so a rule set reads like a table:
///
/// ```
/// use stubforge_core::overrides::SigOverrides;
///
/// let overrides = SigOverrides::new()
///     .signature("*.__eq__", "(self, other: object) -> bool")
///     .param_type("*", "*", "Buffer", "numpy.ndarray")
///     .result_type("*.ImageInput.open", "object", "ImageInput | None");
///
/// assert_eq!(
///     overrides.signature_for("OpenImageIO.ImageBuf.__eq__"),
///     Some("(self, other: object) -> bool"),
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct SigOverrides {
    signatures: Vec<SigRule>,
    param_types: Vec<ParamRule>,
    result_types: Vec<SlotRule>,
    property_types: Vec<SlotRule>,
}

impl SigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a whole-signature override for callables whose scope path
    /// matches. The replacement is full signature text of the form
    /// `(params) -> return`.
    pub fn signature(mut self, scope: &str, replacement: &str) -> Self {
        self.signatures.push(SigRule {
            scope: Pattern::new(scope),
            replacement: replacement.to_string(),
        });
        self
    }

    /// Add a parameter-type override keyed by (scope, parameter name,
    /// inferred type).
    pub fn param_type(mut self, scope: &str, name: &str, ty: &str, replacement: &str) -> Self {
        self.param_types.push(ParamRule {
            scope: Pattern::new(scope),
            name: Pattern::new(name),
            ty: Pattern::new(ty),
            replacement: replacement.to_string(),
        });
        self
    }

    /// Add a result-type override keyed by (scope, inferred return type).
    pub fn result_type(mut self, scope: &str, ty: &str, replacement: &str) -> Self {
        self.result_types.push(SlotRule {
            scope: Pattern::new(scope),
            ty: Pattern::new(ty),
            replacement: replacement.to_string(),
        });
        self
    }

    /// Add a property-type override keyed by (scope, inferred type).
    /// Applies to `@property` getters and annotated class attributes.
    pub fn property_type(mut self, scope: &str, ty: &str, replacement: &str) -> Self {
        self.property_types.push(SlotRule {
            scope: Pattern::new(scope),
            ty: Pattern::new(ty),
            replacement: replacement.to_string(),
        });
        self
    }

    /// First matching whole-signature replacement for a scope path.
    pub fn signature_for(&self, scope: &str) -> Option<&str> {
        self.signatures
            .iter()
            .find(|rule| rule.scope.matches(scope))
            .map(|rule| rule.replacement.as_str())
    }

    /// First matching parameter-type replacement.
    pub fn param_type_for(&self, scope: &str, name: &str, ty: &str) -> Option<&str> {
        self.param_types
            .iter()
            .find(|rule| {
                rule.scope.matches(scope) && rule.name.matches(name) && rule.ty.matches(ty)
            })
            .map(|rule| rule.replacement.as_str())
    }

    /// First matching result-type replacement.
    pub fn result_type_for(&self, scope: &str, ty: &str) -> Option<&str> {
        self.result_types
            .iter()
            .find(|rule| rule.scope.matches(scope) && rule.ty.matches(ty))
            .map(|rule| rule.replacement.as_str())
    }

    /// First matching property-type replacement.
    pub fn property_type_for(&self, scope: &str, ty: &str) -> Option<&str> {
        self.property_types
            .iter()
            .find(|rule| rule.scope.matches(scope) && rule.ty.matches(ty))
            .map(|rule| rule.replacement.as_str())
    }

    /// True when no table holds any rule.
    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
            && self.param_types.is_empty()
            && self.result_types.is_empty()
            && self.property_types.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
