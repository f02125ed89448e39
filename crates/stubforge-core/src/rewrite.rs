//! Signature rewriting against an override table set.
//!
//! One `SignatureRewriter` is built per target module profile and handed
//! to the generation backend explicitly; nothing here touches global
//! state. Rewriting never fails: unmatched slots pass through, and a
//! replacement that does not parse behaves as no match.

use crate::overrides::SigOverrides;
use crate::sig::{parse_sig, FunctionSig, ParamKind};

/// Applies override rules and the positional-only transform to inferred
/// callable signatures.
#[derive(Debug, Clone, Default)]
pub struct SignatureRewriter {
    overrides: SigOverrides,
}

impl SignatureRewriter {
    pub fn new(overrides: SigOverrides) -> Self {
        SignatureRewriter { overrides }
    }

    pub fn overrides(&self) -> &SigOverrides {
        &self.overrides
    }

    /// Rewrite one callable signature.
    ///
    /// `scope` is the callable's dotted path including its own name,
    /// e.g. `OpenImageIO.ImageBuf.get_pixels`. Steps, in order:
    ///
    /// 1. a whole-signature override substitutes the entire signature
    ///    and short-circuits the remaining steps;
    /// 2. each parameter is looked up by (scope, name, inferred type);
    /// 3. the return type is looked up by (scope, inferred type);
    /// 4. parameters auto-named by the binding layer are marked
    ///    positional-only.
    pub fn rewrite(&self, scope: &str, sig: &FunctionSig) -> FunctionSig {
        if let Some(replacement) = self.overrides.signature_for(scope) {
            if let Some(replaced) = parse_sig(replacement) {
                return replaced;
            }
        }
        let mut out = sig.clone();
        for param in &mut out.params {
            let inferred = param.annotation.as_deref().unwrap_or("");
            if let Some(replacement) = self.overrides.param_type_for(scope, &param.name, inferred)
            {
                param.annotation = Some(replacement.to_string());
            }
        }
        let inferred_ret = out.return_type.as_deref().unwrap_or("");
        if let Some(replacement) = self.overrides.result_type_for(scope, inferred_ret) {
            out.return_type = Some(replacement.to_string());
        }
        mark_positional_only(&mut out);
        out
    }

    /// Rewrite raw signature text; `None` when the text does not parse
    /// (callers keep the original).
    pub fn rewrite_text(&self, scope: &str, sig_text: &str) -> Option<String> {
        let sig = parse_sig(sig_text)?;
        Some(self.rewrite(scope, &sig).render())
    }

    /// Property-type override for `@property` getters and annotated
    /// class attributes. `scope` includes the property name.
    pub fn rewrite_property(&self, scope: &str, inferred: &str) -> Option<&str> {
        self.overrides.property_type_for(scope, inferred)
    }
}

// ============================================================================
// Positional-only transform
// ============================================================================

/// Mark the leading run of binding-generated parameter names
/// (`arg0`, `arg1`, ...) positional-only, together with a leading
/// `self`/`cls` receiver when such a run follows it. Those names are
/// what the native binding layer assigns to parameters that cannot be
/// passed by keyword.
pub fn mark_positional_only(sig: &mut FunctionSig) {
    if sig.params.iter().any(|p| p.positional_only) {
        return;
    }
    let mut index = 0;
    let receiver = sig
        .params
        .first()
        .is_some_and(|p| p.kind == ParamKind::Positional && (p.name == "self" || p.name == "cls"));
    if receiver {
        index = 1;
    }
    let run_start = index;
    while sig
        .params
        .get(index)
        .is_some_and(|p| p.kind == ParamKind::Positional && is_auto_name(&p.name))
    {
        index += 1;
    }
    if index == run_start {
        return;
    }
    for param in &mut sig.params[..index] {
        param.positional_only = true;
    }
}

fn is_auto_name(name: &str) -> bool {
    name.strip_prefix("arg")
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

// ============================================================================
// Tests
// ============================================================================
