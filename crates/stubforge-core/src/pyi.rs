//! Whole-file signature rewriting for generated stubs.
//!
//! The stub generator runs out of process, so override rules are applied
//! here as a single pass over the produced interface file. The walker
//! tracks the dotted scope path with an indentation-based class stack,
//! routes every `def` line through the [`SignatureRewriter`], and
//! consults the property table for `@property` getters and annotated
//! class attributes. Lines outside those shapes pass through unchanged.
//!
//! When a whole-signature override fires on an overloaded callable, the
//! generator's inaccurate overload set collapses to the single overridden
//! declaration: the `@overload` decorators are dropped and consecutive
//! duplicates are emitted once.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::rewrite::SignatureRewriter;
use crate::sig::{parse_params, parse_sig, top_level_eq, FunctionSig, DEF_LINE_RE};

static CLASS_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<indent>\s*)class (?P<name>\w+)").unwrap());

static ATTR_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<indent>\s+)(?P<name>\w+): (?P<rest>.+)$").unwrap());

/// Rewrite one generated stub file.
///
/// `module` is the dotted module name the file describes; it anchors
/// every scope path handed to the rewriter.
pub fn rewrite_stub(content: &str, module: &str, rewriter: &SignatureRewriter) -> String {
    StubWalker::new(module, rewriter).walk(content)
}

struct StubWalker<'a> {
    module: &'a str,
    rewriter: &'a SignatureRewriter,
    out: Vec<String>,
    /// (indent, class name) for each enclosing class body.
    scopes: Vec<(usize, String)>,
    /// Decorator lines held until their def decides what happens to them.
    pending: Vec<&'a str>,
    /// Last whole-signature collapse, for deduplicating an overload group.
    last_collapsed: Option<(String, String)>,
}

impl<'a> StubWalker<'a> {
    fn new(module: &'a str, rewriter: &'a SignatureRewriter) -> Self {
        StubWalker {
            module,
            rewriter,
            out: Vec::new(),
            scopes: Vec::new(),
            pending: Vec::new(),
            last_collapsed: None,
        }
    }

    fn walk(mut self, content: &'a str) -> String {
        for line in content.split('\n') {
            self.visit_line(line);
        }
        self.flush_pending();
        self.out.join("\n")
    }

    fn visit_line(&mut self, line: &'a str) {
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            self.pass_through(line);
            return;
        }
        let indent = line.len() - trimmed.len();
        while self.scopes.last().is_some_and(|(depth, _)| indent <= *depth) {
            self.scopes.pop();
        }
        if trimmed.starts_with('@') {
            self.pending.push(line);
            return;
        }
        if let Some(caps) = CLASS_LINE_RE.captures(line) {
            let name = caps["name"].to_string();
            self.pass_through(line);
            self.scopes.push((indent, name));
            return;
        }
        if let Some(caps) = DEF_LINE_RE.captures(line) {
            self.visit_def(line, &caps);
            return;
        }
        match self.rewrite_attr_line(line) {
            Some(rewritten) => {
                self.flush_pending();
                self.last_collapsed = None;
                self.out.push(rewritten);
            }
            None => self.pass_through(line),
        }
    }

    fn visit_def(&mut self, line: &str, caps: &Captures<'_>) {
        let indent = &caps["indent"];
        let asyncness = caps.name("async").map_or("", |m| m.as_str());
        let name = &caps["name"];
        let tail = &caps["tail"];
        let scope = self.scope_path(name);

        // Whole-signature override: substitute verbatim and, for overload
        // groups, collapse to a single declaration.
        if let Some(replacement) = self.rewriter.overrides().signature_for(&scope) {
            if let Some(new_sig) = parse_sig(replacement) {
                let rendered = format!(
                    "{}{}def {}{}:{}",
                    indent,
                    asyncness,
                    name,
                    new_sig.render(),
                    tail
                );
                let has_overload = self.pending.iter().any(|d| d.trim_start() == "@overload");
                if has_overload {
                    if self.last_collapsed.as_ref() == Some(&(scope.clone(), rendered.clone())) {
                        self.pending.clear();
                        return;
                    }
                    self.pending.retain(|d| d.trim_start() != "@overload");
                }
                self.flush_pending();
                self.out.push(rendered.clone());
                self.last_collapsed = Some((scope, rendered));
                return;
            }
        }

        let is_property = self.pending.iter().any(|d| d.trim_start() == "@property");
        self.flush_pending();
        self.last_collapsed = None;

        if is_property {
            // Property getters answer to the property table only.
            let rewritten = caps.name("ret").and_then(|ret| {
                self.rewriter
                    .rewrite_property(&scope, ret.as_str().trim())
                    .map(|replacement| {
                        format!(
                            "{}{}def {}({}) -> {}:{}",
                            indent, asyncness, name, &caps["args"], replacement, tail
                        )
                    })
            });
            self.out.push(rewritten.unwrap_or_else(|| line.to_string()));
            return;
        }

        match parse_params(&caps["args"]) {
            Some(params) => {
                let sig = FunctionSig {
                    params,
                    return_type: caps.name("ret").map(|m| m.as_str().trim().to_string()),
                };
                let rendered = self.rewriter.rewrite(&scope, &sig).render();
                self.out
                    .push(format!("{}{}def {}{}:{}", indent, asyncness, name, rendered, tail));
            }
            None => self.out.push(line.to_string()),
        }
    }

    /// Rewrite an annotated class attribute through the property table.
    /// `None` when the line is not an attribute or no rule matches.
    fn rewrite_attr_line(&self, line: &str) -> Option<String> {
        if self.scopes.is_empty() {
            return None;
        }
        let caps = ATTR_LINE_RE.captures(line)?;
        let name = &caps["name"];
        let rest = &caps["rest"];
        let (ty, suffix) = match top_level_eq(rest) {
            Some(pos) => (rest[..pos].trim_end(), &rest[pos..]),
            None => (rest.trim_end(), ""),
        };
        let scope = self.scope_path(name);
        let replacement = self.rewriter.rewrite_property(&scope, ty)?;
        if suffix.is_empty() {
            Some(format!("{}{}: {}", &caps["indent"], name, replacement))
        } else {
            Some(format!("{}{}: {} {}", &caps["indent"], name, replacement, suffix))
        }
    }

    fn pass_through(&mut self, line: &str) {
        self.flush_pending();
        self.last_collapsed = None;
        self.out.push(line.to_string());
    }

    fn scope_path(&self, name: &str) -> String {
        let mut path = String::from(self.module);
        for (_, class) in &self.scopes {
            path.push('.');
            path.push_str(class);
        }
        path.push('.');
        path.push_str(name);
        path
    }

    fn flush_pending(&mut self) {
        for line in self.pending.drain(..) {
            self.out.push(line.to_string());
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
