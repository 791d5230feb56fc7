//! Extractor registry and shared extraction plumbing.
//!
//! Each framework family implements [`Extractor`]; the registry dispatches
//! every extractor that supports a file's extension, so a `.jsx` file is
//! visited by both the React patterns and the store patterns. Extractors emit
//! only literal promises — anything dynamic lands in a skip-counter bucket
//! and emits nothing.

use crate::ids;
use crate::types::{
    Expectation, ExpectationKind, PromiseKind, PromiseSpec, SkipCounters, SourceLocation,
    SourceType,
};

/// Output of one extractor over one file.
#[derive(Debug, Default)]
pub struct Extraction {
    pub expectations: Vec<Expectation>,
    pub skipped: SkipCounters,
}

impl Extraction {
    pub fn merge(&mut self, other: Extraction) {
        self.expectations.extend(other.expectations);
        let s = &mut self.skipped;
        let o = other.skipped;
        s.dynamic += o.dynamic;
        s.params += o.params;
        s.computed += o.computed;
        s.external += o.external;
        s.parse_error += o.parse_error;
        s.other += o.other;
    }
}

/// A framework extraction capability.
pub trait Extractor {
    fn name(&self) -> &'static str;

    /// Whether this extractor understands files with the given extension.
    fn supports(&self, ext: &str) -> bool;

    /// Extract literal promises from one file.
    fn extract(&self, source: &str, file: &str) -> Extraction;
}

/// The default registry, in deterministic dispatch order.
#[must_use]
pub fn default_registry() -> Vec<Box<dyn Extractor>> {
    vec![
        Box::new(super::html::HtmlExtractor),
        Box::new(super::react::ReactExtractor),
        Box::new(super::vue::VueExtractor),
        Box::new(super::svelte::SvelteExtractor),
        Box::new(super::stores::StoreExtractor),
    ]
}

/// 1-based line and column of a byte offset.
#[must_use]
pub fn line_col(source: &str, offset: usize) -> (u32, u32) {
    let prefix = &source[..offset.min(source.len())];
    let line = prefix.bytes().filter(|b| *b == b'\n').count() as u32 + 1;
    let column = match prefix.rfind('\n') {
        Some(pos) => (offset - pos - 1) as u32 + 1,
        None => offset as u32 + 1,
    };
    (line, column)
}

/// Verdict on a candidate promise value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueClass {
    Literal,
    Dynamic,
    Computed,
    External,
    Empty,
}

/// Classify a candidate value. Only `Literal` is admitted.
#[must_use]
pub fn classify_value(value: &str) -> ValueClass {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return ValueClass::Empty;
    }
    if trimmed.contains("${") || trimmed.contains('`') {
        return ValueClass::Dynamic;
    }
    if trimmed.starts_with('{') || trimmed.ends_with('}') {
        return ValueClass::Computed;
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") || trimmed.starts_with("//")
    {
        return ValueClass::External;
    }
    if trimmed.starts_with("javascript:") || trimmed.starts_with('#') {
        return ValueClass::Empty;
    }
    ValueClass::Literal
}

/// Count a non-literal value in the right bucket.
pub fn count_skip(skipped: &mut SkipCounters, class: ValueClass) {
    match class {
        ValueClass::Dynamic => skipped.dynamic += 1,
        ValueClass::Computed => skipped.computed += 1,
        ValueClass::External => skipped.external += 1,
        ValueClass::Empty => skipped.other += 1,
        ValueClass::Literal => {}
    }
}

/// Build an expectation with its stable ID and provenance.
#[must_use]
pub fn build_expectation(
    kind: ExpectationKind,
    promise_kind: PromiseKind,
    value: &str,
    file: &str,
    line: u32,
    column: u32,
    pattern: &str,
    confidence: f64,
) -> Expectation {
    let source = SourceLocation {
        file: file.to_string(),
        line,
        column,
        pattern: pattern.to_string(),
    };
    let promise = PromiseSpec {
        kind: promise_kind,
        value: value.to_string(),
    };
    let id = ids::expectation_id(kind.as_str(), &source, &promise);
    let source_ref = Some(source.source_ref());
    Expectation {
        id,
        kind,
        promise,
        source,
        source_type: SourceType::Code,
        source_ref,
        confidence,
    }
}
