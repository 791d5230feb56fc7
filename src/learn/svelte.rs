//! Svelte/SvelteKit extraction: anchors, `goto`, form actions, and
//! filesystem routes.
//!
//! Filesystem routes are derived from the file path itself:
//! `src/routes/+page.svelte` → `/`, `src/routes/about/+page.svelte` →
//! `/about`. Dynamic segments (`[id]`) in a route path are skipped with the
//! `params` counter.

use once_cell::sync::Lazy;
use regex::Regex;

use super::extract::{
    Extraction, Extractor, ValueClass, build_expectation, classify_value, count_skip, line_col,
};
use crate::types::{ExpectationKind, PromiseKind};

static ANCHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<a\b[^>]*?\bhref\s*=\s*["']([^"']*)["']"#).expect("static pattern"));
static GOTO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"goto\(\s*["']([^"']*)["']\s*[,)]"#).expect("static pattern"));
static FORM_ACTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<form\b[^>]*?\baction\s*=\s*["']([^"']*)["']"#).expect("static pattern")
});

const CONFIDENCE_ANCHOR: f64 = 0.9;
const CONFIDENCE_GOTO: f64 = 0.85;
const CONFIDENCE_FORM: f64 = 0.85;
const CONFIDENCE_ROUTE: f64 = 0.8;

pub struct SvelteExtractor;

impl Extractor for SvelteExtractor {
    fn name(&self) -> &'static str {
        "svelte"
    }

    fn supports(&self, ext: &str) -> bool {
        ext == "svelte"
    }

    fn extract(&self, source: &str, file: &str) -> Extraction {
        let mut out = Extraction::default();

        for caps in ANCHOR.captures_iter(source) {
            let m = caps.get(0).expect("match exists");
            let value = &caps[1];
            let class = classify_value(value);
            if class != ValueClass::Literal {
                count_skip(&mut out.skipped, class);
                continue;
            }
            let (line, column) = line_col(source, m.start());
            out.expectations.push(build_expectation(
                ExpectationKind::Navigation,
                PromiseKind::Navigate,
                value,
                file,
                line,
                column,
                "svelte-anchor",
                CONFIDENCE_ANCHOR,
            ));
        }

        for caps in GOTO.captures_iter(source) {
            let m = caps.get(0).expect("match exists");
            let value = &caps[1];
            let class = classify_value(value);
            if class != ValueClass::Literal {
                count_skip(&mut out.skipped, class);
                continue;
            }
            let (line, column) = line_col(source, m.start());
            out.expectations.push(build_expectation(
                ExpectationKind::Navigation,
                PromiseKind::Navigate,
                value,
                file,
                line,
                column,
                "svelte-goto",
                CONFIDENCE_GOTO,
            ));
        }

        for caps in FORM_ACTION.captures_iter(source) {
            let m = caps.get(0).expect("match exists");
            let value = &caps[1];
            // SvelteKit default actions use "?/name" forms; keep them.
            let class = if value.starts_with("?/") {
                ValueClass::Literal
            } else {
                classify_value(value)
            };
            if class != ValueClass::Literal {
                count_skip(&mut out.skipped, class);
                continue;
            }
            let (line, column) = line_col(source, m.start());
            out.expectations.push(build_expectation(
                ExpectationKind::Form,
                PromiseKind::Submit,
                value,
                file,
                line,
                column,
                "svelte-form-action",
                CONFIDENCE_FORM,
            ));
        }

        if let Some(route) = filesystem_route(file) {
            if route.contains('[') {
                out.skipped.params += 1;
            } else {
                out.expectations.push(build_expectation(
                    ExpectationKind::Navigation,
                    PromiseKind::Navigate,
                    &route,
                    file,
                    1,
                    1,
                    "sveltekit-route",
                    CONFIDENCE_ROUTE,
                ));
            }
        }

        out
    }
}

/// Derive the route a `+page.svelte` file serves, if any.
fn filesystem_route(file: &str) -> Option<String> {
    let normalized = file.replace('\\', "/");
    let idx = normalized.find("src/routes/")?;
    let tail = &normalized[idx + "src/routes/".len()..];
    let dir = tail.strip_suffix("+page.svelte")?;
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        Some("/".to_string())
    } else {
        Some(format!("/{dir}"))
    }
}
