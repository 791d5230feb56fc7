//! Static HTML extraction: anchors, forms, required inputs.

use once_cell::sync::Lazy;
use regex::Regex;

use super::extract::{
    Extraction, Extractor, ValueClass, build_expectation, classify_value, count_skip, line_col,
};
use crate::types::{ExpectationKind, PromiseKind};

static ANCHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<a\b[^>]*?\bhref\s*=\s*["']([^"']*)["']"#).expect("static pattern"));
static FORM_ACTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<form\b[^>]*?\baction\s*=\s*["']([^"']*)["']"#).expect("static pattern")
});
static REQUIRED_INPUT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<(?:input|select|textarea)\b[^>]*?\brequired\b[^>]*?>"#).expect("static pattern")
});
static NAME_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\bname\s*=\s*["']([^"']+)["']"#).expect("static pattern"));
static CLICK_BUTTON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<button\b[^>]*\bonclick\s*=[^>]*>"#).expect("static pattern"));
static ID_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\bid\s*=\s*["']([^"']+)["']"#).expect("static pattern"));

const CONFIDENCE_ANCHOR: f64 = 0.9;
const CONFIDENCE_FORM: f64 = 0.85;
const CONFIDENCE_CLICK: f64 = 0.8;
const CONFIDENCE_VALIDATION: f64 = 0.6;

pub struct HtmlExtractor;

impl Extractor for HtmlExtractor {
    fn name(&self) -> &'static str {
        "html"
    }

    fn supports(&self, ext: &str) -> bool {
        matches!(ext, "html" | "htm")
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
                "html-anchor",
                CONFIDENCE_ANCHOR,
            ));
        }

        for caps in FORM_ACTION.captures_iter(source) {
            let m = caps.get(0).expect("match exists");
            let value = &caps[1];
            let class = classify_value(value);
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
                "html-form-action",
                CONFIDENCE_FORM,
            ));
        }

        for m in CLICK_BUTTON.find_iter(source) {
            // Click promises need an addressable element; the id becomes
            // the selector the observer resolves.
            let Some(id) = ID_ATTR.captures(m.as_str()).map(|caps| caps[1].to_string()) else {
                out.skipped.computed += 1;
                continue;
            };
            let (line, column) = line_col(source, m.start());
            out.expectations.push(build_expectation(
                ExpectationKind::Interaction,
                PromiseKind::Click,
                &format!("#{id}"),
                file,
                line,
                column,
                "html-click-handler",
                CONFIDENCE_CLICK,
            ));
        }

        for m in REQUIRED_INPUT.find_iter(source) {
            // Required controls promise inline validation feedback; the
            // control needs a name to be addressable.
            let Some(name) = NAME_ATTR
                .captures(m.as_str())
                .map(|caps| caps[1].to_string())
            else {
                out.skipped.other += 1;
                continue;
            };
            let (line, column) = line_col(source, m.start());
            out.expectations.push(build_expectation(
                ExpectationKind::Validation,
                PromiseKind::Validation,
                &name,
                file,
                line,
                column,
                "html-required-input",
                CONFIDENCE_VALIDATION,
            ));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_literal_anchors() {
        let html = r#"<html><body>
<a href="/about">About</a>
<a href="/contact" class="x">Contact</a>
</body></html>"#;
        let out = HtmlExtractor.extract(html, "index.html");
        assert_eq!(out.expectations.len(), 2);
        assert_eq!(out.expectations[0].promise.value, "/about");
        assert_eq!(out.expectations[0].kind, ExpectationKind::Navigation);
        assert_eq!(out.expectations[0].source.line, 2);
        assert_eq!(out.skipped.total(), 0);
    }

    #[test]
    fn skips_external_and_fragment_anchors() {
        let html = r##"<a href="https://example.com">Ext</a><a href="#top">Top</a>"##;
        let out = HtmlExtractor.extract(html, "index.html");
        assert!(out.expectations.is_empty());
        assert_eq!(out.skipped.external, 1);
        assert_eq!(out.skipped.other, 1);
    }

    #[test]
    fn extracts_form_actions_as_submit_promises() {
        let html = r#"<form action="/api/subscribe" method="post"><input name="email"></form>"#;
        let out = HtmlExtractor.extract(html, "index.html");
        assert_eq!(out.expectations.len(), 1);
        assert_eq!(out.expectations[0].kind, ExpectationKind::Form);
        assert_eq!(out.expectations[0].promise.kind, PromiseKind::Submit);
        assert_eq!(out.expectations[0].promise.value, "/api/subscribe");
    }

    #[test]
    fn required_inputs_become_validation_promises() {
        let html = r#"<form action="/go"><input name="email" required></form>"#;
        let out = HtmlExtractor.extract(html, "signup.html");
        let validation: Vec<_> = out
            .expectations
            .iter()
            .filter(|e| e.kind == ExpectationKind::Validation)
            .collect();
        assert_eq!(validation.len(), 1);
        assert_eq!(validation[0].promise.value, "email");
    }

    #[test]
    fn required_input_without_name_counts_other() {
        let html = r#"<input type="text" required>"#;
        let out = HtmlExtractor.extract(html, "a.html");
        assert!(out.expectations.is_empty());
        assert_eq!(out.skipped.other, 1);
    }

    #[test]
    fn click_handler_with_id_becomes_click_promise() {
        let html = r#"<button id="save" onclick="save()">Save</button>"#;
        let out = HtmlExtractor.extract(html, "index.html");
        assert_eq!(out.expectations.len(), 1);
        assert_eq!(out.expectations[0].kind, ExpectationKind::Interaction);
        assert_eq!(out.expectations[0].promise.kind, PromiseKind::Click);
        assert_eq!(out.expectations[0].promise.value, "#save");
    }

    #[test]
    fn click_handler_without_id_counts_computed() {
        let html = r#"<button onclick="save()">Save</button>"#;
        let out = HtmlExtractor.extract(html, "index.html");
        assert!(out.expectations.is_empty());
        assert_eq!(out.skipped.computed, 1);
    }

    #[test]
    fn dynamic_route_hrefs_are_still_literal() {
        // Dynamic-entity routes are literal text; observe/detect classify
        // them out of scope, not learn.
        let html = r#"<a href="/user/[id]">Profile</a>"#;
        let out = HtmlExtractor.extract(html, "index.html");
        assert_eq!(out.expectations.len(), 1);
        assert_eq!(out.expectations[0].promise.value, "/user/[id]");
    }
}
