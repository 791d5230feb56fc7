//! Store extraction: Redux dispatches and Zustand setters with literal
//! action/key names.

use once_cell::sync::Lazy;
use regex::Regex;

use super::extract::{Extraction, Extractor, build_expectation, line_col};
use crate::types::{ExpectationKind, PromiseKind};

static DISPATCH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"dispatch\(\s*(\w+)\s*\(").expect("static pattern"));
static DISPATCH_DYNAMIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"dispatch\(\s*[^\w\s]").expect("static pattern"));
static ZUSTAND_SET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"set\(\s*\(?\s*state\s*\)?\s*=>\s*\(\{\s*(\w+)\s*:").expect("static pattern")
});

const CONFIDENCE_STORE: f64 = 0.7;

pub struct StoreExtractor;

impl Extractor for StoreExtractor {
    fn name(&self) -> &'static str {
        "stores"
    }

    fn supports(&self, ext: &str) -> bool {
        matches!(ext, "js" | "jsx" | "ts" | "tsx")
    }

    fn extract(&self, source: &str, file: &str) -> Extraction {
        let mut out = Extraction::default();

        for caps in DISPATCH.captures_iter(source) {
            let m = caps.get(0).expect("match exists");
            let action = &caps[1];
            let (line, column) = line_col(source, m.start());
            out.expectations.push(build_expectation(
                ExpectationKind::State,
                PromiseKind::StateChange,
                action,
                file,
                line,
                column,
                "redux-dispatch",
                CONFIDENCE_STORE,
            ));
        }
        for _ in DISPATCH_DYNAMIC.find_iter(source) {
            out.skipped.dynamic += 1;
        }

        for caps in ZUSTAND_SET.captures_iter(source) {
            let m = caps.get(0).expect("match exists");
            let key = &caps[1];
            let (line, column) = line_col(source, m.start());
            out.expectations.push(build_expectation(
                ExpectationKind::State,
                PromiseKind::StateChange,
                key,
                file,
                line,
                column,
                "zustand-set",
                CONFIDENCE_STORE,
            ));
        }

        out
    }
}
