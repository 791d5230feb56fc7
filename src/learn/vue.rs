//! Vue SFC extraction: template-bound reactive state.
//!
//! A `ref(...)` or `reactive({...})` identifier becomes a state promise only
//! when the template reads it, mirroring the UI-bound rule for React state.

use once_cell::sync::Lazy;
use regex::Regex;

use super::extract::{Extraction, Extractor, build_expectation, line_col};
use crate::types::{ExpectationKind, PromiseKind};

static REF_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:const|let)\s+(\w+)\s*=\s*(ref|reactive)\s*\(").expect("static pattern")
});
static TEMPLATE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<template>(.*)</template>").expect("static pattern"));

const CONFIDENCE_STATE: f64 = 0.7;

pub struct VueExtractor;

impl Extractor for VueExtractor {
    fn name(&self) -> &'static str {
        "vue"
    }

    fn supports(&self, ext: &str) -> bool {
        ext == "vue"
    }

    fn extract(&self, source: &str, file: &str) -> Extraction {
        let mut out = Extraction::default();

        let template = TEMPLATE_BLOCK
            .captures(source)
            .map(|caps| caps[1].to_string())
            .unwrap_or_default();

        for caps in REF_DECL.captures_iter(source) {
            let m = caps.get(0).expect("match exists");
            let name = &caps[1];

            let read_by_template = template.contains(&format!("{{{{ {name}"))
                || template.contains(&format!("{{{{{name}"))
                || template.contains(&format!("\"{name}\""))
                || template.contains(&format!("v-model=\"{name}"));
            let mutated = source.contains(&format!("{name}.value"))
                || source.contains(&format!("{name}."))
                || source.contains(&format!("{name} ="));

            if !(read_by_template && mutated) {
                out.skipped.other += 1;
                continue;
            }

            let (line, column) = line_col(source, m.start());
            out.expectations.push(build_expectation(
                ExpectationKind::State,
                PromiseKind::StateChange,
                name,
                file,
                line,
                column,
                "vue-reactive-binding",
                CONFIDENCE_STATE,
            ));
        }

        out
    }
}
