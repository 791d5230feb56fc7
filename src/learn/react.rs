//! React/JSX extraction: router links, route declarations, imperative
//! navigation, UI-bound state, and literal fetch targets.

use once_cell::sync::Lazy;
use regex::Regex;

use super::extract::{
    Extraction, Extractor, ValueClass, build_expectation, classify_value, count_skip, line_col,
};
use crate::types::{ExpectationKind, PromiseKind};

static LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<Link\b[^>]*?\b(?:to|href)\s*=\s*["']([^"']*)["']"#).expect("static pattern")
});
static LINK_DYNAMIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<Link\b[^>]*?\b(?:to|href)\s*=\s*\{").expect("static pattern"));
static ROUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<Route\b[^>]*?\bpath\s*=\s*["']([^"']*)["']"#).expect("static pattern")
});
static ROUTER_PUSH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:router|navigate|history)\.push\(\s*["']([^"']*)["']\s*[,)]"#)
        .expect("static pattern")
});
static ROUTER_PUSH_DYNAMIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:router|navigate|history)\.push\(\s*[^\s"')]"#).expect("static pattern")
});
static USE_STATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"const\s*\[\s*(\w+)\s*,\s*(set[A-Z]\w*)\s*\]\s*=\s*useState")
        .expect("static pattern")
});
static FETCH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"fetch\(\s*["']([^"']*)["']"#).expect("static pattern"));
static CLICK_BUTTON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<button\b[^>]*\bonClick\s*=\s*\{[^>]*>").expect("static pattern"));
static ID_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\bid\s*=\s*["']([^"']+)["']"#).expect("static pattern"));

const CONFIDENCE_LINK: f64 = 0.9;
const CONFIDENCE_CLICK: f64 = 0.8;
const CONFIDENCE_ROUTE: f64 = 0.9;
const CONFIDENCE_PUSH: f64 = 0.85;
const CONFIDENCE_STATE: f64 = 0.7;
const CONFIDENCE_FETCH: f64 = 0.75;

pub struct ReactExtractor;

impl Extractor for ReactExtractor {
    fn name(&self) -> &'static str {
        "react"
    }

    fn supports(&self, ext: &str) -> bool {
        matches!(ext, "js" | "jsx" | "ts" | "tsx")
    }

    fn extract(&self, source: &str, file: &str) -> Extraction {
        let mut out = Extraction::default();

        for caps in LINK.captures_iter(source) {
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
                "jsx-link",
                CONFIDENCE_LINK,
            ));
        }
        for _ in LINK_DYNAMIC.find_iter(source) {
            out.skipped.dynamic += 1;
        }

        for caps in ROUTE.captures_iter(source) {
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
                "jsx-route-path",
                CONFIDENCE_ROUTE,
            ));
        }

        for caps in ROUTER_PUSH.captures_iter(source) {
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
                "router-push",
                CONFIDENCE_PUSH,
            ));
        }
        // Pushes whose argument is not a string literal at all.
        out.skipped.dynamic += ROUTER_PUSH_DYNAMIC.find_iter(source).count() as u32;

        // useState identifiers count only when UI-bound: the identifier is
        // rendered in JSX and its setter is actually called.
        for caps in USE_STATE.captures_iter(source) {
            let m = caps.get(0).expect("match exists");
            let name = &caps[1];
            let setter = &caps[2];
            let rendered = source.contains(&format!("{{{name}}}"))
                || source.contains(&format!("{{{name}."))
                || source.contains(&format!("{{ {name} }}"));
            let mutated = source.contains(&format!("{setter}("));
            if !(rendered && mutated) {
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
                "use-state-binding",
                CONFIDENCE_STATE,
            ));
        }

        for m in CLICK_BUTTON.find_iter(source) {
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
                "jsx-click-handler",
                CONFIDENCE_CLICK,
            ));
        }

        for caps in FETCH.captures_iter(source) {
            let m = caps.get(0).expect("match exists");
            let value = &caps[1];
            let class = classify_value(value);
            if class != ValueClass::Literal {
                count_skip(&mut out.skipped, class);
                continue;
            }
            let (line, column) = line_col(source, m.start());
            out.expectations.push(build_expectation(
                ExpectationKind::Network,
                PromiseKind::NetworkAction,
                value,
                file,
                line,
                column,
                "fetch-literal",
                CONFIDENCE_FETCH,
            ));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_link_to_and_href() {
        let src = r#"
export function Nav() {
  return (<nav>
    <Link to="/home">Home</Link>
    <Link href="/docs">Docs</Link>
  </nav>);
}
"#;
        let out = ReactExtractor.extract(src, "src/Nav.jsx");
        assert_eq!(out.expectations.len(), 2);
        assert_eq!(out.expectations[0].promise.value, "/home");
        assert_eq!(out.expectations[1].promise.value, "/docs");
        assert_eq!(out.expectations[0].source.pattern, "jsx-link");
    }

    #[test]
    fn dynamic_link_expression_counts_dynamic() {
        let src = r#"<Link to={target}>Go</Link>"#;
        let out = ReactExtractor.extract(src, "src/Nav.jsx");
        assert!(out.expectations.is_empty());
        assert_eq!(out.skipped.dynamic, 1);
    }

    #[test]
    fn route_path_with_param_is_emitted_literal() {
        let src = r#"<Route path="/user/:id" element={<User />} />"#;
        let out = ReactExtractor.extract(src, "src/App.jsx");
        assert_eq!(out.expectations.len(), 1);
        assert_eq!(out.expectations[0].promise.value, "/user/:id");
    }

    #[test]
    fn router_push_literal_and_dynamic() {
        let src = r#"
function go(router, id) {
  router.push("/checkout");
  router.push(`/user/${id}`);
}
"#;
        let out = ReactExtractor.extract(src, "src/go.ts");
        assert_eq!(out.expectations.len(), 1);
        assert_eq!(out.expectations[0].promise.value, "/checkout");
        assert_eq!(out.skipped.dynamic, 1);
    }

    #[test]
    fn ui_bound_state_becomes_state_promise() {
        let src = r#"
function Counter() {
  const [count, setCount] = useState(0);
  return <button onClick={() => setCount(count + 1)}>{count}</button>;
}
"#;
        let out = ReactExtractor.extract(src, "src/Counter.jsx");
        let state: Vec<_> = out
            .expectations
            .iter()
            .filter(|e| e.kind == ExpectationKind::State)
            .collect();
        assert_eq!(state.len(), 1);
        assert_eq!(state[0].promise.value, "count");
        assert_eq!(state[0].promise.kind, PromiseKind::StateChange);
    }

    #[test]
    fn unrendered_state_is_skipped() {
        let src = r#"
function Hidden() {
  const [flag, setFlag] = useState(false);
  setFlag(true);
  return <div>static</div>;
}
"#;
        let out = ReactExtractor.extract(src, "src/Hidden.jsx");
        assert!(
            out.expectations
                .iter()
                .all(|e| e.kind != ExpectationKind::State)
        );
        assert_eq!(out.skipped.other, 1);
    }

    #[test]
    fn fetch_literal_is_network_promise() {
        let src = r#"
async function submit(data) {
  await fetch("/api/orders", { method: "POST", body: data });
}
"#;
        let out = ReactExtractor.extract(src, "src/api.ts");
        assert_eq!(out.expectations.len(), 1);
        assert_eq!(out.expectations[0].kind, ExpectationKind::Network);
        assert_eq!(out.expectations[0].promise.value, "/api/orders");
    }

    #[test]
    fn external_fetch_counts_external() {
        let src = r#"fetch("https://api.example.com/v1")"#;
        let out = ReactExtractor.extract(src, "src/api.ts");
        assert!(out.expectations.is_empty());
        assert_eq!(out.skipped.external, 1);
    }
}
