//! Framework detection and framework-aware scan-root resolution.
//!
//! A user-provided override always wins. Otherwise the detected framework
//! selects its conventional roots; when several plausible roots exist at the
//! top level and nothing was configured, resolution fails with an actionable
//! ambiguity error listing the candidates — it never guesses.

use camino::{Utf8Path, Utf8PathBuf};

use crate::config::RunConfig;
use crate::error::LearnError;
use crate::types::{Framework, Router};

/// Directory names always excluded from scanning, regardless of root.
pub const HARD_EXCLUSIONS: [&str; 10] = [
    "node_modules",
    "dist",
    "build",
    ".next",
    ".git",
    ".verax",
    "coverage",
    ".cache",
    ".venv",
    "__pycache__",
];

/// Detected project shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub framework: Framework,
    pub router: Router,
}

/// Detect the framework from marker files, unless a hint pins it.
#[must_use]
pub fn detect_framework(root: &Utf8Path, hint: Option<Framework>) -> Detection {
    if let Some(framework) = hint {
        let router = match framework {
            Framework::Nextjs => {
                if root.join("app").is_dir() {
                    Router::App
                } else {
                    Router::Pages
                }
            }
            Framework::Svelte => Router::Filesystem,
            Framework::React | Framework::Vue | Framework::Remix => Router::Spa,
            Framework::Static | Framework::Unknown => Router::None,
        };
        return Detection { framework, router };
    }

    let has = |name: &str| root.join(name).exists();

    if has("next.config.js") || has("next.config.mjs") || has("next.config.ts") {
        let app = root.join("app").is_dir();
        let pages = root.join("pages").is_dir();
        let router = match (app, pages) {
            (true, _) => Router::App,
            (false, true) => Router::Pages,
            (false, false) => Router::Pages,
        };
        return Detection {
            framework: Framework::Nextjs,
            router,
        };
    }

    if has("svelte.config.js") || root.join("src/routes").is_dir() {
        return Detection {
            framework: Framework::Svelte,
            router: Router::Filesystem,
        };
    }

    if root.join("src/App.vue").is_file() || root.join("src/main.vue").is_file() {
        return Detection {
            framework: Framework::Vue,
            router: Router::Spa,
        };
    }

    let src = root.join("src");
    if src.is_dir() {
        let has_jsx = ["App.jsx", "App.tsx", "index.jsx", "index.tsx", "main.jsx", "main.tsx"]
            .iter()
            .any(|f| src.join(f).is_file());
        if has_jsx {
            return Detection {
                framework: Framework::React,
                router: Router::Spa,
            };
        }
    }

    if root.join("index.html").is_file() || root.join("public").is_dir() {
        return Detection {
            framework: Framework::Static,
            router: Router::None,
        };
    }

    Detection {
        framework: Framework::Unknown,
        router: Router::None,
    }
}

/// Resolve the directories Learn will walk.
pub fn resolve_scan_roots(
    root: &Utf8Path,
    detection: Detection,
    config: &RunConfig,
) -> Result<Vec<Utf8PathBuf>, LearnError> {
    if let Some(override_root) = &config.scan_root_override {
        let resolved = if override_root.is_absolute() {
            override_root.clone()
        } else {
            root.join(override_root)
        };
        return Ok(vec![resolved]);
    }

    let existing = |names: &[&str]| -> Vec<Utf8PathBuf> {
        names
            .iter()
            .map(|n| root.join(n))
            .filter(|p| p.is_dir())
            .collect()
    };

    match detection.framework {
        Framework::Nextjs | Framework::Remix => {
            let roots = existing(&["app", "pages"]);
            if roots.is_empty() {
                return Err(LearnError::UnknownScanRoot {
                    framework: detection.framework.as_str().to_string(),
                });
            }
            Ok(roots)
        }
        Framework::React | Framework::Vue | Framework::Svelte => {
            let roots = existing(&["src"]);
            if roots.is_empty() {
                return Err(LearnError::UnknownScanRoot {
                    framework: detection.framework.as_str().to_string(),
                });
            }
            Ok(roots)
        }
        Framework::Static => {
            let public = root.join("public");
            if public.is_dir() {
                Ok(vec![public])
            } else {
                // Flat static sites scan from the project root itself.
                Ok(vec![root.to_path_buf()])
            }
        }
        Framework::Unknown => {
            let candidates: Vec<String> = ["app", "pages", "src", "public"]
                .iter()
                .filter(|n| root.join(n).is_dir())
                .map(|n| (*n).to_string())
                .collect();
            match candidates.len() {
                0 if config.allow_empty_learn => Ok(Vec::new()),
                0 => Err(LearnError::UnknownScanRoot {
                    framework: "unknown".to_string(),
                }),
                1 => Ok(vec![root.join(&candidates[0])]),
                _ => Err(LearnError::AmbiguousScanRoots { candidates }),
            }
        }
    }
}
