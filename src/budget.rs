//! The budget model: per-phase wall-clock caps bounding the entire run.
//!
//! Budgets are computed once, up front, from the run mode, the expectation
//! count, the project size and the framework multiplier. Each phase is capped
//! to its ceiling and floored at its minimum; the total gets a fixed buffer
//! and its own clamp. Test mode yields a fixed small budget regardless of
//! inputs so CI runs are deterministic.

use serde::{Deserialize, Serialize};

use crate::types::Framework;

/// Budget profile selected by the `mode` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Ci,
    Default,
    Test,
}

impl RunMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ci => "ci",
            Self::Default => "default",
            Self::Test => "test",
        }
    }
}

/// Resolved wall-clock budgets in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub total_max_ms: u64,
    pub learn_max_ms: u64,
    pub observe_max_ms: u64,
    pub detect_max_ms: u64,
    pub per_expectation_max_ms: u64,
    pub interaction_timeout_ms: u64,
    pub navigation_timeout_ms: u64,
}

/// Optional user overrides applied after computation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BudgetOverrides {
    pub global_timeout_ms: Option<u64>,
    pub interaction_timeout_ms: Option<u64>,
    pub navigation_timeout_ms: Option<u64>,
}

// Mode base tables. The ci profile is tight, default is loose.
struct ModeTable {
    learn_base_ms: u64,
    learn_per_file_ms: u64,
    learn_floor_ms: u64,
    learn_ceiling_ms: u64,
    observe_base_ms: u64,
    per_expectation_ms: u64,
    observe_floor_ms: u64,
    observe_ceiling_ms: u64,
    detect_base_ms: u64,
    detect_per_expectation_ms: u64,
    detect_floor_ms: u64,
    detect_ceiling_ms: u64,
    total_floor_ms: u64,
    total_ceiling_ms: u64,
}

const CI: ModeTable = ModeTable {
    learn_base_ms: 5_000,
    learn_per_file_ms: 10,
    learn_floor_ms: 3_000,
    learn_ceiling_ms: 60_000,
    observe_base_ms: 10_000,
    per_expectation_ms: 4_000,
    observe_floor_ms: 10_000,
    observe_ceiling_ms: 300_000,
    detect_base_ms: 2_000,
    detect_per_expectation_ms: 25,
    detect_floor_ms: 2_000,
    detect_ceiling_ms: 30_000,
    total_floor_ms: 30_000,
    total_ceiling_ms: 300_000,
};

const DEFAULT: ModeTable = ModeTable {
    learn_base_ms: 10_000,
    learn_per_file_ms: 20,
    learn_floor_ms: 5_000,
    learn_ceiling_ms: 120_000,
    observe_base_ms: 20_000,
    per_expectation_ms: 8_000,
    observe_floor_ms: 15_000,
    observe_ceiling_ms: 600_000,
    detect_base_ms: 5_000,
    detect_per_expectation_ms: 50,
    detect_floor_ms: 2_000,
    detect_ceiling_ms: 60_000,
    total_floor_ms: 60_000,
    total_ceiling_ms: 900_000,
};

/// Buffer added on top of the per-phase sum before the total clamp.
const TOTAL_BUFFER_MS: u64 = 30_000;

/// Fixed test-mode budget for deterministic CI.
const TEST_BUDGET: Budget = Budget {
    total_max_ms: 30_000,
    learn_max_ms: 5_000,
    observe_max_ms: 15_000,
    detect_max_ms: 5_000,
    per_expectation_max_ms: 1_000,
    interaction_timeout_ms: 500,
    navigation_timeout_ms: 1_000,
};

impl Budget {
    /// Compute budgets from run inputs, then apply overrides.
    #[must_use]
    pub fn compute(
        mode: RunMode,
        expectations_count: usize,
        project_size: usize,
        framework: Framework,
        overrides: BudgetOverrides,
    ) -> Self {
        let mut budget = match mode {
            RunMode::Test => TEST_BUDGET,
            RunMode::Ci => Self::from_table(&CI, expectations_count, project_size, framework),
            RunMode::Default => {
                Self::from_table(&DEFAULT, expectations_count, project_size, framework)
            }
        };

        if let Some(total) = overrides.global_timeout_ms {
            budget.total_max_ms = total;
        }
        if let Some(interaction) = overrides.interaction_timeout_ms {
            budget.interaction_timeout_ms = interaction;
        }
        if let Some(navigation) = overrides.navigation_timeout_ms {
            budget.navigation_timeout_ms = navigation;
        }
        budget
    }

    fn from_table(
        table: &ModeTable,
        expectations_count: usize,
        project_size: usize,
        framework: Framework,
    ) -> Self {
        let multiplier = framework.budget_multiplier();
        let scale = |base: u64, per: u64, count: usize| -> u64 {
            let raw = base + per.saturating_mul(count as u64);
            (raw as f64 * multiplier) as u64
        };

        let learn = scale(table.learn_base_ms, table.learn_per_file_ms, project_size)
            .clamp(table.learn_floor_ms, table.learn_ceiling_ms);
        let observe = scale(
            table.observe_base_ms,
            table.per_expectation_ms,
            expectations_count,
        )
        .clamp(table.observe_floor_ms, table.observe_ceiling_ms);
        let detect = scale(
            table.detect_base_ms,
            table.detect_per_expectation_ms,
            expectations_count,
        )
        .clamp(table.detect_floor_ms, table.detect_ceiling_ms);

        let total = (learn + observe + detect + TOTAL_BUFFER_MS)
            .clamp(table.total_floor_ms, table.total_ceiling_ms);

        let per_expectation = (table.per_expectation_ms as f64 * multiplier) as u64;

        Self {
            total_max_ms: total,
            learn_max_ms: learn,
            observe_max_ms: observe,
            detect_max_ms: detect,
            per_expectation_max_ms: per_expectation,
            interaction_timeout_ms: per_expectation / 2,
            navigation_timeout_ms: per_expectation,
        }
    }
}
