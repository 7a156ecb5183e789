//! The three pipeline stages.
//!
//! Analysis and Planning come in rule-based and model-assisted variants
//! behind the [`Scout`] and [`Strategist`] traits; the variant is chosen when
//! the pipeline is built. Execution has a single rules-backed implementation
//! behind [`MoveExecutor`].

mod executor;
mod prompt;
mod scout;
mod strategist;

pub use executor::{Executor, MoveExecutor};
pub use prompt::extract_json;
pub use scout::{ModelAssistedScout, RuleBasedScout, Scout, rule_based_analysis};
pub use strategist::{
    ModelAssistedStrategist, RuleBasedStrategist, Strategist, assess_risk, rank_candidates,
    rule_based_strategy,
};
