//! Business logic services.

pub mod objectives;
pub mod optimizer;

pub use objectives::ObjectiveRules;
pub use optimizer::PromptOptimizer;
