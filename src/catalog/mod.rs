//! Tool metadata, preference filters and the store they are loaded from.

mod candidate;
mod preferences;
mod record;
mod store;

pub use candidate::Candidate;
pub(crate) use candidate::sort_by_score;
pub use preferences::{BudgetTier, PreferenceFilter};
pub use record::{PricingTier, ToolRecord};
pub use store::{InMemoryToolStore, ToolStore};
