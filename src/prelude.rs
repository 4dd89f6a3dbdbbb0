//! Commonly used types and traits.
//!
//! ```rust
//! use tool_search::prelude::*;
//! ```

pub use crate::{Result, SearchError};

pub use crate::{SearchOutcome, ToolSearchEngine, ToolSearchEngineBuilder};

pub use crate::{Candidate, PreferenceFilter, ToolRecord, ToolStore};

pub use crate::{EmbeddingGenerator, SearchStrategy, StrategyKind, StrategyRequest};

pub use crate::{CacheType, QueryType, SearchConfig, StrategyWeights};
