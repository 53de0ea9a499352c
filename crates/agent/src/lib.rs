//! The Kabot conversation orchestrator.
//!
//! Every incoming message goes through the same cycle:
//!
//! 1. **Assemble** the memory views (facts, summary, working history)
//! 2. **Classify** the message into one [`Intent`](kabot_core::Intent)
//! 3. **Route** it to the intent's handler and collaborators
//! 4. **Remember**: append the exchange to working memory
//! 5. On `exit`, **close**: consolidate working memory into the episodic,
//!    summary and fact tiers, then clear it

pub mod classifier;
pub mod closure;
pub mod collaborators;
pub mod context;
pub mod llm;
pub mod locks;
pub mod merge;
pub mod orchestrator;
pub mod prompts;
pub mod reply;
pub mod router;
#[cfg(any(test, feature = "test-util"))]
pub mod test_helpers;

pub use classifier::{Classification, IntentClassifier};
pub use closure::{ClosureOutcome, ClosurePipeline};
pub use collaborators::{CatalogSearch, Collaborators, FarewellWriter, FinancingAdvisor, KavakInfoDesk};
pub use context::{AssembledContext, ContextAssembler};
pub use llm::LlmGateway;
pub use merge::{FactMerger, SummaryMerger};
pub use orchestrator::Orchestrator;
pub use router::{IntentRouter, TurnOutcome};
