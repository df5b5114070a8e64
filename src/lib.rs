//! # Copydesk: Durable Workflows for AI-Assisted Editorial Pipelines
//!
//! Copydesk executes declarative content workflows: an editor assembles a
//! sequence of AI-backed actions (grammar review, SEO optimization, social
//! copy, approval gates), and the engine runs them durably against a content
//! store, suspending for human approval and cancelling cleanly when the
//! suggestions are rejected.
//!
//! ## Core Concepts
//!
//! - **Actions**: The closed catalogue of executable kinds ([`types::ActionKind`]),
//!   each bound to one handler at compile time
//! - **Workflows**: Declarative definitions of actions plus edges
//!   ([`workflow::WorkflowDefinition`]); actions execute in declared order,
//!   edges only decide which step is final before the approval gate
//! - **Working copy**: The text each action operates on, threaded between
//!   actions as intermediate-revision events and staged as a pending revision
//!   awaiting approval
//! - **Steps**: Named, memoized units of work ([`steps::StepLog`]) so a
//!   replayed run never repeats a completed AI call or write
//! - **Events**: Lifecycle triggers and coordination signals
//!   ([`events::WorkflowEvent`]) correlated by content id
//!
//! ## Quick Start
//!
//! ### Declaring a workflow
//!
//! ```
//! use copydesk::types::{ActionKind, EventName};
//! use copydesk::workflow::WorkflowDefinition;
//!
//! let workflow = WorkflowDefinition::linear(
//!     "wf-1",
//!     EventName::ContentUpdated,
//!     &[
//!         ActionKind::GrammarReview,
//!         ActionKind::SeoOptimization,
//!         ActionKind::WaitForApproval,
//!     ],
//! );
//!
//! // grammar_review -> seo_optimization -> wait_for_approval: the SEO pass is
//! // the final step, so its output is staged for approval.
//! let compiled = workflow.compile();
//! assert!(!compiled.is_final_step(ActionKind::GrammarReview.as_str()));
//! assert!(compiled.is_final_step(ActionKind::SeoOptimization.as_str()));
//! ```
//!
//! ### Running the engine
//!
//! ```no_run
//! use std::sync::Arc;
//! use copydesk::completions::OpenAiClient;
//! use copydesk::engine::Engine;
//! use copydesk::store::MemoryStore;
//!
//! # async fn run() -> miette::Result<()> {
//! let store = Arc::new(MemoryStore::default());
//! let completions = Arc::new(OpenAiClient::from_env()?);
//! let engine = Engine::new(store, completions);
//!
//! // Stage the draft and start the review workflow.
//! let event = engine.send_to_review("42", None).await?;
//! let report = engine.run(event).await?;
//! println!("run {} finished: {:?}", report.run_id, report.status);
//! # Ok(())
//! # }
//! ```
//!
//! Approval and rejection arrive out of band (from an HTTP handler, a CLI,
//! anywhere) through [`engine::Engine::approve`] and
//! [`engine::Engine::reject`]; a run suspended at `wait_for_approval` resumes
//! or cancels accordingly.

pub mod actions;
pub mod completions;
pub mod content;
pub mod engine;
pub mod events;
pub mod notify;
pub mod registry;
pub mod steps;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod workflow;
