//! Generation module - Unified request schema, use case selection and forwarding

pub mod request;
pub mod service;
pub mod use_case;

pub use request::UnifiedGenerationRequest;
pub use service::{build_upstream_request, timeout_for, GenerationResult, GenerationService};
pub use use_case::UseCase;
