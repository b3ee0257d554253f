//! Domain layer - Pure business abstractions
//!
//! Record types, error taxonomy and the traits the infrastructure layer
//! implements. No HTTP or storage code lives here.

pub mod errors;
pub mod record;
pub mod repositories;

pub use errors::{
    ExportError, FailureKind, FetchError, ImportError, LookupError, ParseError, PipelineError,
};
pub use record::*;
pub use repositories::*;
