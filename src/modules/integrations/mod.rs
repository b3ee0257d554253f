//! Remote catalogue and classification services.

pub mod catalog;
pub mod rvk;
pub mod sru;

pub use catalog::{Endpoint, EndpointCatalog, ResponseFormat};
pub use rvk::LabelResolver;
