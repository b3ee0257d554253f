//! Feature modules: catalogue integrations, cataloguing rules and the
//! tabular input/output of a batch.

pub mod cataloguing_pro;
pub mod export;
pub mod import;
pub mod integrations;
