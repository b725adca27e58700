//! The remote decision services answering the pipeline's envelopes.

pub mod approval;
pub mod extraction;
pub mod property;
pub mod reference;
pub mod server;
pub mod solvency;

pub use reference::ReferenceData;
pub use server::{router, serve, ServiceState};
