pub mod backend;
pub mod batch;
pub mod orchestrator;
pub mod response;
