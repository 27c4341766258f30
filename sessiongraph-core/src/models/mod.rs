pub mod analysis;
pub mod entity;
pub mod graph;
pub mod message;
pub mod session;

pub use analysis::{AnalysisOutcome, AnalysisResult, SessionAnalysis};
pub use entity::{Entity, Relationship};
pub use graph::KnowledgeGraph;
pub use message::{Message, Role, ToolInvocation, ToolResult};
pub use session::{Session, SessionContext, SessionStats};
