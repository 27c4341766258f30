pub mod discovery;
pub mod error;
pub mod parser;
pub mod session;
pub mod stats;

pub use discovery::{discover_session_files, process_directory};
pub use error::IngestError;
pub use parser::{parse_line, parse_record};
pub use session::{assemble, parse_session_file, project_label};
pub use stats::{export_session_summaries, CorpusStats, SessionSummary};
