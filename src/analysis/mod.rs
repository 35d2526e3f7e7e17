pub mod analyzer;
pub mod dates;
pub mod extract;
pub mod prompts;
pub mod sanitize;

pub use analyzer::{AnalyzerSettings, FilingAnalyzer};
pub use extract::FilingExtractor;
