// src/extractors/mod.rs
pub mod heading;
pub mod section;

// Re-export key extraction types for convenience
#[allow(unused_imports)]
pub use heading::{find_heading, HeadingMatch, MatchQuality};
#[allow(unused_imports)]
pub use section::{extract_span, ExtractorConfig, SectionExtractor};
