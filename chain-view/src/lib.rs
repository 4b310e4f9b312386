pub mod analysis;
pub mod analytics;
pub mod chain;
pub mod config;
pub mod data;
pub mod export;
pub mod metrics;
pub mod pipeline;
pub mod query;
pub mod session;

// Re-export commonly used types
pub use analysis::{clean_markdown, AnalysisRequest, AnalysisRow};
pub use analytics::{project, Analytics, ProjectionLimits};
pub use chain::{organize, organize_detailed, PairingSummary};
pub use config::{ChainConfig, ConfigError};
pub use data::{
    normalize, normalize_all, JsonFileSource, OptionRecord, OptionType, RawRecord, RecordSource,
    SourceError, UnderlyingQuote,
};
pub use export::{to_csv, BulkExport, ExportError, ViewExport};
pub use metrics::{aggregate, Statistics};
pub use pipeline::{derive, DerivedView, ViewState};
pub use query::{filter, sort, FilterSpec, ParseSortFieldError, SortDirection, SortField, SortSpec};
pub use session::{Tab, TabId, Workspace};
