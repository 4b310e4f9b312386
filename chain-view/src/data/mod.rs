pub mod normalize;
pub mod source;
pub mod types;

pub use normalize::{normalize, normalize_all, normalize_quote, RawRecord};
pub use source::{
    created_on, expiring_within, matches_underlying, symbol_code, JsonFileSource, RecordSource,
    SourceError,
};
pub use types::{OptionRecord, OptionType, UnderlyingQuote};
