pub mod colors;
pub mod error;
pub mod format;
pub mod geo_utils;
pub mod region;
pub mod selection;

pub use colors::{ScoreBand, color_for_score};
pub use error::*;
pub use geo_utils::{NameIndex, QuantileFilter, build_name_index, name_of, sorted_names, top_quantile};
pub use region::*;
pub use selection::{MAX_COMPARE, SelectionState};
