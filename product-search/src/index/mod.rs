//! In-process indexes rebuilt from the event stream.
//!
//! - [`PrefixIndex`]: autocomplete over product names
//! - [`PriceIndex`]: price range filtering

mod price_index;
mod prefix_index;

pub use price_index::PriceIndex;
pub use prefix_index::PrefixIndex;
