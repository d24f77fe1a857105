//! Query composition and result grouping
//!
//! - `builder` - declaration-order-preserving SQL composer
//! - `grouping` - folds one-row-per-child join results into nested entities

pub mod builder;
pub mod grouping;

pub use builder::{Direction, QueryArg, QueryBuilder, RenderedQuery};
pub use grouping::{fold_rows, EntityCollection, Nested};
