//! Filter engine - typed conditions combined by AND/OR groups.
//!
//! Operator availability is decided by the field's semantic type alone:
//!
//! | type | operators |
//! |---|---|
//! | string | equals, not-equals, contains, starts-with, ends-with |
//! | integer / decimal | equals, not-equals, greater-than, less-than, greater-or-equal, less-or-equal |
//! | date | equals, not-equals, greater-than, less-than, on-or-after, on-or-before |
//! | boolean | equals |
//!
//! String tests are case-sensitive. Dates compare as calendar days.

mod eval;
mod group;
mod operator;
mod value;

pub use eval::Predicate;
pub use group::{Combinator, FilterCondition, FilterGroup, FilterId, FilterNode};
pub use operator::{operators_for, FilterOperator};
pub use value::FilterValue;
