//! Request-to-query translation and analytics for the application tracker.
//!
//! Nothing in here touches the store: handlers turn raw query-string values
//! into a [`Predicate`], a [`SortSpec`] and a [`PageRequest`], hand them to the
//! record store, and feed grouped rows back through [`analytics`].

pub mod analytics;
pub mod dates;
pub mod error;
pub mod filter;
pub mod pagination;
pub mod predicate;
pub mod sort;

pub use dates::DateRange;
pub use error::ValidationError;
pub use filter::{FilterParams, build_predicate};
pub use pagination::{PageRequest, PaginationSummary};
pub use predicate::{Condition, Predicate, TextField};
pub use sort::{Direction, SortField, SortSpec, resolve_sort};
