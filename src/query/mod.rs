//! Query construction shared by the suggester, faceted search and catalog
//! listings: prefix text expressions, filter predicates and sort orders.

pub mod filter;
pub mod text;

pub use filter::{order_by_clause, Predicate, TitleFilter};
pub use text::{tokenize, PrefixQuery};
