//! Cached parameters with expiry and automatic refresh.
//!
//! A [`Parameter`] remembers when its value was fetched and, once that value
//! is older than its expiry, either refuses to serve it or fetches a new one
//! through its [`Refresher`].

mod cached;
mod refresh;
mod value;

pub use cached::{Freshness, Parameter, ParameterOptions};
pub use refresh::{FnRefresher, Refresher};
pub use value::Value;
