//! Construction surface and the interception entry point.

mod builder;
mod intercept;

pub use builder::{Mimir, MimirBuilder};
pub use intercept::Interceptor;
