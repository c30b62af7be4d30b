pub mod metrics;
pub mod endpoints;
pub mod middleware;

pub use metrics::*;
pub use endpoints::*;
pub use middleware::*;
