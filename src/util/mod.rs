pub mod serde;
pub mod telemetry;

pub use self::serde::{OrderingPolicy, ResourceClass};
pub use telemetry::init_tracing;
