pub mod error;
pub mod queue;
pub mod record;
pub mod sink;

pub use error::{ClientError, ErrorKind, ParseError};
pub use queue::{Delivery, InboundMessage, MessageSource, QueueSubscriber};
pub use record::{MetricRecord, TimestampPolicy};
pub use sink::MetricSink;
