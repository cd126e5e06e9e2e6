use std::future::Future;
use std::pin::Pin;

use crate::error::ClientError;
use crate::record::MetricRecord;

/// Metrics time-series sink.
///
/// Any `Err` is a delivery failure. Implementations do not retry.
pub trait MetricSink: Send + Sync {
    fn send<'a>(
        &'a self,
        record: &'a MetricRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + 'a>>;
}
