use std::num::IntErrorKind;

use crate::error::ParseError;

/// How a timestamp field that is not a base-10 `i64` is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimestampPolicy {
    /// Warn and deliver anyway. The timestamp becomes `0` for a syntax error
    /// and saturates to `i64::MAX` / `i64::MIN` on overflow.
    #[default]
    Lenient,
    /// Reject the payload like a message with too few fields.
    Strict,
}

/// One `(name, value, timestamp)` sample to forward to the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricRecord {
    pub name: String,
    /// Forwarded verbatim, not required to be numeric.
    pub value: String,
    /// Unix epoch seconds.
    pub timestamp: i64,
}

impl MetricRecord {
    /// Parse a plain-text payload `<name> <value> <timestamp> [ignored...]`.
    ///
    /// Fields are split on any whitespace. Only the first three are used;
    /// trailing fields are logged and dropped.
    pub fn parse(payload: &[u8], policy: TimestampPolicy) -> Result<Self, ParseError> {
        let text = String::from_utf8_lossy(payload);
        let fields: Vec<&str> = text.split_whitespace().collect();

        let [name, value, ts, rest @ ..] = fields.as_slice() else {
            return Err(ParseError::MalformedPayload { tokens: fields.len() });
        };

        if !rest.is_empty() {
            tracing::debug!(metric = %name, extra = rest.len(), "ignoring trailing fields");
        }

        let timestamp = match ts.parse::<i64>() {
            Ok(t) => t,
            Err(source) => {
                let fallback = match source.kind() {
                    IntErrorKind::PosOverflow => i64::MAX,
                    IntErrorKind::NegOverflow => i64::MIN,
                    _ => 0,
                };
                let err = ParseError::InvalidTimestamp { token: (*ts).to_owned(), source };
                if policy == TimestampPolicy::Strict {
                    return Err(err);
                }
                tracing::warn!(
                    metric = %name,
                    error = %err,
                    fallback,
                    "could not convert timestamp"
                );
                fallback
            }
        };

        Ok(Self {
            name: (*name).to_owned(),
            value: (*value).to_owned(),
            timestamp,
        })
    }

    /// Graphite plaintext line: `"<name> <value> <timestamp>\n"`.
    pub fn to_plaintext_line(&self) -> String {
        format!("{} {} {}\n", self.name, self.value, self.timestamp)
    }
}
