// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Telemetry recording.

use std::{sync::Arc, time::Duration};

#[cfg(any(feature = "metrics", test))]
use opentelemetry::{
    KeyValue,
    metrics::{Counter, Histogram, Meter},
};
use tracing::Level;

#[cfg(any(feature = "metrics", test))]
use crate::telemetry::{
    attributes,
    metrics::{create_event_counter, create_operation_duration_histogram},
};
use crate::telemetry::{QueryActivity, QueryOperation};

#[derive(Debug, Default)]
struct QueryTelemetryInner {
    logging_enabled: bool,
    #[cfg(any(feature = "metrics", test))]
    event_counter: Option<Counter<u64>>,
    #[cfg(any(feature = "metrics", test))]
    operation_duration: Option<Histogram<f64>>,
}

/// Records query cache activity as logs and metrics.
///
/// A default instance records nothing.
#[derive(Clone, Debug, Default)]
pub(crate) struct QueryTelemetry {
    inner: Arc<QueryTelemetryInner>,
}

impl QueryTelemetry {
    pub(crate) fn new(logging_enabled: bool) -> Self {
        Self {
            inner: Arc::new(QueryTelemetryInner {
                logging_enabled,
                ..QueryTelemetryInner::default()
            }),
        }
    }

    #[cfg(any(feature = "metrics", test))]
    pub(crate) fn with_meter(logging_enabled: bool, meter: &Meter) -> Self {
        Self {
            inner: Arc::new(QueryTelemetryInner {
                logging_enabled,
                event_counter: Some(create_event_counter(meter)),
                operation_duration: Some(create_operation_duration_histogram(meter)),
            }),
        }
    }

    pub(crate) fn logging_enabled(&self) -> bool {
        self.inner.logging_enabled
    }

    /// Records one operation outcome.
    pub(crate) fn record(&self, cache_name: &'static str, operation: QueryOperation, activity: QueryActivity, duration: Option<Duration>) {
        #[cfg(any(feature = "metrics", test))]
        {
            let attrs = [
                KeyValue::new(attributes::CACHE_NAME, cache_name),
                KeyValue::new(attributes::CACHE_OPERATION_NAME, operation.as_str()),
                KeyValue::new(attributes::CACHE_ACTIVITY_NAME, activity.as_str()),
            ];

            if let Some(c) = &self.inner.event_counter {
                c.add(1, &attrs);
            }

            if let (Some(d), Some(h)) = (duration, &self.inner.operation_duration) {
                h.record(d.as_secs_f64(), &attrs);
            }
        }

        if self.inner.logging_enabled {
            Self::emit(cache_name, operation, activity, duration);
        }
    }

    fn emit(cache_name: &'static str, operation: QueryOperation, activity: QueryActivity, duration: Option<Duration>) {
        let op = operation.as_str();
        let ev = activity.as_str();
        let duration_ns = duration.map(|d| d.as_nanos());

        // Tracing levels must be constant. Field names match attributes.rs.
        macro_rules! emit_event {
            ($level:ident) => {
                tracing::$level!(
                    cache.name = cache_name,
                    cache.operation = op,
                    cache.activity = ev,
                    cache.duration_ns = ?duration_ns,
                    "cache.event"
                )
            };
        }

        let level = activity.severity();
        if level == Level::ERROR {
            emit_event!(error);
        } else if level == Level::INFO {
            emit_event!(info);
        } else {
            emit_event!(debug);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use opentelemetry::metrics::MeterProvider;

    use crate::telemetry::testing::{LogCapture, MetricTester};

    #[test]
    fn metrics_record_emits_correct_attributes() {
        let tester = MetricTester::new();
        let meter = tester.meter_provider().meter("doccache");
        let telemetry = QueryTelemetry::with_meter(false, &meter);

        telemetry.record("users", QueryOperation::Lookup, QueryActivity::Hit, Some(Duration::from_millis(5)));

        tester.assert_attributes_contain(&[
            KeyValue::new(attributes::CACHE_NAME, "users"),
            KeyValue::new(attributes::CACHE_OPERATION_NAME, QueryOperation::Lookup.as_str()),
            KeyValue::new(attributes::CACHE_ACTIVITY_NAME, QueryActivity::Hit.as_str()),
        ]);
    }

    #[test]
    fn logs_emit_contains_all_fields_and_values() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        QueryTelemetry::emit("orders", QueryOperation::Store, QueryActivity::Error, Some(Duration::from_nanos(12345)));

        capture.assert_contains(attributes::CACHE_NAME);
        capture.assert_contains(attributes::CACHE_OPERATION_NAME);
        capture.assert_contains(attributes::CACHE_ACTIVITY_NAME);
        capture.assert_contains(attributes::CACHE_DURATION_NAME);
        capture.assert_contains(attributes::CACHE_EVENT_NAME);

        capture.assert_contains("orders");
        capture.assert_contains(QueryOperation::Store.as_str());
        capture.assert_contains(QueryActivity::Error.as_str());
    }

    #[test]
    fn logs_emit_at_activity_severity() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        QueryTelemetry::emit("cache", QueryOperation::Execute, QueryActivity::Error, None);
        capture.assert_contains("ERROR");

        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        QueryTelemetry::emit("cache", QueryOperation::Store, QueryActivity::Stored, None);
        capture.assert_contains("INFO");

        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        QueryTelemetry::emit("cache", QueryOperation::Lookup, QueryActivity::Miss, None);
        capture.assert_contains("DEBUG");
    }

    #[test]
    fn disabled_telemetry_emits_nothing() {
        let telemetry = QueryTelemetry::default();
        assert!(!telemetry.logging_enabled());

        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        telemetry.record("cache", QueryOperation::Lookup, QueryActivity::Hit, Some(Duration::from_secs(1)));

        assert!(capture.output().is_empty());
    }

    #[test]
    fn enabled_logging_emits_records() {
        let telemetry = QueryTelemetry::new(true);

        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        telemetry.record("cache", QueryOperation::Clear, QueryActivity::Cleared, None);

        capture.assert_contains("cache.cleared");
    }
}
