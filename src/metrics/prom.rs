use crate::endpoint;
use crate::expiry::{self, HOURS_PER_DAY};
use crate::report::{Report, Success};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use prometheus::proto::MetricFamily;
use prometheus::{labels, register_gauge_with_registry, Gauge, Registry};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, warn};

const JOB: &str = "lscerts";

// Expiry gauges and the failure gauge are pushed to different groups, so
// each lives in its own registry.
lazy_static! {
    static ref EXPIRY_REGISTRY: Registry = Registry::new();
    static ref FAILURE_REGISTRY: Registry = Registry::new();
    static ref LSCERTS_DAYS_TO_EXPIRY: Gauge = register_gauge_with_registry!(
        "lscerts_days_to_expiry",
        "days before expiration",
        EXPIRY_REGISTRY
    )
    .unwrap();
    static ref LSCERTS_HOURS_TO_EXPIRY: Gauge = register_gauge_with_registry!(
        "lscerts_hours_to_expiry",
        "hours before expiration",
        EXPIRY_REGISTRY
    )
    .unwrap();
    static ref LSCERTS_FAILURES: Gauge = register_gauge_with_registry!(
        "lscerts_failures",
        "urls that yielded no valid certificate in the last audit",
        FAILURE_REGISTRY
    )
    .unwrap();
    // Setting a gauge and gathering it must not interleave with another push.
    static ref PUSH_LOCK: Mutex<()> = Mutex::new(());
}

/// Pushes the failure count, then one metric group per certificate in
/// `report`, to the gateway at `address`. Returns how many groups were
/// accepted; push failures are logged and skipped.
pub fn push_report(report: &Report, now: DateTime<Utc>, address: &str) -> usize {
    let _guard = PUSH_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let mut pushed = 0;

    LSCERTS_FAILURES.set(report.failure_count() as f64);
    let instance = labels! { "instance".to_owned() => JOB.to_owned(), };
    if push(address, instance, FAILURE_REGISTRY.gather(), "failures") {
        pushed += 1;
    }

    for success in &report.successes {
        let hours = expiry::hours_remaining(success.certificate.not_after, now);
        LSCERTS_HOURS_TO_EXPIRY.set(hours as f64);
        LSCERTS_DAYS_TO_EXPIRY.set(hours.div_euclid(HOURS_PER_DAY) as f64);

        if push(
            address,
            grouping(success),
            EXPIRY_REGISTRY.gather(),
            &success.source_url,
        ) {
            pushed += 1;
        }
    }
    pushed
}

/// `push_metrics` appends `/metrics/job/<job>/<labels>` to `address` itself.
fn push(
    address: &str,
    grouping: HashMap<String, String>,
    families: Vec<MetricFamily>,
    what: &str,
) -> bool {
    match prometheus::push_metrics(JOB, grouping, address, families, None) {
        Ok(_) => {
            debug!(what, "pushed metrics");
            true
        }
        Err(e) => {
            warn!(what, error = %e, "failed to push metrics to prometheus");
            false
        }
    }
}

/// Grouping labels for one certificate. The gateway encodes them in a URL
/// path, so values must not contain '/'.
fn grouping(success: &Success) -> HashMap<String, String> {
    let endpoint = endpoint::resolve(&success.source_url)
        .map(|endpoint| endpoint.to_string())
        .unwrap_or_else(|_| success.source_url.clone());

    labels! {
        "instance".to_owned() => JOB.to_owned(),
        "endpoint".to_owned() => label_value(&endpoint),
        "serial".to_owned() => label_value(&success.certificate.serial_number),
        "issuer".to_owned() => label_value(&success.certificate.issuer_common_name),
        "expires".to_owned() => success.certificate.expiry_date(),
    }
}

fn label_value(value: &str) -> String {
    if value.is_empty() {
        "none".to_string()
    } else {
        value.replace('/', "_")
    }
}
