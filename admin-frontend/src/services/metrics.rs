use prometheus::{IntCounterVec, Opts, Registry};
use std::sync::OnceLock;

use crate::models::Role;

pub static SESSION_LOGINS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static SESSION_REFRESH_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static SESSION_REFRESH_COALESCED_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Register the session collectors on the shared registry.
pub fn init_metrics() {
    let registry = service_core::metrics::init_metrics();

    register(
        registry,
        &SESSION_LOGINS_TOTAL,
        Opts::new("session_logins_total", "Login attempts by role and outcome"),
        &["role", "outcome"],
    );
    register(
        registry,
        &SESSION_REFRESH_TOTAL,
        Opts::new(
            "session_refresh_total",
            "Token refresh attempts by role and outcome",
        ),
        &["role", "outcome"],
    );
    register(
        registry,
        &SESSION_REFRESH_COALESCED_TOTAL,
        Opts::new(
            "session_refresh_coalesced_total",
            "Refresh calls that joined an attempt already in flight",
        ),
        &["role"],
    );
}

fn register(
    registry: &Registry,
    slot: &OnceLock<IntCounterVec>,
    opts: Opts,
    labels: &[&str],
) {
    slot.get_or_init(|| {
        let counter = IntCounterVec::new(opts, labels).expect("metric can be created");
        registry
            .register(Box::new(counter.clone()))
            .expect("collector can be registered");
        counter
    });
}

pub fn record_login(role: Role, outcome: &str) {
    if let Some(counter) = SESSION_LOGINS_TOTAL.get() {
        counter.with_label_values(&[role.as_str(), outcome]).inc();
    }
}

pub fn record_refresh(role: Role, outcome: &str) {
    if let Some(counter) = SESSION_REFRESH_TOTAL.get() {
        counter.with_label_values(&[role.as_str(), outcome]).inc();
    }
}

pub fn record_refresh_coalesced(role: Role) {
    if let Some(counter) = SESSION_REFRESH_COALESCED_TOTAL.get() {
        counter.with_label_values(&[role.as_str()]).inc();
    }
}
