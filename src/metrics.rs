//! Prometheus metrics for token issuance and revocation.

use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, CounterVec};

/// Tokens issued counter.
pub static TOKENS_ISSUED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "account_tokens_issued_total",
        "Total number of tokens issued",
        &["token_type"]
    )
    .expect("Failed to register tokens_issued metric")
});

/// Refresh token rotations by outcome.
pub static TOKEN_ROTATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "account_token_rotations_total",
        "Total number of refresh token rotations",
        &["status"]
    )
    .expect("Failed to register token_rotations metric")
});

/// Token validations by type and outcome.
pub static TOKEN_VALIDATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "account_token_validations_total",
        "Total number of token validations",
        &["token_type", "status"]
    )
    .expect("Failed to register token_validations metric")
});

/// Sign-outs by outcome.
pub static SIGNOUTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "account_signouts_total",
        "Total number of sign-outs",
        &["status"]
    )
    .expect("Failed to register signouts metric")
});

/// Token store operations counter.
pub static STORE_OPERATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "account_token_store_operations_total",
        "Total number of token store operations",
        &["operation", "status"]
    )
    .expect("Failed to register store_operations metric")
});

/// Security events counter.
pub static SECURITY_EVENTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "account_security_events_total",
        "Total number of security events",
        &["event_type"]
    )
    .expect("Failed to register security_events metric")
});

pub const REFRESH_TOKEN_REUSE: &str = "REFRESH_TOKEN_REUSE";

pub fn record_token_issued(token_type: &str) {
    TOKENS_ISSUED.with_label_values(&[token_type]).inc();
}

pub fn record_rotation(status: &str) {
    TOKEN_ROTATIONS.with_label_values(&[status]).inc();
}

pub fn record_validation(token_type: &str, status: &str) {
    TOKEN_VALIDATIONS
        .with_label_values(&[token_type, status])
        .inc();
}

pub fn record_signout(status: &str) {
    SIGNOUTS.with_label_values(&[status]).inc();
}

pub fn record_store_operation(operation: &str, status: &str) {
    STORE_OPERATIONS
        .with_label_values(&[operation, status])
        .inc();
}

pub fn record_security_event(event_type: &str) {
    SECURITY_EVENTS.with_label_values(&[event_type]).inc();
}
