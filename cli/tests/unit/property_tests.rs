//! Property-based tests for readiness polling and key validation.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use metalctl::domain::{LifecycleError, PendingReason, ReadyState, validate_private_key};
use proptest::prelude::*;

use crate::mocks::{RecordingTransport, controller, device_json};

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

fn pem(label: &str, body: &[String]) -> String {
    format!(
        "-----BEGIN {label}-----\n{}\n-----END {label}-----\n",
        body.join("\n")
    )
}

proptest! {
    /// Every state other than "active" is pending, never an error.
    #[test]
    fn non_active_state_is_pending(state in "[a-z_]{0,16}".prop_filter("not active", |s| s != "active")) {
        let (ctl, _) = controller(
            RecordingTransport::new().respond(200, &device_json("dev-1", &state, None)),
        );
        let result = block_on(ctl.poll_ready("dev-1")).unwrap();
        prop_assert_eq!(result, ReadyState::Pending(PendingReason::State(state)));
    }

    /// 2xx..4xx statuses other than 200 and 404 never raise while polling.
    #[test]
    fn unrecognized_status_is_pending(status in (201u16..500).prop_filter("not 404", |s| *s != 404)) {
        let (ctl, _) = controller(RecordingTransport::new().respond(status, "{}"));
        let result = block_on(ctl.poll_ready("dev-1"));
        if (200..300).contains(&status) {
            // A 2xx body without an id cannot be decoded.
            prop_assert!(matches!(result, Err(LifecycleError::Decode(_))));
        } else {
            prop_assert_eq!(result.unwrap(), ReadyState::Pending(PendingReason::UnrecognizedStatus(status)));
        }
    }

    /// Every 5xx is a retryable error.
    #[test]
    fn server_errors_are_retryable(status in 500u16..600) {
        let (ctl, _) = controller(RecordingTransport::new().respond(status, ""));
        let err = block_on(ctl.poll_ready("dev-1")).unwrap_err();
        prop_assert!(err.is_retryable());
    }

    /// Well-framed unencrypted keys with a base64 body are accepted.
    #[test]
    fn framed_base64_key_is_accepted(
        kind in prop::sample::select(vec!["OPENSSH", "RSA", "EC", ""]),
        body in prop::collection::vec("[A-Za-z0-9+/]{1,64}={0,2}", 1..8),
    ) {
        let label = if kind.is_empty() {
            "PRIVATE KEY".to_string()
        } else {
            format!("{kind} PRIVATE KEY")
        };
        prop_assert!(validate_private_key(&pem(&label, &body)).is_ok());
    }

    /// Public keys and certificates are never accepted as private keys.
    #[test]
    fn non_private_pem_is_rejected(
        label in prop::sample::select(vec!["PUBLIC KEY", "CERTIFICATE", "RSA PUBLIC KEY"]),
        body in prop::collection::vec("[A-Za-z0-9+/]{1,64}", 1..4),
    ) {
        let err = validate_private_key(&pem(label, &body)).unwrap_err();
        prop_assert!(err.is_authentication());
    }

    /// Arbitrary text without PEM framing is rejected, not panicked on.
    #[test]
    fn unframed_text_is_rejected(text in "[^-]{0,200}") {
        prop_assert!(validate_private_key(&text).is_err());
    }
}
