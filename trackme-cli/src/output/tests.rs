//! CLI output formatting tests.
//!
//! These tests verify that CLI output is correctly formatted for both
//! text and JSON output modes.

#[cfg(test)]
mod text_formatter_tests {
    use super::super::json::{StatusOutput, SummaryOutput};
    use super::super::text::TextFormatter;
    use chrono::{TimeZone, Utc};
    use trackme_core::{Acknowledgement, LocationSample, LogoutReason, SessionState};
    use trackme_session::{SessionErrorKind, SessionEvent};
    use trackme_store::Settings;

    fn status(state: SessionState, username: Option<&str>) -> StatusOutput {
        StatusOutput {
            state,
            username: username.map(str::to_string),
            server: "http://127.0.0.1:5000".into(),
            background_enabled: false,
            credential_backend: "file".into(),
            reporting: false,
        }
    }

    fn ack() -> Acknowledgement {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        Acknowledgement {
            sample: LocationSample::new(55.6, 12.5, at).unwrap(),
            acknowledged_at: at,
        }
    }

    #[test]
    fn test_status_logged_in() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_status(&status(SessionState::LoggedIn, Some("alice")));

        assert!(output.starts_with("logged in as alice"));
        assert!(output.contains("Server:     http://127.0.0.1:5000"));
        assert!(output.contains("Background: off"));
        assert!(output.contains("Reporting is paused"));
    }

    #[test]
    fn test_status_logged_out() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_status(&status(SessionState::LoggedOut, None));
        assert!(output.starts_with("logged out\n"));
    }

    #[test]
    fn test_status_colors() {
        let formatter = TextFormatter::new(true);
        let output = formatter.format_status(&status(SessionState::LoggedIn, Some("alice")));
        assert!(output.contains("\x1b[32m"), "logged in should be green");
    }

    #[test]
    fn test_ack_line() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_ack(&ack());

        assert!(output.contains("Reported (55.60000, 12.50000)"));
        assert!(output.contains("Last updated: "));
    }

    #[test]
    fn test_event_lines() {
        let formatter = TextFormatter::new(false);

        let started = SessionEvent::SubmissionStarted { sample: ack().sample };
        assert_eq!(formatter.format_event(&started), None);

        let failed = SessionEvent::SubmissionFailed {
            kind: SessionErrorKind::Transport,
            message: "Transport error: timed out".into(),
        };
        assert_eq!(
            formatter.format_event(&failed).unwrap(),
            "✗ Update failed. Transport error: timed out"
        );

        let expired = SessionEvent::SubmissionFailed {
            kind: SessionErrorKind::SessionExpired,
            message: "Session expired, log in again".into(),
        };
        assert!(formatter.format_event(&expired).unwrap().starts_with("✗ Unauthorized."));

        let logged_out = SessionEvent::LoggedOut {
            reason: LogoutReason::RefreshRejected,
        };
        assert_eq!(
            formatter.format_event(&logged_out).unwrap(),
            "Logged out: refresh token rejected (run 'trackme login' to continue)"
        );

        let ended_elsewhere = SessionEvent::LoggedOut {
            reason: LogoutReason::EndedElsewhere,
        };
        assert_eq!(
            formatter.format_event(&ended_elsewhere).unwrap(),
            "Logged out: session ended in another process"
        );
    }

    #[test]
    fn test_summary() {
        let formatter = TextFormatter::new(false);
        let summary = SummaryOutput {
            submitted: 3,
            failed: 1,
            aborted: 0,
        };
        assert_eq!(formatter.format_summary(&summary), "3 reported, 1 failed");
    }

    #[test]
    fn test_settings() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_settings(&Settings::default());
        assert!(output.contains("Credential backend:  file"));
        assert!(output.contains("Report interval:     1 minute"));
        assert!(output.contains("Status fade:         4s"));
    }
}

#[cfg(test)]
mod json_formatter_tests {
    use super::super::json::{JsonFormatter, ReportOutput, StatusOutput};
    use chrono::{TimeZone, Utc};
    use trackme_core::{Acknowledgement, LocationSample, SessionState};

    #[test]
    fn test_status_json() {
        let status = StatusOutput {
            state: SessionState::RefreshingCredentials,
            username: None,
            server: "http://127.0.0.1:5000".into(),
            background_enabled: true,
            credential_backend: "keychain".into(),
            reporting: true,
        };
        let json: serde_json::Value =
            serde_json::from_str(&JsonFormatter::new(false).format(&status).unwrap()).unwrap();

        assert_eq!(json["state"], "refreshing_credentials");
        assert_eq!(json["backgroundEnabled"], true);
        assert_eq!(json["credentialBackend"], "keychain");
        assert!(json.get("username").is_none());
    }

    #[test]
    fn test_report_json() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let ack = Acknowledgement {
            sample: LocationSample::new(55.6, 12.5, at).unwrap(),
            acknowledged_at: at,
        };
        let json: serde_json::Value = serde_json::from_str(
            &JsonFormatter::new(false)
                .format(&ReportOutput::from(&ack))
                .unwrap(),
        )
        .unwrap();

        assert_eq!(json["latitude"], 55.6);
        assert_eq!(json["longitude"], 12.5);
        assert_eq!(json["acknowledgedAt"], "2024-05-01T12:00:00+00:00");
    }

    #[test]
    fn test_format_pretty() {
        let formatter = JsonFormatter::new(true);
        let output = formatter.format(&serde_json::json!({"a": 1})).unwrap();
        assert!(output.contains('\n'));
    }

    #[test]
    fn test_format_compact() {
        let formatter = JsonFormatter::new(false);
        let output = formatter.format(&serde_json::json!({"a": 1})).unwrap();
        assert_eq!(output, r#"{"a":1}"#);
    }
}
