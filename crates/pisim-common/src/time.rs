//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Wall-clock helpers shared by the generator and logs."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use chrono::{DateTime, SecondsFormat, Utc};

/// Milliseconds since the Unix epoch according to the wall clock.
pub fn unix_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Render epoch milliseconds as RFC 3339 for log fields.
pub fn millis_to_rfc3339(millis: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_millis_is_after_2020() {
        assert!(unix_millis() > 1_577_836_800_000);
    }

    #[test]
    fn renders_rfc3339() {
        assert_eq!(
            millis_to_rfc3339(1_700_000_000_123).as_deref(),
            Some("2023-11-14T22:13:20.123Z")
        );
    }
}
