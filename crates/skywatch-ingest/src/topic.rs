//! Topic grammar parsing.
//!
//! Sensors publish on `skywatch/{organization_id}/sensors/{sensor_id}/{action}`
//! with optional trailing segments. Parsing is pure; any violation is a
//! non-fatal format error and the message is dropped by the caller.

use crate::error::{Error, Result};

/// Fixed root segment of every Skywatch topic.
pub const TOPIC_ROOT: &str = "skywatch";

/// Wildcard filter covering every organization, sensor and action.
pub const SUBSCRIBE_FILTER: &str = "skywatch/+/sensors/+/#";

/// Structured form of an inbound topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTopic {
    pub organization_id: String,
    pub sensor_id: i64,
    /// Action segment: readings, batch, command-response, ...
    pub action: String,
}

/// Parse a raw topic string.
pub fn parse_topic(topic: &str) -> Result<ParsedTopic> {
    let parts: Vec<&str> = topic.split('/').collect();

    // Expected: skywatch/{org_id}/sensors/{sensor_id}/{action}
    if parts.len() < 5 || parts[0] != TOPIC_ROOT || parts[2] != "sensors" {
        return Err(Error::Topic(topic.to_string()));
    }

    let sensor_id: i64 = parts[3]
        .parse()
        .map_err(|_| Error::Topic(format!("invalid sensor id in topic: {}", topic)))?;

    Ok(ParsedTopic {
        organization_id: parts[1].to_string(),
        sensor_id,
        action: parts[4].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_topic() {
        let parsed = parse_topic("skywatch/org1/sensors/42/readings").unwrap();
        assert_eq!(parsed.organization_id, "org1");
        assert_eq!(parsed.sensor_id, 42);
        assert_eq!(parsed.action, "readings");
    }

    #[test]
    fn allows_trailing_segments() {
        let parsed = parse_topic("skywatch/acme/sensors/7/command-response/123").unwrap();
        assert_eq!(parsed.action, "command-response");
        assert_eq!(parsed.sensor_id, 7);
    }

    #[test]
    fn rejects_short_topics() {
        assert!(parse_topic("skywatch/org1/sensors/42").is_err());
        assert!(parse_topic("skywatch").is_err());
        assert!(parse_topic("").is_err());
    }

    #[test]
    fn rejects_wrong_root() {
        assert!(parse_topic("other/org1/sensors/42/readings").is_err());
    }

    #[test]
    fn rejects_wrong_sensors_literal() {
        assert!(parse_topic("skywatch/org1/devices/42/readings").is_err());
    }

    #[test]
    fn rejects_non_numeric_sensor_id() {
        let err = parse_topic("skywatch/org1/sensors/abc/readings").unwrap_err();
        assert!(matches!(err, Error::Topic(_)));
    }

    #[test]
    fn accepts_negative_sensor_id_as_i64() {
        // The grammar only requires a 64-bit integer; range policy lives
        // elsewhere.
        let parsed = parse_topic("skywatch/org1/sensors/-1/readings").unwrap();
        assert_eq!(parsed.sensor_id, -1);
    }
}
