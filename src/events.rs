//! Events emitted by the `NomadBadge` contract.
//!
//! These are the observable contract of a call: argument order and values are
//! fixed, and a failed call emits nothing.

use serde::{Deserialize, Serialize};

use crate::badge::FlightId;
use crate::ledger::{amount_string, AccountId, Amount};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum BadgeEvent {
    #[serde(rename_all = "camelCase")]
    FlightAdded { flight_id: FlightId },
    #[serde(rename_all = "camelCase")]
    RewardsProvided { recipient: AccountId },
    #[serde(rename_all = "camelCase")]
    RewardsPointsAssigned {
        sequence_index: u64,
        recipient: AccountId,
        #[serde(with = "amount_string")]
        points_awarded: Amount,
    },
}

impl BadgeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BadgeEvent::FlightAdded { .. } => "FlightAdded",
            BadgeEvent::RewardsProvided { .. } => "RewardsProvided",
            BadgeEvent::RewardsPointsAssigned { .. } => "RewardsPointsAssigned",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_solidity_style_names() {
        let event = BadgeEvent::RewardsPointsAssigned {
            sequence_index: 0,
            recipient: "0xuser".into(),
            points_awarded: 1_000,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "event": "RewardsPointsAssigned",
                "sequenceIndex": 0,
                "recipient": "0xuser",
                "pointsAwarded": "1000",
            })
        );
        assert_eq!(event.name(), "RewardsPointsAssigned");
    }
}
