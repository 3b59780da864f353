use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ledger::AccountId;

pub type FlightId = u64;

pub const BADGE_NAME: &str = "NomadBadge";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BadgeError {
    #[error("flight {flight_id} is already recorded for {owner}")]
    DuplicateFlight { flight_id: FlightId, owner: AccountId },
    #[error("flight {flight_id} belongs to {owner}")]
    FlightOwnedElsewhere { flight_id: FlightId, owner: AccountId },
}

/// What to do when a flight id is added again for its current owner.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateFlightPolicy {
    #[default]
    Reject,
    Ignore,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlightRecord {
    pub flight_id: FlightId,
    pub owner: AccountId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlightInsert {
    Recorded,
    AlreadyRecorded,
}

/// Soulbound flight records. There is no operation that moves or removes a record.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlightLedger {
    policy: DuplicateFlightPolicy,
    badges: BTreeMap<AccountId, Vec<FlightId>>,
    owners: BTreeMap<FlightId, AccountId>,
}

impl FlightLedger {
    pub fn new(policy: DuplicateFlightPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> DuplicateFlightPolicy {
        self.policy
    }

    pub fn add_flight(
        &mut self,
        flight_id: FlightId,
        owner: &AccountId,
    ) -> Result<FlightInsert, BadgeError> {
        if let Some(current) = self.owners.get(&flight_id) {
            if current != owner {
                return Err(BadgeError::FlightOwnedElsewhere {
                    flight_id,
                    owner: current.clone(),
                });
            }
            return match self.policy {
                DuplicateFlightPolicy::Reject => Err(BadgeError::DuplicateFlight {
                    flight_id,
                    owner: owner.clone(),
                }),
                DuplicateFlightPolicy::Ignore => Ok(FlightInsert::AlreadyRecorded),
            };
        }
        self.owners.insert(flight_id, owner.clone());
        self.badges.entry(owner.clone()).or_default().push(flight_id);
        Ok(FlightInsert::Recorded)
    }

    /// Flight ids in the order they were recorded.
    pub fn flights_of(&self, owner: &str) -> &[FlightId] {
        self.badges.get(owner).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn records_of(&self, owner: &str) -> Vec<FlightRecord> {
        self.flights_of(owner)
            .iter()
            .map(|flight_id| FlightRecord {
                flight_id: *flight_id,
                owner: owner.to_string(),
            })
            .collect()
    }

    pub fn owner_of(&self, flight_id: FlightId) -> Option<&AccountId> {
        self.owners.get(&flight_id)
    }

    pub fn has_flight(&self, owner: &str, flight_id: FlightId) -> bool {
        self.owners.get(&flight_id).is_some_and(|o| o == owner)
    }

    pub fn flight_count(&self) -> usize {
        self.owners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_flight_appends_to_owner_badge() {
        let mut ledger = FlightLedger::default();
        let owner: AccountId = "traveler".into();
        assert_eq!(ledger.add_flight(12345, &owner), Ok(FlightInsert::Recorded));
        assert_eq!(ledger.add_flight(7, &owner), Ok(FlightInsert::Recorded));
        assert_eq!(ledger.flights_of("traveler"), &[12345, 7]);
        assert!(ledger.has_flight("traveler", 12345));
        assert_eq!(ledger.owner_of(7), Some(&owner));
        assert_eq!(ledger.flights_of("nobody"), &[] as &[FlightId]);
        assert_eq!(
            ledger.records_of("traveler")[1],
            FlightRecord {
                flight_id: 7,
                owner: owner.clone(),
            }
        );
    }

    #[test]
    fn duplicate_rejected_by_default() {
        let mut ledger = FlightLedger::default();
        let owner: AccountId = "traveler".into();
        ledger.add_flight(1, &owner).unwrap();
        assert_eq!(
            ledger.add_flight(1, &owner),
            Err(BadgeError::DuplicateFlight {
                flight_id: 1,
                owner: owner.clone(),
            })
        );
        assert_eq!(ledger.flights_of("traveler"), &[1]);
    }

    #[test]
    fn duplicate_ignored_when_configured() {
        let mut ledger = FlightLedger::new(DuplicateFlightPolicy::Ignore);
        let owner: AccountId = "traveler".into();
        ledger.add_flight(1, &owner).unwrap();
        assert_eq!(
            ledger.add_flight(1, &owner),
            Ok(FlightInsert::AlreadyRecorded)
        );
        assert_eq!(ledger.flight_count(), 1);
    }

    #[test]
    fn flight_owned_by_someone_else_is_rejected_under_any_policy() {
        for policy in [DuplicateFlightPolicy::Reject, DuplicateFlightPolicy::Ignore] {
            let mut ledger = FlightLedger::new(policy);
            ledger.add_flight(9, &"alice".to_string()).unwrap();
            assert_eq!(
                ledger.add_flight(9, &"bob".to_string()),
                Err(BadgeError::FlightOwnedElsewhere {
                    flight_id: 9,
                    owner: "alice".into(),
                })
            );
            assert!(ledger.flights_of("bob").is_empty());
        }
    }
}
