use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{AuthorizationPolicy, Operation};
use crate::automation::{Timestamp, UpkeepOutcome, UpkeepTrigger};
use crate::badge::{BadgeError, DuplicateFlightPolicy, FlightId, FlightInsert, FlightLedger, BADGE_NAME};
use crate::events::BadgeEvent;
use crate::ledger::{AccountId, Amount, LedgerError, RewardToken};
use crate::rewards::RewardEngine;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractError {
    #[error("{caller} is not authorized to call {operation}")]
    Unauthorized {
        caller: AccountId,
        operation: Operation,
    },
    #[error("badge pays out of token {expected}, not {actual}")]
    TokenMismatch {
        expected: AccountId,
        actual: AccountId,
    },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Badge(#[from] BadgeError),
}

/// One externally submitted call against the badge contract.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum Call {
    AddFlight {
        flight_id: FlightId,
        owner: AccountId,
    },
    RunRewardProcess {
        recipient: AccountId,
    },
    SetUpdateTimer {
        interval_secs: u64,
    },
    PerformUpkeep {
        recipient: AccountId,
    },
}

impl Call {
    pub fn operation(&self) -> Operation {
        match self {
            Call::AddFlight { .. } => Operation::AddFlight,
            Call::RunRewardProcess { .. } => Operation::RunRewardProcess,
            Call::SetUpdateTimer { .. } => Operation::SetUpdateTimer,
            Call::PerformUpkeep { .. } => Operation::PerformUpkeep,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallReceipt {
    pub caller: AccountId,
    pub call: Call,
    pub timestamp: Timestamp,
    pub events: Vec<BadgeEvent>,
}

/// Persistent part of the badge contract.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BadgeState {
    pub address: AccountId,
    pub token: AccountId,
    pub administrator: AccountId,
    pub flights: FlightLedger,
    pub rewards: RewardEngine,
    pub automation: UpkeepTrigger,
    pub events: Vec<BadgeEvent>,
}

#[derive(Clone, Debug)]
pub struct BadgeParams {
    pub address: AccountId,
    pub token: AccountId,
    pub administrator: AccountId,
    pub reward_points: Amount,
    pub duplicate_flights: DuplicateFlightPolicy,
    pub update_interval_secs: u64,
}

/// The flight badge contract: records soulbound flights and pays reward
/// cycles out of the administrator's token balance, either on request or
/// when its upkeep trigger is due.
pub struct NomadBadge {
    state: BadgeState,
    policy: Box<dyn AuthorizationPolicy>,
}

impl fmt::Debug for NomadBadge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NomadBadge")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl NomadBadge {
    pub fn new(params: BadgeParams, policy: Box<dyn AuthorizationPolicy>) -> Self {
        Self {
            state: BadgeState {
                address: params.address,
                token: params.token,
                administrator: params.administrator,
                flights: FlightLedger::new(params.duplicate_flights),
                rewards: RewardEngine::new(params.reward_points),
                automation: UpkeepTrigger::new(params.update_interval_secs),
                events: Vec::new(),
            },
            policy,
        }
    }

    pub fn restore(state: BadgeState, policy: Box<dyn AuthorizationPolicy>) -> Self {
        Self { state, policy }
    }

    pub fn name(&self) -> &'static str {
        BADGE_NAME
    }

    pub fn state(&self) -> &BadgeState {
        &self.state
    }

    pub fn address(&self) -> &AccountId {
        &self.state.address
    }

    pub fn administrator(&self) -> &AccountId {
        &self.state.administrator
    }

    pub fn flights(&self) -> &FlightLedger {
        &self.state.flights
    }

    pub fn rewards(&self) -> &RewardEngine {
        &self.state.rewards
    }

    pub fn automation(&self) -> &UpkeepTrigger {
        &self.state.automation
    }

    /// Every event emitted so far, oldest first.
    pub fn events(&self) -> &[BadgeEvent] {
        &self.state.events
    }

    fn authorize(&self, caller: &AccountId, operation: Operation) -> Result<(), ContractError> {
        if self.policy.is_authorized(caller, operation) {
            return Ok(());
        }
        warn!(%caller, %operation, "call rejected: unauthorized");
        Err(ContractError::Unauthorized {
            caller: caller.clone(),
            operation,
        })
    }

    fn check_token(&self, token: &RewardToken) -> Result<(), ContractError> {
        if *token.address() != self.state.token {
            return Err(ContractError::TokenMismatch {
                expected: self.state.token.clone(),
                actual: token.address().clone(),
            });
        }
        Ok(())
    }

    fn emit(&mut self, events: &[BadgeEvent]) {
        self.state.events.extend_from_slice(events);
    }

    pub fn add_flight(
        &mut self,
        caller: &AccountId,
        flight_id: FlightId,
        owner: &AccountId,
    ) -> Result<Vec<BadgeEvent>, ContractError> {
        self.authorize(caller, Operation::AddFlight)?;
        let events = match self.state.flights.add_flight(flight_id, owner)? {
            FlightInsert::Recorded => {
                info!(flight_id, %owner, "flight added");
                vec![BadgeEvent::FlightAdded { flight_id }]
            }
            FlightInsert::AlreadyRecorded => Vec::new(),
        };
        self.emit(&events);
        Ok(events)
    }

    pub fn run_reward_process(
        &mut self,
        caller: &AccountId,
        token: &mut RewardToken,
        recipient: &AccountId,
    ) -> Result<Vec<BadgeEvent>, ContractError> {
        self.authorize(caller, Operation::RunRewardProcess)?;
        self.check_token(token)?;
        let events = self
            .state
            .rewards
            .run_reward_process(token, &self.state.administrator, recipient)?;
        info!(
            %recipient,
            sequence = self.state.rewards.next_sequence() - 1,
            points = %self.state.rewards.reward_points(),
            "rewards provided"
        );
        self.emit(&events);
        Ok(events)
    }

    pub fn set_update_timer(
        &mut self,
        caller: &AccountId,
        interval_secs: u64,
    ) -> Result<(), ContractError> {
        self.authorize(caller, Operation::SetUpdateTimer)?;
        self.state.automation.set_update_timer(interval_secs);
        info!(interval_secs, "update timer set");
        Ok(())
    }

    pub fn check_upkeep(&self, now: Timestamp) -> bool {
        self.state.automation.check_upkeep(now)
    }

    pub fn perform_upkeep(
        &mut self,
        caller: &AccountId,
        token: &mut RewardToken,
        now: Timestamp,
        recipient: &AccountId,
    ) -> Result<UpkeepOutcome, ContractError> {
        self.authorize(caller, Operation::PerformUpkeep)?;
        self.check_token(token)?;
        let BadgeState {
            administrator,
            rewards,
            automation,
            ..
        } = &mut self.state;
        let outcome = automation.perform_if_due(now, || {
            rewards
                .run_reward_process(token, administrator, recipient)
                .map_err(ContractError::from)
        })?;
        if outcome.performed() {
            info!(now, %recipient, "upkeep performed");
            self.emit(outcome.events());
        }
        Ok(outcome)
    }

    /// Applies one call; on error no state has changed and nothing was emitted.
    pub fn apply_call(
        &mut self,
        caller: &AccountId,
        call: &Call,
        token: &mut RewardToken,
        now: Timestamp,
    ) -> Result<Vec<BadgeEvent>, ContractError> {
        match call {
            Call::AddFlight { flight_id, owner } => self.add_flight(caller, *flight_id, owner),
            Call::RunRewardProcess { recipient } => {
                self.run_reward_process(caller, token, recipient)
            }
            Call::SetUpdateTimer { interval_secs } => {
                self.set_update_timer(caller, *interval_secs)?;
                Ok(Vec::new())
            }
            Call::PerformUpkeep { recipient } => self
                .perform_upkeep(caller, token, now, recipient)
                .map(|outcome| outcome.events().to_vec()),
        }
    }
}
