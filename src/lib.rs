//! Nomad loyalty rewards.
//!
//! Two cooperating ledgers: a soulbound flight badge per traveler and a
//! fixed-supply reward point token. Reward cycles move points from the
//! administrator to a traveler, either on request or when the interval-gated
//! upkeep trigger is polled and due.
//!
//! Every operation is synchronous and all-or-nothing. Callers are expected to
//! apply one call at a time.

pub mod auth;
pub mod automation;
pub mod badge;
pub mod config;
pub mod contracts;
pub mod deploy;
pub mod events;
pub mod ledger;
pub mod logging;
pub mod rewards;

pub use auth::{AdminOnly, AuthorizationPolicy, Delegated, Operation};
pub use automation::{Clock, Keeper, ManualClock, SystemClock, UpkeepOutcome, UpkeepTrigger};
pub use badge::{DuplicateFlightPolicy, FlightId, FlightLedger};
pub use config::Config;
pub use contracts::{Call, CallReceipt, ContractError, NomadBadge};
pub use deploy::{DeployError, Deployment};
pub use events::BadgeEvent;
pub use ledger::{AccountId, Amount, LedgerError, RewardToken, TOTAL_ISSUANCE};
pub use rewards::RewardEngine;
