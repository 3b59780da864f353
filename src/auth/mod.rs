//! Authorization policies for privileged contract operations.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ledger::AccountId;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    AddFlight,
    RunRewardProcess,
    SetUpdateTimer,
    PerformUpkeep,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::AddFlight => "addFlight",
            Operation::RunRewardProcess => "runRewardProcess",
            Operation::SetUpdateTimer => "setUpdateTimer",
            Operation::PerformUpkeep => "performUpkeep",
        };
        f.write_str(name)
    }
}

pub trait AuthorizationPolicy: Send + Sync {
    fn is_authorized(&self, caller: &AccountId, operation: Operation) -> bool;
}

impl<F> AuthorizationPolicy for F
where
    F: Fn(&AccountId, Operation) -> bool + Send + Sync,
{
    fn is_authorized(&self, caller: &AccountId, operation: Operation) -> bool {
        self(caller, operation)
    }
}

/// Only the administrative account may call privileged operations.
#[derive(Clone, Debug)]
pub struct AdminOnly {
    administrator: AccountId,
}

impl AdminOnly {
    pub fn new(administrator: impl Into<AccountId>) -> Self {
        Self {
            administrator: administrator.into(),
        }
    }
}

impl AuthorizationPolicy for AdminOnly {
    fn is_authorized(&self, caller: &AccountId, _operation: Operation) -> bool {
        *caller == self.administrator
    }
}

/// The administrator may do anything; issuers may record flights and run
/// reward cycles; keepers may perform upkeep. Timer configuration stays with
/// the administrator.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Delegated {
    pub administrator: AccountId,
    pub issuers: BTreeSet<AccountId>,
    pub keepers: BTreeSet<AccountId>,
}

impl Delegated {
    pub fn new(administrator: impl Into<AccountId>) -> Self {
        Self {
            administrator: administrator.into(),
            ..Self::default()
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<AccountId>) -> Self {
        self.issuers.insert(issuer.into());
        self
    }

    pub fn with_keeper(mut self, keeper: impl Into<AccountId>) -> Self {
        self.keepers.insert(keeper.into());
        self
    }
}

impl AuthorizationPolicy for Delegated {
    fn is_authorized(&self, caller: &AccountId, operation: Operation) -> bool {
        if *caller == self.administrator {
            return true;
        }
        match operation {
            Operation::AddFlight | Operation::RunRewardProcess => self.issuers.contains(caller),
            Operation::PerformUpkeep => self.keepers.contains(caller),
            Operation::SetUpdateTimer => false,
        }
    }
}
