use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub type AccountId = String;
pub type Amount = u128;

/// Fixed issuance, assigned in full to the administrator at genesis.
pub const TOTAL_ISSUANCE: Amount = 100_000_000_000_000_000_000_000_000_000;

pub const TOKEN_NAME: &str = "NomadRewardToken";
pub const TOKEN_SYMBOL: &str = "NRT";
pub const TOKEN_DECIMALS: u8 = 18;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("insufficient balance in account {account}: need {needed}, available {available}")]
    InsufficientBalance {
        account: AccountId,
        needed: Amount,
        available: Amount,
    },
    #[error("transfer amount must be greater than zero")]
    InvalidAmount,
    #[error("snapshot state root does not match its balances")]
    StateRootMismatch,
    #[error("snapshot balances sum to {actual}, expected {expected}")]
    SupplyMismatch { expected: Amount, actual: Amount },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    Genesis {
        to: AccountId,
        #[serde(with = "amount_string")]
        amount: Amount,
    },
    Transfer {
        from: AccountId,
        to: AccountId,
        #[serde(with = "amount_string")]
        amount: Amount,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub address: AccountId,
    pub administrator: AccountId,
    #[serde(with = "balance_map")]
    pub balances: BTreeMap<AccountId, Amount>,
    pub events: Vec<LedgerEvent>,
    #[serde(with = "hex_root")]
    pub state_root: [u8; 32],
}

/// The reward point ledger. Supply is fixed at construction; balances only move by transfer.
#[derive(Debug, Clone)]
pub struct RewardToken {
    address: AccountId,
    administrator: AccountId,
    balances: BTreeMap<AccountId, Amount>,
    events: Vec<LedgerEvent>,
}

impl RewardToken {
    pub fn new(address: impl Into<AccountId>, administrator: impl Into<AccountId>) -> Self {
        let administrator = administrator.into();
        let mut balances = BTreeMap::new();
        balances.insert(administrator.clone(), TOTAL_ISSUANCE);
        Self {
            address: address.into(),
            events: vec![LedgerEvent::Genesis {
                to: administrator.clone(),
                amount: TOTAL_ISSUANCE,
            }],
            administrator,
            balances,
        }
    }

    pub fn name(&self) -> &'static str {
        TOKEN_NAME
    }

    pub fn symbol(&self) -> &'static str {
        TOKEN_SYMBOL
    }

    pub fn decimals(&self) -> u8 {
        TOKEN_DECIMALS
    }

    pub fn total_supply(&self) -> Amount {
        TOTAL_ISSUANCE
    }

    pub fn address(&self) -> &AccountId {
        &self.address
    }

    pub fn administrator(&self) -> &AccountId {
        &self.administrator
    }

    /// Unknown accounts hold zero.
    pub fn balance_of(&self, account: &str) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Moves `amount` from `from` to `to`. Nothing changes unless both sides can be applied.
    pub fn transfer(&mut self, from: &str, to: &str, amount: Amount) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let available = self.balance_of(from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                account: from.to_string(),
                needed: amount,
                available,
            });
        }
        if from != to {
            if let Some(balance) = self.balances.get_mut(from) {
                *balance -= amount;
            }
            // Cannot overflow: every balance is bounded by TOTAL_ISSUANCE.
            *self.balances.entry(to.to_string()).or_insert(0) += amount;
        }
        self.events.push(LedgerEvent::Transfer {
            from: from.to_string(),
            to: to.to_string(),
            amount,
        });
        Ok(())
    }

    /// Sum over every stored balance; equals `TOTAL_ISSUANCE` in every reachable state.
    pub fn circulating_sum(&self) -> Amount {
        self.balances.values().sum()
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            address: self.address.clone(),
            administrator: self.administrator.clone(),
            balances: self.balances.clone(),
            events: self.events.clone(),
            state_root: compute_state_root(&self.balances),
        }
    }

    /// Rebuilds a ledger from a persisted snapshot, checking its root and supply.
    pub fn restore(snapshot: LedgerSnapshot) -> Result<Self, LedgerError> {
        if compute_state_root(&snapshot.balances) != snapshot.state_root {
            return Err(LedgerError::StateRootMismatch);
        }
        let actual = snapshot
            .balances
            .values()
            .try_fold(0u128, |acc, b| acc.checked_add(*b))
            .unwrap_or(Amount::MAX);
        if actual != TOTAL_ISSUANCE {
            return Err(LedgerError::SupplyMismatch {
                expected: TOTAL_ISSUANCE,
                actual,
            });
        }
        Ok(Self {
            address: snapshot.address,
            administrator: snapshot.administrator,
            balances: snapshot.balances,
            events: snapshot.events,
        })
    }
}

fn compute_state_root(balances: &BTreeMap<AccountId, Amount>) -> [u8; 32] {
    let mut leaves: Vec<[u8; 32]> = Vec::new();
    for (account, balance) in balances {
        let mut hasher = Sha256::new();
        hasher.update(b"acct");
        hasher.update((account.len() as u64).to_le_bytes());
        hasher.update(account.as_bytes());
        hasher.update(balance.to_le_bytes());
        leaves.push(hasher.finalize().into());
    }
    build_merkle(leaves)
}

fn build_merkle(mut leaves: Vec<[u8; 32]>) -> [u8; 32] {
    if leaves.is_empty() {
        return Sha256::digest(b"nomad-ledger-empty").into();
    }
    while leaves.len() > 1 {
        let mut next = Vec::with_capacity(leaves.len().div_ceil(2));
        for chunk in leaves.chunks(2) {
            let mut hasher = Sha256::new();
            hasher.update(b"node");
            hasher.update(chunk[0]);
            hasher.update(chunk.get(1).unwrap_or(&chunk[0]));
            next.push(hasher.finalize().into());
        }
        leaves = next;
    }
    leaves[0]
}

// u128 does not survive every JSON consumer; amounts travel as decimal strings.
pub(crate) mod amount_string {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use super::Amount;

    pub fn serialize<S>(value: &Amount, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Amount, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        encoded.parse().map_err(D::Error::custom)
    }
}

mod balance_map {
    use std::collections::BTreeMap;

    use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

    use super::{AccountId, Amount};

    pub fn serialize<S>(value: &BTreeMap<AccountId, Amount>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let encoded: BTreeMap<&AccountId, String> =
            value.iter().map(|(k, v)| (k, v.to_string())).collect();
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<AccountId, Amount>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = BTreeMap::<AccountId, String>::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|(k, v)| v.parse().map(|amount| (k, amount)).map_err(D::Error::custom))
            .collect()
    }
}

mod hex_root {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let bytes = hex::decode(&encoded).map_err(D::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| D::Error::custom("state root must be 32 bytes"))
    }
}
