//! Deploying the token and badge contracts, and persisting what they produce.

pub mod abi;

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::auth::{AuthorizationPolicy, Delegated};
use crate::automation::{Clock, Keeper, Timestamp, Upkeep, UpkeepOutcome};
use crate::config::Config;
use crate::contracts::{BadgeParams, BadgeState, Call, CallReceipt, ContractError, NomadBadge};
use crate::ledger::{AccountId, LedgerError, LedgerSnapshot, RewardToken};

pub const STATE_FILE: &str = "state.json";

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("persisted token state rejected: {0}")]
    Ledger(#[from] LedgerError),
    #[error("badge {badge} is bound to token {expected}, state holds {actual}")]
    TokenBinding {
        badge: AccountId,
        expected: AccountId,
        actual: AccountId,
    },
    #[error("administrator mismatch: roles name {roles}, badge {badge}, token {token}")]
    AdministratorMismatch {
        roles: AccountId,
        badge: AccountId,
        token: AccountId,
    },
    #[error(transparent)]
    Contract(#[from] ContractError),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> DeployError + '_ {
    move |source| DeployError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// `0x` followed by the first 20 bytes of `SHA-256(deployer || nonce)`.
pub fn contract_address(deployer: &str, nonce: u64) -> AccountId {
    let mut hasher = Sha256::new();
    hasher.update(b"nomad-contract");
    hasher.update(deployer.as_bytes());
    hasher.update(nonce.to_le_bytes());
    let digest = hasher.finalize();
    format!("0x{}", hex::encode(&digest[..20]))
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentState {
    pub deployer: AccountId,
    pub roles: Delegated,
    pub token: LedgerSnapshot,
    pub badge: BadgeState,
}

#[derive(Serialize)]
struct AddressArtifact<'a> {
    #[serde(rename = "Contract")]
    contract: &'a str,
}

/// The deployed pair: the reward token and the badge contract paying out of it.
#[derive(Debug)]
pub struct Deployment {
    deployer: AccountId,
    roles: Delegated,
    token: RewardToken,
    badge: NomadBadge,
}

impl Deployment {
    /// Deploys with the roles named in `config`.
    pub fn deploy(config: &Config) -> Result<Self, DeployError> {
        let roles = config.roles();
        let policy = Box::new(roles.clone());
        Self::deploy_with_policy(config, roles, policy)
    }

    /// Deploys with a caller-supplied policy. `roles` is what gets persisted.
    pub fn deploy_with_policy(
        config: &Config,
        roles: Delegated,
        policy: Box<dyn AuthorizationPolicy>,
    ) -> Result<Self, DeployError> {
        let deployer = config.administrator.clone();
        info!(%deployer, "deploying contracts");

        let token = RewardToken::new(contract_address(&deployer, 0), deployer.clone());
        info!(address = %token.address(), "{} deployed", token.name());

        let mut badge = NomadBadge::new(
            BadgeParams {
                address: contract_address(&deployer, 1),
                token: token.address().clone(),
                administrator: deployer.clone(),
                reward_points: config.reward_points.into(),
                duplicate_flights: config.duplicate_flights,
                update_interval_secs: 0,
            },
            policy,
        );
        info!(address = %badge.address(), "{} deployed", badge.name());

        badge.set_update_timer(&deployer, config.update_interval_secs)?;

        Ok(Self {
            deployer,
            roles,
            token,
            badge,
        })
    }

    pub fn from_state(state: DeploymentState) -> Result<Self, DeployError> {
        let token = RewardToken::restore(state.token)?;
        if *token.address() != state.badge.token {
            return Err(DeployError::TokenBinding {
                badge: state.badge.address,
                expected: state.badge.token,
                actual: token.address().clone(),
            });
        }
        if state.roles.administrator != state.badge.administrator
            || state.badge.administrator != *token.administrator()
        {
            return Err(DeployError::AdministratorMismatch {
                roles: state.roles.administrator,
                badge: state.badge.administrator,
                token: token.administrator().clone(),
            });
        }
        let badge = NomadBadge::restore(state.badge, Box::new(state.roles.clone()));
        Ok(Self {
            deployer: state.deployer,
            roles: state.roles,
            token,
            badge,
        })
    }

    pub fn state(&self) -> DeploymentState {
        DeploymentState {
            deployer: self.deployer.clone(),
            roles: self.roles.clone(),
            token: self.token.snapshot(),
            badge: self.badge.state().clone(),
        }
    }

    pub fn deployer(&self) -> &AccountId {
        &self.deployer
    }

    pub fn token(&self) -> &RewardToken {
        &self.token
    }

    pub fn badge(&self) -> &NomadBadge {
        &self.badge
    }

    /// Applies one call all-or-nothing.
    pub fn execute(
        &mut self,
        caller: &AccountId,
        call: Call,
        now: Timestamp,
    ) -> Result<CallReceipt, ContractError> {
        match self.badge.apply_call(caller, &call, &mut self.token, now) {
            Ok(events) => Ok(CallReceipt {
                caller: caller.clone(),
                call,
                timestamp: now,
                events,
            }),
            Err(err) => {
                warn!(%caller, operation = %call.operation(), error = %err, "call failed");
                Err(err)
            }
        }
    }

    /// Binds a keeper identity and recipient for [`crate::automation::Keeper`] polling.
    pub fn upkeep_target(&mut self, caller: AccountId, recipient: AccountId) -> UpkeepTarget<'_> {
        UpkeepTarget {
            deployment: self,
            caller,
            recipient,
        }
    }

    /// One keeper poll against the state at `path`: reload, tick, and save when a
    /// cycle ran. Writes made by other handles between polls are kept.
    pub fn keeper_tick<C: Clock>(
        path: &Path,
        keeper: &mut Keeper<C>,
        caller: &AccountId,
        recipient: &AccountId,
    ) -> Result<UpkeepOutcome, DeployError> {
        let mut deployment = Self::load(path)?;
        let outcome = {
            let mut target = deployment.upkeep_target(caller.clone(), recipient.clone());
            keeper.tick(&mut target)?
        };
        if outcome.performed() {
            deployment.save(path)?;
        }
        Ok(outcome)
    }

    /// Writes `<Name>Address.json` and `<Name>Abi.json` for both contracts.
    pub fn write_artifacts(&self, out_dir: &Path) -> Result<Vec<PathBuf>, DeployError> {
        fs::create_dir_all(out_dir).map_err(io_error(out_dir))?;
        let mut written = Vec::new();
        for abi in [
            abi::reward_token_abi(self.token.address()),
            abi::badge_abi(self.badge.address()),
        ] {
            let address_path = out_dir.join(format!("{}Address.json", abi.contract_name));
            let address = serde_json::to_vec_pretty(&AddressArtifact {
                contract: &abi.address,
            })?;
            write_all(&address_path, &address)?;
            written.push(address_path);

            let abi_path = out_dir.join(format!("{}Abi.json", abi.contract_name));
            write_all(&abi_path, &serde_json::to_vec_pretty(&abi)?)?;
            written.push(abi_path);
        }
        info!(dir = %out_dir.display(), files = written.len(), "artifacts written");
        Ok(written)
    }

    pub fn save(&self, path: &Path) -> Result<(), DeployError> {
        write_all(path, &serde_json::to_vec_pretty(&self.state())?)
    }

    pub fn load(path: &Path) -> Result<Self, DeployError> {
        let bytes = fs::read(path).map_err(io_error(path))?;
        Self::from_state(serde_json::from_slice(&bytes)?)
    }
}

fn write_all(path: &Path, bytes: &[u8]) -> Result<(), DeployError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let mut file = fs::File::create(path).map_err(io_error(path))?;
    file.write_all(bytes).map_err(io_error(path))
}

pub struct UpkeepTarget<'a> {
    deployment: &'a mut Deployment,
    caller: AccountId,
    recipient: AccountId,
}

impl Upkeep for UpkeepTarget<'_> {
    type Error = ContractError;

    fn check_upkeep(&self, now: Timestamp) -> bool {
        self.deployment.badge.check_upkeep(now)
    }

    fn perform_upkeep(&mut self, now: Timestamp) -> Result<UpkeepOutcome, ContractError> {
        let Deployment { token, badge, .. } = &mut *self.deployment;
        badge.perform_upkeep(&self.caller, token, now, &self.recipient)
    }
}
