use serde::{Deserialize, Serialize};

use crate::events::BadgeEvent;
use crate::ledger::{amount_string, AccountId, Amount, LedgerError, RewardToken};

/// Points paid out by one reward cycle.
pub const DEFAULT_REWARD_POINTS: Amount = 1_000;

/// Pays a fixed award per cycle from the administrator's balance.
///
/// The award does not depend on the recipient's flight history, so a cycle is
/// constant-cost no matter how many flights have been recorded.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RewardEngine {
    #[serde(with = "amount_string")]
    reward_points: Amount,
    next_sequence: u64,
}

impl Default for RewardEngine {
    fn default() -> Self {
        Self::new(DEFAULT_REWARD_POINTS)
    }
}

impl RewardEngine {
    pub fn new(reward_points: Amount) -> Self {
        Self {
            reward_points,
            next_sequence: 0,
        }
    }

    pub fn reward_points(&self) -> Amount {
        self.reward_points
    }

    /// Sequence index the next successful cycle will carry.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Runs one reward cycle. On error neither the balances nor the sequence move.
    pub fn run_reward_process(
        &mut self,
        token: &mut RewardToken,
        administrator: &str,
        recipient: &AccountId,
    ) -> Result<Vec<BadgeEvent>, LedgerError> {
        token.transfer(administrator, recipient, self.reward_points)?;

        let sequence_index = self.next_sequence;
        self.next_sequence += 1;
        Ok(vec![
            BadgeEvent::RewardsProvided {
                recipient: recipient.clone(),
            },
            BadgeEvent::RewardsPointsAssigned {
                sequence_index,
                recipient: recipient.clone(),
                points_awarded: self.reward_points,
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycles_pay_fixed_award_with_increasing_sequence() {
        let mut token = RewardToken::new("0xtoken", "admin");
        let mut engine = RewardEngine::default();
        let user: AccountId = "user".into();

        let first = engine.run_reward_process(&mut token, "admin", &user).unwrap();
        assert_eq!(
            first,
            vec![
                BadgeEvent::RewardsProvided {
                    recipient: user.clone()
                },
                BadgeEvent::RewardsPointsAssigned {
                    sequence_index: 0,
                    recipient: user.clone(),
                    points_awarded: 1_000,
                },
            ]
        );
        let second = engine.run_reward_process(&mut token, "admin", &user).unwrap();
        assert_eq!(
            second[1],
            BadgeEvent::RewardsPointsAssigned {
                sequence_index: 1,
                recipient: user.clone(),
                points_awarded: 1_000,
            }
        );
        assert_eq!(token.balance_of("user"), 2_000);
    }

    #[test]
    fn failed_cycle_does_not_advance_sequence() {
        let mut token = RewardToken::new("0xtoken", "admin");
        let mut engine = RewardEngine::default();
        let user: AccountId = "user".into();
        let err = engine
            .run_reward_process(&mut token, "nobody", &user)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
        assert_eq!(engine.next_sequence(), 0);
        assert_eq!(token.balance_of("user"), 0);
    }

    #[test]
    fn zero_award_is_refused_by_the_ledger() {
        let mut token = RewardToken::new("0xtoken", "admin");
        let mut engine = RewardEngine::new(0);
        let err = engine
            .run_reward_process(&mut token, "admin", &"user".to_string())
            .unwrap_err();
        assert_eq!(err, LedgerError::InvalidAmount);
    }
}
