use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;

use nomad_rewards::badge::BadgeError;
use nomad_rewards::contracts::BadgeParams;
use nomad_rewards::{
    AccountId, AdminOnly, BadgeEvent, Call, Config, ContractError, Deployment,
    DuplicateFlightPolicy, LedgerError, NomadBadge, RewardToken, TOTAL_ISSUANCE,
};

const ADMIN: &str = "0xadmin";

fn admin() -> AccountId {
    ADMIN.to_string()
}

fn contracts(interval: u64) -> (NomadBadge, RewardToken) {
    let token = RewardToken::new("0xtoken", ADMIN);
    let badge = NomadBadge::new(
        BadgeParams {
            address: "0xbadge".into(),
            token: token.address().clone(),
            administrator: admin(),
            reward_points: 1_000,
            duplicate_flights: DuplicateFlightPolicy::Reject,
            update_interval_secs: interval,
        },
        Box::new(AdminOnly::new(ADMIN)),
    );
    (badge, token)
}

#[test]
fn scenario_a_genesis_balances() {
    let (_, token) = contracts(0);
    assert_eq!(
        token.balance_of(ADMIN),
        100_000_000_000_000_000_000_000_000_000
    );
    assert_eq!(token.balance_of("0xanyone"), 0);
    assert_eq!(token.total_supply(), TOTAL_ISSUANCE);
}

#[test]
fn scenario_b_add_flight() {
    let (mut badge, _) = contracts(0);
    let owner: AccountId = "0xowner".into();
    let events = badge.add_flight(&admin(), 12345, &owner).unwrap();
    assert_eq!(events, vec![BadgeEvent::FlightAdded { flight_id: 12345 }]);
    assert!(badge.flights().flights_of("0xowner").contains(&12345));

    let err = badge.add_flight(&admin(), 12345, &owner).unwrap_err();
    assert_eq!(
        err,
        ContractError::Badge(BadgeError::DuplicateFlight {
            flight_id: 12345,
            owner: owner.clone(),
        })
    );
    assert_eq!(badge.events().len(), 1);
}

#[test]
fn scenario_c_reward_cycles_increment_sequence() {
    let (mut badge, mut token) = contracts(0);
    let user: AccountId = "0xuser".into();

    let first = badge.run_reward_process(&admin(), &mut token, &user).unwrap();
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
    assert_eq!(token.balance_of("0xuser"), 1_000);
    assert_eq!(token.balance_of(ADMIN), TOTAL_ISSUANCE - 1_000);

    let second = badge.run_reward_process(&admin(), &mut token, &user).unwrap();
    assert_eq!(
        second[1],
        BadgeEvent::RewardsPointsAssigned {
            sequence_index: 1,
            recipient: user.clone(),
            points_awarded: 1_000,
        }
    );
}

#[test]
fn scenario_d_upkeep_respects_interval() {
    let mut deployment = Deployment::deploy(&Config {
        administrator: admin(),
        update_interval_secs: 0,
        ..Config::default()
    })
    .unwrap();
    let user: AccountId = "0xuser".into();
    let t0 = 1_700_000_000;

    deployment
        .execute(&admin(), Call::SetUpdateTimer { interval_secs: 3_600 }, t0)
        .unwrap();

    let upkeep = |now| (Call::PerformUpkeep { recipient: user.clone() }, now);

    let (call, now) = upkeep(t0);
    let receipt = deployment.execute(&admin(), call, now).unwrap();
    assert_eq!(receipt.events.len(), 2);
    assert_eq!(deployment.token().balance_of("0xuser"), 1_000);

    let (call, now) = upkeep(t0 + 1_800);
    let receipt = deployment.execute(&admin(), call, now).unwrap();
    assert!(receipt.events.is_empty());
    assert_eq!(deployment.token().balance_of("0xuser"), 1_000);

    let (call, now) = upkeep(t0 + 3_600);
    let receipt = deployment.execute(&admin(), call, now).unwrap();
    assert_eq!(
        receipt.events[1],
        BadgeEvent::RewardsPointsAssigned {
            sequence_index: 1,
            recipient: user.clone(),
            points_awarded: 1_000,
        }
    );
    assert_eq!(deployment.token().balance_of("0xuser"), 2_000);
}

#[test]
fn redundant_upkeep_at_same_instant_fires_once() {
    let (mut badge, mut token) = contracts(3_600);
    let user: AccountId = "0xuser".into();
    let now = 10_000;
    let fired = (0..5)
        .filter(|_| {
            badge
                .perform_upkeep(&admin(), &mut token, now, &user)
                .unwrap()
                .performed()
        })
        .count();
    assert_eq!(fired, 1);
    assert_eq!(token.balance_of("0xuser"), 1_000);
}

#[test]
fn scenario_e_drained_administrator_fails_atomically() {
    let (mut badge, mut token) = contracts(0);
    token
        .transfer(ADMIN, "0xsink", TOTAL_ISSUANCE - 999)
        .unwrap();
    let before = token.snapshot();
    let user: AccountId = "0xuser".into();

    let err = badge
        .run_reward_process(&admin(), &mut token, &user)
        .unwrap_err();
    assert_eq!(
        err,
        ContractError::Ledger(LedgerError::InsufficientBalance {
            account: admin(),
            needed: 1_000,
            available: 999,
        })
    );
    assert_eq!(token.snapshot(), before);
    assert!(badge.events().is_empty());
    assert_eq!(badge.rewards().next_sequence(), 0);

    // The trigger stays due after a failed cycle.
    assert!(badge
        .perform_upkeep(&admin(), &mut token, 50, &user)
        .is_err());
    assert!(badge.check_upkeep(50));
}

#[derive(Clone, Debug)]
enum Op {
    AddFlight { flight_id: u64, owner: usize },
    Reward { recipient: usize },
    Transfer { from: usize, to: usize, amount: u128 },
    Upkeep { advance: u64, recipient: usize },
}

const ACCOUNTS: [&str; 4] = [ADMIN, "0xalice", "0xbob", "0xcarol"];

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u64..20, 0usize..4).prop_map(|(flight_id, owner)| Op::AddFlight { flight_id, owner }),
        (0usize..4).prop_map(|recipient| Op::Reward { recipient }),
        (0usize..4, 0usize..4, 0u128..5_000)
            .prop_map(|(from, to, amount)| Op::Transfer { from, to, amount }),
        (0u64..7_200, 0usize..4).prop_map(|(advance, recipient)| Op::Upkeep { advance, recipient }),
    ]
}

proptest! {
    /// Supply is conserved and badges only grow, whatever the call sequence.
    #[test]
    fn supply_conserved_and_badges_monotonic(ops in prop::collection::vec(op(), 1..60)) {
        let (mut badge, mut token) = contracts(3_600);
        let mut now = 1_000_000u64;
        let mut seen: BTreeMap<AccountId, BTreeSet<u64>> = BTreeMap::new();

        for op in ops {
            match op {
                Op::AddFlight { flight_id, owner } => {
                    let _ = badge.add_flight(&admin(), flight_id, &ACCOUNTS[owner].to_string());
                }
                Op::Reward { recipient } => {
                    let _ = badge.run_reward_process(&admin(), &mut token, &ACCOUNTS[recipient].to_string());
                }
                Op::Transfer { from, to, amount } => {
                    let _ = token.transfer(ACCOUNTS[from], ACCOUNTS[to], amount);
                }
                Op::Upkeep { advance, recipient } => {
                    now += advance;
                    let _ = badge.perform_upkeep(&admin(), &mut token, now, &ACCOUNTS[recipient].to_string());
                }
            }

            prop_assert_eq!(token.circulating_sum(), TOTAL_ISSUANCE);
            for account in ACCOUNTS {
                let flights: BTreeSet<u64> = badge.flights().flights_of(account).iter().copied().collect();
                let previous = seen.entry(account.to_string()).or_default();
                prop_assert!(previous.is_subset(&flights));
                for flight_id in &flights {
                    prop_assert_eq!(badge.flights().owner_of(*flight_id).map(String::as_str), Some(account));
                }
                *previous = flights;
            }
        }
    }

    /// Reward events carry a gap-free sequence starting at zero.
    #[test]
    fn reward_sequence_is_gap_free(cycles in 1usize..20) {
        let (mut badge, mut token) = contracts(0);
        let user: AccountId = "0xuser".into();
        for _ in 0..cycles {
            badge.run_reward_process(&admin(), &mut token, &user).unwrap();
        }
        let indices: Vec<u64> = badge
            .events()
            .iter()
            .filter_map(|event| match event {
                BadgeEvent::RewardsPointsAssigned { sequence_index, .. } => Some(*sequence_index),
                _ => None,
            })
            .collect();
        prop_assert_eq!(indices, (0..cycles as u64).collect::<Vec<_>>());
        prop_assert_eq!(token.balance_of("0xuser"), 1_000 * cycles as u128);
    }
}
