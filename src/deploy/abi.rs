//! Interface descriptors written next to each deployed address.

use serde::Serialize;

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AbiParam {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub ty: &'static str,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StateMutability {
    View,
    Nonpayable,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AbiFunction {
    pub name: &'static str,
    pub inputs: Vec<AbiParam>,
    pub outputs: Vec<AbiParam>,
    pub state_mutability: StateMutability,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct AbiEvent {
    pub name: &'static str,
    pub inputs: Vec<AbiParam>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContractAbi {
    pub contract_name: &'static str,
    pub address: String,
    pub functions: Vec<AbiFunction>,
    pub events: Vec<AbiEvent>,
}

fn param(name: &'static str, ty: &'static str) -> AbiParam {
    AbiParam { name, ty }
}

fn view(name: &'static str, inputs: Vec<AbiParam>, output: &'static str) -> AbiFunction {
    AbiFunction {
        name,
        inputs,
        outputs: vec![param("", output)],
        state_mutability: StateMutability::View,
    }
}

fn call(name: &'static str, inputs: Vec<AbiParam>) -> AbiFunction {
    AbiFunction {
        name,
        inputs,
        outputs: Vec::new(),
        state_mutability: StateMutability::Nonpayable,
    }
}

pub fn reward_token_abi(address: &str) -> ContractAbi {
    ContractAbi {
        contract_name: crate::ledger::TOKEN_NAME,
        address: address.to_string(),
        functions: vec![
            view("name", vec![], "string"),
            view("symbol", vec![], "string"),
            view("decimals", vec![], "uint8"),
            view("totalSupply", vec![], "uint256"),
            view("balanceOf", vec![param("account", "address")], "uint256"),
        ],
        events: vec![AbiEvent {
            name: "Transfer",
            inputs: vec![
                param("from", "address"),
                param("to", "address"),
                param("value", "uint256"),
            ],
        }],
    }
}

pub fn badge_abi(address: &str) -> ContractAbi {
    ContractAbi {
        contract_name: crate::badge::BADGE_NAME,
        address: address.to_string(),
        functions: vec![
            view("name", vec![], "string"),
            call(
                "addFlight",
                vec![param("flightId", "uint256"), param("owner", "address")],
            ),
            view("flightsOf", vec![param("owner", "address")], "uint256[]"),
            call("runRewardProcess", vec![param("recipient", "address")]),
            call("setUpdateTimer", vec![param("intervalSeconds", "uint256")]),
            view("checkUpkeep", vec![param("currentTimestamp", "uint256")], "bool"),
            call(
                "performUpkeep",
                vec![
                    param("currentTimestamp", "uint256"),
                    param("recipient", "address"),
                ],
            ),
        ],
        events: vec![
            AbiEvent {
                name: "FlightAdded",
                inputs: vec![param("flightId", "uint256")],
            },
            AbiEvent {
                name: "RewardsProvided",
                inputs: vec![param("recipient", "address")],
            },
            AbiEvent {
                name: "RewardsPointsAssigned",
                inputs: vec![
                    param("sequenceIndex", "uint256"),
                    param("recipient", "address"),
                    param("pointsAwarded", "uint256"),
                ],
            },
        ],
    }
}
