use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::info;

use nomad_rewards::{
    automation::{Clock, SystemClock, Timestamp},
    logging, AccountId, Call, Config, Deployment,
};

#[derive(Parser)]
#[command(
    name = "nomad-rewards",
    version,
    about = "Deploy and drive the NomadBadge / NomadRewardToken contracts"
)]
struct Cli {
    /// TOML config file; defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding artifacts and state.json (overrides `output_dir`)
    #[arg(long, global = true)]
    out_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Deploy both contracts, set the update timer, write artifacts
    Deploy {
        #[arg(long)]
        admin: Option<AccountId>,
        /// Upkeep interval in seconds
        #[arg(long)]
        interval: Option<u64>,
        /// Replace an existing deployment in the output directory
        #[arg(long)]
        force: bool,
    },
    /// Record a flight on the owner's badge
    AddFlight {
        #[arg(long)]
        flight_id: u64,
        #[arg(long)]
        owner: AccountId,
        #[arg(long)]
        caller: Option<AccountId>,
    },
    /// Run one reward cycle for a recipient
    Reward {
        #[arg(long)]
        recipient: AccountId,
        #[arg(long)]
        caller: Option<AccountId>,
    },
    /// Set the upkeep interval
    SetTimer {
        #[arg(long)]
        seconds: u64,
        #[arg(long)]
        caller: Option<AccountId>,
    },
    /// Run a reward cycle if the upkeep interval has elapsed
    Upkeep {
        #[arg(long)]
        recipient: AccountId,
        /// UNIX seconds; the system clock when omitted
        #[arg(long)]
        now: Option<Timestamp>,
        #[arg(long)]
        caller: Option<AccountId>,
    },
    /// Print an account's point balance
    Balance {
        #[arg(long)]
        account: AccountId,
    },
    /// Print the flights on an account's badge
    Badge {
        #[arg(long)]
        account: AccountId,
    },
    /// Apply a JSON array of calls in order
    Call {
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Deserialize)]
struct CallRequest {
    caller: Option<AccountId>,
    now: Option<Timestamp>,
    call: Call,
}

#[derive(Serialize)]
struct BadgeView<'a> {
    account: &'a str,
    flights: &'a [u64],
}

//==================== shared helpers ====================//

struct Workspace {
    config: Config,
    state_path: PathBuf,
}

impl Workspace {
    fn open(cli: &Cli) -> Result<Self> {
        let mut config = Config::load(cli.config.as_deref())?;
        if let Some(dir) = &cli.out_dir {
            config.output_dir = dir.clone();
        }
        let state_path = config.state_path();
        Ok(Self { config, state_path })
    }

    fn load(&self) -> Result<Deployment> {
        Deployment::load(&self.state_path).with_context(|| {
            format!(
                "no deployment at {} (run `nomad-rewards deploy` first)",
                self.state_path.display()
            )
        })
    }

    fn save(&self, deployment: &Deployment) -> Result<()> {
        deployment
            .save(&self.state_path)
            .with_context(|| format!("saving {}", self.state_path.display()))
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn submit(
    ws: &Workspace,
    caller: Option<AccountId>,
    call: Call,
    now: Option<Timestamp>,
) -> Result<()> {
    let mut deployment = ws.load()?;
    let caller = caller.unwrap_or_else(|| deployment.deployer().clone());
    let now = now.unwrap_or_else(|| SystemClock.now());
    let receipt = deployment.execute(&caller, call, now)?;
    ws.save(&deployment)?;
    print_json(&receipt)
}

//==================== commands ====================//

fn deploy_cmd(
    ws: &mut Workspace,
    admin: Option<AccountId>,
    interval: Option<u64>,
    force: bool,
) -> Result<()> {
    if let Some(admin) = admin {
        ws.config.administrator = admin;
    }
    if let Some(interval) = interval {
        ws.config.update_interval_secs = interval;
    }
    ws.config.validate()?;
    if ws.state_path.exists() && !force {
        bail!(
            "{} already holds a deployment; pass --force to replace it",
            ws.state_path.display()
        );
    }

    let deployment = Deployment::deploy(&ws.config)?;
    deployment.write_artifacts(&ws.config.output_dir)?;
    ws.save(&deployment)?;
    info!(
        interval_secs = ws.config.update_interval_secs,
        "automation update timer set"
    );

    println!("Deploying contracts with the account: {}", deployment.deployer());
    println!(
        "{} deployed at: {}",
        deployment.token().name(),
        deployment.token().address()
    );
    println!(
        "{} deployed at: {}",
        deployment.badge().name(),
        deployment.badge().address()
    );
    println!("Artifacts → {}", ws.config.output_dir.display());
    Ok(())
}

fn call_file_cmd(ws: &Workspace, file: &Path) -> Result<()> {
    let bytes = fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let requests: Vec<CallRequest> =
        serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", file.display()))?;

    let mut deployment = ws.load()?;
    let mut receipts = Vec::with_capacity(requests.len());
    for (idx, request) in requests.into_iter().enumerate() {
        let caller = request
            .caller
            .unwrap_or_else(|| deployment.deployer().clone());
        let now = request.now.unwrap_or_else(|| SystemClock.now());
        match deployment.execute(&caller, request.call, now) {
            Ok(receipt) => {
                // Calls before a failure stay applied.
                ws.save(&deployment)?;
                receipts.push(receipt);
            }
            Err(err) => {
                print_json(&receipts)?;
                return Err(err).with_context(|| format!("call #{idx} failed"));
            }
        }
    }
    print_json(&receipts)
}

//==================== main ====================//

fn main() -> Result<()> {
    logging::init_tracing();
    let cli = Cli::parse();
    let mut ws = Workspace::open(&cli)?;

    match cli.command {
        Command::Deploy {
            admin,
            interval,
            force,
        } => deploy_cmd(&mut ws, admin, interval, force),
        Command::AddFlight {
            flight_id,
            owner,
            caller,
        } => submit(&ws, caller, Call::AddFlight { flight_id, owner }, None),
        Command::Reward { recipient, caller } => {
            submit(&ws, caller, Call::RunRewardProcess { recipient }, None)
        }
        Command::SetTimer { seconds, caller } => submit(
            &ws,
            caller,
            Call::SetUpdateTimer {
                interval_secs: seconds,
            },
            None,
        ),
        Command::Upkeep {
            recipient,
            now,
            caller,
        } => submit(&ws, caller, Call::PerformUpkeep { recipient }, now),
        Command::Balance { account } => {
            let deployment = ws.load()?;
            println!("{}", deployment.token().balance_of(&account));
            Ok(())
        }
        Command::Badge { account } => {
            let deployment = ws.load()?;
            print_json(&BadgeView {
                account: &account,
                flights: deployment.badge().flights().flights_of(&account),
            })
        }
        Command::Call { file } => call_file_cmd(&ws, &file),
    }
}
