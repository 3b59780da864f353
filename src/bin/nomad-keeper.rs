use std::{path::PathBuf, thread, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use nomad_rewards::{logging, AccountId, Config, DeployError, Deployment, Keeper, SystemClock};

/// Polls the NomadBadge upkeep trigger on a fixed cadence and performs the
/// reward cycle whenever it is due.
#[derive(Parser)]
#[command(name = "nomad-keeper", version)]
struct Args {
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding state.json (overrides `output_dir`)
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Account credited by each reward cycle
    #[arg(long)]
    recipient: AccountId,

    /// Keeper identity; the deployer when omitted
    #[arg(long)]
    caller: Option<AccountId>,

    /// Seconds between polls
    #[arg(long, default_value_t = 60)]
    every: u64,

    /// Stop after this many polls; poll forever when omitted
    #[arg(long)]
    ticks: Option<u64>,
}

fn main() -> Result<()> {
    logging::init_tracing();
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(dir) = args.out_dir {
        config.output_dir = dir;
    }
    let state_path = config.state_path();
    let deployment = Deployment::load(&state_path)
        .with_context(|| format!("loading {}", state_path.display()))?;
    let caller = args
        .caller
        .unwrap_or_else(|| deployment.deployer().clone());

    info!(
        badge = %deployment.badge().address(),
        every = args.every,
        %caller,
        recipient = %args.recipient,
        "keeper started"
    );

    let mut keeper = Keeper::new(SystemClock);
    let mut polled = 0u64;
    loop {
        // Reloaded every poll; CLI writes made in between are kept.
        match Deployment::keeper_tick(&state_path, &mut keeper, &caller, &args.recipient) {
            Ok(outcome) if outcome.performed() => {
                info!(events = outcome.events().len(), "reward cycle performed");
            }
            Ok(_) => {}
            // Retried on the next poll; the trigger was left due.
            Err(DeployError::Contract(err)) => warn!(error = %err, "upkeep failed"),
            Err(err) => {
                return Err(err).with_context(|| format!("polling {}", state_path.display()));
            }
        }

        polled += 1;
        if args.ticks.is_some_and(|limit| polled >= limit) {
            break;
        }
        thread::sleep(Duration::from_secs(args.every));
    }

    let stats = keeper.stats();
    info!(
        polls = stats.polls,
        performed = stats.performed,
        failed = stats.failed,
        "keeper stopped"
    );
    Ok(())
}
