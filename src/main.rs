use clap::Parser;
use log::{error, info, warn};

use transit_sim::simulation::{SpawnRequest, Transform, TransitConfig, TransitWorld};

#[derive(Parser)]
#[command(name = "transit_sim")]
#[command(about = "Hub-to-destination transit shuttle simulation")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "1200")]
    ticks: u32,

    /// Time delta per tick in seconds
    #[arg(long, default_value = "0.5")]
    delta: f32,

    /// Seed for spawn point selection
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Seconds between shuttle decisions
    #[arg(long, default_value = "30")]
    cooldown: f32,

    /// Spawn a late joiner at the hub every this many ticks
    #[arg(long, default_value = "40")]
    spawn_every: u32,

    /// Disable transit at this tick to exercise teardown
    #[arg(long)]
    disable_at: Option<u32>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run_headless(&cli) {
        error!("Simulation failed: {:#}", e);
        std::process::exit(1);
    }
}

/// Run the simulation in headless mode
fn run_headless(cli: &Cli) -> anyhow::Result<()> {
    info!("Running transit simulation in headless mode...");
    info!("Ticks: {}, Delta: {}s, Cooldown: {}s", cli.ticks, cli.delta, cli.cooldown);

    let config = TransitConfig {
        enabled: true,
        cooldown_secs: cli.cooldown,
        ..TransitConfig::default()
    };
    let (mut world, destination) = TransitWorld::create_demo_world(config, cli.seed)?;

    info!("Initial state:");
    world.print_summary();

    let mut spawned = 0u32;
    let mut departed = 0usize;
    let mut left_behind = 0usize;

    for tick in 1..=cli.ticks {
        if Some(tick) == cli.disable_at {
            world.set_enabled(false);
        }

        if cli.spawn_every > 0 && tick % cli.spawn_every == 0 {
            let name = format!("Passenger {}", spawned);
            let mut request = SpawnRequest::new(&name, Some(destination));
            if world.request_spawn(&mut request).is_some() {
                spawned += 1;
            }
        }

        board_waiting_passengers(&mut world);

        for report in world.tick(cli.delta) {
            departed += report.revoked.len();
            left_behind += report.ejected.len();
        }

        if tick % 120 == 0 {
            info!("--- After tick {} ({:.1}s simulated time) ---", tick, world.time);
            world.print_summary();
        }
    }

    info!("=== SIMULATION COMPLETE ===");
    world.print_summary();
    info!("Passengers spawned: {}", spawned);
    info!("Passengers departed: {}", departed);
    info!("Left behind: {}", left_behind);

    world.shutdown();
    Ok(())
}

/// Everyone holding a token at the hub walks onto a docked shuttle
fn board_waiting_passengers(world: &mut TransitWorld) {
    let Some(shuttle) = world
        .shuttles()
        .map(|s| s.entity)
        .find(|s| world.is_at_hub(*s) && !world.jumps.is_jumping(*s))
    else {
        return;
    };

    let waiting: Vec<_> = world
        .ledger
        .holders()
        .filter(|actor| world.store.get(*actor).is_some_and(|e| e.parent == world.find_hub()))
        .collect();

    for (seat, actor) in waiting.into_iter().enumerate() {
        let local = Transform::at(seat as f32 * 0.5, 0.0);
        if let Err(e) = world.board(actor, shuttle, local) {
            warn!("Passenger {:?} could not board: {:#}", actor, e);
        }
    }
}
