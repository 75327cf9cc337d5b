//! gamewire demo entry point.
//!
//! Drives the coordination layer headless for a fixed number of ticks:
//!
//! 1. Load `runtime.ini` (or the file given with `--config`)
//! 2. Set up the runtime with a demo factory that builds coins and bullets
//! 3. Subscribe a HUD entity to score events and register tick observers
//! 4. Each tick, randomly check objects out of the pools, return them, and
//!    publish events
//! 5. Log pool statistics and shut the factory worker down
//!
//! # Running
//!
//! ```sh
//! RUST_LOG=debug cargo run --release -- --ticks 300
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use bevy_ecs::prelude::*;
use clap::Parser;

use gamewire::components::listenerowner::ListenerOwner;
use gamewire::events::gameevent::{GameEvent, payload};
use gamewire::resources::eventbus::{EventBus, Listener};
use gamewire::resources::listenerregistry::ListenerRegistry;
use gamewire::resources::objectpool::ObjectPools;
use gamewire::resources::poolfactory::{Prefab, prefab};
use gamewire::resources::runtimeconfig::RuntimeConfig;
use gamewire::resources::tickobservers::{FixedUpdate, TickDispatcher, TickObserverRef, Update};
use gamewire::runtime::{build_frame_schedule, run_frame, setup_runtime, shutdown_runtime};
use gamewire::systems::objectpool::{get_from_pool, init_pool, return_to_pool};

/// gamewire headless demo
#[derive(Parser)]
#[command(version, about = "Runs the gamewire coordination layer headless with random traffic.")]
struct Cli {
    /// INI configuration file.
    #[arg(long, value_name = "PATH", default_value = "./runtime.ini")]
    config: PathBuf,

    /// Number of frames to run before exiting.
    #[arg(long, value_name = "N", default_value_t = 600)]
    ticks: u32,
}

#[derive(Component, Debug)]
struct Coin {
    value: u32,
}

#[derive(Component, Debug)]
struct Bullet;

/// Entities the demo currently has checked out, per pool.
#[derive(Resource, Default)]
struct Live {
    coins: Vec<Entity>,
    bullets: Vec<Entity>,
}

fn demo_factory(key: &str) -> Option<Prefab> {
    // Simulate expensive construction.
    std::thread::sleep(Duration::from_millis(2));
    match key {
        "coin" => Some(prefab(Coin {
            value: fastrand::u32(1..=10),
        })),
        "bullet" => Some(prefab(Bullet)),
        _ => None,
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    log::info!("Hello, world! This is gamewire!");
    let mut config = RuntimeConfig::with_path(&cli.config);
    if let Err(e) = config.load_from_file() {
        log::warn!("{}; using defaults", e);
    }
    let frame_time = config.frame_duration();

    // --------------- ECS world + resources ---------------
    let mut world = World::new();
    setup_runtime(&mut world, config, demo_factory);
    world.init_resource::<Live>();

    init_pool::<Coin>(&mut world, "coin", 8);
    init_pool::<Bullet>(&mut world, "bullet", 16);

    // HUD listens to score changes until it is despawned halfway through.
    let hud = world.spawn(ListenerOwner).id();
    let score = Arc::new(AtomicU32::new(0));
    {
        let registry = world.resource::<ListenerRegistry>();
        let s = score.clone();
        registry.add_listener(
            hud,
            GameEvent::ScoreChanged,
            Listener::new(move |p| {
                if let Some(total) = p.and_then(|p| p.downcast_ref::<u32>()) {
                    s.store(*total, Ordering::Relaxed);
                    log::debug!("hud: score {}", total);
                }
            }),
        );
        registry.add_listener(
            hud,
            GameEvent::GameOver,
            Listener::new(|_| log::info!("hud: game over")),
        );
    }

    let fixed_steps = Arc::new(AtomicU32::new(0));
    {
        let f = fixed_steps.clone();
        world
            .resource::<TickDispatcher<FixedUpdate>>()
            .register_observer(TickObserverRef::new(move |_: f32| {
                f.fetch_add(1, Ordering::Relaxed);
            }));
        world
            .resource::<TickDispatcher<Update>>()
            .register_observer(TickObserverRef::new(|dt: f32| {
                log::trace!("update: dt={:.4}", dt);
            }));
    }

    let mut frame = build_frame_schedule();
    world.resource::<EventBus>().invoke_event(GameEvent::GameStarted, None);

    // --------------- Main loop ---------------
    let mut total_score = 0u32;
    let mut last = Instant::now();
    for tick in 0..cli.ticks {
        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f32();
        last = now;

        random_traffic(&mut world, &mut total_score);
        run_frame(&mut world, &mut frame, dt);

        if tick == cli.ticks / 2 {
            log::info!("despawning hud");
            world.despawn(hud);
        }

        let spent = now.elapsed().as_secs_f32();
        if spent < frame_time {
            std::thread::sleep(Duration::from_secs_f32(frame_time - spent));
        }
    }

    world.resource::<EventBus>().invoke_event(GameEvent::GameOver, None);

    let pools = world.resource::<ObjectPools>();
    let mut keys: Vec<&str> = pools.keys().collect();
    keys.sort_unstable();
    for key in keys {
        if let Some(stats) = pools.stats(key) {
            log::info!(
                "pool '{}': total={} available={} in_use={}",
                key,
                stats.total,
                stats.available,
                stats.in_use
            );
        }
    }
    log::info!(
        "score={} (hud saw {}), fixed steps={}, hud owners left={}",
        total_score,
        score.load(Ordering::Relaxed),
        fixed_steps.load(Ordering::Relaxed),
        world.resource::<ListenerRegistry>().owner_count()
    );

    shutdown_runtime(&mut world);
}

fn random_traffic(world: &mut World, total_score: &mut u32) {
    if fastrand::u8(..4) == 0 {
        get_from_pool::<Coin>(world, "coin", None, |world, entity| {
            if let Some(entity) = entity {
                world.resource_mut::<Live>().coins.push(entity);
            }
        });
    }
    if fastrand::bool() {
        get_from_pool::<Bullet>(world, "bullet", None, |world, entity| {
            if let Some(entity) = entity {
                world.resource_mut::<Live>().bullets.push(entity);
            }
        });
    }

    let coin = {
        let mut live = world.resource_mut::<Live>();
        if !live.coins.is_empty() && fastrand::u8(..5) == 0 {
            let index = fastrand::usize(..live.coins.len());
            Some(live.coins.swap_remove(index))
        } else {
            None
        }
    };
    if let Some(coin) = coin {
        let value = world.get::<Coin>(coin).map_or(0, |c| c.value);
        *total_score += value;
        let bus = world.resource::<EventBus>();
        bus.invoke_event(GameEvent::CoinCollected, Some(payload(value)));
        bus.invoke_event(GameEvent::ScoreChanged, Some(payload(*total_score)));
        if let Err(e) = return_to_pool(world, "coin", coin) {
            log::error!("{}", e);
        }
    }

    let bullet = {
        let mut live = world.resource_mut::<Live>();
        if live.bullets.len() > 4 {
            Some(live.bullets.remove(0))
        } else {
            None
        }
    };
    if let Some(bullet) = bullet {
        if let Err(e) = return_to_pool(world, "bullet", bullet) {
            log::error!("{}", e);
        }
    }
}
