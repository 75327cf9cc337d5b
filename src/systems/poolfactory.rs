//! Pool factory worker thread.
//!
//! [`factory_worker`] runs on its own OS thread, owns the [`PoolFactory`], and
//! processes [`FactoryCmd`] messages one at a time. Each finished batch is
//! wrapped in a main thread action so the delivery continuation runs where
//! the world lives, never on the worker.
//!
//! See also: [`crate::resources::poolfactory`].

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use bevy_ecs::prelude::World;
use crossbeam_channel::Receiver;
use log::{debug, error};

use crate::resources::mainthread::MainThreadSender;
use crate::resources::poolfactory::{FactoryCmd, PoolFactory, Prefab};

/// Entry point of the factory worker thread.
///
/// Blocks on the command channel until it receives [`FactoryCmd::Shutdown`]
/// or every sender is dropped. A panicking factory counts as a creation
/// failure: the delivery still runs, with no prefabs.
pub fn factory_worker(
    factory: Arc<dyn PoolFactory>,
    rx_cmd: Receiver<FactoryCmd>,
    main: MainThreadSender,
) {
    debug!(
        "pool factory thread starting (id={:?})",
        std::thread::current().id()
    );

    while let Ok(cmd) = rx_cmd.recv() {
        match cmd {
            FactoryCmd::Create {
                key,
                count,
                deliver,
            } => {
                let prefabs: Vec<Prefab> =
                    match catch_unwind(AssertUnwindSafe(|| factory.create_many(&key, count))) {
                        Ok(prefabs) => prefabs,
                        Err(_) => {
                            error!("pool factory panicked creating {} x '{}'", count, key);
                            Vec::new()
                        }
                    };
                debug!(
                    "pool factory created {}/{} object(s) for '{}'",
                    prefabs.len(),
                    count,
                    key
                );
                main.enqueue(move |world: &mut World| deliver(world, prefabs));
            }
            FactoryCmd::Shutdown => break,
        }
    }

    debug!("pool factory thread exiting");
}
