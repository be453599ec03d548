//! Headless collision walkthrough
//!
//! A trigger circle follows a scripted path through a handful of obstacles
//! and logs every enter and exit. Pass a `.toml` or `.ron` file to override
//! the world settings:
//!
//! ```text
//! cargo run --bin collision_demo -- collision_demo/config/world.toml
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::thread;

use collision2d::foundation::logging;
use collision2d::prelude::*;
use thiserror::Error;

const PLAYER: EntityId = 1;
const TICKS: u32 = 600;
const DT: f32 = 1.0 / 60.0;

#[derive(Error, Debug)]
enum DemoError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("physics: {0}")]
    Physics(#[from] PhysicsError),

    #[error("obstacle spawner thread panicked")]
    Spawner,
}

#[derive(Default)]
struct ContactStats {
    enters: BTreeMap<EntityId, u32>,
    exits: BTreeMap<EntityId, u32>,
    touching: u32,
}

/// Logs contacts for the player and keeps per-obstacle counts
struct ContactLogger {
    names: BTreeMap<EntityId, &'static str>,
    stats: Rc<RefCell<ContactStats>>,
}

impl ContactLogger {
    fn name(&self, id: EntityId) -> &str {
        self.names.get(&id).copied().unwrap_or("unknown")
    }
}

impl CollisionListener for ContactLogger {
    fn on_collision_enter(&mut self, _this: EntityId, other: EntityId, normal: Vec2, penetration: f32) {
        log::info!(
            "enter {:<10} normal ({:+.2}, {:+.2}) depth {:.3}",
            self.name(other),
            normal.x,
            normal.y,
            penetration
        );
        let mut stats = self.stats.borrow_mut();
        *stats.enters.entry(other).or_default() += 1;
        stats.touching += 1;
    }

    fn on_collision_exit(&mut self, _this: EntityId, other: EntityId) {
        log::info!("exit  {}", self.name(other));
        let mut stats = self.stats.borrow_mut();
        *stats.exits.entry(other).or_default() += 1;
        stats.touching = stats.touching.saturating_sub(1);
    }
}

fn load_config() -> Result<CollisionWorldConfig, DemoError> {
    match std::env::args().nth(1) {
        Some(path) => {
            println!("Loading world config from {path}");
            Ok(CollisionWorldConfig::load_from_file(path)?)
        }
        None => Ok(CollisionWorldConfig::default()),
    }
}

/// Piecewise-linear path through the obstacle field
fn player_position(tick: u32) -> Vec2 {
    const WAYPOINTS: [(f32, f32); 5] = [(-6.0, 0.0), (-3.0, 2.0), (0.0, 2.9), (3.0, -1.0), (6.0, -3.0)];

    let t = tick as f32 / TICKS as f32 * (WAYPOINTS.len() - 1) as f32;
    let segment = (t as usize).min(WAYPOINTS.len() - 2);
    let local = t - segment as f32;
    let (x0, y0) = WAYPOINTS[segment];
    let (x1, y1) = WAYPOINTS[segment + 1];
    Vec2::new(x0 + (x1 - x0) * local, y0 + (y1 - y0) * local)
}

fn build_world(
    config: CollisionWorldConfig,
    stats: Rc<RefCell<ContactStats>>,
) -> Result<(CollisionWorld, ColliderId, BTreeMap<EntityId, ColliderId>), DemoError> {
    let mut world = CollisionWorld::new(config)?;

    let obstacle_layer = world.layers().get("hazard").unwrap_or(PhysicsLayers::ENVIRONMENT);
    let mut names = BTreeMap::new();
    names.insert(10, "boulder");
    names.insert(11, "platform");
    names.insert(12, "crate");
    names.insert(13, "wedge");
    names.insert(14, "late-spawn");

    let logger = world.add_listener(Box::new(ContactLogger { names, stats }));

    let player = world.add_collider(
        Collider::new(PLAYER)
            .with_shape(Shape::circle(0.4)?)
            .with_layer(PhysicsLayers::PLAYER)
            .with_mask(LayerMask::from_layer(PhysicsLayers::ENVIRONMENT).with_layer(obstacle_layer))
            .as_trigger(true)
            .with_listener(logger)
            .with_transform(Transform2D::new(player_position(0), 0.0)),
    )?;

    let obstacles = [
        (10, Shape::circle(0.6)?, Transform2D::from_position(-3.0, 2.0)),
        (11, Shape::box_shape(1.5, 0.3)?, Transform2D::from_position(0.0, 3.0)),
        (12, Shape::box_shape(0.5, 0.5)?, Transform2D::new(Vec2::new(3.0, -1.0), 0.6)),
        (
            13,
            Shape::polygon(vec![Vec2::new(-0.6, -0.4), Vec2::new(0.6, -0.4), Vec2::new(0.0, 0.7)])?,
            Transform2D::from_position(4.5, -2.0),
        ),
    ];

    let mut ids = BTreeMap::new();
    for (owner, shape, transform) in obstacles {
        let id = world.add_collider(
            Collider::new(owner)
                .with_shape(shape)
                .with_layer(obstacle_layer)
                .with_mask(LayerMask::from_layer(PhysicsLayers::PLAYER))
                .with_transform(transform),
        )?;
        ids.insert(owner, id);
    }

    Ok((world, player, ids))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_with_default("info");

    println!("=== Collision2D Walkthrough ===");
    println!("Player circle follows a scripted path past four obstacles");
    println!();

    let config = load_config()?;
    let stats = Rc::new(RefCell::new(ContactStats::default()));
    let (mut world, player, obstacles) = build_world(config, Rc::clone(&stats))?;

    // A second obstacle lands on the path from another thread
    let sender = world.command_sender();
    let spawner = thread::spawn(move || -> Result<(), PhysicsError> {
        sender.add_collider(
            Collider::new(14)
                .with_shape(Shape::circle(0.5)?)
                .with_layer(PhysicsLayers::ENVIRONMENT)
                .with_mask(LayerMask::from_layer(PhysicsLayers::PLAYER))
                .with_transform(Transform2D::from_position(5.2, -2.6)),
        )
    });
    spawner.join().map_err(|_| DemoError::Spawner)??;

    for tick in 0..=TICKS {
        world.set_transform(player, Transform2D::new(player_position(tick), 0.0))?;

        // The crate is cleared once the player is halfway along the path
        if tick == TICKS / 2 {
            if let Some(crate_id) = obstacles.get(&12) {
                log::info!("removing crate at t={:.2}s", tick as f32 * DT);
                world.remove_collider(*crate_id)?;
            }
        }

        world.step();

        if tick % 120 == 0 {
            let pos = player_position(tick);
            log::debug!(
                "t={:.2}s player ({:+.2}, {:+.2}) active pairs {}",
                tick as f32 * DT,
                pos.x,
                pos.y,
                world.active_pair_count()
            );
        }
    }

    let stats = stats.borrow();
    println!();
    println!("=== Summary ({} steps) ===", world.step_count());
    for owner in stats.enters.keys().chain(stats.exits.keys()).collect::<BTreeSet<_>>() {
        println!(
            "  obstacle {owner}: {} enter(s), {} exit(s)",
            stats.enters.get(owner).copied().unwrap_or(0),
            stats.exits.get(owner).copied().unwrap_or(0)
        );
    }
    println!("  still touching: {}", stats.touching);
    println!("  colliders alive: {}", world.collider_count());

    Ok(())
}
