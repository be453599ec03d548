//! Broad-phase stress run
//!
//! Spawns a field of random circles and boxes that drift and bounce inside
//! an arena, then reports step timings alongside contact and event counts.
//!
//! ```text
//! cargo run --release --bin broadphase_stress -- [count] [seed]
//! ```

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use collision2d::foundation::logging;
use collision2d::prelude::*;
use rand::prelude::*;

const ARENA_HALF: f32 = 60.0;
const STEPS: u32 = 300;
const DT: f32 = 1.0 / 60.0;

struct Body {
    id: ColliderId,
    position: Vec2,
    velocity: Vec2,
    angle: f32,
    spin: f32,
}

/// Counts transitions without logging each one
#[derive(Default, Clone)]
struct Tally {
    enters: Rc<Cell<u64>>,
    exits: Rc<Cell<u64>>,
}

impl CollisionListener for Tally {
    fn on_collision_enter(&mut self, _this: EntityId, _other: EntityId, _normal: Vec2, _penetration: f32) {
        self.enters.set(self.enters.get() + 1);
    }

    fn on_collision_exit(&mut self, _this: EntityId, _other: EntityId) {
        self.exits.set(self.exits.get() + 1);
    }
}

fn parse_args() -> (usize, u64) {
    let mut args = std::env::args().skip(1);
    let count = args.next().and_then(|s| s.parse().ok()).unwrap_or(2000);
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(0x00c0_ffee);
    (count, seed)
}

fn random_shape(rng: &mut StdRng) -> PhysicsResult<Shape> {
    if rng.gen_bool(0.5) {
        Shape::circle(rng.gen_range(0.2..1.0))
    } else {
        Shape::box_shape(rng.gen_range(0.2..1.0), rng.gen_range(0.2..1.0))
    }
}

fn bounce(position: &mut f32, velocity: &mut f32) {
    if position.abs() > ARENA_HALF {
        *position = position.clamp(-ARENA_HALF, ARENA_HALF);
        *velocity = -*velocity;
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_with_default("info");

    let (count, seed) = parse_args();
    println!("=== Broad-phase Stress ===");
    println!("{count} bodies, seed {seed:#x}, {STEPS} steps");
    println!();

    let mut rng = StdRng::seed_from_u64(seed);
    let config = CollisionWorldConfig {
        report_stay_events: false,
        ..CollisionWorldConfig::default()
    };
    let mut world = CollisionWorld::new(config)?;

    // Only every tenth body listens so the callback cost stays small
    let counts = Tally::default();
    let tally = world.add_listener(Box::new(counts.clone()));

    let setup_start = Instant::now();
    let mut bodies = Vec::with_capacity(count);
    for owner in 0..count {
        let position = Vec2::new(
            rng.gen_range(-ARENA_HALF..ARENA_HALF),
            rng.gen_range(-ARENA_HALF..ARENA_HALF),
        );
        let angle = rng.gen_range(-std::f32::consts::PI..std::f32::consts::PI);
        let layer = if rng.gen_bool(0.8) {
            PhysicsLayers::ENEMY
        } else {
            PhysicsLayers::PROJECTILE
        };

        let mut collider = Collider::new(EntityId::try_from(owner)?)
            .with_shape(random_shape(&mut rng)?)
            .with_layer(layer)
            .with_mask(LayerMask::ENEMY | LayerMask::PROJECTILE)
            .with_transform(Transform2D::new(position, angle));
        if owner % 10 == 0 {
            collider = collider.with_listener(tally);
        }

        bodies.push(Body {
            id: world.add_collider(collider)?,
            position,
            velocity: Vec2::new(rng.gen_range(-4.0..4.0), rng.gen_range(-4.0..4.0)),
            angle,
            spin: rng.gen_range(-1.0..1.0),
        });
    }
    println!("Setup: {:.2?}", setup_start.elapsed());

    let run_start = Instant::now();
    let mut peak_pairs = 0;
    let mut total_pairs = 0;
    let mut total_events = 0;

    for step in 1..=STEPS {
        for body in &mut bodies {
            body.position += body.velocity * DT;
            body.angle += body.spin * DT;
            bounce(&mut body.position.x, &mut body.velocity.x);
            bounce(&mut body.position.y, &mut body.velocity.y);
            world.set_transform(body.id, Transform2D::new(body.position, body.angle))?;
        }

        world.step();

        let pairs = world.active_pair_count();
        peak_pairs = peak_pairs.max(pairs);
        total_pairs += pairs;
        total_events += world.events().len();

        if step % 60 == 0 {
            log::info!(
                "step {step:>4}: {pairs} contacts, {} events, {:.2?} elapsed",
                world.events().len(),
                run_start.elapsed()
            );
        }
    }

    let elapsed = run_start.elapsed();
    world.remove_listener(tally)?;

    println!();
    println!("=== Results ===");
    println!("  total time:        {elapsed:.2?}");
    println!("  per step:          {:.2?}", elapsed / STEPS);
    println!("  mean contacts:     {:.1}", total_pairs as f64 / f64::from(STEPS));
    println!("  peak contacts:     {peak_pairs}");
    println!("  transition events: {total_events}");
    println!(
        "  listener saw:      {} enter(s), {} exit(s)",
        counts.enters.get(),
        counts.exits.get()
    );

    Ok(())
}
