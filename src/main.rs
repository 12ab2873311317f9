//! Trackroll headless demo
//!
//! Loads a level (a JSON file given as the first argument, or a built-in
//! demo map), registers a platform, a hostile ball, and a score sign, then
//! runs the simulation and logs what happened. Useful for profiling the tick
//! loop and for eyeballing determinism without a renderer.

use std::path::Path;
use std::process::ExitCode;

use glam::Vec3;

use trackroll::consts::SIM_DT;
use trackroll::level;
use trackroll::sim::{
    BonusKind, Body, BodyKind, CyclicPlatform, HostileBall, Map, ScoreSign, World, cell_flags,
};

fn main() -> ExitCode {
    env_logger::init();

    let map = match std::env::args().nth(1) {
        Some(path) => match level::load_level(Path::new(&path)) {
            Ok(map) => map,
            Err(err) => {
                log::error!("{err}");
                return ExitCode::FAILURE;
            }
        },
        None => demo_map(),
    };

    let mut world = World::new(0xC0FFEE);
    world.load_map(map);

    // A marble standing in for the player's ball
    let marble = Body::new(BodyKind::Marble, Vec3::new(3.5, 3.5, 0.3), 0.3);
    let marble_id = world.add_body(marble);
    world.state.player.playing = true;
    world.state.player.time_left = 120;

    world.add_hook(Box::new(CyclicPlatform::new(6, 6, 8, 8, 0.0, 2.0, 0.0, 1.0)));
    world.add_hook(Box::new(ScoreSign::new(
        BonusKind::Score,
        250,
        Vec3::new(3.5, 3.5, 1.5),
    )));
    HostileBall::spawn(&mut world, 12.5, 12.5);

    let seconds = 30.0;
    let ticks = (seconds / SIM_DT) as u32;
    log::info!("simulating {seconds}s ({ticks} ticks)");

    for _ in 0..ticks {
        if let Some(body) = world.state.bodies.get(marble_id) {
            world.state.player.position = body.position;
        } else {
            world.state.player.playing = false;
        }
        world.tick(SIM_DT);

        for event in world.state.drain_events() {
            log::info!("effect event: {event:?}");
        }
        if let Some(map) = world.state.map.as_mut()
            && let Some(region) = map.take_dirty()
        {
            log::trace!("terrain updated: {region:?}");
        }
    }

    log::info!(
        "done: score {}, {} bodies alive, player at {:?}",
        world.state.player.score,
        world.state.bodies.len(),
        world.state.player.position
    );
    ExitCode::SUCCESS
}

/// Small built-in level: flat ground, an acid pool, a sand strip, and a
/// raised ledge for the platform to meet.
fn demo_map() -> Map {
    let mut map = Map::new(16, 16);
    map.name = "demo".into();
    map.level_set = "builtin".into();

    for ix in 10..=12 {
        for iy in 2..=4 {
            map.cell_mut(ix, iy).flags |= cell_flags::ACID;
        }
    }
    for iy in 0..16 {
        map.cell_mut(5, iy).flags |= cell_flags::SAND;
    }
    map.set_region_heights(13, 13, 15, 15, |_, _, h| *h = [2.0; 5]);
    map.take_dirty();
    map
}
