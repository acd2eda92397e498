//! # Voxel Terrain Demo
//!
//! Headless run of the terrain engine: generates a world, meshes it, knocks out the
//! supports under an overhang so it collapses, lets the debris settle, and writes the
//! minimap to `minimap.png`.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release -- [config.json]
//! ```

use cgmath::Point3;
use log::info;
use web_time::Instant;

use voxel_terrain::engine_state::{
    voxels::{block::Block, generation::generate_terrain},
    EditCommand, EngineConfig, EngineError, TerrainEngine,
};

const FRAME_TIME: f32 = 1.0 / 60.0;
const MAX_FRAMES: usize = 100_000;

fn main() -> Result<(), EngineError> {
    voxel_terrain::init_logger();

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig {
            world_size: [256, 64, 256],
            ..EngineConfig::default()
        },
    };

    let started = Instant::now();
    let mut engine = TerrainEngine::new(config)?;
    let written = generate_terrain(engine.world(), 7);
    info!("Generated {} solid voxels", written);

    let frames = run_until_settled(&mut engine);
    info!(
        "Initial mesh of {} chunks ready after {} frame(s), {:?}",
        engine.chunks().live_mesh_count(),
        frames,
        started.elapsed()
    );

    // Clear a pit, stand a slab on a single pillar inside it, then cut the pillar.
    let top = engine.world().size_y() as i32 - 1;
    let slab_y = top - 3;
    engine.apply_edit(EditCommand::ClearRegion {
        min: Point3::new(8, 2, 8),
        max: Point3::new(40, top, 40),
    });
    for x in 20..26 {
        for z in 20..26 {
            engine.apply_edit(EditCommand::SetBlock {
                position: Point3::new(x, slab_y, z),
                block: Block::rgb(180, 90, 40),
            });
        }
    }
    for y in 2..slab_y {
        engine.apply_edit(EditCommand::SetBlock {
            position: Point3::new(22, y, 22),
            block: Block::rgb(120, 120, 120),
        });
    }
    run_until_settled(&mut engine);

    engine.apply_edit(EditCommand::ClearBlock {
        position: Point3::new(22, slab_y / 2, 22),
    });

    let frames = run_until_settled(&mut engine);
    info!(
        "Collapse settled after {} frame(s), {} particle(s) left",
        frames,
        engine.particles().len()
    );

    engine.minimap().save_png("minimap.png")?;
    info!("Minimap written to minimap.png");

    engine.shutdown();
    Ok(())
}

/// Runs frames until no work is pending and nothing is falling.
fn run_until_settled(engine: &mut TerrainEngine) -> usize {
    for frame in 0..MAX_FRAMES {
        engine.update(FRAME_TIME, Instant::now());
        if engine.is_idle() && engine.structures().is_empty() && engine.particles().is_empty() {
            return frame + 1;
        }
        std::thread::sleep(std::time::Duration::from_millis(1));
    }
    MAX_FRAMES
}
