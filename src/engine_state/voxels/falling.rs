//! # Falling Structures
//!
//! A [`CollapsingStructure`] is a voxel cluster carved out of the world after losing
//! its ground connection. It falls as one rigid body: its voxels keep their relative
//! layout and only the whole set is translated. Collisions test every translated voxel
//! against the live terrain. On impact the velocity is reflected on the colliding axes
//! and damped elsewhere; once the vertical speed after a bounce falls below the rest
//! threshold the structure dissolves into particles.

use std::collections::HashMap;

use cgmath::{InnerSpace, Point3, Quaternion, Rad, Rotation3, Vector3, Zero};

use crate::engine_state::rendering::meshing::{naive::mesh_voxel_set, tesselator::Tesselator};

use super::{
    block::Block,
    particles::Particle,
    world::WorldView,
};

/// Rotation applied to the visual orientation at every bounce.
const BOUNCE_SPIN: Rad<f32> = Rad(0.35);

/// Physical constants for falling structures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallSettings {
    /// Downward acceleration in voxels per second squared
    pub gravity: f32,
    /// Fraction of speed kept after a bounce
    pub bounce: f32,
    /// Vertical speed below which a bounced structure comes to rest
    pub rest_speed: f32,
}

impl Default for FallSettings {
    fn default() -> Self {
        FallSettings {
            gravity: 20.0,
            bounce: 0.85,
            rest_speed: 1.5,
        }
    }
}

/// Outcome of one simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallStep {
    /// Moved freely
    Falling,
    /// Hit terrain and bounced
    Bounced,
    /// Bounced too slowly to keep moving; ready to dissolve
    Settled,
}

/// A detached voxel cluster simulated as a falling rigid body.
#[derive(Debug, Clone)]
pub struct CollapsingStructure {
    /// Voxels at their world positions at detach time, with colors
    pub voxels: HashMap<Point3<i32>, Block>,
    /// Current world position of the centroid
    pub pivot: Point3<f32>,
    /// Linear velocity in voxels per second
    pub velocity: Vector3<f32>,
    /// Number of bounces so far
    pub rotation: u32,
    /// Visual orientation around the pivot
    pub orientation: Quaternion<f32>,
    /// Geometry relative to the pivot
    pub mesh: Tesselator,
    /// Set once the rendering backend has taken the mesh
    pub displaylist_ready: bool,
    spin_axis: Vector3<f32>,
    displacement: Vector3<f32>,
}

impl CollapsingStructure {
    /// Builds a structure from carved voxels and meshes it around `pivot`.
    pub fn new(voxels: HashMap<Point3<i32>, Block>, pivot: Point3<f32>) -> Self {
        let mesh = mesh_voxel_set(&voxels, pivot);
        let axis = Vector3::new(fastrand::f32() - 0.5, fastrand::f32() - 0.5, fastrand::f32() - 0.5);
        let spin_axis = if axis.magnitude2() > f32::EPSILON {
            axis.normalize()
        } else {
            Vector3::unit_y()
        };

        CollapsingStructure {
            voxels,
            pivot,
            velocity: Vector3::zero(),
            rotation: 0,
            orientation: Quaternion::from_axis_angle(spin_axis, Rad(0.0)),
            mesh,
            displaylist_ready: false,
            spin_axis,
            displacement: Vector3::zero(),
        }
    }

    /// Distance travelled since detaching.
    pub fn displacement(&self) -> Vector3<f32> {
        self.displacement
    }

    /// Whether any voxel, moved by `offset` from its detach position, overlaps terrain.
    /// Above the grid is open sky.
    pub fn collides(&self, view: &WorldView<'_>, offset: Vector3<f32>, height: i32) -> bool {
        self.voxels.keys().any(|position| {
            let x = (position.x as f32 + offset.x).floor() as i32;
            let y = (position.y as f32 + offset.y).floor() as i32;
            let z = (position.z as f32 + offset.z).floor() as i32;
            y < height && view.is_solid(x, y, z)
        })
    }

    /// Advances the simulation by `dt` seconds against the terrain in `view`.
    ///
    /// # Arguments
    /// * `dt` - Frame time in seconds
    /// * `view` - Terrain under a shared lock
    /// * `height` - World height; nothing above it collides
    /// * `settings` - Gravity, bounce and rest threshold
    pub fn update(&mut self, dt: f32, view: &WorldView<'_>, height: i32, settings: &FallSettings) -> FallStep {
        self.velocity.y -= settings.gravity * dt;
        let step = self.velocity * dt;

        if !self.collides(view, self.displacement + step, height) {
            self.displacement += step;
            self.pivot += step;
            return FallStep::Falling;
        }

        for axis in 0..3 {
            let mut single = Vector3::zero();
            single[axis] = step[axis];
            if self.collides(view, self.displacement + single, height) {
                self.velocity[axis] *= -settings.bounce;
            } else {
                self.velocity[axis] *= settings.bounce;
            }
        }
        self.rotation += 1;
        self.orientation = Quaternion::from_axis_angle(self.spin_axis, BOUNCE_SPIN * self.rotation as f32);

        if self.velocity.y.abs() < settings.rest_speed {
            FallStep::Settled
        } else {
            FallStep::Bounced
        }
    }

    /// Debris particles for a dissolving structure, at most `cap` of them, spread
    /// evenly over its voxels.
    pub fn dissolve(&self, cap: usize, lifetime: f32) -> Vec<Particle> {
        if cap == 0 || self.voxels.is_empty() {
            return Vec::new();
        }

        let mut positions: Vec<(&Point3<i32>, &Block)> = self.voxels.iter().collect();
        positions.sort_by_key(|(position, _)| (position.y, position.z, position.x));
        let stride = positions.len().div_ceil(cap);

        positions
            .into_iter()
            .step_by(stride)
            .map(|(position, block)| {
                let center = Point3::new(
                    position.x as f32 + 0.5,
                    position.y as f32 + 0.5,
                    position.z as f32 + 0.5,
                ) + self.displacement;
                let velocity = Vector3::new(
                    (fastrand::f32() - 0.5) * 4.0,
                    fastrand::f32() * 3.0 + 1.0,
                    (fastrand::f32() - 0.5) * 4.0,
                );
                Particle::new(center, velocity, *block, lifetime)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::{store::DenseColumnStore, world::World};

    fn floor_world() -> World {
        let world = World::new(Box::new(DenseColumnStore::with_world_size(8, 16, 8)), 8);
        for x in 0..8 {
            for z in 0..8 {
                world.set(x, 0, z, Block::GROUND);
            }
        }
        world
    }

    fn single_voxel(y: i32) -> CollapsingStructure {
        let mut voxels = HashMap::new();
        voxels.insert(Point3::new(3, y, 3), Block::rgb(70, 70, 70));
        CollapsingStructure::new(voxels, Point3::new(3.5, y as f32 + 0.5, 3.5))
    }

    #[test]
    fn falls_freely_through_air() {
        let world = floor_world();
        let mut structure = single_voxel(10);
        let settings = FallSettings::default();

        let step = structure.update(0.05, &world.read(), 16, &settings);
        assert_eq!(step, FallStep::Falling);
        assert!(structure.velocity.y < 0.0);
        assert!(structure.pivot.y < 10.5);
        assert!(structure.displacement().y < 0.0);
    }

    #[test]
    fn bounces_then_settles_on_the_floor() {
        let world = floor_world();
        let mut structure = single_voxel(6);
        let settings = FallSettings::default();

        let mut steps = Vec::new();
        for _ in 0..2000 {
            let step = structure.update(1.0 / 60.0, &world.read(), 16, &settings);
            steps.push(step);
            if step == FallStep::Settled {
                break;
            }
        }

        assert_eq!(steps.last(), Some(&FallStep::Settled));
        assert!(steps.contains(&FallStep::Bounced));
        assert!(structure.rotation >= 1);
        // It never sank into the floor.
        assert!(structure.pivot.y >= 1.5 - 1e-3);
    }

    #[test]
    fn dissolve_respects_the_particle_cap() {
        let mut voxels = HashMap::new();
        for x in 0..10 {
            voxels.insert(Point3::new(x, 5, 0), Block::rgb(9, 9, 9));
        }
        let structure = CollapsingStructure::new(voxels, Point3::new(5.0, 5.5, 0.5));

        assert_eq!(structure.dissolve(4, 1.0).len(), 4);
        assert_eq!(structure.dissolve(100, 1.0).len(), 10);
        assert!(structure.dissolve(0, 1.0).is_empty());
    }

    #[test]
    fn structure_mesh_is_built_around_the_pivot() {
        let structure = single_voxel(4);
        assert_eq!(structure.mesh.quad_count(), 6);
        assert!(!structure.displaylist_ready);
    }
}
