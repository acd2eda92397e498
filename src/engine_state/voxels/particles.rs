//! Decorative debris left behind by dissolving structures.

use cgmath::{Point3, Vector3};

use super::{block::Block, world::WorldView};

/// Fraction of vertical speed kept when a particle hits the ground.
const PARTICLE_RESTITUTION: f32 = 0.4;
/// Fraction of horizontal speed kept on ground contact.
const PARTICLE_FRICTION: f32 = 0.7;

/// A single debris particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Point3<f32>,
    pub velocity: Vector3<f32>,
    pub color: Block,
    /// Seconds lived so far
    pub age: f32,
    /// Seconds until the particle expires
    pub lifetime: f32,
}

impl Particle {
    pub fn new(position: Point3<f32>, velocity: Vector3<f32>, color: Block, lifetime: f32) -> Self {
        Particle {
            position,
            velocity,
            color,
            age: 0.0,
            lifetime,
        }
    }

    /// Advances the particle by `dt` seconds.
    ///
    /// Returns `false` once the particle has expired.
    pub fn update(&mut self, dt: f32, view: &WorldView<'_>, height: i32, gravity: f32) -> bool {
        self.age += dt;
        if self.age >= self.lifetime {
            return false;
        }

        self.velocity.y -= gravity * dt;
        let next = self.position + self.velocity * dt;
        let cell = Point3::new(next.x.floor() as i32, next.y.floor() as i32, next.z.floor() as i32);

        if cell.y < height && view.is_solid(cell.x, cell.y, cell.z) {
            self.velocity.y = -self.velocity.y * PARTICLE_RESTITUTION;
            self.velocity.x *= PARTICLE_FRICTION;
            self.velocity.z *= PARTICLE_FRICTION;
        } else {
            self.position = next;
        }
        true
    }
}
