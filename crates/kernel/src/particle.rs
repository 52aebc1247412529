//! Fixed-capacity particle ring buffer in struct-of-arrays layout.
//!
//! Index `i` across every array refers to the same slot. Spawning writes the
//! slot at the cursor and advances it modulo capacity, so the oldest slot is
//! overwritten once the ring is full.

/// Complete state of one slot, used to move a slot through a per-index
/// transform and write it back.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParticleState {
    /// Position `[x, y, z]` (meters)
    pub position: [f32; 3],
    /// Velocity `[vx, vy, vz]` (m/s)
    pub velocity: [f32; 3],
    /// Deposition weight in [0, 1]
    pub weight: f32,
    /// Seconds since spawn
    pub age: f32,
    /// Path length since spawn (meters)
    pub travelled: f32,
    /// Whether the slot holds a particle in flight
    pub alive: bool,
}

impl ParticleState {
    /// Take the particle out of flight. Its weight is zeroed so a stale
    /// slot can never deposit.
    pub fn retire(&mut self) {
        self.alive = false;
        self.weight = 0.0;
    }
}

/// Struct-of-arrays particle ring.
#[derive(Debug, Clone)]
pub struct ParticleRing {
    // ---- Positions ----
    /// X positions (meters)
    pub x: Vec<f32>,
    /// Y positions (meters); the wall is at `y = 0`
    pub y: Vec<f32>,
    /// Z positions (meters)
    pub z: Vec<f32>,

    // ---- Velocities ----
    /// X velocities (m/s)
    pub vx: Vec<f32>,
    /// Y velocities (m/s)
    pub vy: Vec<f32>,
    /// Z velocities (m/s)
    pub vz: Vec<f32>,

    // ---- Scalar fields ----
    /// Deposition weight
    pub weight: Vec<f32>,
    /// Seconds since spawn
    pub age: Vec<f32>,
    /// Path length since spawn (meters)
    pub travelled: Vec<f32>,
    /// Live flag
    pub alive: Vec<bool>,

    cursor: usize,
}

impl ParticleRing {
    /// Allocate a ring with `capacity` dead slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            x: vec![0.0; capacity],
            y: vec![0.0; capacity],
            z: vec![0.0; capacity],
            vx: vec![0.0; capacity],
            vy: vec![0.0; capacity],
            vz: vec![0.0; capacity],
            weight: vec![0.0; capacity],
            age: vec![0.0; capacity],
            travelled: vec![0.0; capacity],
            alive: vec![false; capacity],
            cursor: 0,
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.x.len()
    }

    /// Slot the next spawn will write.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of live particles.
    pub fn live_count(&self) -> usize {
        self.alive.iter().filter(|&&a| a).count()
    }

    /// Spawn a particle at the cursor, overwriting whatever was there.
    ///
    /// Returns the slot index. A zero-capacity ring ignores the spawn and
    /// returns `None`.
    pub fn spawn(&mut self, position: [f32; 3], velocity: [f32; 3], weight: f32) -> Option<usize> {
        let capacity = self.capacity();
        if capacity == 0 {
            return None;
        }
        let i = self.cursor;
        self.set(
            i,
            &ParticleState {
                position,
                velocity,
                weight,
                age: 0.0,
                travelled: 0.0,
                alive: true,
            },
        );
        self.cursor = (self.cursor + 1) % capacity;
        Some(i)
    }

    /// Read slot `i`.
    pub fn get(&self, i: usize) -> ParticleState {
        ParticleState {
            position: [self.x[i], self.y[i], self.z[i]],
            velocity: [self.vx[i], self.vy[i], self.vz[i]],
            weight: self.weight[i],
            age: self.age[i],
            travelled: self.travelled[i],
            alive: self.alive[i],
        }
    }

    /// Overwrite slot `i`.
    pub fn set(&mut self, i: usize, s: &ParticleState) {
        self.x[i] = s.position[0];
        self.y[i] = s.position[1];
        self.z[i] = s.position[2];
        self.vx[i] = s.velocity[0];
        self.vy[i] = s.velocity[1];
        self.vz[i] = s.velocity[2];
        self.weight[i] = s.weight;
        self.age[i] = s.age;
        self.travelled[i] = s.travelled;
        self.alive[i] = s.alive;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ring_is_empty() {
        let ring = ParticleRing::new(8);
        assert_eq!(ring.capacity(), 8);
        assert_eq!(ring.live_count(), 0);
        assert_eq!(ring.cursor(), 0);
    }

    #[test]
    fn spawn_advances_cursor_and_wraps() {
        let mut ring = ParticleRing::new(3);
        for k in 0..5 {
            let slot = ring.spawn([k as f32, 1.0, 0.0], [0.0, -1.0, 0.0], 1.0);
            assert_eq!(slot, Some(k % 3));
        }
        assert_eq!(ring.cursor(), 2);
        assert_eq!(ring.live_count(), 3);
        // Slots 0 and 1 were overwritten by the 4th and 5th spawns
        assert_eq!(ring.x[0], 3.0);
        assert_eq!(ring.x[1], 4.0);
        assert_eq!(ring.x[2], 2.0);
    }

    #[test]
    fn retire_clears_weight() {
        let mut ring = ParticleRing::new(2);
        let i = ring.spawn([0.0; 3], [0.0; 3], 0.7).unwrap();
        let mut s = ring.get(i);
        s.retire();
        ring.set(i, &s);
        assert!(!ring.alive[i]);
        assert_eq!(ring.weight[i], 0.0);
        assert_eq!(ring.live_count(), 0);
    }

    #[test]
    fn zero_capacity_ignores_spawn() {
        let mut ring = ParticleRing::new(0);
        assert_eq!(ring.spawn([0.0; 3], [0.0; 3], 1.0), None);
    }

    #[test]
    fn get_set_round_trip() {
        let mut ring = ParticleRing::new(4);
        let s = ParticleState {
            position: [1.0, 2.0, 3.0],
            velocity: [4.0, 5.0, 6.0],
            weight: 0.5,
            age: 0.25,
            travelled: 1.5,
            alive: true,
        };
        ring.set(2, &s);
        assert_eq!(ring.get(2), s);
    }
}
