//! Double-buffered particle state.
//!
//! Every physical quantity is held twice. Passes read the `front` copy and
//! write the `back` copy, then [`DoubleBuffer::swap`] flips the roles by
//! toggling an index. No pass ever reads and writes the same array.

use crate::schema::{ConfigError, Seed, SimulationConfig};

use super::Vec2;

/// A pair of equally sized arrays with one designated as the readable front.
#[derive(Debug, Clone)]
pub struct DoubleBuffer<T> {
    buffers: [Vec<T>; 2],
    front: usize,
}

impl<T: Copy + Default> DoubleBuffer<T> {
    /// Wrap `initial` as the front buffer; the back buffer starts zeroed.
    pub fn new(initial: Vec<T>) -> Self {
        let back = vec![T::default(); initial.len()];
        Self {
            buffers: [initial, back],
            front: 0,
        }
    }
}

impl<T> DoubleBuffer<T> {
    #[inline]
    pub fn len(&self) -> usize {
        self.buffers[0].len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index (0 or 1) of the buffer currently acting as front.
    #[inline]
    pub fn front_index(&self) -> usize {
        self.front
    }

    #[inline]
    pub fn front(&self) -> &[T] {
        &self.buffers[self.front]
    }

    #[inline]
    pub fn back_mut(&mut self) -> &mut [T] {
        &mut self.buffers[1 - self.front]
    }

    /// Mutable access to the front buffer, for loading state from outside a pass
    /// (seeding, GPU readback).
    #[inline]
    pub fn front_mut(&mut self) -> &mut [T] {
        &mut self.buffers[self.front]
    }

    /// Borrow the front for reading and the back for writing at the same time.
    #[inline]
    pub fn split_mut(&mut self) -> (&[T], &mut [T]) {
        let [a, b] = &mut self.buffers;
        if self.front == 0 {
            (a.as_slice(), b.as_mut_slice())
        } else {
            (b.as_slice(), a.as_mut_slice())
        }
    }

    /// Exchange front and back roles.
    #[inline]
    pub fn swap(&mut self) {
        self.front = 1 - self.front;
    }
}

/// Physical quantities held by the [`StateStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Position,
    Velocity,
}

/// Position and velocity buffers for N particles.
#[derive(Debug, Clone)]
pub struct StateStore {
    pub position: DoubleBuffer<Vec2>,
    pub velocity: DoubleBuffer<Vec2>,
}

impl StateStore {
    /// Build a store from per-particle positions and velocities of equal length.
    pub fn new(positions: Vec<Vec2>, velocities: Vec<Vec2>) -> Result<Self, ConfigError> {
        if positions.len() != velocities.len() {
            return Err(ConfigError::BufferLengthMismatch {
                positions: positions.len(),
                velocities: velocities.len(),
            });
        }
        Ok(Self {
            position: DoubleBuffer::new(positions),
            velocity: DoubleBuffer::new(velocities),
        })
    }

    #[inline]
    pub fn particle_count(&self) -> usize {
        self.position.len()
    }

    #[inline]
    pub fn buffer(&self, quantity: Quantity) -> &DoubleBuffer<Vec2> {
        match quantity {
            Quantity::Position => &self.position,
            Quantity::Velocity => &self.velocity,
        }
    }

    #[inline]
    pub fn buffer_mut(&mut self, quantity: Quantity) -> &mut DoubleBuffer<Vec2> {
        match quantity {
            Quantity::Position => &mut self.position,
            Quantity::Velocity => &mut self.velocity,
        }
    }

    /// Read particle `i` from the front buffer of `quantity`.
    #[inline]
    pub fn read(&self, quantity: Quantity, i: usize) -> Vec2 {
        self.buffer(quantity).front()[i]
    }

    /// Write particle `i` into the back buffer of `quantity`.
    #[inline]
    pub fn write(&mut self, quantity: Quantity, i: usize, value: Vec2) {
        self.buffer_mut(quantity).back_mut()[i] = value;
    }

    #[inline]
    pub fn swap(&mut self, quantity: Quantity) {
        self.buffer_mut(quantity).swap();
    }
}

/// Simulation state container.
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub store: StateStore,
    /// Accumulated simulated time in seconds.
    pub time: f32,
    /// Completed frames.
    pub frame: u64,
}

impl SimulationState {
    /// Create new state from seed.
    pub fn from_seed(seed: &Seed, config: &SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (positions, velocities) = seed.generate(config.particle_count)?;
        Self::from_particles(positions, velocities)
    }

    /// Create state directly from particle arrays.
    pub fn from_particles(
        positions: Vec<Vec2>,
        velocities: Vec<Vec2>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            store: StateStore::new(positions, velocities)?,
            time: 0.0,
            frame: 0,
        })
    }

    #[inline]
    pub fn particle_count(&self) -> usize {
        self.store.particle_count()
    }

    /// Latest positions, as handed to presentation.
    #[inline]
    pub fn positions(&self) -> &[Vec2] {
        self.store.position.front()
    }

    /// Latest velocities.
    #[inline]
    pub fn velocities(&self) -> &[Vec2] {
        self.store.velocity.front()
    }

    #[inline]
    pub fn position(&self, i: usize) -> Vec2 {
        self.store.read(Quantity::Position, i)
    }

    #[inline]
    pub fn velocity(&self, i: usize) -> Vec2 {
        self.store.read(Quantity::Velocity, i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Pattern;

    #[test]
    fn test_swap_toggles_front() {
        let mut buf = DoubleBuffer::new(vec![1.0f32, 2.0]);
        assert_eq!(buf.front_index(), 0);
        buf.back_mut().copy_from_slice(&[3.0, 4.0]);
        assert_eq!(buf.front(), &[1.0, 2.0]);

        buf.swap();
        assert_eq!(buf.front_index(), 1);
        assert_eq!(buf.front(), &[3.0, 4.0]);

        buf.swap();
        assert_eq!(buf.front(), &[1.0, 2.0]);
    }

    #[test]
    fn test_split_follows_front() {
        let mut buf = DoubleBuffer::new(vec![1u32, 2, 3]);
        {
            let (front, back) = buf.split_mut();
            for (b, f) in back.iter_mut().zip(front) {
                *b = f * 10;
            }
        }
        buf.swap();
        {
            let (front, back) = buf.split_mut();
            assert_eq!(front, &[10, 20, 30]);
            assert_eq!(back, &[1, 2, 3]);
        }
    }

    #[test]
    fn test_write_is_invisible_until_swap() {
        let mut store =
            StateStore::new(vec![Vec2::new(0.5, 0.5)], vec![Vec2::new(0.1, 0.0)]).unwrap();
        store.write(Quantity::Velocity, 0, Vec2::new(-0.1, 0.0));
        assert_eq!(store.read(Quantity::Velocity, 0), Vec2::new(0.1, 0.0));

        store.swap(Quantity::Velocity);
        assert_eq!(store.read(Quantity::Velocity, 0), Vec2::new(-0.1, 0.0));
        // Position is untouched by a velocity swap.
        assert_eq!(store.read(Quantity::Position, 0), Vec2::new(0.5, 0.5));
    }

    #[test]
    fn test_unequal_buffers_rejected() {
        let result = SimulationState::from_particles(
            vec![Vec2::new(0.2, 0.5), Vec2::new(0.3, 0.5)],
            vec![Vec2::ZERO],
        );
        assert!(matches!(
            result,
            Err(ConfigError::BufferLengthMismatch {
                positions: 2,
                velocities: 1
            })
        ));
    }

    #[test]
    fn test_state_from_seed() {
        let config = SimulationConfig {
            particle_count: 32,
            ..SimulationConfig::default()
        };
        let state = SimulationState::from_seed(&Seed::default(), &config).unwrap();

        assert_eq!(state.particle_count(), 32);
        assert_eq!(state.frame, 0);
        for p in state.positions() {
            assert!((0.25..=0.75).contains(&p.x));
            assert!((0.25..=0.75).contains(&p.y));
        }
    }

    #[test]
    fn test_state_from_seed_rejects_bad_config() {
        let config = SimulationConfig {
            particle_count: 0,
            ..SimulationConfig::default()
        };
        let seed = Seed {
            pattern: Pattern::default(),
        };
        assert!(SimulationState::from_seed(&seed, &config).is_err());
    }
}
