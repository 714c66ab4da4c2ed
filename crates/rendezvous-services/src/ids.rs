//! Peer identifier generation.

use rand::Rng;

use rendezvous_core::PeerId;

/// Source of fresh peer identifiers.
pub trait IdSource: Send + Sync {
    fn next_id(&self) -> PeerId;
}

/// Uniform random identifiers in `1..space`.
///
/// No state survives a restart; collisions are only unlikely, not
/// impossible, so callers should still check the registry.
#[derive(Debug, Clone, Copy)]
pub struct RandomIds {
    space: u64,
}

impl RandomIds {
    /// `space` below 2 is raised to 2 so that a non-zero id always exists.
    pub fn new(space: u64) -> Self {
        Self {
            space: space.max(2),
        }
    }

    pub fn space(&self) -> u64 {
        self.space
    }
}

impl IdSource for RandomIds {
    fn next_id(&self) -> PeerId {
        let mut rng = rand::thread_rng();
        loop {
            if let Some(id) = PeerId::new(rng.gen_range(0..self.space)) {
                return id;
            }
        }
    }
}
