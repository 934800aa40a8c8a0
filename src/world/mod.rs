//! World/chunk data collaborator interface

use crate::controller::avatar::Vec3;

/// A single block of world geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub id: u32,
}

/// Read access to world geometry around the avatar.
///
/// `block_at` returning `None` signals that the containing chunk is not
/// loaded yet; the tick scheduler skips simulation steps until data arrives.
pub trait WorldView: Send + Sync {
    fn block_at(&self, pos: Vec3) -> Option<Block>;
}
