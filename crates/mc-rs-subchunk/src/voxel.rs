//! Local coordinates within a sub-chunk and their storage order.
//!
//! Blocks are stored column by column in XZY order: Y varies fastest, then Z,
//! then X, so `index = (x*16 + z)*16 + y`.

use crate::error::SubChunkError;

/// Edge length of a sub-chunk in blocks.
pub const SUB_CHUNK_SIZE: usize = 16;

/// Number of blocks in a sub-chunk.
pub const BLOCK_COUNT: usize = SUB_CHUNK_SIZE * SUB_CHUNK_SIZE * SUB_CHUNK_SIZE;

/// A block position local to one sub-chunk. Each axis is in `[0, 15]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Voxel {
    x: u8,
    y: u8,
    z: u8,
}

impl Voxel {
    pub fn new(x: usize, y: usize, z: usize) -> Result<Self, SubChunkError> {
        if x >= SUB_CHUNK_SIZE || y >= SUB_CHUNK_SIZE || z >= SUB_CHUNK_SIZE {
            return Err(SubChunkError::CoordinateOutOfRange { x, y, z });
        }
        Ok(Self {
            x: x as u8,
            y: y as u8,
            z: z as u8,
        })
    }

    /// The voxel stored at `index` in a block storage record.
    pub fn from_index(index: usize) -> Result<Self, SubChunkError> {
        if index >= BLOCK_COUNT {
            return Err(SubChunkError::VoxelIndexOutOfRange { index });
        }
        Ok(Self {
            x: ((index >> 8) & 15) as u8,
            y: (index & 15) as u8,
            z: ((index >> 4) & 15) as u8,
        })
    }

    /// Position of this voxel in a block storage record.
    pub fn index(self) -> usize {
        self.y as usize + 16 * self.z as usize + 256 * self.x as usize
    }

    pub fn x(self) -> usize {
        self.x as usize
    }

    pub fn y(self) -> usize {
        self.y as usize
    }

    pub fn z(self) -> usize {
        self.z as usize
    }
}

/// Storage index of the block at local `(x, y, z)`.
pub fn voxel_to_index(x: usize, y: usize, z: usize) -> Result<usize, SubChunkError> {
    Voxel::new(x, y, z).map(Voxel::index)
}

/// Local `(x, y, z)` of the block at storage `index`.
pub fn index_to_voxel(index: usize) -> Result<(usize, usize, usize), SubChunkError> {
    Voxel::from_index(index).map(|v| (v.x(), v.y(), v.z()))
}

/// All voxels of a sub-chunk in storage order.
pub fn voxels() -> impl Iterator<Item = Voxel> {
    (0..BLOCK_COUNT).map(|index| Voxel {
        x: ((index >> 8) & 15) as u8,
        y: (index & 15) as u8,
        z: ((index >> 4) & 15) as u8,
    })
}
