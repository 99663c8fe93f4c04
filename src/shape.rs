use crate::error::ConfigError;

/// Dense grids are limited to 1D/2D/3D.
pub const MAX_RANK: usize = 3;

/// Row-major extent tuple. The last dimension varies fastest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    pub dims: Vec<usize>,
}

impl Shape {
    pub fn d1(a: usize) -> Self {
        Self { dims: vec![a] }
    }

    pub fn d2(a: usize, b: usize) -> Self {
        Self { dims: vec![a, b] }
    }

    pub fn d3(a: usize, b: usize, c: usize) -> Self {
        Self { dims: vec![a, b, c] }
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Total element count: product of all extents.
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rank() == 0 || self.rank() > MAX_RANK {
            return Err(ConfigError::RankOutOfRange(self.rank()));
        }
        if self.dims.iter().any(|&d| d == 0) {
            return Err(ConfigError::ZeroExtent);
        }
        Ok(())
    }

    /// Row-major linearization. `None` when the index is out of bounds
    /// or its rank does not match.
    pub fn offset_of(&self, idx: &[usize]) -> Option<usize> {
        if idx.len() != self.rank() {
            return None;
        }
        let mut off = 0usize;
        for (&i, &extent) in idx.iter().zip(self.dims.iter()) {
            if i >= extent {
                return None;
            }
            off = off * extent + i;
        }
        Some(off)
    }

    /// Inverse of `offset_of` for in-range linear offsets. Coordinates
    /// beyond the rank stay zero.
    pub fn decode(&self, linear: usize) -> [usize; MAX_RANK] {
        decode_index(&self.dims, linear)
    }
}

/// Row-major decode over an arbitrary extent list.
pub fn decode_index(dims: &[usize], linear: usize) -> [usize; MAX_RANK] {
    let mut coords = [0usize; MAX_RANK];
    let mut rem = linear;
    for d in (0..dims.len()).rev() {
        coords[d] = rem % dims[d];
        rem /= dims[d];
    }
    coords
}
