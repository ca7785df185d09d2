//! Discretization of a rectangular domain into uniform cubic voxels.

use crate::{
    error::FieldError,
    geometry::{
        Dim3::{self, X, Y, Z},
        Idx3, In3D, Point3, Vec3,
    },
    num::{self, BFloat},
};

/// A found 3D voxel index inside the grid, or the out-of-bounds sentinel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoxelQuery {
    Inside(Idx3<usize>),
    Outside,
}

impl VoxelQuery {
    /// Whether the query found a voxel inside the grid.
    pub fn is_inside(&self) -> bool {
        matches!(self, Self::Inside(_))
    }

    /// Returns the found voxel indices, or `None` if outside.
    pub fn indices(&self) -> Option<&Idx3<usize>> {
        match self {
            Self::Inside(indices) => Some(indices),
            Self::Outside => None,
        }
    }
}

/// Which volume to compute with `VoxelGrid3::volume`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VolumeKind {
    Domain,
    Voxel,
}

/// A rectangular domain with lower corner at the origin, divided into
/// cubic voxels of equal size.
///
/// The number of voxels along each axis is the domain size divided by the
/// voxel step, rounded up. The grid is immutable after construction.
#[derive(Clone, Debug, PartialEq)]
pub struct VoxelGrid3<F> {
    domain_size: Vec3<F>,
    voxel_step: F,
    shape: In3D<usize>,
}

impl<F: BFloat> VoxelGrid3<F> {
    /// Creates a new grid for the given domain size and voxel step.
    ///
    /// # Errors
    ///
    /// Returns `FieldError::InvalidDomain` if any domain size component or the
    /// voxel step is non-positive or not finite, or if the resulting number of
    /// voxels is not representable.
    pub fn new(domain_size: Vec3<F>, voxel_step: F) -> Result<Self, FieldError> {
        if !(voxel_step > F::zero()) || !voxel_step.is_finite() {
            return Err(FieldError::InvalidDomain(format!(
                "voxel step must be positive and finite, got {:?}",
                voxel_step
            )));
        }
        for dim in Dim3::slice() {
            if !(domain_size[dim] > F::zero()) || !domain_size[dim].is_finite() {
                return Err(FieldError::InvalidDomain(format!(
                    "domain size along {} must be positive and finite, got {:?}",
                    dim, domain_size[dim]
                )));
            }
        }

        let mut shape = In3D::same(0);
        for dim in Dim3::slice() {
            shape[dim] = ::num::cast::<F, usize>((domain_size[dim] / voxel_step).ceil())
                .ok_or_else(|| {
                    FieldError::InvalidDomain(format!(
                        "number of voxels along {} is not representable",
                        dim
                    ))
                })?;
        }
        if shape[X]
            .checked_mul(shape[Y])
            .and_then(|n_voxels| n_voxels.checked_mul(shape[Z]))
            .is_none()
        {
            return Err(FieldError::InvalidDomain(format!(
                "total number of voxels for shape {}x{}x{} is not representable",
                shape[X], shape[Y], shape[Z]
            )));
        }

        Ok(Self {
            domain_size,
            voxel_step,
            shape,
        })
    }

    /// Returns the number of voxels along each axis.
    pub fn shape(&self) -> &In3D<usize> {
        &self.shape
    }

    /// Returns the extent of the domain along each axis.
    pub fn domain_size(&self) -> &Vec3<F> {
        &self.domain_size
    }

    /// Returns the edge length of a voxel.
    pub fn voxel_step(&self) -> F {
        self.voxel_step
    }

    /// Returns the total number of voxels.
    pub fn n_voxels(&self) -> usize {
        self.shape[X] * self.shape[Y] * self.shape[Z]
    }

    /// Returns the volume of the whole domain.
    pub fn domain_volume(&self) -> F {
        self.domain_size[X] * self.domain_size[Y] * self.domain_size[Z]
    }

    /// Returns the volume of a single voxel.
    pub fn voxel_volume(&self) -> F {
        self.voxel_step * self.voxel_step * self.voxel_step
    }

    /// Returns either the domain volume or the voxel volume.
    pub fn volume(&self, kind: VolumeKind) -> F {
        match kind {
            VolumeKind::Domain => self.domain_volume(),
            VolumeKind::Voxel => self.voxel_volume(),
        }
    }

    /// Returns the center point of the domain.
    pub fn domain_center(&self) -> Point3<F> {
        let half = num::from_f64::<F>(0.5);
        Point3::with_each_component(|dim| half * self.domain_size[dim])
    }

    /// Finds the indices of the voxel containing the given point.
    ///
    /// A point exactly on a voxel boundary belongs to the voxel with the
    /// higher index. Points with any coordinate below zero, at or beyond the
    /// domain size, or not a number give `VoxelQuery::Outside`.
    pub fn find_voxel(&self, point: &Point3<F>) -> VoxelQuery {
        let mut indices = Idx3::origin();
        for dim in Dim3::slice() {
            let coord = point[dim];
            if !(coord >= F::zero()) || coord >= self.domain_size[dim] {
                return VoxelQuery::Outside;
            }
            match ::num::cast::<F, usize>((coord / self.voxel_step).floor()) {
                Some(idx) if idx < self.shape[dim] => indices[dim] = idx,
                _ => return VoxelQuery::Outside,
            }
        }
        VoxelQuery::Inside(indices)
    }

    /// Whether the given (possibly negative) indices refer to a voxel in the grid.
    pub fn is_legal_index(&self, indices: &Idx3<isize>) -> bool {
        Dim3::slice().iter().all(|&dim| {
            indices[dim] >= 0 && (indices[dim] as usize) < self.shape[dim]
        })
    }

    /// Converts the given signed indices to voxel indices if they are legal.
    pub fn legal_indices(&self, indices: &Idx3<isize>) -> Option<Idx3<usize>> {
        if self.is_legal_index(indices) {
            Idx3::try_from_idx(indices)
        } else {
            None
        }
    }

    /// Computes the center point of the voxel with the given indices.
    pub fn voxel_center(&self, indices: &Idx3<usize>) -> Point3<F> {
        let half = num::from_f64::<F>(0.5);
        Point3::with_each_component(|dim| {
            (num::from_usize::<F>(indices[dim]) + half) * self.voxel_step
        })
    }

    /// Creates an iterator over the indices of all voxels, with the
    /// x-index varying slowest and the z-index fastest.
    pub fn voxel_indices(&self) -> impl Iterator<Item = Idx3<usize>> + '_ {
        (0..self.n_voxels()).map(move |idx| compute_3d_indices_from_flat_idx(&self.shape, idx))
    }
}

/// Computes the 3D indices corresponding to a given index into the flattened
/// voxel sequence, assuming the z-index varies fastest.
pub fn compute_3d_indices_from_flat_idx(shape: &In3D<usize>, idx: usize) -> Idx3<usize> {
    let k = idx % shape[Z];
    let j = idx / shape[Z] % shape[Y];
    let i = idx / (shape[Z] * shape[Y]);
    Idx3::new(i, j, k)
}

/// Computes the index into the flattened voxel sequence corresponding to the
/// given 3D indices, assuming the z-index varies fastest.
pub fn compute_flat_idx_from_3d_indices(shape: &In3D<usize>, indices: &Idx3<usize>) -> usize {
    (indices[X] * shape[Y] + indices[Y]) * shape[Z] + indices[Z]
}

#[cfg(test)]
mod tests {

    use super::*;
    use approx::assert_abs_diff_eq;

    fn grid(size: (f64, f64, f64), step: f64) -> VoxelGrid3<f64> {
        VoxelGrid3::new(Vec3::new(size.0, size.1, size.2), step).unwrap()
    }

    #[test]
    fn grid_shape_rounds_up() {
        assert_eq!(grid((4.0, 4.0, 4.0), 1.0).shape(), &In3D::new(4, 4, 4));
        assert_eq!(grid((4.5, 2.0, 0.3), 1.0).shape(), &In3D::new(5, 2, 1));
        assert_eq!(grid((10.0, 20.0, 5.0), 2.5).n_voxels(), 4 * 8 * 2);
    }

    #[test]
    fn invalid_domains_are_rejected() {
        for (size, step) in [
            ((4.0, 4.0, 4.0), 0.0),
            ((4.0, 4.0, 4.0), -1.0),
            ((0.0, 4.0, 4.0), 1.0),
            ((4.0, -2.0, 4.0), 1.0),
            ((4.0, 4.0, f64::NAN), 1.0),
            ((4.0, 4.0, 4.0), f64::INFINITY),
        ] {
            let result = VoxelGrid3::new(Vec3::new(size.0, size.1, size.2), step);
            assert!(
                matches!(result, Err(FieldError::InvalidDomain(_))),
                "accepted size {:?} and step {}",
                size,
                step
            );
        }
    }

    #[test]
    fn unrepresentable_voxel_count_is_rejected() {
        let result = VoxelGrid3::new(Vec3::equal_components(1e7), 1e-3);
        assert!(matches!(result, Err(FieldError::InvalidDomain(_))));

        let grid = grid((1e7, 1.0, 1.0), 0.5);
        assert_eq!(grid.n_voxels(), 80_000_000);
    }

    #[test]
    fn volumes_follow_domain_and_step() {
        let grid = grid((4.5, 2.0, 3.0), 0.5);
        assert_abs_diff_eq!(grid.volume(VolumeKind::Domain), 27.0);
        assert_abs_diff_eq!(grid.volume(VolumeKind::Voxel), 0.125);
    }

    #[test]
    fn voxel_search_works() {
        let grid = grid((4.0, 3.0, 2.0), 1.0);
        assert_eq!(
            grid.find_voxel(&Point3::new(0.0, 0.0, 0.0)),
            VoxelQuery::Inside(Idx3::new(0, 0, 0))
        );
        assert_eq!(
            grid.find_voxel(&Point3::new(2.0, 1.5, 1.999)),
            VoxelQuery::Inside(Idx3::new(2, 1, 1))
        );
        assert_eq!(
            grid.find_voxel(&Point3::new(3.999, 2.999, 0.5)),
            VoxelQuery::Inside(Idx3::new(3, 2, 0))
        );
        assert_eq!(
            grid.find_voxel(&Point3::new(-1e-9, 1.0, 1.0)),
            VoxelQuery::Outside
        );
        assert_eq!(
            grid.find_voxel(&Point3::new(1.0, 3.0, 1.0)),
            VoxelQuery::Outside
        );
        assert_eq!(
            grid.find_voxel(&Point3::new(1.0, 1.0, f64::NAN)),
            VoxelQuery::Outside
        );
    }

    #[test]
    fn points_beyond_domain_but_inside_last_voxel_are_outside() {
        let grid = grid((4.5, 4.5, 4.5), 1.0);
        assert_eq!(grid.shape(), &In3D::new(5, 5, 5));
        assert!(grid.find_voxel(&Point3::new(4.4, 4.4, 4.4)).is_inside());
        assert_eq!(
            grid.find_voxel(&Point3::new(4.6, 1.0, 1.0)),
            VoxelQuery::Outside
        );
    }

    #[test]
    fn index_legality_is_checked_per_axis() {
        let grid = grid((4.0, 3.0, 2.0), 1.0);
        assert!(grid.is_legal_index(&Idx3::new(0, 0, 0)));
        assert!(grid.is_legal_index(&Idx3::new(3, 2, 1)));
        assert!(!grid.is_legal_index(&Idx3::new(-1, 0, 0)));
        assert!(!grid.is_legal_index(&Idx3::new(4, 0, 0)));
        assert!(!grid.is_legal_index(&Idx3::new(0, 0, 2)));
        assert_eq!(
            grid.legal_indices(&Idx3::new(1, 2, 1)),
            Some(Idx3::new(1, 2, 1))
        );
        assert_eq!(grid.legal_indices(&Idx3::new(1, 3, 1)), None);
    }

    #[test]
    fn voxel_centers_lie_inside_their_voxels() {
        let grid = grid((4.0, 3.0, 2.0), 0.5);
        for indices in grid.voxel_indices() {
            let center = grid.voxel_center(&indices);
            assert_eq!(grid.find_voxel(&center), VoxelQuery::Inside(indices));
        }
    }

    #[test]
    fn voxel_indices_vary_fastest_along_z() {
        let grid = grid((2.0, 2.0, 3.0), 1.0);
        let indices: Vec<_> = grid.voxel_indices().take(4).collect();
        assert_eq!(
            indices,
            vec![
                Idx3::new(0, 0, 0),
                Idx3::new(0, 0, 1),
                Idx3::new(0, 0, 2),
                Idx3::new(0, 1, 0)
            ]
        );
        let shape = grid.shape();
        for (flat_idx, indices) in grid.voxel_indices().enumerate() {
            assert_eq!(compute_flat_idx_from_3d_indices(shape, &indices), flat_idx);
        }
    }
}
