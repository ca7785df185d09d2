//! Weighting of voxels for sampling fields at arbitrary points.

use crate::{
    geometry::{Dim3, Idx3, In3D, Point3},
    grid::{VoxelGrid3, VoxelQuery},
    num::{self, BFloat},
};

/// A set of voxels with associated weights, used for evaluating a field
/// at a single point.
///
/// The first entry is always the base voxel, i.e. the voxel containing
/// the evaluation point.
#[derive(Clone, Debug, PartialEq)]
pub struct VoxelStencil<F> {
    voxels: Vec<(Idx3<usize>, F)>,
}

impl<F: BFloat> VoxelStencil<F> {
    /// Creates a stencil consisting only of the given base voxel with unit weight.
    pub fn single(base: Idx3<usize>) -> Self {
        Self {
            voxels: vec![(base, F::one())],
        }
    }

    /// Returns the indices of the base voxel.
    pub fn base(&self) -> &Idx3<usize> {
        &self.voxels[0].0
    }

    /// Returns the weighted voxels of the stencil, starting with the base voxel.
    pub fn voxels(&self) -> &[(Idx3<usize>, F)] {
        &self.voxels
    }

    /// Returns the sum of all weights in the stencil.
    pub fn total_weight(&self) -> F {
        self.voxels
            .iter()
            .fold(F::zero(), |total, &(_, weight)| total + weight)
    }
}

/// Defines the properties of a 3D interpolator.
pub trait Interpolator3: Clone + Sync + Send {
    /// Computes the weighted voxels to combine when evaluating a field
    /// at the given point.
    ///
    /// # Returns
    ///
    /// `None` if the point lies outside the grid, otherwise a stencil whose
    /// first voxel is the one containing the point.
    fn stencil<F: BFloat>(&self, grid: &VoxelGrid3<F>, point: &Point3<F>)
        -> Option<VoxelStencil<F>>;
}

/// Interpolator that uses the value of the voxel containing the point.
#[derive(Clone, Copy, Debug, Default)]
pub struct NearestVoxelInterpolator3;

impl Interpolator3 for NearestVoxelInterpolator3 {
    fn stencil<F: BFloat>(
        &self,
        grid: &VoxelGrid3<F>,
        point: &Point3<F>,
    ) -> Option<VoxelStencil<F>> {
        match grid.find_voxel(point) {
            VoxelQuery::Inside(indices) => Some(VoxelStencil::single(indices)),
            VoxelQuery::Outside => None,
        }
    }
}

/// Interpolator that blends the eight voxels whose centers surround the point.
///
/// Points within half a voxel step of the domain boundary use the value of
/// the voxel containing them. Neighbors falling outside the grid are left out
/// of the stencil, and the remaining weights are not renormalized.
#[derive(Clone, Copy, Debug, Default)]
pub struct TrilinearInterpolator3;

impl TrilinearInterpolator3 {
    /// Whether the point lies closer than half a voxel step to any face of the domain.
    pub fn is_in_boundary_layer<F: BFloat>(grid: &VoxelGrid3<F>, point: &Point3<F>) -> bool {
        let half_step = num::from_f64::<F>(0.5) * grid.voxel_step();
        let domain_size = grid.domain_size();
        Dim3::slice()
            .iter()
            .any(|&dim| point[dim] < half_step || point[dim] > domain_size[dim] - half_step)
    }
}

impl Interpolator3 for TrilinearInterpolator3 {
    fn stencil<F: BFloat>(
        &self,
        grid: &VoxelGrid3<F>,
        point: &Point3<F>,
    ) -> Option<VoxelStencil<F>> {
        let base = match grid.find_voxel(point) {
            VoxelQuery::Inside(indices) => indices,
            VoxelQuery::Outside => return None,
        };
        if Self::is_in_boundary_layer(grid, point) {
            return Some(VoxelStencil::single(base));
        }

        let step = grid.voxel_step();
        let half = num::from_f64::<F>(0.5);

        // Offset towards the neighboring voxel center on the same side of the
        // base center as the point, and the weight fraction of that neighbor.
        let mut offsets = In3D::same(0_isize);
        let mut fractions = In3D::same(F::zero());
        for dim in Dim3::slice() {
            let center = (num::from_usize::<F>(base[dim]) + half) * step;
            if point[dim] > center {
                offsets[dim] = 1;
                fractions[dim] = (point[dim] - center) / step;
            } else {
                offsets[dim] = -1;
                fractions[dim] = F::one() - (point[dim] - (center - step)) / step;
            }
        }

        let mut voxels = Vec::with_capacity(8);
        for corner in 0..8_usize {
            let mut weight = F::one();
            let mut indices = Idx3::<isize>::origin();
            for dim in Dim3::slice() {
                let uses_offset = corner & (1 << dim.num()) != 0;
                indices[dim] = base[dim] as isize + if uses_offset { offsets[dim] } else { 0 };
                weight = weight
                    * if uses_offset {
                        fractions[dim]
                    } else {
                        F::one() - fractions[dim]
                    };
            }
            if let Some(indices) = grid.legal_indices(&indices) {
                voxels.push((indices, weight));
            }
        }
        Some(VoxelStencil { voxels })
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::geometry::Vec3;
    use approx::assert_abs_diff_eq;

    fn cube_grid(size: f64, step: f64) -> VoxelGrid3<f64> {
        VoxelGrid3::new(Vec3::equal_components(size), step).unwrap()
    }

    #[test]
    fn nearest_stencil_is_containing_voxel() {
        let grid = cube_grid(4.0, 1.0);
        let stencil = NearestVoxelInterpolator3
            .stencil(&grid, &Point3::new(2.2, 0.1, 3.9))
            .unwrap();
        assert_eq!(stencil.voxels(), &[(Idx3::new(2, 0, 3), 1.0)]);
        assert!(NearestVoxelInterpolator3
            .stencil(&grid, &Point3::new(4.0, 1.0, 1.0))
            .is_none());
    }

    #[test]
    fn trilinear_stencil_at_voxel_corner_weights_eight_voxels_equally() {
        let grid = cube_grid(4.0, 1.0);
        let stencil = TrilinearInterpolator3
            .stencil(&grid, &Point3::new(2.0, 2.0, 2.0))
            .unwrap();
        assert_eq!(stencil.base(), &Idx3::new(2, 2, 2));
        assert_eq!(stencil.voxels().len(), 8);
        for (indices, weight) in stencil.voxels() {
            assert_eq!(*weight, 0.125);
            for dim in Dim3::slice() {
                assert!(indices[dim] == 1 || indices[dim] == 2);
            }
        }
    }

    #[test]
    fn trilinear_stencil_at_voxel_center_puts_all_weight_on_base() {
        let grid = cube_grid(4.0, 1.0);
        let stencil = TrilinearInterpolator3
            .stencil(&grid, &Point3::new(1.5, 2.5, 1.5))
            .unwrap();
        assert_eq!(stencil.base(), &Idx3::new(1, 2, 1));
        assert_eq!(stencil.voxels()[0].1, 1.0);
        for (_, weight) in &stencil.voxels()[1..] {
            assert_eq!(*weight, 0.0);
        }
    }

    #[test]
    fn trilinear_weights_point_towards_nearest_centers() {
        let grid = cube_grid(4.0, 1.0);
        let stencil = TrilinearInterpolator3
            .stencil(&grid, &Point3::new(1.75, 1.25, 1.5))
            .unwrap();
        assert_abs_diff_eq!(stencil.total_weight(), 1.0, epsilon = 1e-12);
        let weight_of = |i, j, k| {
            stencil
                .voxels()
                .iter()
                .find(|(indices, _)| indices == &Idx3::new(i, j, k))
                .map(|&(_, weight)| weight)
                .unwrap()
        };
        // x lies above the base center, y below it, z exactly on it.
        assert_abs_diff_eq!(weight_of(1, 1, 1), 0.75 * 0.75 * 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(weight_of(2, 1, 1), 0.25 * 0.75 * 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(weight_of(1, 0, 1), 0.75 * 0.25 * 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(weight_of(2, 0, 1), 0.25 * 0.25 * 1.0, epsilon = 1e-12);
    }

    #[test]
    fn boundary_layer_degrades_to_nearest() {
        let grid = cube_grid(4.0, 1.0);
        for point in [
            Point3::new(0.4, 2.0, 2.0),
            Point3::new(2.0, 3.6, 2.0),
            Point3::new(2.0, 2.0, 3.99),
        ] {
            assert!(TrilinearInterpolator3::is_in_boundary_layer(&grid, &point));
            let stencil = TrilinearInterpolator3.stencil(&grid, &point).unwrap();
            assert_eq!(stencil.voxels().len(), 1);
        }
        assert!(!TrilinearInterpolator3::is_in_boundary_layer(
            &grid,
            &Point3::new(0.5, 3.5, 2.0)
        ));
    }

    #[test]
    fn neighbors_outside_grid_are_skipped_without_renormalization() {
        let grid = cube_grid(4.0, 1.0);
        // On the lower half-step plane the lower neighbor along x is illegal.
        let stencil = TrilinearInterpolator3
            .stencil(&grid, &Point3::new(0.5, 2.0, 2.0))
            .unwrap();
        assert_eq!(stencil.base(), &Idx3::new(0, 2, 2));
        assert_eq!(stencil.voxels().len(), 4);
        assert_abs_diff_eq!(stencil.total_weight(), 1.0, epsilon = 1e-12);

        let grid = VoxelGrid3::new(Vec3::new(4.0, 4.0, 3.5), 1.0).unwrap();
        // The last voxel along z extends beyond the domain face, which is
        // what limits the interpolated region.
        let stencil = TrilinearInterpolator3
            .stencil(&grid, &Point3::new(2.0, 2.0, 2.9))
            .unwrap();
        assert_eq!(stencil.base(), &Idx3::new(2, 2, 2));
        assert_eq!(stencil.voxels().len(), 8);
    }
}
