//! Per-voxel storage and sampling of species concentrations and gradients.

pub mod population;

use crate::{
    error::FieldError,
    geometry::{
        Dim3::{X, Y, Z},
        Idx3, In3D, Point3, Vec3,
    },
    grid::VoxelGrid3,
    interpolation::{Interpolator3, NearestVoxelInterpolator3, TrilinearInterpolator3},
    io::Verbosity,
    num::BFloat,
    species::{insert_into_species_map, SpeciesKey, SpeciesMap},
};
use ndarray::Array3;
use std::{collections::BTreeMap, sync::Arc};

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// Concentration and gradient values of a single species over the grid.
///
/// Voxels that have not been written yet are marked as unpopulated and
/// do not count as containing the species.
#[derive(Clone, Debug)]
pub struct SpeciesLayer<F> {
    concentrations: Array3<F>,
    gradients: In3D<Array3<F>>,
    populated: Array3<bool>,
}

impl<F: BFloat> SpeciesLayer<F> {
    fn new(shape: &In3D<usize>) -> Self {
        let shape = shape.to_tuple();
        Self {
            concentrations: Array3::zeros(shape),
            gradients: In3D::new(
                Array3::zeros(shape),
                Array3::zeros(shape),
                Array3::zeros(shape),
            ),
            populated: Array3::from_elem(shape, false),
        }
    }

    /// Whether the voxel with the given indices holds a value for the species.
    pub fn is_populated(&self, indices: &Idx3<usize>) -> bool {
        self.populated
            .get(indices.to_tuple())
            .copied()
            .unwrap_or(false)
    }

    /// Returns the concentration and gradient at the given voxel, or `None`
    /// if the voxel does not hold a value for the species.
    pub fn value(&self, indices: &Idx3<usize>) -> Option<(F, Vec3<F>)> {
        if self.is_populated(indices) {
            let idx = indices.to_tuple();
            Some((
                self.concentrations[idx],
                Vec3::new(
                    self.gradients[X][idx],
                    self.gradients[Y][idx],
                    self.gradients[Z][idx],
                ),
            ))
        } else {
            None
        }
    }

    /// Returns a reference to the 3D array of concentrations.
    ///
    /// Entries of unpopulated voxels are meaningless.
    pub fn concentrations(&self) -> &Array3<F> {
        &self.concentrations
    }

    /// Returns the number of voxels holding a value for the species.
    pub fn n_populated(&self) -> usize {
        self.populated.iter().filter(|&&populated| populated).count()
    }

    fn set(&mut self, indices: &Idx3<usize>, concentration: F, gradient: &Vec3<F>) {
        let idx = indices.to_tuple();
        self.concentrations[idx] = concentration;
        self.gradients[X][idx] = gradient[X];
        self.gradients[Y][idx] = gradient[Y];
        self.gradients[Z][idx] = gradient[Z];
        self.populated[idx] = true;
    }
}

/// All species values held by a single voxel.
#[derive(Clone, Debug, PartialEq)]
pub struct Voxel<F> {
    pub concentrations: SpeciesMap<F>,
    pub gradients: SpeciesMap<Vec3<F>>,
}

impl<F> Voxel<F> {
    /// Creates a voxel view without any species values.
    pub fn empty() -> Self {
        Self {
            concentrations: SpeciesMap::new(),
            gradients: SpeciesMap::new(),
        }
    }

    /// Whether the voxel holds no species values.
    pub fn is_empty(&self) -> bool {
        self.concentrations.is_empty()
    }
}

/// Concentrations and gradients of all species evaluated at a point.
pub type FieldSample<F> = Voxel<F>;

/// A 3D field of species concentrations and gradients over a voxel grid.
///
/// Every species is identified by a `SpeciesKey` and is written by one of the
/// population strategies in the `population` module. The field is meant to be
/// populated during setup and only sampled afterwards.
#[derive(Clone, Debug)]
pub struct Field<F> {
    grid: Arc<VoxelGrid3<F>>,
    layers: BTreeMap<SpeciesKey, SpeciesLayer<F>>,
    interpolation_enabled: bool,
    verbosity: Verbosity,
}

impl<F: BFloat> Field<F> {
    /// Creates a new field without any species over the given grid.
    ///
    /// Interpolation is enabled by default.
    pub fn new(grid: Arc<VoxelGrid3<F>>) -> Self {
        Self {
            grid,
            layers: BTreeMap::new(),
            interpolation_enabled: true,
            verbosity: Verbosity::Quiet,
        }
    }

    /// Consumes the field and returns a version with the given interpolation setting.
    pub fn with_interpolation(mut self, enabled: bool) -> Self {
        self.interpolation_enabled = enabled;
        self
    }

    /// Consumes the field and returns a version with the given verbosity.
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Returns a reference to the grid.
    pub fn grid(&self) -> &VoxelGrid3<F> {
        self.grid.as_ref()
    }

    /// Returns a new atomic reference counted pointer to the grid.
    pub fn arc_with_grid(&self) -> Arc<VoxelGrid3<F>> {
        Arc::clone(&self.grid)
    }

    /// Returns the 3D shape of the grid.
    pub fn shape(&self) -> &In3D<usize> {
        self.grid.shape()
    }

    /// Whether sampling interpolates between voxels.
    pub fn interpolation_enabled(&self) -> bool {
        self.interpolation_enabled
    }

    /// Sets whether sampling interpolates between voxels.
    pub fn set_interpolation(&mut self, enabled: bool) {
        self.interpolation_enabled = enabled;
    }

    /// Returns the verbosity used when populating the field.
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Sets the verbosity used when populating the field.
    pub fn set_verbosity(&mut self, verbosity: Verbosity) {
        self.verbosity = verbosity;
    }

    /// Creates an iterator over the keys of all species in the field.
    pub fn species_keys(&self) -> impl Iterator<Item = &SpeciesKey> {
        self.layers.keys()
    }

    /// Whether the field holds the given species.
    pub fn contains_species(&self, key: &SpeciesKey) -> bool {
        self.layers.contains_key(key)
    }

    /// Returns the layer of values for the given species, if present.
    pub fn species_layer(&self, key: &SpeciesKey) -> Option<&SpeciesLayer<F>> {
        self.layers.get(key)
    }

    /// Removes the given species from every voxel.
    ///
    /// Returns whether the species was present.
    pub fn remove_species(&mut self, key: &SpeciesKey) -> bool {
        self.layers.remove(key).is_some()
    }

    /// Removes all species from the field, keeping the grid.
    pub fn clear_species(&mut self) {
        self.layers.clear();
    }

    /// Returns the concentration of the given species at the given voxel.
    pub fn concentration(&self, key: &SpeciesKey, indices: &Idx3<usize>) -> Option<F> {
        self.layers
            .get(key)
            .and_then(|layer| layer.value(indices))
            .map(|(concentration, _)| concentration)
    }

    /// Returns the gradient of the given species at the given voxel.
    pub fn gradient(&self, key: &SpeciesKey, indices: &Idx3<usize>) -> Option<Vec3<F>> {
        self.layers
            .get(key)
            .and_then(|layer| layer.value(indices))
            .map(|(_, gradient)| gradient)
    }

    /// Collects all species values held by the voxel with the given indices.
    ///
    /// Returns `None` if the indices are outside the grid.
    pub fn voxel(&self, indices: &Idx3<usize>) -> Option<Voxel<F>> {
        let shape = self.shape();
        if indices[X] >= shape[X] || indices[Y] >= shape[Y] || indices[Z] >= shape[Z] {
            return None;
        }
        let mut voxel = Voxel::empty();
        for (key, layer) in &self.layers {
            if let Some((concentration, gradient)) = layer.value(indices) {
                insert_into_species_map(&mut voxel.concentrations, key, concentration);
                insert_into_species_map(&mut voxel.gradients, key, gradient);
            }
        }
        Some(voxel)
    }

    /// Computes the smallest and largest concentration of the given species
    /// over all voxels holding it.
    pub fn concentration_range(&self, key: &SpeciesKey) -> Option<(F, F)> {
        let layer = self.layers.get(key)?;
        layer
            .concentrations
            .iter()
            .zip(layer.populated.iter())
            .filter(|&(_, &populated)| populated)
            .fold(None, |range, (&concentration, _)| match range {
                None => Some((concentration, concentration)),
                Some((min, max)) => Some((F::min(min, concentration), F::max(max, concentration))),
            })
    }

    /// Evaluates the concentrations and gradients of all species present in
    /// the voxel containing the given point.
    ///
    /// With interpolation enabled, values are blended trilinearly from the
    /// surrounding voxels, otherwise the containing voxel is used directly.
    /// Points outside the grid give an empty sample.
    pub fn sample(&self, point: &Point3<F>) -> FieldSample<F> {
        if self.interpolation_enabled {
            self.sample_with(&TrilinearInterpolator3, point)
        } else {
            self.sample_with(&NearestVoxelInterpolator3, point)
        }
    }

    /// Evaluates the concentrations of all species at the given point.
    pub fn sample_concentrations(&self, point: &Point3<F>) -> SpeciesMap<F> {
        self.sample(point).concentrations
    }

    /// Evaluates the gradients of all species at the given point.
    pub fn sample_gradients(&self, point: &Point3<F>) -> SpeciesMap<Vec3<F>> {
        self.sample(point).gradients
    }

    /// Evaluates all species at the given point using the given interpolator.
    ///
    /// Only species present in the base voxel of the stencil are included.
    /// Stencil voxels lacking a species are left out of its weighted sum.
    pub fn sample_with<I: Interpolator3>(&self, interpolator: &I, point: &Point3<F>) -> FieldSample<F> {
        let mut sample = FieldSample::empty();
        let stencil = match interpolator.stencil(self.grid(), point) {
            Some(stencil) => stencil,
            None => return sample,
        };

        for (key, layer) in &self.layers {
            if !layer.is_populated(stencil.base()) {
                continue;
            }
            let mut concentration = F::zero();
            let mut gradient = Vec3::zero();
            for (indices, weight) in stencil.voxels() {
                if let Some((voxel_concentration, voxel_gradient)) = layer.value(indices) {
                    concentration = concentration + *weight * voxel_concentration;
                    gradient = gradient + voxel_gradient * *weight;
                }
            }
            insert_into_species_map(&mut sample.concentrations, key, concentration);
            insert_into_species_map(&mut sample.gradients, key, gradient);
        }
        sample
    }

    fn layer_entry(&mut self, key: &SpeciesKey) -> &mut SpeciesLayer<F> {
        let shape = self.grid.shape();
        self.layers
            .entry(key.clone())
            .or_insert_with(|| SpeciesLayer::new(shape))
    }
}

/// Settings for constructing a grid and an empty field on it.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct FieldSettings<F> {
    pub domain_size: Vec3<F>,
    pub voxel_step: F,
    #[cfg_attr(feature = "serialization", serde(default = "default_interpolation"))]
    pub interpolation: bool,
    #[cfg_attr(feature = "serialization", serde(default))]
    pub verbosity: Verbosity,
}

#[cfg(feature = "serialization")]
fn default_interpolation() -> bool {
    true
}

impl<F: BFloat> FieldSettings<F> {
    /// Creates settings for the given domain and voxel step, with
    /// interpolation enabled and no status output.
    pub fn new(domain_size: Vec3<F>, voxel_step: F) -> Self {
        Self {
            domain_size,
            voxel_step,
            interpolation: true,
            verbosity: Verbosity::Quiet,
        }
    }

    /// Constructs the grid and an empty field using these settings.
    pub fn build_field(&self) -> Result<Field<F>, FieldError> {
        let grid = VoxelGrid3::new(self.domain_size.clone(), self.voxel_step)?;
        Ok(Field::new(Arc::new(grid))
            .with_interpolation(self.interpolation)
            .with_verbosity(self.verbosity))
    }
}
