//! Strategies for filling a species layer of a field with values.

use super::Field;
use crate::{
    error::FieldError,
    geometry::{Dim3, Idx3, Point3, RegionFrame, Vec3},
    io::{open_file_and_map_err, voxel_lines::VoxelLineReader},
    num::{self, BFloat},
    species::SpeciesKey,
};
use indicatif::ProgressIterator;
use std::{
    fmt,
    io::BufRead,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Where the center and widths of a Gaussian distribution come from.
#[derive(Clone)]
pub enum GaussianShape<F: BFloat> {
    /// Centered on the region, with widths equal to twice its half-extents.
    /// Voxel positions are mapped into the local frame of the region.
    Region(Arc<dyn RegionFrame<F>>),
    /// Axis-aligned distribution with the given center and per-axis widths.
    AxisAligned { center: Point3<F>, width: Vec3<F> },
    /// Centered in the domain, with widths equal to the domain size.
    DomainDefault,
}

impl<F: BFloat> fmt::Debug for GaussianShape<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Region(region) => f
                .debug_struct("Region")
                .field("center", &region.center())
                .field("extents", &region.extents())
                .finish(),
            Self::AxisAligned { center, width } => f
                .debug_struct("AxisAligned")
                .field("center", center)
                .field("width", width)
                .finish(),
            Self::DomainDefault => write!(f, "DomainDefault"),
        }
    }
}

/// Source of pre-computed per-voxel values for a custom distribution.
#[derive(Clone, Debug, PartialEq)]
pub enum CustomSource {
    File(PathBuf),
    Text(String),
}

/// Distribution of values to populate a species with.
#[derive(Clone, Debug)]
pub enum Distribution<F: BFloat> {
    /// The same concentration everywhere, with zero gradient.
    Homogeneous { level: F },
    /// Concentration varying linearly along a direction in index space,
    /// from `min` at one corner of the grid to `max` at the opposite one.
    Linear { direction: Vec3<F>, min: F, max: F },
    /// Gaussian bump with the given peak concentration.
    Gaussian { amplitude: F, shape: GaussianShape<F> },
    /// One line of values per voxel read from a line-oriented source.
    Custom(CustomSource),
}

impl<F: BFloat> Distribution<F> {
    /// Returns a short lowercase name for the kind of distribution.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Homogeneous { .. } => "homogeneous",
            Self::Linear { .. } => "linear",
            Self::Gaussian { .. } => "gaussian",
            Self::Custom(_) => "custom",
        }
    }

    /// Checks the parameters of the distribution.
    ///
    /// # Errors
    ///
    /// Returns `FieldError::InvalidParameter` for non-finite values, a
    /// zero-length linear direction or a Gaussian with a non-positive width
    /// or region extent along any axis.
    pub fn validate(&self) -> Result<(), FieldError> {
        match self {
            Self::Homogeneous { level } => {
                require(level.is_finite(), "homogeneous level must be finite")
            }
            Self::Linear {
                direction,
                min,
                max,
            } => {
                require(
                    num::all_finite(&[*min, *max]),
                    "linear bounds must be finite",
                )?;
                require(
                    direction.normalized().is_some(),
                    "linear direction must have finite, non-zero length",
                )
            }
            Self::Gaussian { amplitude, shape } => {
                require(amplitude.is_finite(), "gaussian amplitude must be finite")?;
                match shape {
                    GaussianShape::Region(region) => {
                        require(
                            region.center().is_finite(),
                            "gaussian region center must be finite",
                        )?;
                        require(
                            all_positive_and_finite(&region.extents()),
                            "gaussian region extents must be positive and finite",
                        )
                    }
                    GaussianShape::AxisAligned { center, width } => {
                        require(center.is_finite(), "gaussian center must be finite")?;
                        require(
                            all_positive_and_finite(width),
                            "gaussian widths must be positive and finite",
                        )
                    }
                    GaussianShape::DomainDefault => Ok(()),
                }
            }
            Self::Custom(_) => Ok(()),
        }
    }
}

fn require(condition: bool, message: &str) -> Result<(), FieldError> {
    if condition {
        Ok(())
    } else {
        Err(FieldError::InvalidParameter(message.to_string()))
    }
}

fn all_positive_and_finite<F: BFloat>(values: &Vec3<F>) -> bool {
    values.is_finite() && values.min() > F::zero()
}

/// Describes the population of one species in a field.
#[derive(Clone, Debug)]
pub struct PopulationRequest<F: BFloat> {
    pub key: SpeciesKey,
    pub distribution: Distribution<F>,
}

impl<F: BFloat> PopulationRequest<F> {
    /// Creates a new population request.
    pub fn new(key: SpeciesKey, distribution: Distribution<F>) -> Self {
        Self { key, distribution }
    }
}

/// Bookkeeping reported after a species has been populated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PopulationSummary<F> {
    pub n_voxels: usize,
    pub min_concentration: F,
    pub max_concentration: F,
}

impl<F: BFloat> Field<F> {
    /// Populates the species of the request with its distribution.
    ///
    /// Parameters are validated before anything is modified. Any existing
    /// values of the species are overwritten.
    pub fn populate(
        &mut self,
        request: &PopulationRequest<F>,
    ) -> Result<PopulationSummary<F>, FieldError> {
        let key = &request.key;
        match &request.distribution {
            Distribution::Homogeneous { level } => self.populate_homogeneous(key, *level),
            Distribution::Linear {
                direction,
                min,
                max,
            } => self.populate_linear(key, direction, *min, *max),
            Distribution::Gaussian { amplitude, shape } => {
                self.populate_gaussian(key, *amplitude, shape)
            }
            Distribution::Custom(CustomSource::File(file_path)) => {
                self.populate_custom_from_file(key, file_path)
            }
            Distribution::Custom(CustomSource::Text(text)) => {
                self.populate_custom_from_reader(key, text.as_bytes())
            }
        }
    }

    /// Sets the given concentration and a zero gradient in every voxel.
    pub fn populate_homogeneous(
        &mut self,
        key: &SpeciesKey,
        level: F,
    ) -> Result<PopulationSummary<F>, FieldError> {
        Distribution::Homogeneous { level }.validate()?;
        self.report_population(key, "homogeneous");
        self.fill_layer(key, |_| Ok((level, Vec3::zero())))
    }

    /// Sets concentrations varying linearly with the projection of the voxel
    /// indices onto the given direction.
    ///
    /// The projection of the far grid corner is scaled to reach `max` if it
    /// is positive, or `min` if it is negative, with the origin voxel at the
    /// other bound. A direction orthogonal to the grid diagonal gives zero
    /// concentration everywhere. The gradient is constant and expressed per
    /// voxel index.
    pub fn populate_linear(
        &mut self,
        key: &SpeciesKey,
        direction: &Vec3<F>,
        min: F,
        max: F,
    ) -> Result<PopulationSummary<F>, FieldError> {
        let distribution = Distribution::Linear {
            direction: direction.clone(),
            min,
            max,
        };
        distribution.validate()?;
        let direction = direction.normalized().ok_or_else(|| {
            FieldError::InvalidParameter("linear direction must have non-zero length".to_string())
        })?;
        self.report_population(key, distribution.kind_name());

        let shape = self.shape().clone();
        let projected_diagonal = Dim3::slice().iter().fold(F::zero(), |sum, &dim| {
            sum + direction[dim] * (num::from_usize::<F>(shape[dim]) - F::one())
        });

        let (start, end) = if projected_diagonal > F::zero() {
            (min, max)
        } else {
            (max, min)
        };
        let gradient = if projected_diagonal == F::zero() {
            Vec3::zero()
        } else {
            &direction * ((end - start) / projected_diagonal)
        };

        self.fill_layer(key, |indices| {
            if projected_diagonal == F::zero() {
                return Ok((F::zero(), gradient.clone()));
            }
            let projection = Dim3::slice().iter().fold(F::zero(), |sum, &dim| {
                sum + direction[dim] * num::from_usize::<F>(indices[dim])
            });
            let concentration = start + (end - start) * projection / projected_diagonal;
            Ok((concentration, gradient.clone()))
        })
    }

    /// Sets concentrations following a Gaussian with the given amplitude.
    ///
    /// The exponent is evaluated from voxel center positions in the local
    /// frame of the shape, while the gradient is computed from the world
    /// space displacement of the voxel center from the shape center.
    pub fn populate_gaussian(
        &mut self,
        key: &SpeciesKey,
        amplitude: F,
        shape: &GaussianShape<F>,
    ) -> Result<PopulationSummary<F>, FieldError> {
        Distribution::Gaussian {
            amplitude,
            shape: shape.clone(),
        }
        .validate()?;
        self.report_population(key, "gaussian");

        let grid = self.arc_with_grid();
        let two = num::from_f64::<F>(2.0);
        let (center, width, frame): (Point3<F>, Vec3<F>, Option<&dyn RegionFrame<F>>) =
            match shape {
                GaussianShape::Region(region) => {
                    (region.center(), region.extents() * two, Some(region.as_ref()))
                }
                GaussianShape::AxisAligned { center, width } => {
                    (center.clone(), width.clone(), None)
                }
                GaussianShape::DomainDefault => {
                    (grid.domain_center(), grid.domain_size().clone(), None)
                }
            };

        self.fill_layer(key, |indices| {
            let position = grid.voxel_center(indices);
            let displacement = &position - &center;
            let local_position = match frame {
                Some(frame) => frame.world_to_local_preserve_scale(&position),
                None => displacement.clone(),
            };
            let exponent_numerator = local_position.squared_length();
            let normal = local_position.normalized().unwrap_or_else(Vec3::zero);
            let exponent_denominator = Dim3::slice().iter().fold(F::zero(), |sum, &dim| {
                let scaled = normal[dim] * width[dim];
                sum + scaled * scaled
            });

            let concentration = if exponent_denominator == F::zero() {
                amplitude
            } else {
                amplitude * (-exponent_numerator / (two * exponent_denominator)).exp()
            };
            let gradient = Vec3::with_each_component(|dim| {
                -concentration * displacement[dim] / (width[dim] * width[dim])
            });
            Ok((concentration, gradient))
        })
    }

    /// Sets the values of every voxel from consecutive lines of the given
    /// reader, in x-outermost, z-innermost order.
    ///
    /// Each line holds a concentration followed by the three gradient
    /// components.
    ///
    /// # Errors
    ///
    /// Returns `FieldError::MalformedInput` if a line is missing or cannot be
    /// parsed, and `FieldError::FileAccess` if reading fails. Voxels visited
    /// before the failing line keep their new values. A species that ends up
    /// with no populated voxels is not added to the field.
    pub fn populate_custom_from_reader<R: BufRead>(
        &mut self,
        key: &SpeciesKey,
        reader: R,
    ) -> Result<PopulationSummary<F>, FieldError> {
        self.populate_from_voxel_lines(key, VoxelLineReader::new(reader))
    }

    /// Sets the values of every voxel from the lines of the given file.
    ///
    /// See `populate_custom_from_reader` for the line format.
    pub fn populate_custom_from_file<P: AsRef<Path>>(
        &mut self,
        key: &SpeciesKey,
        file_path: P,
    ) -> Result<PopulationSummary<F>, FieldError> {
        let file_path = file_path.as_ref();
        let reader = open_file_and_map_err(file_path)?;
        if self.verbosity.print_messages() {
            println!("Reading custom values from {}", file_path.display());
        }
        self.populate_from_voxel_lines(
            key,
            VoxelLineReader::new(reader).with_source_path(file_path),
        )
    }

    fn populate_from_voxel_lines<R: BufRead>(
        &mut self,
        key: &SpeciesKey,
        mut voxel_lines: VoxelLineReader<R>,
    ) -> Result<PopulationSummary<F>, FieldError> {
        self.report_population(key, "custom");
        self.fill_layer(key, |_| voxel_lines.next_voxel_values())
    }

    fn report_population(&self, key: &SpeciesKey, kind_name: &str) {
        if self.verbosity.print_messages() {
            println!(
                "Populating {} with {} distribution over {} voxels",
                key,
                kind_name,
                self.grid().n_voxels()
            );
        }
    }

    fn fill_layer<V>(
        &mut self,
        key: &SpeciesKey,
        mut evaluate: V,
    ) -> Result<PopulationSummary<F>, FieldError>
    where
        V: FnMut(&Idx3<usize>) -> Result<(F, Vec3<F>), FieldError>,
    {
        let grid = self.arc_with_grid();
        let progress_bar = self.verbosity.create_progress_bar(grid.n_voxels());
        let layer = self.layer_entry(key);

        let mut min_concentration = F::infinity();
        let mut max_concentration = F::neg_infinity();
        for indices in grid.voxel_indices().progress_with(progress_bar) {
            let (concentration, gradient) = match evaluate(&indices) {
                Ok(values) => values,
                Err(err) => {
                    if layer.n_populated() == 0 {
                        self.layers.remove(key);
                    }
                    return Err(err);
                }
            };
            layer.set(&indices, concentration, &gradient);
            min_concentration = F::min(min_concentration, concentration);
            max_concentration = F::max(max_concentration, concentration);
        }
        Ok(PopulationSummary {
            n_voxels: grid.n_voxels(),
            min_concentration,
            max_concentration,
        })
    }
}
