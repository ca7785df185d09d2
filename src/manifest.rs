//! Declarative description of a field and the species to populate it with.

use crate::{
    error::FieldError,
    field::{
        population::{CustomSource, Distribution, GaussianShape, PopulationRequest},
        Field, FieldSettings,
    },
    geometry::{OrientedRegion3, Point3, RegionFrame, Vec3},
    num::BFloat,
    species::SpeciesKey,
};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

#[cfg(feature = "json")]
use crate::io::read_text_file;

/// Oriented box used to shape a Gaussian distribution.
///
/// Missing axes default to the world x- and y-axes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "F: Deserialize<'de>"))]
pub struct RegionEntry<F> {
    pub center: Point3<F>,
    pub extents: Vec3<F>,
    #[serde(default)]
    pub x_axis: Option<Vec3<F>>,
    #[serde(default)]
    pub y_axis: Option<Vec3<F>>,
}

impl<F: BFloat> RegionEntry<F> {
    /// Constructs the oriented region described by the entry.
    pub fn to_region(&self) -> Result<OrientedRegion3<F>, FieldError> {
        let x_axis = self
            .x_axis
            .clone()
            .unwrap_or_else(|| Vec3::new(F::one(), F::zero(), F::zero()));
        let y_axis = self
            .y_axis
            .clone()
            .unwrap_or_else(|| Vec3::new(F::zero(), F::one(), F::zero()));
        OrientedRegion3::new(self.center.clone(), self.extents.clone(), x_axis, y_axis)
    }
}

/// Serializable description of a distribution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "F: Deserialize<'de>"))]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DistributionEntry<F> {
    Homogeneous {
        level: F,
    },
    Linear {
        direction: Vec3<F>,
        min: F,
        max: F,
    },
    /// Shaped by `region` if given, otherwise by `center` and `width`
    /// together, otherwise centered in the domain.
    Gaussian {
        amplitude: F,
        #[serde(default)]
        region: Option<RegionEntry<F>>,
        #[serde(default)]
        center: Option<Point3<F>>,
        #[serde(default)]
        width: Option<Vec3<F>>,
    },
    Custom {
        path: PathBuf,
    },
}

/// One species to populate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "F: Deserialize<'de>"))]
pub struct SpeciesEntry<F> {
    pub group: String,
    pub instance: String,
    pub distribution: DistributionEntry<F>,
}

/// Field settings together with the species to populate the field with,
/// in order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "F: Deserialize<'de>"))]
pub struct SpeciesManifest<F> {
    pub settings: FieldSettings<F>,
    #[serde(default)]
    pub species: Vec<SpeciesEntry<F>>,
}

impl<F: BFloat + 'static> SpeciesEntry<F> {
    /// Converts the entry into a population request.
    ///
    /// Relative custom input paths are resolved against `base_dir` if given.
    pub fn to_request(&self, base_dir: Option<&Path>) -> Result<PopulationRequest<F>, FieldError> {
        let distribution = match &self.distribution {
            DistributionEntry::Homogeneous { level } => Distribution::Homogeneous { level: *level },
            DistributionEntry::Linear {
                direction,
                min,
                max,
            } => Distribution::Linear {
                direction: direction.clone(),
                min: *min,
                max: *max,
            },
            DistributionEntry::Gaussian {
                amplitude,
                region,
                center,
                width,
            } => {
                let shape = match (region, center, width) {
                    (Some(region), _, _) => {
                        let region: Arc<dyn RegionFrame<F>> = Arc::new(region.to_region()?);
                        GaussianShape::Region(region)
                    }
                    (None, Some(center), Some(width)) => GaussianShape::AxisAligned {
                        center: center.clone(),
                        width: width.clone(),
                    },
                    (None, None, None) => GaussianShape::DomainDefault,
                    _ => {
                        return Err(FieldError::InvalidParameter(format!(
                            "gaussian for {}/{} needs both center and width",
                            self.group, self.instance
                        )))
                    }
                };
                Distribution::Gaussian {
                    amplitude: *amplitude,
                    shape,
                }
            }
            DistributionEntry::Custom { path } => {
                let path = match base_dir {
                    Some(base_dir) if path.is_relative() => base_dir.join(path),
                    _ => path.clone(),
                };
                Distribution::Custom(CustomSource::File(path))
            }
        };
        Ok(PopulationRequest::new(
            SpeciesKey::new(self.group.as_str(), self.instance.as_str()),
            distribution,
        ))
    }
}

impl<F: BFloat + 'static> SpeciesManifest<F> {
    /// Converts all species entries into population requests.
    pub fn requests(&self, base_dir: Option<&Path>) -> Result<Vec<PopulationRequest<F>>, FieldError> {
        self.species
            .iter()
            .map(|entry| entry.to_request(base_dir))
            .collect()
    }

    /// Builds the field and populates every species in order.
    ///
    /// All entries are converted and validated before the first species is
    /// populated.
    pub fn build_field(&self, base_dir: Option<&Path>) -> Result<Field<F>, FieldError> {
        let requests = self.requests(base_dir)?;
        for request in &requests {
            request.distribution.validate()?;
        }
        let mut field = self.settings.build_field()?;
        for request in &requests {
            field.populate(request)?;
        }
        Ok(field)
    }
}

#[cfg(feature = "json")]
impl<F> SpeciesManifest<F>
where
    F: BFloat + 'static + serde::de::DeserializeOwned,
{
    /// Parses a manifest from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `FieldError::MalformedInput` referring to the line where
    /// parsing failed.
    pub fn from_json_str(text: &str) -> Result<Self, FieldError> {
        serde_json::from_str(text).map_err(|err| FieldError::MalformedInput {
            line_number: err.line(),
            reason: err.to_string(),
        })
    }

    /// Parses a manifest from the given JSON file.
    pub fn from_json_file<P: AsRef<Path>>(file_path: P) -> Result<Self, FieldError> {
        Self::from_json_str(&read_text_file(file_path)?)
    }
}

/// Reads a manifest from the given JSON file and builds the populated field.
///
/// Relative custom input paths are resolved against the directory of the
/// manifest.
#[cfg(feature = "json")]
pub fn load_field_from_json_file<F, P>(file_path: P) -> Result<Field<F>, FieldError>
where
    F: BFloat + 'static + serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let file_path = file_path.as_ref();
    let manifest = SpeciesManifest::<F>::from_json_file(file_path)?;
    manifest.build_field(file_path.parent())
}

#[cfg(all(test, feature = "json"))]
mod tests {

    use super::*;
    use crate::{geometry::Idx3, io::Verbosity};

    const MANIFEST: &str = r#"{
        "settings": { "domain_size": [4.0, 4.0, 4.0], "voxel_step": 1.0 },
        "species": [
            {
                "group": "glucose",
                "instance": "g1",
                "distribution": { "kind": "homogeneous", "level": 2.5 }
            },
            {
                "group": "oxygen",
                "instance": "o1",
                "distribution": {
                    "kind": "gaussian",
                    "amplitude": 1.0,
                    "region": { "center": [2.5, 2.5, 2.5], "extents": [1.0, 1.0, 1.0] }
                }
            }
        ]
    }"#;

    #[test]
    fn manifest_builds_populated_field() {
        let manifest = SpeciesManifest::<f64>::from_json_str(MANIFEST).unwrap();
        assert!(manifest.settings.interpolation);
        assert_eq!(manifest.settings.verbosity, Verbosity::Quiet);

        let field = manifest.build_field(None).unwrap();
        let glucose = SpeciesKey::new("glucose", "g1");
        let oxygen = SpeciesKey::new("oxygen", "o1");
        assert_eq!(field.concentration(&glucose, &Idx3::new(0, 3, 1)), Some(2.5));
        assert_eq!(field.concentration(&oxygen, &Idx3::new(2, 2, 2)), Some(1.0));
    }

    #[test]
    fn omitted_optional_entries_take_defaults() {
        let manifest = SpeciesManifest::<f64>::from_json_str(
            r#"{ "settings": { "domain_size": [2.0, 2.0, 2.0], "voxel_step": 1.0 } }"#,
        )
        .unwrap();
        assert!(manifest.species.is_empty());
        assert_eq!(manifest.build_field(None).unwrap().species_keys().count(), 0);

        let entry: SpeciesEntry<f64> = serde_json::from_str(
            r#"{
                "group": "oxygen",
                "instance": "o1",
                "distribution": { "kind": "gaussian", "amplitude": 2.0 }
            }"#,
        )
        .unwrap();
        assert_eq!(
            entry.distribution,
            DistributionEntry::Gaussian {
                amplitude: 2.0,
                region: None,
                center: None,
                width: None,
            }
        );
        assert!(matches!(
            entry.to_request(None).unwrap().distribution,
            Distribution::Gaussian {
                shape: GaussianShape::DomainDefault,
                ..
            }
        ));
    }

    #[test]
    fn invalid_json_reports_line() {
        let result = SpeciesManifest::<f64>::from_json_str("{\n\"settings\": 3\n}");
        assert!(matches!(
            result,
            Err(FieldError::MalformedInput { line_number: 2, .. })
        ));
    }

    #[test]
    fn incomplete_gaussian_shape_is_rejected() {
        let entry = SpeciesEntry {
            group: "glucose".to_string(),
            instance: "g1".to_string(),
            distribution: DistributionEntry::Gaussian {
                amplitude: 1.0,
                region: None,
                center: Some(Point3::new(1.0, 1.0, 1.0)),
                width: None,
            },
        };
        assert!(matches!(
            entry.to_request(None),
            Err(FieldError::InvalidParameter(_))
        ));
    }

    #[test]
    fn relative_custom_paths_are_resolved_against_base_dir() {
        let entry = SpeciesEntry::<f64> {
            group: "glucose".to_string(),
            instance: "g1".to_string(),
            distribution: DistributionEntry::Custom {
                path: PathBuf::from("values.txt"),
            },
        };
        let request = entry.to_request(Some(Path::new("/data"))).unwrap();
        assert!(matches!(
            request.distribution,
            Distribution::Custom(CustomSource::File(path)) if path == Path::new("/data/values.txt")
        ));
    }
}
