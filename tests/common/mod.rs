#![allow(dead_code)]

use approx::abs_diff_eq;
use lazy_static::lazy_static;
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};
use tissuefield::{
    field::Field,
    geometry::{Point3, Vec3},
    grid::VoxelGrid3,
    species::{lookup_in_species_map, SpeciesKey, SpeciesMap},
};

#[macro_export]
macro_rules! def_test {
    (
        OUT[$($out_ident:ident = $out_str:expr),*]
        fn $name:ident $test_body:block
    ) => {
        #[test]
        fn $name() {
            let test = common::Test::new(stringify!($name));
            $( let $out_ident = test.output_path($out_str); )*
            $test_body
        }
    };
}

pub const EPSILON: f64 = 1e-12;

pub fn glucose() -> SpeciesKey {
    SpeciesKey::new("glucose", "g1")
}

pub fn oxygen() -> SpeciesKey {
    SpeciesKey::new("oxygen", "o1")
}

/// Creates a field over a copy of the shared 4x4x4 grid.
pub fn cube_field() -> Field<f64> {
    Field::new(Arc::clone(&CUBE_GRID))
}

pub fn sampled_concentration(field: &Field<f64>, key: &SpeciesKey, point: &Point3<f64>) -> Option<f64> {
    lookup_in_species_map(&field.sample_concentrations(point), key).copied()
}

pub fn sampled_gradient(field: &Field<f64>, key: &SpeciesKey, point: &Point3<f64>) -> Option<Vec3<f64>> {
    lookup_in_species_map(&field.sample_gradients(point), key).cloned()
}

pub fn assert_single_species_value<T: PartialEq + std::fmt::Debug>(
    map: &SpeciesMap<T>,
    key: &SpeciesKey,
    value: T,
) {
    assert_eq!(map.len(), 1, "Expected one group in {:?}", map);
    assert_eq!(
        lookup_in_species_map(map, key),
        Some(&value),
        "Expected {} = {:?} in {:?}",
        key,
        value,
        map
    );
}

pub fn assert_values_close(a: f64, b: f64, epsilon: f64) {
    assert!(
        abs_diff_eq!(a, b, epsilon = epsilon),
        "Values {} and {} differ by more than {}",
        a,
        b,
        epsilon
    );
}

#[derive(Debug, Clone)]
pub struct Test {
    output_dir: PathBuf,
}

impl Test {
    pub fn new<S: AsRef<str>>(name: S) -> Self {
        let name = name.as_ref();
        let output_dir = CONTEXT
            .prepared_output_dir(name)
            .unwrap_or_else(|err| panic!("Could not prepare output directory for {}: {}", name, err));
        Self { output_dir }
    }

    pub fn output_path<S: AsRef<str>>(&self, file_name: S) -> PathBuf {
        self.output_dir.join(file_name.as_ref())
    }
}

#[derive(Debug, Clone)]
pub struct TestContext {
    base_output_dir: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        Self {
            base_output_dir: Path::new(env!("CARGO_TARGET_TMPDIR")).join("tissuefield_tests"),
        }
    }

    pub fn output_dir<S: AsRef<str>>(&self, test_name: S) -> PathBuf {
        self.base_output_dir.join(test_name.as_ref())
    }

    pub fn prepared_output_dir<S: AsRef<str>>(&self, test_name: S) -> io::Result<PathBuf> {
        let output_dir = self.output_dir(test_name);
        if output_dir.exists() {
            fs::remove_dir_all(&output_dir)?;
        }
        fs::create_dir_all(&output_dir)?;
        Ok(output_dir)
    }
}

lazy_static! {
    pub static ref CONTEXT: TestContext = TestContext::new();
    pub static ref CUBE_GRID: Arc<VoxelGrid3<f64>> =
        Arc::new(VoxelGrid3::new(Vec3::equal_components(4.0), 1.0).unwrap());
    pub static ref HOMOGENEOUS_FIELD: Field<f64> = {
        let mut field = cube_field();
        field.populate_homogeneous(&glucose(), 2.5).unwrap();
        field
    };
}
