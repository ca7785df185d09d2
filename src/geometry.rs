//! Geometric utility objects.

use crate::{error::FieldError, num::BFloat};
use num;
use std::{
    fmt,
    ops::{Add, Div, Index, IndexMut, Mul, Sub},
};

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

#[cfg(any(test, feature = "for-testing"))]
use approx::{AbsDiffEq, RelativeEq};

/// Denotes the x-, y- or z-dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dim3 {
    X = 0,
    Y = 1,
    Z = 2,
}

impl Dim3 {
    /// Creates an array for iterating over the x-, y- and z-dimensions.
    pub fn slice() -> [Self; 3] {
        [Self::X, Self::Y, Self::Z]
    }

    /// Returns the number of the dimension.
    pub fn num(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Dim3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        })
    }
}

use Dim3::{X, Y, Z};

/// Represents any quantity with three dimensional components.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct In3D<T>([T; 3]);

impl<T> In3D<T> {
    /// Creates a new 3D quantity given the three components.
    pub fn new(x: T, y: T, z: T) -> Self {
        Self([x, y, z])
    }

    /// Creates a new 3D quantity by evaluating the given component
    /// constructor for each dimension.
    pub fn with_each_component<C>(create_component: C) -> Self
    where
        C: Fn(Dim3) -> T,
    {
        Self(Dim3::slice().map(create_component))
    }

    /// Creates a new 3D quantity with the given value copied into all components.
    pub fn same(a: T) -> Self
    where
        T: Copy,
    {
        Self([a; 3])
    }

    /// Creates a new tuple containing copies of the three components.
    pub fn to_tuple(&self) -> (T, T, T)
    where
        T: Copy,
    {
        let [x, y, z] = self.0;
        (x, y, z)
    }
}

impl<T> Index<Dim3> for In3D<T> {
    type Output = T;
    fn index(&self, dim: Dim3) -> &Self::Output {
        &self.0[dim.num()]
    }
}

impl<T> IndexMut<Dim3> for In3D<T> {
    fn index_mut(&mut self, dim: Dim3) -> &mut Self::Output {
        &mut self.0[dim.num()]
    }
}

fn write_components<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    components: &In3D<T>,
    delimiters: (&str, &str),
) -> fmt::Result {
    write!(
        f,
        "{}{}, {}, {}{}",
        delimiters.0, components[X], components[Y], components[Z], delimiters.1
    )
}

/// Implements component indexing and `Display` for a newtype around `In3D`.
macro_rules! impl_in3d_wrapper {
    ($T:ident <$C:ident: $bound:path>, $delimiters:expr) => {
        impl<$C: $bound> Index<Dim3> for $T<$C> {
            type Output = $C;
            fn index(&self, dim: Dim3) -> &Self::Output {
                &self.0[dim]
            }
        }

        impl<$C: $bound> IndexMut<Dim3> for $T<$C> {
            fn index_mut(&mut self, dim: Dim3) -> &mut Self::Output {
                &mut self.0[dim]
            }
        }

        impl<$C: $bound + fmt::Display> fmt::Display for $T<$C> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write_components(f, &self.0, $delimiters)
            }
        }
    };
}

/// Implements a component-wise binary operator between references, plus the
/// by-value form delegating to it.
macro_rules! impl_componentwise_op {
    ($Op:ident, $op:ident, $Lhs:ident, $Rhs:ident => $Out:ident) => {
        impl<'a, F: BFloat> $Op<&'a $Rhs<F>> for &'a $Lhs<F> {
            type Output = $Out<F>;
            fn $op(self, other: &'a $Rhs<F>) -> Self::Output {
                $Out::with_each_component(|dim| $Op::$op(self[dim], other[dim]))
            }
        }

        impl<F: BFloat> $Op<$Rhs<F>> for $Lhs<F> {
            type Output = $Out<F>;
            fn $op(self, other: $Rhs<F>) -> Self::Output {
                $Op::$op(&self, &other)
            }
        }
    };
}

/// Implements an operator applying a scalar to every component.
macro_rules! impl_scalar_op {
    ($Op:ident, $op:ident, $T:ident) => {
        impl<F: BFloat> $Op<F> for &$T<F> {
            type Output = $T<F>;
            fn $op(self, scalar: F) -> Self::Output {
                $T::with_each_component(|dim| $Op::$op(self[dim], scalar))
            }
        }

        impl<F: BFloat> $Op<F> for $T<F> {
            type Output = $T<F>;
            fn $op(self, scalar: F) -> Self::Output {
                $Op::$op(&self, scalar)
            }
        }
    };
}

#[cfg(any(test, feature = "for-testing"))]
macro_rules! impl_approx_eq_3d {
    ($T:ident <$F:ident>) => {
        impl<$F> AbsDiffEq for $T<$F>
        where
            $F: BFloat + AbsDiffEq,
            $F::Epsilon: Copy,
        {
            type Epsilon = <$F as AbsDiffEq>::Epsilon;

            fn default_epsilon() -> Self::Epsilon {
                $F::default_epsilon()
            }

            fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
                Dim3::slice()
                    .iter()
                    .all(|&dim| $F::abs_diff_eq(&self[dim], &other[dim], epsilon))
            }
        }

        impl<$F> RelativeEq for $T<$F>
        where
            $F: BFloat + RelativeEq,
            $F::Epsilon: Copy,
        {
            fn default_max_relative() -> Self::Epsilon {
                $F::default_max_relative()
            }

            fn relative_eq(
                &self,
                other: &Self,
                epsilon: Self::Epsilon,
                max_relative: Self::Epsilon,
            ) -> bool {
                Dim3::slice().iter().all(|&dim| {
                    $F::relative_eq(&self[dim], &other[dim], epsilon, max_relative)
                })
            }
        }
    };
}

/// A 3D vector.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct Vec3<F>(In3D<F>);

impl<F: BFloat> Vec3<F> {
    /// Creates a new 3D vector given the three components.
    pub fn new(x: F, y: F, z: F) -> Self {
        Self(In3D::new(x, y, z))
    }

    /// Creates a new 3D vector by evaluating the given component
    /// constructor for each dimension.
    pub fn with_each_component<C>(create_component: C) -> Self
    where
        C: Fn(Dim3) -> F,
    {
        Self(In3D::with_each_component(create_component))
    }

    pub fn zero() -> Self {
        Self(In3D::same(F::zero()))
    }

    pub fn equal_components(a: F) -> Self {
        Self(In3D::same(a))
    }

    pub fn squared_length(&self) -> F {
        self.dot(self)
    }

    pub fn length(&self) -> F {
        self.squared_length().sqrt()
    }

    /// Whether all components are finite.
    pub fn is_finite(&self) -> bool {
        Dim3::slice().iter().all(|&dim| self[dim].is_finite())
    }

    /// Computes the dot product of the vector with another vector.
    pub fn dot(&self, other: &Self) -> F {
        Dim3::slice()
            .iter()
            .fold(F::zero(), |sum, &dim| sum + self[dim] * other[dim])
    }

    /// Computes the right-handed cross product of the vector with another vector.
    pub fn cross(&self, other: &Self) -> Self {
        Self::new(
            self[Y] * other[Z] - self[Z] * other[Y],
            self[Z] * other[X] - self[X] * other[Z],
            self[X] * other[Y] - self[Y] * other[X],
        )
    }

    /// Returns a unit length version of the vector, or `None` if the
    /// vector has zero or non-finite length.
    pub fn normalized(&self) -> Option<Self> {
        let length = self.length();
        if length == F::zero() || !length.is_finite() {
            None
        } else {
            Some(self / length)
        }
    }

    /// Returns the smallest component.
    pub fn min(&self) -> F {
        F::min(self[X], F::min(self[Y], self[Z]))
    }
}

impl_in3d_wrapper!(Vec3<F: BFloat>, ("(", ")"));
impl_componentwise_op!(Add, add, Vec3, Vec3 => Vec3);
impl_componentwise_op!(Sub, sub, Vec3, Vec3 => Vec3);
impl_scalar_op!(Mul, mul, Vec3);
impl_scalar_op!(Div, div, Vec3);

#[cfg(any(test, feature = "for-testing"))]
impl_approx_eq_3d!(Vec3<F>);

/// A 3D spatial coordinate.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct Point3<F>(In3D<F>);

impl<F: BFloat> Point3<F> {
    /// Creates a new 3D point given the three components.
    pub fn new(x: F, y: F, z: F) -> Self {
        Self(In3D::new(x, y, z))
    }

    /// Creates a new 3D point by evaluating the given component
    /// constructor for each dimension.
    pub fn with_each_component<C>(create_component: C) -> Self
    where
        C: Fn(Dim3) -> F,
    {
        Self(In3D::with_each_component(create_component))
    }

    pub fn origin() -> Self {
        Self(In3D::same(F::zero()))
    }

    /// Returns the displacement of the point from the origin.
    pub fn to_vec3(&self) -> Vec3<F> {
        Vec3(self.0.clone())
    }

    /// Whether all components are finite.
    pub fn is_finite(&self) -> bool {
        Dim3::slice().iter().all(|&dim| self[dim].is_finite())
    }
}

impl_in3d_wrapper!(Point3<F: BFloat>, ("(", ")"));
impl_componentwise_op!(Sub, sub, Point3, Point3 => Vec3);
impl_componentwise_op!(Add, add, Point3, Vec3 => Point3);

#[cfg(any(test, feature = "for-testing"))]
impl_approx_eq_3d!(Point3<F>);

/// A 3D index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Idx3<I>(In3D<I>);

impl<I: num::Integer + Copy> Idx3<I> {
    /// Creates a new 3D index given the three components.
    pub fn new(i: I, j: I, k: I) -> Self {
        Self(In3D::new(i, j, k))
    }

    pub fn origin() -> Self {
        Self(In3D::same(I::zero()))
    }

    /// Converts an index with a different component type, returning `None`
    /// if any component is not representable in the new type.
    pub fn try_from_idx<U>(other: &Idx3<U>) -> Option<Self>
    where
        I: num::NumCast,
        U: num::Integer + num::NumCast + Copy,
    {
        Some(Self::new(
            I::from(other[X])?,
            I::from(other[Y])?,
            I::from(other[Z])?,
        ))
    }

    /// Returns the components as a tuple, usable for indexing 3D arrays.
    pub fn to_tuple(&self) -> (I, I, I) {
        self.0.to_tuple()
    }
}

impl_in3d_wrapper!(Idx3<I: num::Integer>, ("[", "]"));

/// Defines the properties of an oriented sub-volume of the domain
/// with its own local coordinate frame.
pub trait RegionFrame<F: BFloat>: Sync + Send {
    /// Returns the center of the region in world coordinates.
    fn center(&self) -> Point3<F>;

    /// Returns the half-widths of the region along its local axes.
    fn extents(&self) -> Vec3<F>;

    /// Maps the given world point into the local frame of the region,
    /// keeping world distance units.
    fn world_to_local_preserve_scale(&self, point: &Point3<F>) -> Vec3<F>;
}

/// A box-shaped region with arbitrary orientation.
#[derive(Clone, Debug, PartialEq)]
pub struct OrientedRegion3<F> {
    center: Point3<F>,
    extents: Vec3<F>,
    axes: In3D<Vec3<F>>,
}

impl<F: BFloat> OrientedRegion3<F> {
    /// Creates a new oriented region from its center, half-extents and the
    /// directions of its local x- and y-axes.
    ///
    /// The y-axis is orthogonalized against the x-axis, and the local z-axis
    /// completes a right-handed frame.
    pub fn new(
        center: Point3<F>,
        extents: Vec3<F>,
        x_axis: Vec3<F>,
        y_axis: Vec3<F>,
    ) -> Result<Self, FieldError> {
        if !center.is_finite() || !extents.is_finite() {
            return Err(FieldError::InvalidParameter(
                "region center and extents must be finite".to_string(),
            ));
        }
        let unit_x = x_axis.normalized().ok_or_else(|| {
            FieldError::InvalidParameter("region x-axis has zero length".to_string())
        })?;
        let unit_y = (&y_axis - &(&unit_x * unit_x.dot(&y_axis)))
            .normalized()
            .ok_or_else(|| {
                FieldError::InvalidParameter(
                    "region y-axis is zero or parallel to the x-axis".to_string(),
                )
            })?;
        let unit_z = unit_x.cross(&unit_y);
        Ok(Self {
            center,
            extents,
            axes: In3D::new(unit_x, unit_y, unit_z),
        })
    }

    /// Creates a new region whose local axes coincide with the world axes.
    pub fn axis_aligned(center: Point3<F>, extents: Vec3<F>) -> Result<Self, FieldError> {
        Self::new(
            center,
            extents,
            Vec3::new(F::one(), F::zero(), F::zero()),
            Vec3::new(F::zero(), F::one(), F::zero()),
        )
    }

    /// Returns a reference to the unit vector of the given local axis.
    pub fn axis(&self, dim: Dim3) -> &Vec3<F> {
        &self.axes[dim]
    }
}

impl<F: BFloat> RegionFrame<F> for OrientedRegion3<F> {
    fn center(&self) -> Point3<F> {
        self.center.clone()
    }

    fn extents(&self) -> Vec3<F> {
        self.extents.clone()
    }

    fn world_to_local_preserve_scale(&self, point: &Point3<F>) -> Vec3<F> {
        let displacement = point - &self.center;
        Vec3::with_each_component(|dim| displacement.dot(&self.axes[dim]))
    }
}
