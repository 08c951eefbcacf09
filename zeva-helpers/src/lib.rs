use ndarray::{NdFloat, ScalarOperand};

use num_traits::{FromPrimitive, NumCast};
use rand::distr::uniform::SampleUniform;

use std::iter::Sum;

// Include submodules
mod common;
mod model;

// Re-export types from submodules
pub use common::{Dataset, DatasetError};
pub use model::{ModelError, TrainableModel};

/// Scalar trait bound shared by every table and trainer in the workspace.
///
/// Covers the ndarray arithmetic, casting and uniform-sampling operations the
/// trainers rely on; implemented for `f32` and `f64`.
pub trait Float:
    NdFloat + FromPrimitive + Default + Sum + SampleUniform + ScalarOperand + std::marker::Unpin
{
    fn cast<T: NumCast>(x: T) -> Option<Self> {
        NumCast::from(x)
    }
}

impl Float for f32 {}

impl Float for f64 {}
