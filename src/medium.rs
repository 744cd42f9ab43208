//! Optical medium (spec.md §3): a refractive index and an absorptivity.

use crate::error::{Result, SolveError};
use crate::geometry::Float;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Medium {
    pub refractive_index: Float,
    pub absorptivity: Float,
}

impl Medium {
    pub fn new(refractive_index: Float, absorptivity: Float) -> Result<Self> {
        if refractive_index <= 0.0 {
            return Err(SolveError::BadArgument(
                "medium refractive index must be positive".into(),
            ));
        }
        if absorptivity < 0.0 {
            return Err(SolveError::BadArgument(
                "medium absorptivity must be non-negative".into(),
            ));
        }
        Ok(Medium { refractive_index, absorptivity })
    }

    pub fn vacuum() -> Self {
        Medium { refractive_index: 1.0, absorptivity: 0.0 }
    }
}
