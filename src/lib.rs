#[macro_use]
extern crate impl_ops;

pub mod atmosphere;
pub mod carving;
pub mod error;
pub mod estimator;
pub mod geometry;
pub mod material;
pub mod medium;
pub mod mesh;
pub mod punched;
pub mod quadric;
pub mod rng;
pub mod scene;
pub mod shape;
pub mod sink;
pub mod solver;
pub mod spectrum;
pub mod sun;
