//! Feature Engineering Engine
//!
//! Aligns prediction inputs to a trained model's declared features and
//! encodes cleaned tables for training.

mod aligner;
mod descriptor;
mod encoder;
mod error;
mod features;

pub use aligner::{align, FeatureAligner};
pub use descriptor::{CategoricalDimension, DeploymentDescriptor, TimeFeature, DESCRIPTOR_VERSION};
pub use encoder::{EncodedTable, OneHotEncoder};
pub use error::FeatureError;
pub use features::{
    indicator_name, BaseFeatures, CategoricalSelection, FeatureVector, AREA_HA, YEAR_SINCE_START,
};
