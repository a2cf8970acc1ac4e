//! Predicts an EV charging-session outcome from the parameters entered on a
//! web form: the fields are parsed into a [`types::ChargingSessionInput`],
//! encoded into a fixed-order [`features::FeatureVector`], and handed to a
//! [`model::Regressor`] loaded once at startup.

pub mod config;
pub mod features;
pub mod http;
pub mod model;
pub mod types;

pub use features::{encode, format_prediction, EncodeError, FeatureVector, FEATURE_COLUMNS};
pub use model::{ModelError, ModelSource, Regressor};
pub use types::{ChargingSessionInput, ParkingType};
