//! XGBoost integration
//!
//! - [`booster`]: tree ensemble in XGBoost's JSON model format
//! - [`materializer`]: reads and writes boosters as `model.json` artifacts

pub mod booster;
pub mod materializer;

pub use booster::{Booster, BoosterError, BoosterResult, DefaultLeft, ObjectiveKind, RegTree};
pub use materializer::{MaterializerError, XgboostBoosterMaterializer, DEFAULT_FILENAME};
