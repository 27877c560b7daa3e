pub mod api;
pub mod source;
pub mod tokens;

pub use api::GarminClient;
pub use source::{FitnessSource, GarminSource};
pub use tokens::OAuth2Token;
