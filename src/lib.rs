pub mod config;
pub mod error;
pub mod models;
pub mod net;
pub mod normalizer;
pub mod persistence;
pub mod registry;

pub use error::{Result, ZooError};
pub use net::NeuralNet;
pub use persistence::{LoadOptions, load_folder, load_folder_with};
