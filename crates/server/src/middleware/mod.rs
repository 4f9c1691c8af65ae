pub mod model_loaders;

pub use model_loaders::{ModelLoaderDeps, fetch_model_or_status};
