pub mod bootstrap_loader;
pub mod layer_loader;
