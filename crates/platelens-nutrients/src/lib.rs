pub mod remote;
pub mod resolver;
pub mod store;

pub use remote::{FdcClient, RemoteNutrientSource};
pub use resolver::NutrientResolver;
pub use store::{EmbeddedStore, NutrientStore};
