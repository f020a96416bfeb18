pub mod traits;
pub mod grid;
pub mod mutation;
pub mod manager;

pub use manager::{ConfigManager, AppConfig, ENV_PREFIX};
pub use grid::GridConfig;
pub use mutation::{MutationConfig, MutationStrategy};
