pub mod debug;
pub mod health;

pub use debug::{env_secrets_handler, refresh_secrets_handler, reveal_secret_handler};
pub use health::{health_handler, root_handler};
