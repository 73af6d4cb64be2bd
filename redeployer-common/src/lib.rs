pub mod annotations;
pub mod constants;
pub mod errors;
pub mod kubernetes;
pub mod labels;
pub mod redeployment;
pub mod traits;
pub mod watcher;
