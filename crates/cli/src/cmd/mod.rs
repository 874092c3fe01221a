mod build;
mod deploy;
mod dev;
mod help;

pub use build::cmd_build;
pub use deploy::cmd_deploy;
pub use dev::cmd_dev;
pub use help::cmd_help;
