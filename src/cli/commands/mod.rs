//! One module per subcommand; each exposes `execute`.

pub mod apply;
pub mod auth;
pub mod delete;
pub mod generate;
pub mod get;
pub mod import_cmd;
pub mod plan;
pub mod read;
