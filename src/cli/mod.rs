pub mod args;
pub mod commands;
pub mod table;

pub use args::{parse_args, AboutInput, Command, Invocation, SettingsPatch};
pub use commands::CliContext;
