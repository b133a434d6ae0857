mod args;
mod oneshot;
mod provider;
mod repl;

pub use args::{Cli, Commands, ConfigSubcommands};
pub use oneshot::run_once;
pub use provider::{apply_overrides, create_relay, load_context};
pub use repl::{Repl, ctrl_c_interrupts};
