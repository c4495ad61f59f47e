//! CLI subcommand implementations.

mod add;
mod list;
mod popup;
mod serve;

pub use add::run_add;
pub use list::run_list;
pub use popup::run_popup;
pub use serve::run_serve;
