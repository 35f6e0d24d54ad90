pub mod tailored_loader;

pub use tailored_loader::{load_all_tailored_outputs, load_tailored_output};
