mod logging;
mod raise_error;

pub use logging::Logger;
pub use raise_error::{raise_error, Level};
