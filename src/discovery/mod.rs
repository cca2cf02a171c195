//! On-demand lookup of named services under `{root}/discovery/{qualified name}`.

mod decoder;
mod service_lookup;
pub use decoder::*;
pub use service_lookup::*;
