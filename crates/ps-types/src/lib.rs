pub mod errors;
pub mod metric;
pub mod value;

pub use errors::*;
pub use metric::*;
pub use value::*;
