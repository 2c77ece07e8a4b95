mod area;
mod distance;

pub use area::*;
pub use distance::*;
