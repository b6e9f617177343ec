pub mod geom_params;
pub mod index;
pub mod primitive;

pub use index::SketchIndex;
pub use primitive::*;

#[cfg(test)]
mod tests_index;

#[cfg(test)]
mod tests_primitive;
