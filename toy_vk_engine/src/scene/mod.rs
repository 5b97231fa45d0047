//! Scene module: the per-frame list of drawable instances.

mod object;

pub use object::Object;
