//! Crop → extract → normalize: everything between a capture and the form.

pub mod crop;
pub mod extraction;
pub mod normalize;
