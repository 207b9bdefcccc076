pub mod part;

pub use part::{BomFilter, Part, PartProgress, PartStatus, Stage};
