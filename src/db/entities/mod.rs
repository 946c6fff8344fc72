//! sea-orm entities
pub mod images;
