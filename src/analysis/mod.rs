pub mod index_change;
pub mod indices;
pub mod pixel_change;
pub mod rgb_change;
