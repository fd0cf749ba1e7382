mod factor;

pub use factor::{Factor, LinearCombination};
