mod packages;

pub use packages::*;
