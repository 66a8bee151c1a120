pub mod props;

pub use props::*;
