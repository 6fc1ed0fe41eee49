pub mod common;
pub mod completions;
pub mod inspect;
pub mod simulate;
