pub(crate) mod future;
pub mod merge;
