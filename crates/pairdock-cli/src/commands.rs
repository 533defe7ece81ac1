pub mod dock;
pub mod merge;
