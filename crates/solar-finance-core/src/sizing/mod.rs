pub mod reverse;
pub mod search;
pub mod solar;
