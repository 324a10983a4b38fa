pub mod economy;
pub mod payback;
