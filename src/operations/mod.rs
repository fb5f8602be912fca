pub mod copy;
pub mod creation;
pub mod modification;
