mod move_face;

pub use move_face::MoveFace;
