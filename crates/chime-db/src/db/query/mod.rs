pub mod due;
pub mod legacy;
