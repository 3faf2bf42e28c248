pub mod entity;
pub mod explosion;
pub mod glyph;
pub mod grid;
pub mod lighting;
pub mod motion;
pub mod puzzle;
pub mod riddle;
pub mod rules;
pub mod spring;
