pub mod avatar;
pub mod event;
pub mod frame;
pub mod level;
pub mod room;
pub mod step;
pub mod world;
