pub mod net;
pub mod player;
pub mod room;
pub mod session;
pub mod time;
