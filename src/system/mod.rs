pub mod mixer;
pub mod player;
pub mod shutdown;
