pub mod bridge;
pub mod window;
