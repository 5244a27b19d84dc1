pub mod events;
pub mod planet;
pub mod war;

pub use events::*;
pub use planet::*;
pub use war::*;
