mod assignments;
mod directory;
mod health;
mod proposals;
mod reviews;
mod windows;

pub use assignments::*;
pub use directory::*;
pub use health::*;
pub use proposals::*;
pub use reviews::*;
pub use windows::*;
