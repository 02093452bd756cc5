pub mod button;
pub mod card;
pub mod notice;
pub mod spinner;

pub use button::*;
pub use card::*;
pub use notice::*;
pub use spinner::*;
