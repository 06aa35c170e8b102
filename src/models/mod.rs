pub mod pin;

pub use pin::{new_pin_id, Pin, PinTag};
