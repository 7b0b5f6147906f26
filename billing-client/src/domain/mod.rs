mod bill;
mod item;
mod meter;
mod reading;
mod subscriber;

pub use bill::{Bill, BillTotals};
pub use item::{Item, ItemView, Point, Subscription};
pub use meter::Meter;
pub use reading::{NewReading, Reading};
pub use subscriber::Subscriber;
