pub mod calendar;
pub mod collection;
pub mod due_queue;
pub mod review;
pub mod settings;
pub mod stats;
pub mod tracker;

pub use review::ReviewError;
