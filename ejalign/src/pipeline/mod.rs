mod train;
pub use train::{train, TrainArgs};
