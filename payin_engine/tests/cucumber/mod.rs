mod payin_world;
mod setups;
mod steps;

pub use payin_world::PayinWorld;
