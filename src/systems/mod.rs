mod city;
mod unit;

pub use city::CitySystem;
pub use unit::UnitSystem;
