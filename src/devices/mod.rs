//! Household device models: production, consumption, and storage.

/// Time-of-day household consumption profile.
pub mod baseload;
/// Home battery state-of-charge model.
pub mod battery;
/// Solar photovoltaic production model.
pub mod solar;
pub mod types;

pub use baseload::BaseLoad;
pub use battery::Battery;
pub use solar::SolarPv;
pub use types::Device;
pub use types::DeviceContext;
