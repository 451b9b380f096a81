mod inventory;
mod onboarding;
mod settings;

pub use inventory::*;
pub use onboarding::*;
pub use settings::*;
