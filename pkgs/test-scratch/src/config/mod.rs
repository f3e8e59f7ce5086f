pub mod policy;
pub mod settings;

pub use policy::DeletePolicy;
pub use settings::ScratchConfig;
