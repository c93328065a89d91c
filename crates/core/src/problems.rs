pub mod ode;

pub use ode::OdeSystem;
