//! Process lifecycle: startup wiring lives in `main`, shutdown here.

pub mod shutdown;

pub use shutdown::Shutdown;
