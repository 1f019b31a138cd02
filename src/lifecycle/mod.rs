//! Process lifecycle: graceful shutdown signals

mod shutdown;

pub use shutdown::ShutdownSignal;
