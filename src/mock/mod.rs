mod clock;
mod display;
mod network;
mod store;
mod terminal;

pub use clock::{FixedClock, SimulatedClock};
pub use display::{DisplayError, RecordingDisplay, TerminalDisplay, render_frame};
pub use network::{
    ScriptedProvisioner, SimulatedBus, SimulatedError, SimulatedLink, SimulatedTimeSync,
};
pub use store::MemoryStore;
pub use terminal::run_interactive_terminal;
