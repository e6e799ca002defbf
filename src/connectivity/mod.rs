mod supervisor;
mod traits;

pub use supervisor::{
    ConnectionState, Mode, ServiceReport, StartupError, Supervisor, SupervisorSettings,
    SupervisorState,
};
pub use traits::{ControlBus, NetworkLink, Provisioner, TimeSync};
