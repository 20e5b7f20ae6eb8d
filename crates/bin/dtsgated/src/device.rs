//! The closed set of devices the gateway manages.

use dtsgate_adapter_relay_http::RelayDevice;
use dtsgate_adapter_simulated::SimulatedSdk;
use dtsgate_app::controller::DtsController;
use dtsgate_app::ports::Device;
use dtsgate_app::scheduler::Scheduler;
use dtsgate_domain::device::{DeviceKind, Status};
use dtsgate_domain::error::GatewayError;

pub type Controller = DtsController<SimulatedSdk>;

pub enum GatewayDevice {
    Dts(Controller),
    Relay(RelayDevice),
}

impl GatewayDevice {
    #[must_use]
    pub fn as_dts(&self) -> Option<&Controller> {
        match self {
            Self::Dts(controller) => Some(controller),
            Self::Relay(_) => None,
        }
    }

    #[must_use]
    pub fn as_relay(&self) -> Option<&RelayDevice> {
        match self {
            Self::Relay(relay) => Some(relay),
            Self::Dts(_) => None,
        }
    }
}

impl From<Controller> for GatewayDevice {
    fn from(controller: Controller) -> Self {
        Self::Dts(controller)
    }
}

impl From<RelayDevice> for GatewayDevice {
    fn from(relay: RelayDevice) -> Self {
        Self::Relay(relay)
    }
}

impl Device for GatewayDevice {
    fn id(&self) -> &str {
        match self {
            Self::Dts(controller) => Device::id(controller),
            Self::Relay(relay) => Device::id(relay),
        }
    }

    fn kind(&self) -> DeviceKind {
        match self {
            Self::Dts(controller) => Device::kind(controller),
            Self::Relay(relay) => Device::kind(relay),
        }
    }

    fn status(&self) -> Status {
        match self {
            Self::Dts(controller) => Device::status(controller),
            Self::Relay(relay) => Device::status(relay),
        }
    }

    async fn run(&self) -> Result<(), GatewayError> {
        match self {
            Self::Dts(controller) => Device::run(controller).await,
            Self::Relay(relay) => Device::run(relay).await,
        }
    }

    async fn close(&self) -> Result<(), GatewayError> {
        match self {
            Self::Dts(controller) => Device::close(controller).await,
            Self::Relay(relay) => Device::close(relay).await,
        }
    }

    fn set_scheduler(&self, scheduler: Scheduler) {
        match self {
            Self::Dts(controller) => Device::set_scheduler(controller, scheduler),
            Self::Relay(relay) => Device::set_scheduler(relay, scheduler),
        }
    }
}
