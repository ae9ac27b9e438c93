use crate::{
    control::ControlData,
    error::RequestError,
    hw::UsbHardware,
    registry::RequestHandlerRegistry,
    standard::{self, DeviceState},
};
use log::{debug, trace};
use usb::setup::{RequestKind, SetupPacket};

/// Route a control request to whatever handles it. The custom handler, if there is one, gets the
/// first look at every request; if it fails, the request is routed by its type.
pub fn dispatch<H, C>(
    hardware: &mut H,
    class: &mut C,
    state: &mut DeviceState,
    registry: &RequestHandlerRegistry<C>,
    setup: &SetupPacket,
    data: &mut ControlData<'_>,
) -> Result<(), RequestError>
where
    H: UsbHardware,
{
    if let Some(custom) = registry.custom() {
        if custom(class, setup, data).is_ok() {
            trace!("{:?} handled by custom handler", setup);
            return Ok(());
        }
        data.clear_response();
    }

    match setup.kind() {
        RequestKind::Standard => standard::handle_request(state, hardware, setup, data),
        kind @ (RequestKind::Class | RequestKind::Vendor) => match registry.get(&kind) {
            Some(handler) => handler(class, setup, data),
            None => {
                debug!("No handler for {:?} request {:#x}", kind, setup.request);
                Err(RequestError::NoHandler)
            }
        },
        RequestKind::Reserved => Err(RequestError::ReservedRequestType),
    }
}
