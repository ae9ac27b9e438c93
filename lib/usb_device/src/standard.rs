//! The standard requests of chapter 9 of the USB 2.0 specification, which every device must
//! respond to.

use crate::{control::ControlData, error::RequestError, hw::UsbHardware};
use log::{debug, trace};
use usb::{
    endpoint::EndpointAddress,
    setup::{Feature, Recipient, Request, SetupPacket},
};

/// The parts of the USB device state machine that are driven by standard requests.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct DeviceState {
    /// The selected configuration value. `0` means the device is unconfigured.
    pub configuration: u8,
    pub address: u8,
}

pub fn handle_request<H>(
    state: &mut DeviceState,
    hardware: &mut H,
    setup: &SetupPacket,
    data: &mut ControlData<'_>,
) -> Result<(), RequestError>
where
    H: UsbHardware,
{
    match setup.recipient() {
        Some(Recipient::Device) => device_request(state, hardware, setup, data),
        Some(Recipient::Interface) => interface_request(setup, data),
        Some(Recipient::Endpoint) => endpoint_request(hardware, setup, data),
        _ => Err(RequestError::UnsupportedRecipient),
    }
}

fn device_request<H>(
    state: &mut DeviceState,
    hardware: &mut H,
    setup: &SetupPacket,
    data: &mut ControlData<'_>,
) -> Result<(), RequestError>
where
    H: UsbHardware,
{
    match setup.standard_request() {
        Some(Request::GetStatus) => {
            // Bit 0 is self-powered, bit 1 remote wakeup. We support neither.
            data.respond(&[0x00, 0x00])
        }
        Some(Request::SetAddress) => {
            let address = (setup.value & 0x7f) as u8;
            trace!("Setting address to {}", address);
            hardware.set_address(address);
            state.address = address;
            Ok(())
        }
        Some(Request::GetDescriptor) => {
            let (typ, index) = setup.descriptor_type_index();
            let descriptor = data
                .descriptors()
                .resolve(typ, index, setup.index)
                .ok_or(RequestError::DescriptorNotFound { typ, index })?;
            data.respond_static(descriptor);
            Ok(())
        }
        Some(Request::GetConfiguration) => data.respond(&[state.configuration]),
        Some(Request::SetConfiguration) => {
            let configuration = (setup.value & 0xff) as u8;
            trace!("Setting configuration to {}", configuration);
            state.configuration = configuration;
            hardware.configure_device(configuration != 0);
            Ok(())
        }
        Some(request @ (Request::ClearFeature | Request::SetFeature)) => {
            /*
             * Remote wakeup and test mode are recognised, but there is nothing here that can act
             * on them, so the request still fails.
             */
            match Feature::try_from(setup.value) {
                Ok(feature @ (Feature::DeviceRemoteWakeup | Feature::TestMode)) => {
                    debug!("{:?} of device feature {:?} is not supported", request, feature)
                }
                _ => debug!("{:?} of unknown device feature {:#x}", request, setup.value),
            }
            Err(RequestError::Unsupported)
        }
        Some(Request::SetDescriptor) => Err(RequestError::Unsupported),
        _ => Err(RequestError::Unsupported),
    }
}

fn interface_request(setup: &SetupPacket, data: &mut ControlData<'_>) -> Result<(), RequestError> {
    match setup.standard_request() {
        Some(Request::GetStatus) => data.respond(&[0x00, 0x00]),
        Some(Request::GetInterface) => data.respond(&[0x00]),
        // We only support the default alternate setting of each interface
        Some(Request::SetInterface) => match setup.value {
            0 => Ok(()),
            other => Err(RequestError::InvalidValue(other)),
        },
        Some(Request::ClearFeature | Request::SetFeature) => Err(RequestError::Unsupported),
        _ => Err(RequestError::Unsupported),
    }
}

fn endpoint_request<H>(hardware: &mut H, setup: &SetupPacket, data: &mut ControlData<'_>) -> Result<(), RequestError>
where
    H: UsbHardware,
{
    let endpoint = EndpointAddress::from(setup.index as u8);

    match setup.standard_request() {
        Some(Request::GetStatus) => {
            let halted = hardware.is_endpoint_stalled(endpoint);
            data.respond(&[halted as u8, 0x00])
        }
        Some(Request::ClearFeature) if setup.value == Feature::EndpointHalt as u16 => {
            trace!("Clearing halt on {:?}", endpoint);
            hardware.set_endpoint_stall(endpoint, false);
            Ok(())
        }
        Some(Request::SetFeature) if setup.value == Feature::EndpointHalt as u16 => {
            trace!("Halting {:?}", endpoint);
            hardware.set_endpoint_stall(endpoint, true);
            Ok(())
        }
        Some(Request::ClearFeature | Request::SetFeature) => Err(RequestError::InvalidValue(setup.value)),
        Some(Request::SynchFrame) => Err(RequestError::Unsupported),
        _ => Err(RequestError::Unsupported),
    }
}
