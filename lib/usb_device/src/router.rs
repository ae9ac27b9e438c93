use crate::{
    error::RegistrationError,
    hw::{DeviceStatus, EndpointStatus},
};
use log::info;
use usb::endpoint::EndpointAddress;

/// Called when an endpoint interrupt occurs on a class endpoint.
pub type EndpointHandler<H, C> = fn(&mut C, &mut H, EndpointAddress, EndpointStatus);
/// Called at the start of every frame, with the frame number.
pub type FrameHandler<H, C> = fn(&mut C, &mut H, u16);
/// Called when the device's bus state changes, after any bus reset has been processed.
pub type DeviceStatusHandler<H, C> = fn(&mut C, &mut H, DeviceStatus);

pub enum EndpointRoute<H, C> {
    /// Endpoint 0, driven by the control pipe.
    Control,
    /// A class endpoint. Events are passed to the handler, if there is one.
    Class(Option<EndpointHandler<H, C>>),
}

// These can't be derived without requiring `H: Copy` and `C: Copy`
impl<H, C> Clone for EndpointRoute<H, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H, C> Copy for EndpointRoute<H, C> {}

pub struct EndpointEntry<H, C> {
    pub max_packet_size: u16,
    pub route: EndpointRoute<H, C>,
}

impl<H, C> Clone for EndpointEntry<H, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H, C> Copy for EndpointEntry<H, C> {}

/// The endpoints a device uses, and who handles events on them.
pub struct EndpointHandlerTable<H, C> {
    endpoints: [Option<EndpointEntry<H, C>>; EndpointAddress::COUNT],
    frame: Option<FrameHandler<H, C>>,
    device_status: Option<DeviceStatusHandler<H, C>>,
}

impl<H, C> EndpointHandlerTable<H, C> {
    /// Create a table with both halves of endpoint 0 routed to the control pipe.
    pub fn new(control_max_packet_size: u16) -> EndpointHandlerTable<H, C> {
        let mut endpoints: [Option<EndpointEntry<H, C>>; EndpointAddress::COUNT] = [None; EndpointAddress::COUNT];
        let control = EndpointEntry { max_packet_size: control_max_packet_size, route: EndpointRoute::Control };
        endpoints[EndpointAddress::CONTROL_OUT.index()] = Some(control);
        endpoints[EndpointAddress::CONTROL_IN.index()] = Some(control);

        EndpointHandlerTable { endpoints, frame: None, device_status: None }
    }

    pub fn register(
        &mut self,
        address: EndpointAddress,
        max_packet_size: u16,
        handler: Option<EndpointHandler<H, C>>,
    ) -> Result<(), RegistrationError> {
        if address.has_reserved_bits() {
            return Err(RegistrationError::InvalidEndpoint(address));
        }
        if address.is_control() {
            return Err(RegistrationError::ControlEndpoint(address));
        }
        // Isochronous endpoints can have packets of up to 1023 bytes at full speed
        if max_packet_size == 0 || max_packet_size > 1023 {
            return Err(RegistrationError::InvalidMaxPacketSize(address, max_packet_size));
        }

        info!("Registering endpoint {:?} (max packet size = {})", address, max_packet_size);
        self.endpoints[address.index()] = Some(EndpointEntry { max_packet_size, route: EndpointRoute::Class(handler) });
        Ok(())
    }

    pub fn set_frame_handler(&mut self, handler: FrameHandler<H, C>) {
        self.frame = Some(handler);
    }

    pub fn set_device_status_handler(&mut self, handler: DeviceStatusHandler<H, C>) {
        self.device_status = Some(handler);
    }

    pub fn get(&self, address: EndpointAddress) -> Option<EndpointEntry<H, C>> {
        if address.has_reserved_bits() {
            return None;
        }
        self.endpoints[address.index()]
    }

    pub fn frame_handler(&self) -> Option<FrameHandler<H, C>> {
        self.frame
    }

    pub fn device_status_handler(&self) -> Option<DeviceStatusHandler<H, C>> {
        self.device_status
    }

    /// Iterate over every registered endpoint, including endpoint 0.
    pub fn iter(&self) -> impl Iterator<Item = (EndpointAddress, EndpointEntry<H, C>)> + '_ {
        self.endpoints.iter().enumerate().filter_map(|(index, entry)| {
            let number = (index / 2) as u8;
            let address = if index % 2 == 1 { number | 0x80 } else { number };
            entry.map(|entry| (EndpointAddress(address), entry))
        })
    }
}
