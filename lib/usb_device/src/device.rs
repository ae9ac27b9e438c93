use crate::{
    config::Config,
    control::{ControlData, ControlPipe},
    dispatch::dispatch,
    error::{RegistrationError, RequestError},
    hw::{DeviceStatus, EndpointStatus, InterruptEvent, UsbHardware},
    registry::{RequestHandler, RequestHandlerRegistry},
    router::{DeviceStatusHandler, EndpointHandler, EndpointHandlerTable, EndpointRoute, FrameHandler},
    standard::DeviceState,
};
use log::{info, trace, warn};
use usb::{
    descriptor::DescriptorTable,
    endpoint::EndpointAddress,
    setup::{RequestKind, SetupPacket},
};

/// Collects everything a `UsbDevice` needs before it is connected to the bus. Nothing can be
/// registered once the device has been built.
pub struct UsbDeviceBuilder<H, C> {
    hardware: H,
    class: C,
    config: Config,
    descriptors: DescriptorTable<'static>,
    registry: RequestHandlerRegistry<C>,
    endpoints: EndpointHandlerTable<H, C>,
}

impl<H, C> UsbDeviceBuilder<H, C>
where
    H: UsbHardware,
{
    pub fn new(hardware: H, class: C, config: Config) -> Result<UsbDeviceBuilder<H, C>, RegistrationError> {
        config.validate()?;
        Ok(UsbDeviceBuilder {
            hardware,
            class,
            config,
            descriptors: DescriptorTable::new(),
            registry: RequestHandlerRegistry::new(),
            endpoints: EndpointHandlerTable::new(config.control_max_packet_size),
        })
    }

    /// Add a buffer of descriptors to the device's descriptor table. The buffer is validated, and
    /// then borrowed for the lifetime of the device.
    pub fn register_descriptor_table(&mut self, table: &'static [u8]) -> Result<&mut Self, RegistrationError> {
        let records = self.descriptors.register(table)?;
        info!("Registered descriptor table of {} bytes ({} descriptors)", table.len(), records);
        Ok(self)
    }

    pub fn register_request_handler(
        &mut self,
        kind: RequestKind,
        handler: RequestHandler<C>,
    ) -> Result<&mut Self, RegistrationError> {
        self.registry.register(kind, handler)?;
        Ok(self)
    }

    /// Register a handler that is offered every request before the built-in handling. If it
    /// succeeds, its reply is used; if it fails, the request is handled as if it were not there.
    pub fn register_custom_request_handler(&mut self, handler: RequestHandler<C>) -> &mut Self {
        self.registry.register_custom(handler);
        self
    }

    pub fn register_endpoint_handler(
        &mut self,
        endpoint: EndpointAddress,
        max_packet_size: u16,
        handler: Option<EndpointHandler<H, C>>,
    ) -> Result<&mut Self, RegistrationError> {
        self.endpoints.register(endpoint, max_packet_size, handler)?;
        Ok(self)
    }

    pub fn register_frame_handler(&mut self, handler: FrameHandler<H, C>) -> &mut Self {
        info!("Registering frame handler");
        self.endpoints.set_frame_handler(handler);
        self
    }

    pub fn register_device_status_handler(&mut self, handler: DeviceStatusHandler<H, C>) -> &mut Self {
        info!("Registering device status handler");
        self.endpoints.set_device_status_handler(handler);
        self
    }

    /// Realize the registered endpoints on the hardware, and produce the device. The device is not
    /// visible to the host until [`UsbDevice::connect`] is called.
    pub fn build(self) -> Result<UsbDevice<H, C>, RegistrationError> {
        let device_descriptor =
            self.descriptors.device_descriptor().ok_or(RegistrationError::MissingDeviceDescriptor)?;
        info!(
            "Building USB device {:04x}:{:04x} (USB {:x}.{:02x})",
            device_descriptor.vendor_id,
            device_descriptor.product_id,
            device_descriptor.bcd_usb >> 8,
            device_descriptor.bcd_usb & 0xff
        );
        if device_descriptor.max_control_packet_size as u16 != self.config.control_max_packet_size {
            warn!(
                "Device descriptor advertises a control packet size of {}, but the control endpoint is configured for {}",
                device_descriptor.max_control_packet_size, self.config.control_max_packet_size
            );
        }

        let mut hardware = self.hardware;
        for (address, entry) in self.endpoints.iter() {
            trace!("Realizing endpoint {:?}", address);
            hardware.realize_endpoint(address, entry.max_packet_size);
        }

        Ok(UsbDevice {
            hardware,
            class: self.class,
            config: self.config,
            descriptors: self.descriptors,
            registry: self.registry,
            endpoints: self.endpoints,
            state: DeviceState::default(),
            control: ControlPipe::new(self.config.control_max_packet_size),
        })
    }
}

/// A USB device: owns the hardware layer, the class state, and every registered handler, and turns
/// interrupt events into calls to them.
pub struct UsbDevice<H, C> {
    hardware: H,
    class: C,
    config: Config,
    descriptors: DescriptorTable<'static>,
    registry: RequestHandlerRegistry<C>,
    endpoints: EndpointHandlerTable<H, C>,
    state: DeviceState,
    control: ControlPipe,
}

impl<H, C> UsbDevice<H, C>
where
    H: UsbHardware,
{
    pub fn connect(&mut self) {
        info!("Connecting to the bus");
        self.hardware.connect(true);
    }

    pub fn disconnect(&mut self) {
        info!("Disconnecting from the bus");
        self.hardware.connect(false);
    }

    /// Process an event reported by the controller. Must be called with the USB interrupt masked.
    pub fn handle_interrupt(&mut self, event: InterruptEvent) {
        match event {
            InterruptEvent::Endpoint { address, status } => self.handle_endpoint(address, status),
            InterruptEvent::Frame(frame) => {
                if let Some(handler) = self.endpoints.frame_handler() {
                    handler(&mut self.class, &mut self.hardware, frame);
                }
            }
            InterruptEvent::DeviceStatus(status) => self.handle_device_status(status),
        }
    }

    /// Handle a complete control request, for controllers that run the data stage of control
    /// transfers themselves. `out_data` is the data the host sent with the request. The returned
    /// reply is truncated to `wLength`.
    pub fn dispatch_setup(&mut self, setup: &SetupPacket, out_data: &[u8]) -> Result<&[u8], RequestError> {
        let buffer = self.control.buffer_mut();
        let target = buffer.get_mut(..out_data.len()).ok_or(RequestError::DataTooLong(out_data.len()))?;
        target.copy_from_slice(out_data);

        let mut data = ControlData::new(buffer, out_data.len(), &self.descriptors);
        dispatch(&mut self.hardware, &mut self.class, &mut self.state, &self.registry, setup, &mut data)?;

        let reply = data.response();
        let length = usize::min(reply.len(), setup.length as usize);
        Ok(&reply.bytes(self.control.buffer_mut())[..length])
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn class(&self) -> &C {
        &self.class
    }

    pub fn class_mut(&mut self) -> &mut C {
        &mut self.class
    }

    pub fn hardware(&self) -> &H {
        &self.hardware
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hardware
    }

    fn handle_endpoint(&mut self, address: EndpointAddress, status: EndpointStatus) {
        let Some(entry) = self.endpoints.get(address) else {
            trace!("Ignoring event on unregistered endpoint {:?}: {:?}", address, status);
            return;
        };

        match entry.route {
            EndpointRoute::Control if address.is_in() => self.control.handle_in(&mut self.hardware),
            EndpointRoute::Control => {
                let UsbDevice { hardware, class, descriptors, registry, state, control, .. } = self;
                control.handle_out(hardware, descriptors, status, |hardware, setup, data| {
                    dispatch(hardware, class, state, registry, setup, data)
                });
            }
            EndpointRoute::Class(Some(handler)) => handler(&mut self.class, &mut self.hardware, address, status),
            EndpointRoute::Class(None) => trace!("No handler for event on {:?}: {:?}", address, status),
        }
    }

    fn handle_device_status(&mut self, status: DeviceStatus) {
        if status.contains(DeviceStatus::CONNECT_CHANGE) {
            info!("Bus {}", if status.contains(DeviceStatus::CONNECT) { "connected" } else { "disconnected" });
        }
        if status.contains(DeviceStatus::SUSPEND_CHANGE) {
            info!("Bus {}", if status.contains(DeviceStatus::SUSPEND) { "suspended" } else { "resumed" });
        }

        if status.contains(DeviceStatus::RESET) {
            info!("Bus reset");
            /*
             * A reset returns the device to the Default state: unaddressed and unconfigured. The
             * controller resets its own address, so we only tell it about the configuration.
             */
            if self.state.configuration != 0 {
                self.hardware.configure_device(false);
            }
            self.state = DeviceState::default();
            self.control.reset();
        }

        if let Some(handler) = self.endpoints.device_status_handler() {
            handler(&mut self.class, &mut self.hardware, status);
        }
    }
}
