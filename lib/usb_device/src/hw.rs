//! The contract between the control-plane engine and the USB device controller driver that sits
//! underneath it.
//!
//! The driver owns the controller's registers. It reports bus activity by calling
//! [`UsbDevice::handle_interrupt`](crate::device::UsbDevice::handle_interrupt) from its interrupt
//! handler, and the engine calls back into it through [`UsbHardware`] to move data and to change
//! the device's address, configuration, and endpoint halt state.
//!
//! ### Re-entrancy
//! The engine must never be entered while it is already handling an event. The driver must keep
//! the USB interrupt source masked from the moment it reads an event until
//! `handle_interrupt` returns, so that a callback can never be interrupted by a nested instance of
//! itself. `UsbDevice` is driven through `&mut self`, and [`InterruptCell`](crate::isr::InterruptCell)
//! refuses a nested entry rather than aliasing the device if this is ever violated.

use bitflags::bitflags;
use usb::endpoint::EndpointAddress;

pub trait UsbHardware {
    /// Enable or disable the soft-connect pull-up, making the device visible to the host.
    fn connect(&mut self, connect: bool);

    /// Set the address the device responds to. This is called while the `SET_ADDRESS` request is
    /// being handled, before its status stage has completed; the USB spec requires the new address
    /// to only take effect once the status stage has finished, and the driver is responsible for
    /// deferring it if the controller does not.
    fn set_address(&mut self, address: u8);

    /// Called with `true` when the host selects a configuration, and `false` when the device
    /// returns to the unconfigured state. Drivers should enable or disable the non-control
    /// endpoints accordingly.
    fn configure_device(&mut self, configured: bool);

    /// Allocate controller resources for an endpoint, and enable its interrupts. Called once for
    /// each registered endpoint (including the two halves of the control endpoint) when the
    /// device is built.
    fn realize_endpoint(&mut self, endpoint: EndpointAddress, max_packet_size: u16);

    fn set_endpoint_stall(&mut self, endpoint: EndpointAddress, stalled: bool);
    fn is_endpoint_stalled(&self, endpoint: EndpointAddress) -> bool;

    /// Read the packet waiting in an OUT endpoint's buffer into `buffer`, returning the number of
    /// bytes read. If the packet is larger than `buffer`, the remainder is discarded. Returns
    /// `None` if no valid packet could be read.
    fn read_endpoint(&mut self, endpoint: EndpointAddress, buffer: &mut [u8]) -> Option<usize>;

    /// Queue a packet for transmission on an IN endpoint. `data` will be at most the endpoint's
    /// maximum packet size, and may be empty.
    fn write_endpoint(&mut self, endpoint: EndpointAddress, data: &[u8]);
}

bitflags! {
    /// The cause of an endpoint interrupt.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct EndpointStatus: u8 {
        /// A packet has been received (OUT) or transmitted (IN).
        const DATA = 1 << 0;
        const STALLED = 1 << 1;
        /// The received packet is a SETUP packet. Only reported for the control OUT endpoint.
        const SETUP = 1 << 2;
        const ERROR = 1 << 3;
        /// The endpoint NAKed a token because it had no data ready.
        const NACKED = 1 << 4;
    }
}

bitflags! {
    /// A change in the device's bus state.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct DeviceStatus: u8 {
        const CONNECT = 1 << 0;
        const CONNECT_CHANGE = 1 << 1;
        const SUSPEND = 1 << 2;
        const SUSPEND_CHANGE = 1 << 3;
        const RESET = 1 << 4;
    }
}

/// An event reported by the controller driver.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InterruptEvent {
    Endpoint { address: EndpointAddress, status: EndpointStatus },
    /// Start of a new (micro)frame. Carries the frame number from the SOF packet.
    Frame(u16),
    DeviceStatus(DeviceStatus),
}
