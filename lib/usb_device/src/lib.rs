//! `usb_device` implements the control plane of a USB device: the part of the device side of the
//! protocol that is the same for every device. It answers the standard requests of chapter 9 of the
//! USB 2.0 specification, serves descriptors from a table registered at init, drives control
//! transfers on endpoint 0, and routes class and vendor requests, endpoint events, and frame ticks
//! to handlers supplied by the device class.
//!
//! A device is assembled with a [`UsbDeviceBuilder`]: it takes the hardware layer (anything that
//! implements [`UsbHardware`]), the class state, and a [`Config`], and collects descriptor tables
//! and handlers. Building it realizes the endpoints on the hardware. From then on, the controller
//! driver reports bus activity through [`UsbDevice::handle_interrupt`].

#![no_std]

#[cfg(test)]
extern crate std;

pub mod config;
pub mod control;
pub mod device;
mod dispatch;
pub mod error;
pub mod hw;
pub mod isr;
pub mod registry;
pub mod router;
pub mod standard;

#[cfg(test)]
mod mock;

pub use config::Config;
pub use control::ControlData;
pub use device::{UsbDevice, UsbDeviceBuilder};
pub use error::{RegistrationError, RequestError};
pub use hw::{DeviceStatus, EndpointStatus, InterruptEvent, UsbHardware};
pub use isr::InterruptCell;
pub use standard::DeviceState;
