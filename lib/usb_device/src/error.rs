use crate::config::ConfigError;
use core::fmt;
use usb::{descriptor::DescriptorError, endpoint::EndpointAddress};

/// Why a control request could not be completed. Every one of these ends with the control
/// endpoint being stalled.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RequestError {
    /// The request is not implemented for its recipient.
    Unsupported,
    UnsupportedRecipient,
    /// A class or vendor request arrived, but no handler is registered for its type.
    NoHandler,
    ReservedRequestType,
    DescriptorNotFound {
        typ: u8,
        index: u8,
    },
    InvalidValue(u16),
    /// The reply does not fit in the control buffer.
    ReplyTooLong(usize),
    /// The host announced more OUT data than the control buffer can hold.
    DataTooLong(usize),
    /// The SETUP packet could not be read, or was not 8 bytes long.
    MalformedSetup,
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::Unsupported => write!(f, "unsupported request"),
            RequestError::UnsupportedRecipient => write!(f, "unsupported recipient"),
            RequestError::NoHandler => write!(f, "no handler registered for request type"),
            RequestError::ReservedRequestType => write!(f, "reserved request type"),
            RequestError::DescriptorNotFound { typ, index } => {
                write!(f, "no descriptor of type {:#x} at index {}", typ, index)
            }
            RequestError::InvalidValue(value) => write!(f, "invalid value {:#x}", value),
            RequestError::ReplyTooLong(length) => write!(f, "reply of {} bytes is too long", length),
            RequestError::DataTooLong(length) => write!(f, "{} bytes of OUT data is too long", length),
            RequestError::MalformedSetup => write!(f, "malformed SETUP packet"),
        }
    }
}

/// A problem with something registered with a `UsbDeviceBuilder`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RegistrationError {
    Descriptor(DescriptorError),
    /// No registered descriptor table contains a device descriptor.
    MissingDeviceDescriptor,
    /// Standard requests are handled by the built-in chapter 9 engine. Use a custom request
    /// handler to override individual standard requests.
    StandardHandler,
    ReservedRequestType,
    /// Endpoint 0 is driven by the control pipe.
    ControlEndpoint(EndpointAddress),
    InvalidEndpoint(EndpointAddress),
    InvalidMaxPacketSize(EndpointAddress, u16),
    Config(ConfigError),
}

impl From<DescriptorError> for RegistrationError {
    fn from(err: DescriptorError) -> Self {
        RegistrationError::Descriptor(err)
    }
}

impl From<ConfigError> for RegistrationError {
    fn from(err: ConfigError) -> Self {
        RegistrationError::Config(err)
    }
}
