use crate::{
    control::ControlData,
    error::{RegistrationError, RequestError},
};
use log::info;
use usb::setup::{RequestKind, SetupPacket};

/// Handles a control request on behalf of a device class. `C` is the class state owned by the
/// device. A handler replies through the `ControlData` it is passed, and fails by returning an
/// error, which stalls the control endpoint.
pub type RequestHandler<C> = fn(&mut C, &SetupPacket, &mut ControlData<'_>) -> Result<(), RequestError>;

/// The request handlers of a device, keyed by request type, plus an optional custom handler that
/// is offered every request before anything else.
pub struct RequestHandlerRegistry<C> {
    handlers: [Option<RequestHandler<C>>; RequestKind::COUNT],
    custom: Option<RequestHandler<C>>,
}

impl<C> RequestHandlerRegistry<C> {
    pub const fn new() -> RequestHandlerRegistry<C> {
        RequestHandlerRegistry { handlers: [None; RequestKind::COUNT], custom: None }
    }

    /// Install the handler for class or vendor requests, replacing any previous one. Standard
    /// requests are handled by the built-in chapter 9 engine, and the reserved type is never
    /// handled.
    pub fn register(&mut self, kind: RequestKind, handler: RequestHandler<C>) -> Result<(), RegistrationError> {
        let index = kind.index();
        match kind {
            RequestKind::Standard => Err(RegistrationError::StandardHandler),
            RequestKind::Reserved => Err(RegistrationError::ReservedRequestType),
            RequestKind::Class | RequestKind::Vendor => {
                info!("Registering handler for {:?} requests", kind);
                self.handlers[index] = Some(handler);
                Ok(())
            }
        }
    }

    pub fn register_custom(&mut self, handler: RequestHandler<C>) {
        info!("Registering custom request handler");
        self.custom = Some(handler);
    }

    pub fn get(&self, kind: &RequestKind) -> Option<RequestHandler<C>> {
        self.handlers[kind.index()]
    }

    pub fn custom(&self) -> Option<RequestHandler<C>> {
        self.custom
    }
}

impl<C> Default for RequestHandlerRegistry<C> {
    fn default() -> Self {
        RequestHandlerRegistry::new()
    }
}
