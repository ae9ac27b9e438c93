//! The control pipe: drives a control transfer on endpoint 0 through its SETUP, data, and status
//! stages, handing the request to the dispatcher once any OUT data has arrived.

use crate::{
    error::RequestError,
    hw::{EndpointStatus, UsbHardware},
};
use log::{debug, trace, warn};
use usb::{
    descriptor::DescriptorTable,
    endpoint::EndpointAddress,
    setup::{Direction, SetupPacket},
};

/// The size of the buffer used for the data stage of control transfers. Requests with more OUT
/// data than this are stalled, and replies assembled in the buffer can not be longer than this.
/// Descriptor replies are sent straight from the descriptor table, and so are not limited by it.
pub const CONTROL_BUFFER_SIZE: usize = 128;

/// What a request handler replies with in the data stage.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Reply {
    Empty,
    /// `length` bytes of the control buffer, starting at `offset`.
    Buffer { offset: usize, length: usize },
    Static(&'static [u8]),
}

impl Reply {
    pub fn len(&self) -> usize {
        match self {
            Reply::Empty => 0,
            Reply::Buffer { length, .. } => *length,
            Reply::Static(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bytes<'b>(&self, buffer: &'b [u8]) -> &'b [u8] {
        match self {
            Reply::Empty => &[],
            Reply::Buffer { offset, length } => &buffer[*offset..(*offset + *length)],
            Reply::Static(bytes) => bytes,
        }
    }
}

/// The data of a control request, as seen by a request handler. Holds the OUT data sent by the
/// host (if any), and collects the handler's reply.
pub struct ControlData<'a> {
    buffer: &'a mut [u8],
    received: usize,
    reply: Reply,
    descriptors: &'a DescriptorTable<'static>,
}

impl<'a> ControlData<'a> {
    pub fn new(buffer: &'a mut [u8], received: usize, descriptors: &'a DescriptorTable<'static>) -> ControlData<'a> {
        ControlData { buffer, received, reply: Reply::Empty, descriptors }
    }

    /// The data the host sent in the OUT data stage.
    pub fn received(&self) -> &[u8] {
        &self.buffer[..self.received]
    }

    /// Reply with a copy of `bytes`. The reply is placed after the received data, so it is left
    /// intact for any handler that sees the request after this one.
    pub fn respond(&mut self, bytes: &[u8]) -> Result<(), RequestError> {
        let offset = self.received;
        let target =
            self.buffer.get_mut(offset..(offset + bytes.len())).ok_or(RequestError::ReplyTooLong(bytes.len()))?;
        target.copy_from_slice(bytes);
        self.reply = Reply::Buffer { offset, length: bytes.len() };
        Ok(())
    }

    /// Reply with `bytes` without copying them.
    pub fn respond_static(&mut self, bytes: &'static [u8]) {
        self.reply = Reply::Static(bytes);
    }

    pub fn response(&self) -> Reply {
        self.reply
    }

    pub fn clear_response(&mut self) {
        self.reply = Reply::Empty;
    }

    pub fn response_bytes(&self) -> &[u8] {
        self.reply.bytes(self.buffer)
    }

    pub fn descriptors(&self) -> &'a DescriptorTable<'static> {
        self.descriptors
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Stage {
    Idle,
    DataOut { setup: SetupPacket, received: usize },
    DataIn { reply: Reply, offset: usize, length: usize, zero_length_packet: bool },
    /// Waiting for the host to collect our zero-length status packet.
    StatusIn,
    /// Waiting for the host's zero-length status packet.
    StatusOut,
}

pub struct ControlPipe {
    stage: Stage,
    buffer: [u8; CONTROL_BUFFER_SIZE],
    max_packet_size: usize,
    stalled: bool,
}

impl ControlPipe {
    pub fn new(max_packet_size: u16) -> ControlPipe {
        ControlPipe { stage: Stage::Idle, buffer: [0; CONTROL_BUFFER_SIZE], max_packet_size: max_packet_size as usize, stalled: false }
    }

    /// Abandon any transfer in progress. Used when the bus is reset.
    pub fn reset(&mut self) {
        if self.stage != Stage::Idle {
            debug!("Abandoning control transfer in stage {:?}", self.stage);
        }
        self.stage = Stage::Idle;
    }

    pub fn is_idle(&self) -> bool {
        self.stage == Stage::Idle
    }

    pub fn buffer_mut(&mut self) -> &mut [u8; CONTROL_BUFFER_SIZE] {
        &mut self.buffer
    }

    /// Handle an event on the control OUT endpoint. `dispatch` is called once the request is ready
    /// to be handled.
    pub fn handle_out<H, F>(
        &mut self,
        hardware: &mut H,
        descriptors: &DescriptorTable<'static>,
        status: EndpointStatus,
        dispatch: F,
    ) where
        H: UsbHardware,
        F: FnOnce(&mut H, &SetupPacket, &mut ControlData<'_>) -> Result<(), RequestError>,
    {
        if status.contains(EndpointStatus::SETUP) {
            /*
             * A SETUP packet always starts a new transfer, even if the previous one has not
             * finished. The controller clears a protocol stall when it receives one, but we clear
             * it here too so the hardware layer has a consistent view.
             */
            if self.stage != Stage::Idle {
                debug!("SETUP received in stage {:?}; abandoning previous transfer", self.stage);
                self.stage = Stage::Idle;
            }
            if self.stalled {
                hardware.set_endpoint_stall(EndpointAddress::CONTROL_IN, false);
                self.stalled = false;
            }

            let mut bytes = [0u8; SetupPacket::SIZE];
            match hardware.read_endpoint(EndpointAddress::CONTROL_OUT, &mut bytes) {
                Some(SetupPacket::SIZE) => (),
                other => {
                    warn!("{} (read {:?} bytes)", RequestError::MalformedSetup, other);
                    self.stall(hardware);
                    return;
                }
            }

            let setup = SetupPacket::from_bytes(&bytes);
            trace!("SETUP: {:?}", setup);

            if setup.length == 0 || setup.direction() == Direction::DeviceToHost {
                self.complete(hardware, descriptors, setup, 0, dispatch);
            } else if setup.length as usize > CONTROL_BUFFER_SIZE {
                debug!("Stalling {:?}: {}", setup, RequestError::DataTooLong(setup.length as usize));
                self.stall(hardware);
            } else {
                self.stage = Stage::DataOut { setup, received: 0 };
            }
            return;
        }

        match self.stage {
            Stage::DataOut { setup, received } => {
                let expected = setup.length as usize;
                let Some(read) = hardware.read_endpoint(EndpointAddress::CONTROL_OUT, &mut self.buffer[received..expected])
                else {
                    warn!("Failed to read OUT data for {:?}", setup);
                    self.stall(hardware);
                    return;
                };
                let received = received + read;

                // A short packet ends the data stage early
                if received < expected && read == self.max_packet_size {
                    self.stage = Stage::DataOut { setup, received };
                } else {
                    self.complete(hardware, descriptors, setup, received, dispatch);
                }
            }
            Stage::StatusOut => {
                let _ = hardware.read_endpoint(EndpointAddress::CONTROL_OUT, &mut []);
                trace!("Control transfer complete");
                self.stage = Stage::Idle;
            }
            stage => {
                let _ = hardware.read_endpoint(EndpointAddress::CONTROL_OUT, &mut []);
                trace!("Ignoring unexpected OUT packet in stage {:?}", stage);
            }
        }
    }

    /// Handle an event on the control IN endpoint: the host has collected the last packet we sent.
    pub fn handle_in<H>(&mut self, hardware: &mut H)
    where
        H: UsbHardware,
    {
        match self.stage {
            Stage::DataIn { .. } => self.send_next(hardware),
            Stage::StatusIn => {
                trace!("Control transfer complete");
                self.stage = Stage::Idle;
            }
            stage => trace!("Ignoring IN event in stage {:?}", stage),
        }
    }

    fn complete<H, F>(
        &mut self,
        hardware: &mut H,
        descriptors: &DescriptorTable<'static>,
        setup: SetupPacket,
        received: usize,
        dispatch: F,
    ) where
        H: UsbHardware,
        F: FnOnce(&mut H, &SetupPacket, &mut ControlData<'_>) -> Result<(), RequestError>,
    {
        let result = {
            let mut data = ControlData::new(&mut self.buffer, received, descriptors);
            dispatch(hardware, &setup, &mut data).map(|()| data.response())
        };

        let reply = match result {
            Ok(reply) => reply,
            Err(err) => {
                debug!("Stalling {:?}: {}", setup, err);
                self.stall(hardware);
                return;
            }
        };

        if setup.direction() == Direction::DeviceToHost && setup.length > 0 {
            let requested = setup.length as usize;
            let length = usize::min(reply.len(), requested);
            /*
             * The host knows the data stage is over when it receives a short packet, or when it has
             * received `wLength` bytes. If our reply is shorter than it asked for, but fills a whole
             * number of packets, we have to follow it with a zero-length packet.
             */
            let zero_length_packet = length < requested && length % self.max_packet_size == 0;
            self.stage = Stage::DataIn { reply, offset: 0, length, zero_length_packet };
            self.send_next(hardware);
        } else {
            hardware.write_endpoint(EndpointAddress::CONTROL_IN, &[]);
            self.stage = Stage::StatusIn;
        }
    }

    fn send_next<H>(&mut self, hardware: &mut H)
    where
        H: UsbHardware,
    {
        let Stage::DataIn { reply, offset, length, zero_length_packet } = self.stage else {
            return;
        };

        let chunk = usize::min(length - offset, self.max_packet_size);
        hardware.write_endpoint(EndpointAddress::CONTROL_IN, &reply.bytes(&self.buffer)[offset..(offset + chunk)]);
        let offset = offset + chunk;

        self.stage = if chunk < self.max_packet_size || (offset == length && !zero_length_packet) {
            Stage::StatusOut
        } else {
            Stage::DataIn { reply, offset, length, zero_length_packet }
        };
    }

    fn stall<H>(&mut self, hardware: &mut H)
    where
        H: UsbHardware,
    {
        hardware.set_endpoint_stall(EndpointAddress::CONTROL_IN, true);
        self.stalled = true;
        self.stage = Stage::Idle;
    }
}
