use crate::hw::UsbHardware;
use std::{collections::VecDeque, vec::Vec};
use usb::endpoint::EndpointAddress;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Call {
    Connect(bool),
    SetAddress(u8),
    ConfigureDevice(bool),
    Realize(EndpointAddress, u16),
    Stall(EndpointAddress, bool),
    Write(EndpointAddress, Vec<u8>),
}

/// A fake controller that records every call made into it.
pub struct MockHardware {
    calls: Vec<Call>,
    stalled: [bool; EndpointAddress::COUNT],
    pending: [VecDeque<Vec<u8>>; EndpointAddress::COUNT],
}

impl MockHardware {
    pub fn new() -> MockHardware {
        MockHardware {
            calls: Vec::new(),
            stalled: [false; EndpointAddress::COUNT],
            pending: core::array::from_fn(|_| VecDeque::new()),
        }
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Queue a packet from the host for an OUT endpoint.
    pub fn queue_packet(&mut self, endpoint: EndpointAddress, data: &[u8]) {
        self.pending[endpoint.index()].push_back(data.to_vec());
    }

    /// Remove and return the packets written to `endpoint` so far.
    pub fn take_writes(&mut self, endpoint: EndpointAddress) -> Vec<Vec<u8>> {
        let mut writes = Vec::new();
        self.calls.retain(|call| match call {
            Call::Write(address, data) if *address == endpoint => {
                writes.push(data.clone());
                false
            }
            _ => true,
        });
        writes
    }
}

impl UsbHardware for MockHardware {
    fn connect(&mut self, connect: bool) {
        self.calls.push(Call::Connect(connect));
    }

    fn set_address(&mut self, address: u8) {
        self.calls.push(Call::SetAddress(address));
    }

    fn configure_device(&mut self, configured: bool) {
        self.calls.push(Call::ConfigureDevice(configured));
    }

    fn realize_endpoint(&mut self, endpoint: EndpointAddress, max_packet_size: u16) {
        self.calls.push(Call::Realize(endpoint, max_packet_size));
    }

    fn set_endpoint_stall(&mut self, endpoint: EndpointAddress, stalled: bool) {
        self.stalled[endpoint.index()] = stalled;
        self.calls.push(Call::Stall(endpoint, stalled));
    }

    fn is_endpoint_stalled(&self, endpoint: EndpointAddress) -> bool {
        self.stalled[endpoint.index()]
    }

    fn read_endpoint(&mut self, endpoint: EndpointAddress, buffer: &mut [u8]) -> Option<usize> {
        let packet = self.pending[endpoint.index()].pop_front()?;
        let length = usize::min(packet.len(), buffer.len());
        buffer[..length].copy_from_slice(&packet[..length]);
        Some(length)
    }

    fn write_endpoint(&mut self, endpoint: EndpointAddress, data: &[u8]) {
        self.calls.push(Call::Write(endpoint, data.to_vec()));
    }
}
