//! A simulated controller and host, for driving a `UsbDevice` through whole transfers.

#![allow(dead_code)]

use std::collections::VecDeque;
use usb::{
    endpoint::EndpointAddress,
    setup::{Direction, Recipient, Request, RequestType, SetupPacket},
};
use usb_device::{EndpointStatus, InterruptEvent, UsbDevice, UsbHardware};

#[derive(Default)]
pub struct SimulatedController {
    pub connected: bool,
    pub address: u8,
    pub configured: bool,
    pub realized: Vec<(EndpointAddress, u16)>,
    stalled: [bool; EndpointAddress::COUNT],
    from_host: [VecDeque<Vec<u8>>; EndpointAddress::COUNT],
    to_host: [VecDeque<Vec<u8>>; EndpointAddress::COUNT],
}

impl SimulatedController {
    pub fn new() -> SimulatedController {
        SimulatedController::default()
    }

    /// Take the packets the device has queued for the host on `endpoint`.
    pub fn collect(&mut self, endpoint: EndpointAddress) -> Vec<Vec<u8>> {
        self.to_host[endpoint.index()].drain(..).collect()
    }
}

impl UsbHardware for SimulatedController {
    fn connect(&mut self, connect: bool) {
        self.connected = connect;
    }

    fn set_address(&mut self, address: u8) {
        self.address = address;
    }

    fn configure_device(&mut self, configured: bool) {
        self.configured = configured;
    }

    fn realize_endpoint(&mut self, endpoint: EndpointAddress, max_packet_size: u16) {
        self.realized.push((endpoint, max_packet_size));
    }

    fn set_endpoint_stall(&mut self, endpoint: EndpointAddress, stalled: bool) {
        self.stalled[endpoint.index()] = stalled;
    }

    fn is_endpoint_stalled(&self, endpoint: EndpointAddress) -> bool {
        self.stalled[endpoint.index()]
    }

    fn read_endpoint(&mut self, endpoint: EndpointAddress, buffer: &mut [u8]) -> Option<usize> {
        let packet = self.from_host[endpoint.index()].pop_front()?;
        let length = packet.len().min(buffer.len());
        buffer[..length].copy_from_slice(&packet[..length]);
        Some(length)
    }

    fn write_endpoint(&mut self, endpoint: EndpointAddress, data: &[u8]) {
        self.to_host[endpoint.index()].push_back(data.to_vec());
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Stalled;

/// Plays the part of the host. Every method runs a whole transaction against the device, raising
/// the interrupts the controller would raise along the way.
pub struct Host<'a, C> {
    pub device: &'a mut UsbDevice<SimulatedController, C>,
}

impl<'a, C> Host<'a, C> {
    pub fn new(device: &'a mut UsbDevice<SimulatedController, C>) -> Host<'a, C> {
        Host { device }
    }

    fn controller(&mut self) -> &mut SimulatedController {
        self.device.hardware_mut()
    }

    fn send_setup(&mut self, setup: &SetupPacket) -> Result<(), Stalled> {
        self.controller().from_host[EndpointAddress::CONTROL_OUT.index()].push_back(setup.to_bytes().to_vec());
        self.device.handle_interrupt(InterruptEvent::Endpoint {
            address: EndpointAddress::CONTROL_OUT,
            status: EndpointStatus::SETUP | EndpointStatus::DATA,
        });
        self.check_stall()
    }

    fn check_stall(&mut self) -> Result<(), Stalled> {
        if self.device.hardware().is_endpoint_stalled(EndpointAddress::CONTROL_IN) {
            Err(Stalled)
        } else {
            Ok(())
        }
    }

    fn in_token(&mut self) -> Option<Vec<u8>> {
        let packet = self.controller().to_host[EndpointAddress::CONTROL_IN.index()].pop_front()?;
        self.device.handle_interrupt(InterruptEvent::Endpoint {
            address: EndpointAddress::CONTROL_IN,
            status: EndpointStatus::DATA,
        });
        Some(packet)
    }

    fn out_packet(&mut self, endpoint: EndpointAddress, data: &[u8]) {
        self.controller().from_host[endpoint.index()].push_back(data.to_vec());
        self.device.handle_interrupt(InterruptEvent::Endpoint { address: endpoint, status: EndpointStatus::DATA });
    }

    /// Run a control transfer with an IN data stage, returning the data the device sent.
    pub fn control_in(&mut self, setup: SetupPacket) -> Result<Vec<u8>, Stalled> {
        assert_eq!(setup.direction(), Direction::DeviceToHost);
        let max_packet_size = self.device.config().control_max_packet_size as usize;

        self.send_setup(&setup)?;
        let mut data = Vec::new();
        loop {
            let packet = self.in_token().expect("Device did not send a data packet");
            assert!(packet.len() <= max_packet_size);
            data.extend_from_slice(&packet);
            if packet.len() < max_packet_size || data.len() >= setup.length as usize {
                break;
            }
        }

        // Status stage
        self.out_packet(EndpointAddress::CONTROL_OUT, &[]);
        self.check_stall()?;
        Ok(data)
    }

    /// Run a control transfer with an optional OUT data stage.
    pub fn control_out(&mut self, setup: SetupPacket, data: &[u8]) -> Result<(), Stalled> {
        assert_eq!(setup.direction(), Direction::HostToDevice);
        assert_eq!(setup.length as usize, data.len());
        let max_packet_size = self.device.config().control_max_packet_size as usize;

        self.send_setup(&setup)?;
        for chunk in data.chunks(max_packet_size) {
            self.out_packet(EndpointAddress::CONTROL_OUT, chunk);
            self.check_stall()?;
        }
        // A short final packet isn't needed if the data is a whole number of packets, as the host
        // has said how much it is sending.

        let status = self.in_token().expect("Device did not send a status packet");
        assert!(status.is_empty());
        Ok(())
    }

    pub fn get_descriptor(&mut self, typ: u8, index: u8, length: u16) -> Result<Vec<u8>, Stalled> {
        self.control_in(SetupPacket::new(
            RequestType::standard(Direction::DeviceToHost, Recipient::Device),
            Request::GetDescriptor as u8,
            ((typ as u16) << 8) | index as u16,
            0,
            length,
        ))
    }

    pub fn set_address(&mut self, address: u8) -> Result<(), Stalled> {
        self.control_out(
            SetupPacket::new(
                RequestType::standard(Direction::HostToDevice, Recipient::Device),
                Request::SetAddress as u8,
                address as u16,
                0,
                0,
            ),
            &[],
        )
    }

    pub fn set_configuration(&mut self, configuration: u8) -> Result<(), Stalled> {
        self.control_out(
            SetupPacket::new(
                RequestType::standard(Direction::HostToDevice, Recipient::Device),
                Request::SetConfiguration as u8,
                configuration as u16,
                0,
                0,
            ),
            &[],
        )
    }

    /// Send a packet to a class OUT endpoint.
    pub fn bulk_out(&mut self, endpoint: EndpointAddress, data: &[u8]) {
        self.out_packet(endpoint, data);
    }

    /// Collect the packets waiting on a class IN endpoint, acknowledging each.
    pub fn bulk_in(&mut self, endpoint: EndpointAddress) -> Vec<Vec<u8>> {
        let packets = self.controller().collect(endpoint);
        for _ in &packets {
            self.device.handle_interrupt(InterruptEvent::Endpoint { address: endpoint, status: EndpointStatus::DATA });
        }
        packets
    }
}
