//! A mass-storage class device with no storage behind it: its class requests report no logical
//! units, and anything sent to its bulk OUT endpoint is echoed back on its bulk IN endpoint.

mod common;

use common::{Host, SimulatedController, Stalled};
use usb::{
    descriptor::DescriptorType,
    endpoint::EndpointAddress,
    language::ENGLISH_US,
    msc::{MassStorageRequest, CLASS_MASS_STORAGE, PROTOCOL_BULK_ONLY, SUBCLASS_SCSI},
    setup::{Direction, Recipient, RequestKind, RequestType, SetupPacket},
};
use usb_device::{
    Config,
    ControlData,
    EndpointStatus,
    RequestError,
    UsbDevice,
    UsbDeviceBuilder,
    UsbHardware,
};

const BULK_IN: EndpointAddress = EndpointAddress(0x82);
const BULK_OUT: EndpointAddress = EndpointAddress(0x05);

#[rustfmt::skip]
static DESCRIPTORS: &[u8] = &[
    // Device
    0x12, 0x01, 0x10, 0x01, 0x00, 0x00, 0x00, 0x40, 0x34, 0x12, 0x02, 0x01, 0x00, 0x01, 0x01, 0x02, 0x03, 0x01,
    // Configuration
    0x09, 0x02, 0x20, 0x00, 0x01, 0x01, 0x00, 0xc0, 0x32,
    // Interface: mass storage, SCSI, bulk-only
    0x09, 0x04, 0x00, 0x00, 0x02, CLASS_MASS_STORAGE, SUBCLASS_SCSI, PROTOCOL_BULK_ONLY, 0x00,
    // Endpoints
    0x07, 0x05, 0x82, 0x02, 0x40, 0x00, 0x00,
    0x07, 0x05, 0x05, 0x02, 0x40, 0x00, 0x00,
    // Language IDs
    0x04, 0x03, ENGLISH_US as u8, (ENGLISH_US >> 8) as u8,
    // Manufacturer
    0x0e, 0x03, b'L', 0, b'P', 0, b'C', 0, b'U', 0, b'S', 0, b'B', 0,
    // Product
    0x12, 0x03, b'P', 0, b'r', 0, b'o', 0, b'd', 0, b'u', 0, b'c', 0, b't', 0, b'X', 0,
    // Serial number
    0x12, 0x03, b'D', 0, b'E', 0, b'A', 0, b'D', 0, b'C', 0, b'0', 0, b'D', 0, b'E', 0,
    0x00,
];

#[derive(Default)]
struct MassStorage {
    resets: u32,
    echoed: Vec<usize>,
    acknowledged: u32,
}

fn class_request(class: &mut MassStorage, setup: &SetupPacket, data: &mut ControlData<'_>) -> Result<(), RequestError> {
    match MassStorageRequest::try_from(setup.request) {
        Ok(MassStorageRequest::GetMaxLun) => {
            if setup.value != 0 || setup.length != 1 {
                return Err(RequestError::InvalidValue(setup.value));
            }
            data.respond(&[0])
        }
        Ok(MassStorageRequest::Reset) => {
            if setup.value != 0 || setup.length != 0 {
                return Err(RequestError::InvalidValue(setup.value));
            }
            class.resets += 1;
            Ok(())
        }
        Err(_) => Err(RequestError::Unsupported),
    }
}

fn bulk_out(class: &mut MassStorage, hardware: &mut SimulatedController, endpoint: EndpointAddress, _: EndpointStatus) {
    let mut buffer = [0u8; 64];
    if let Some(length) = hardware.read_endpoint(endpoint, &mut buffer) {
        hardware.write_endpoint(BULK_IN, &buffer[..length]);
        class.echoed.push(length);
    }
}

fn bulk_in(class: &mut MassStorage, _: &mut SimulatedController, _: EndpointAddress, _: EndpointStatus) {
    class.acknowledged += 1;
}

fn build() -> UsbDevice<SimulatedController, MassStorage> {
    let mut builder = UsbDeviceBuilder::new(SimulatedController::new(), MassStorage::default(), Config::new()).unwrap();
    builder
        .register_descriptor_table(DESCRIPTORS)
        .unwrap()
        .register_request_handler(RequestKind::Class, class_request)
        .unwrap()
        .register_endpoint_handler(BULK_IN, 64, Some(bulk_in))
        .unwrap()
        .register_endpoint_handler(BULK_OUT, 64, Some(bulk_out))
        .unwrap();
    let mut device = builder.build().unwrap();
    device.connect();
    device
}

fn class_setup(direction: Direction, request: MassStorageRequest, value: u16, length: u16) -> SetupPacket {
    let typ = RequestType::standard(direction, Recipient::Interface).with(RequestType::KIND, RequestKind::Class);
    SetupPacket::new(typ, request as u8, value, 0, length)
}

#[test]
fn enumerates() {
    let mut device = build();
    assert!(device.hardware().connected);
    assert_eq!(
        device.hardware().realized,
        [(EndpointAddress::CONTROL_OUT, 64), (EndpointAddress::CONTROL_IN, 64), (BULK_IN, 64), (BULK_OUT, 64)]
    );

    let mut host = Host::new(&mut device);

    // Hosts often ask for 64 bytes of the device descriptor first
    let device_descriptor = host.get_descriptor(DescriptorType::Device as u8, 0, 64).unwrap();
    assert_eq!(device_descriptor, &DESCRIPTORS[0..18]);

    host.set_address(9).unwrap();
    assert_eq!(host.device.hardware().address, 9);

    // The configuration descriptor header, then the whole thing
    let header = host.get_descriptor(DescriptorType::Configuration as u8, 0, 9).unwrap();
    assert_eq!(header, &DESCRIPTORS[18..27]);
    let total_length = u16::from_le_bytes([header[2], header[3]]);
    let configuration = host.get_descriptor(DescriptorType::Configuration as u8, 0, total_length).unwrap();
    assert_eq!(configuration, &DESCRIPTORS[18..50]);
    assert_eq!(configuration[9 + 5..9 + 8], [CLASS_MASS_STORAGE, SUBCLASS_SCSI, PROTOCOL_BULK_ONLY]);

    // Strings
    let languages = host.get_descriptor(DescriptorType::String as u8, 0, 255).unwrap();
    assert_eq!(languages.len(), 4);
    assert_eq!(u16::from_le_bytes([languages[2], languages[3]]), ENGLISH_US);
    let product = host.get_descriptor(DescriptorType::String as u8, 2, 255).unwrap();
    assert_eq!(product.len(), 0x12);
    assert_eq!(&product[2..6], [b'P', 0, b'r', 0]);
    assert_eq!(host.get_descriptor(DescriptorType::String as u8, 4, 255), Err(Stalled));

    host.set_configuration(1).unwrap();
    assert!(host.device.hardware().configured);
    assert_eq!(host.device.state().configuration, 1);
    assert_eq!(host.device.state().address, 9);
}

#[test]
fn class_requests() {
    let mut device = build();
    let mut host = Host::new(&mut device);
    host.set_configuration(1).unwrap();

    assert_eq!(host.control_in(class_setup(Direction::DeviceToHost, MassStorageRequest::GetMaxLun, 0, 1)), Ok(vec![0]));
    assert_eq!(
        host.control_in(class_setup(Direction::DeviceToHost, MassStorageRequest::GetMaxLun, 1, 1)),
        Err(Stalled)
    );

    host.control_out(class_setup(Direction::HostToDevice, MassStorageRequest::Reset, 0, 0), &[]).unwrap();
    assert_eq!(host.device.class().resets, 1);

    // A vendor request has nowhere to go
    let vendor = SetupPacket::from_bytes(&[0xc0, 0x01, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00]);
    assert_eq!(host.control_in(vendor), Err(Stalled));

    // The device recovers after a stall
    assert_eq!(host.control_in(class_setup(Direction::DeviceToHost, MassStorageRequest::GetMaxLun, 0, 1)), Ok(vec![0]));
}

#[test]
fn echoes_bulk_data() {
    let mut device = build();
    let mut host = Host::new(&mut device);
    host.set_configuration(1).unwrap();

    let message: Vec<u8> = (0..64).collect();
    host.bulk_out(BULK_OUT, &message);
    host.bulk_out(BULK_OUT, b"hello");

    assert_eq!(host.bulk_in(BULK_IN), [message, b"hello".to_vec()]);
    assert_eq!(host.device.class().echoed, [64, 5]);
    assert_eq!(host.device.class().acknowledged, 2);
}

#[test]
fn halting_the_bulk_endpoint() {
    let mut device = build();
    let mut host = Host::new(&mut device);
    host.set_configuration(1).unwrap();

    let endpoint_request = |request: u8, length: u16| {
        let direction = if length == 0 { Direction::HostToDevice } else { Direction::DeviceToHost };
        SetupPacket::new(RequestType::standard(direction, Recipient::Endpoint), request, 0, BULK_IN.0 as u16, length)
    };
    const GET_STATUS: u8 = 0;
    const CLEAR_FEATURE: u8 = 1;
    const SET_FEATURE: u8 = 3;

    host.control_out(endpoint_request(SET_FEATURE, 0), &[]).unwrap();
    assert!(host.device.hardware().is_endpoint_stalled(BULK_IN));
    assert_eq!(host.control_in(endpoint_request(GET_STATUS, 2)), Ok(vec![1, 0]));

    host.control_out(endpoint_request(CLEAR_FEATURE, 0), &[]).unwrap();
    assert_eq!(host.control_in(endpoint_request(GET_STATUS, 2)), Ok(vec![0, 0]));
}
