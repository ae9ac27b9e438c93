use core::fmt;

/// The 8-byte packet a host sends at the start of every control transfer.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C, align(8))]
pub struct SetupPacket {
    pub typ: RequestType,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

impl SetupPacket {
    pub const SIZE: usize = 8;

    pub fn new(typ: RequestType, request: u8, value: u16, index: u16, length: u16) -> SetupPacket {
        SetupPacket { typ, request, value, index, length }
    }

    /// Decode a setup packet from its wire form. All multi-byte fields are little-endian.
    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> SetupPacket {
        SetupPacket {
            typ: RequestType::from_bits(bytes[0]),
            request: bytes[1],
            value: u16::from_le_bytes([bytes[2], bytes[3]]),
            index: u16::from_le_bytes([bytes[4], bytes[5]]),
            length: u16::from_le_bytes([bytes[6], bytes[7]]),
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let [value_lo, value_hi] = self.value.to_le_bytes();
        let [index_lo, index_hi] = self.index.to_le_bytes();
        let [length_lo, length_hi] = self.length.to_le_bytes();
        [self.typ.bits(), self.request, value_lo, value_hi, index_lo, index_hi, length_lo, length_hi]
    }

    pub fn direction(&self) -> Direction {
        self.typ.get(RequestType::DIRECTION)
    }

    pub fn kind(&self) -> RequestKind {
        self.typ.get(RequestType::KIND)
    }

    /// The recipient of this request, or `None` if the recipient field holds one of the reserved
    /// encodings (`4..=31`).
    pub fn recipient(&self) -> Option<Recipient> {
        match self.typ.try_get(RequestType::RECIPIENT) {
            Ok(Recipient::_Reserved) | Err(_) => None,
            Ok(recipient) => Some(recipient),
        }
    }

    /// Interpret `bRequest` as one of the standard requests. Only meaningful when `kind` is
    /// `RequestKind::Standard`, as class and vendor requests reuse the same opcode space.
    pub fn standard_request(&self) -> Option<Request> {
        Request::try_from(self.request).ok()
    }

    /// `GET_DESCRIPTOR` and `SET_DESCRIPTOR` encode the descriptor type in the high byte of
    /// `wValue`, and the index in the low byte.
    pub fn descriptor_type_index(&self) -> (u8, u8) {
        ((self.value >> 8) as u8, self.value as u8)
    }
}

impl fmt::Debug for SetupPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetupPacket")
            .field("typ", &format_args!("{:#04x}", self.typ.bits()))
            .field("request", &format_args!("{:#04x}", self.request))
            .field("value", &format_args!("{:#06x}", self.value))
            .field("index", &format_args!("{:#06x}", self.index))
            .field("length", &self.length)
            .finish()
    }
}

mycelium_bitfield::bitfield! {
    #[derive(PartialEq, Eq)]
    pub struct RequestType<u8> {
        pub const RECIPIENT: Recipient;
        pub const KIND: RequestKind;
        pub const DIRECTION: Direction;
    }
}

impl RequestType {
    pub fn standard(direction: Direction, recipient: Recipient) -> RequestType {
        RequestType::new()
            .with(RequestType::RECIPIENT, recipient)
            .with(RequestType::KIND, RequestKind::Standard)
            .with(RequestType::DIRECTION, direction)
    }
}

mycelium_bitfield::enum_from_bits! {
    #[derive(PartialEq, Eq, Debug)]
    pub enum Recipient<u8> {
        Device = 0b00000,
        Interface = 0b00001,
        Endpoint = 0b00010,
        Other = 0b00011,
        // XXX: only here to make the field take up all five bits of the recipient. Encodings
        // `4..=31` are reserved by the USB spec and are never produced by `SetupPacket::recipient`.
        _Reserved = 0b11111,
    }
}

mycelium_bitfield::enum_from_bits! {
    #[derive(PartialEq, Eq, Debug)]
    pub enum RequestKind<u8> {
        Standard = 0b00,
        Class = 0b01,
        Vendor = 0b10,
        Reserved = 0b11,
    }
}

impl RequestKind {
    pub const COUNT: usize = 4;

    pub fn index(&self) -> usize {
        match self {
            RequestKind::Standard => 0,
            RequestKind::Class => 1,
            RequestKind::Vendor => 2,
            RequestKind::Reserved => 3,
        }
    }
}

mycelium_bitfield::enum_from_bits! {
    #[derive(PartialEq, Eq, Debug)]
    pub enum Direction<u8> {
        HostToDevice = 0b0,
        DeviceToHost = 0b1,
    }
}

/// The standard requests defined in table 9-4 of the USB 2.0 specification.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Request {
    GetStatus = 0,
    ClearFeature = 1,
    SetFeature = 3,
    SetAddress = 5,
    GetDescriptor = 6,
    SetDescriptor = 7,
    GetConfiguration = 8,
    SetConfiguration = 9,
    GetInterface = 10,
    SetInterface = 11,
    SynchFrame = 12,
}

impl TryFrom<u8> for Request {
    type Error = u8;

    fn try_from(value: u8) -> Result<Request, u8> {
        Ok(match value {
            0 => Request::GetStatus,
            1 => Request::ClearFeature,
            3 => Request::SetFeature,
            5 => Request::SetAddress,
            6 => Request::GetDescriptor,
            7 => Request::SetDescriptor,
            8 => Request::GetConfiguration,
            9 => Request::SetConfiguration,
            10 => Request::GetInterface,
            11 => Request::SetInterface,
            12 => Request::SynchFrame,
            other => return Err(other),
        })
    }
}

/// Feature selectors used by `CLEAR_FEATURE` and `SET_FEATURE`, carried in `wValue`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u16)]
pub enum Feature {
    EndpointHalt = 0,
    DeviceRemoteWakeup = 1,
    TestMode = 2,
}

impl TryFrom<u16> for Feature {
    type Error = u16;

    fn try_from(value: u16) -> Result<Feature, u16> {
        match value {
            0 => Ok(Feature::EndpointHalt),
            1 => Ok(Feature::DeviceRemoteWakeup),
            2 => Ok(Feature::TestMode),
            other => Err(other),
        }
    }
}
