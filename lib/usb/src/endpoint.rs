use crate::setup::Direction;
use bit_field::BitField;
use core::fmt;

/// An endpoint address, as used in endpoint descriptors and in the `wIndex` of endpoint-recipient
/// requests. Bits `0..4` hold the endpoint number, and bit `7` the direction (`1` is IN).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EndpointAddress(pub u8);

impl EndpointAddress {
    /// The number of distinct endpoint addresses: 16 endpoint numbers, in each direction.
    pub const COUNT: usize = 32;

    pub const CONTROL_OUT: EndpointAddress = EndpointAddress(0x00);
    pub const CONTROL_IN: EndpointAddress = EndpointAddress(0x80);

    pub fn new(number: u8, direction: Direction) -> EndpointAddress {
        let mut value = 0u8;
        value.set_bits(0..4, number & 0xf);
        value.set_bit(7, direction == Direction::DeviceToHost);
        EndpointAddress(value)
    }

    pub fn number(self) -> u8 {
        self.0.get_bits(0..4)
    }

    pub fn is_in(self) -> bool {
        self.0.get_bit(7)
    }

    pub fn direction(self) -> Direction {
        if self.is_in() {
            Direction::DeviceToHost
        } else {
            Direction::HostToDevice
        }
    }

    pub fn is_control(self) -> bool {
        self.number() == 0
    }

    /// A dense index for this endpoint, in `0..EndpointAddress::COUNT`. OUT endpoints are at even
    /// indices, and IN endpoints at odd ones.
    pub fn index(self) -> usize {
        (self.number() as usize * 2) + self.is_in() as usize
    }

    /// Whether any of the reserved bits (`4..7`) are set.
    pub fn has_reserved_bits(self) -> bool {
        self.0.get_bits(4..7) != 0
    }
}

impl From<u8> for EndpointAddress {
    fn from(value: u8) -> Self {
        EndpointAddress(value)
    }
}

impl fmt::Debug for EndpointAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EP{}{}", self.number(), if self.is_in() { "IN" } else { "OUT" })
    }
}
