use log::{trace, warn};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum DescriptorType {
    Device = 1,
    Configuration = 2,
    String = 3,
    Interface = 4,
    Endpoint = 5,
    DeviceQualifier = 6,
    OtherSpeedConfiguration = 7,
    InterfacePower = 8,
    Hid = 0x21,
    HidReport = 0x22,
    HidPhysical = 0x23,
}

impl TryFrom<u8> for DescriptorType {
    type Error = u8;

    fn try_from(value: u8) -> Result<DescriptorType, u8> {
        Ok(match value {
            1 => DescriptorType::Device,
            2 => DescriptorType::Configuration,
            3 => DescriptorType::String,
            4 => DescriptorType::Interface,
            5 => DescriptorType::Endpoint,
            6 => DescriptorType::DeviceQualifier,
            7 => DescriptorType::OtherSpeedConfiguration,
            8 => DescriptorType::InterfacePower,
            0x21 => DescriptorType::Hid,
            0x22 => DescriptorType::HidReport,
            0x23 => DescriptorType::HidPhysical,
            other => return Err(other),
        })
    }
}

impl DescriptorType {
    /// Configuration-like descriptors are requested as a whole block: the configuration
    /// descriptor itself followed by every interface, endpoint, and class descriptor belonging to
    /// it. The length of the block is held in `wTotalLength`, rather than `bLength`.
    pub fn is_configuration(typ: u8) -> bool {
        typ == DescriptorType::Configuration as u8 || typ == DescriptorType::OtherSpeedConfiguration as u8
    }
}

#[derive(Clone, Copy, Default, Debug)]
#[repr(C)]
pub struct DeviceDescriptor {
    pub length: u8,
    pub typ: u8,
    /// Binary-Coded Decimal representation of the USB Spec version the device supports.
    /// E.g. `2.10` is represented by `0x210`.
    pub bcd_usb: u16,
    pub class: u8,
    pub sub_class: u8,
    pub protocol: u8,
    /// Maximum packet size for endpoint 0 (only 8, 16, 32, and 64 are valid values)
    pub max_control_packet_size: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    pub bcd_device: u16,
    /// Index of string descriptor describing the device's manufacturer.
    pub manufacturer_index: u8,
    pub product_index: u8,
    pub serial_number: u8,
    pub num_configurations: u8,
}

impl DeviceDescriptor {
    pub const LENGTH: usize = 18;

    /// Decode a device descriptor from its wire form. Returns `None` if `bytes` is too short or
    /// does not describe a device descriptor.
    pub fn parse(bytes: &[u8]) -> Option<DeviceDescriptor> {
        let bytes = bytes.get(0..Self::LENGTH)?;
        if bytes[0] as usize != Self::LENGTH || bytes[1] != DescriptorType::Device as u8 {
            return None;
        }

        let word = |offset: usize| u16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
        Some(DeviceDescriptor {
            length: bytes[0],
            typ: bytes[1],
            bcd_usb: word(2),
            class: bytes[4],
            sub_class: bytes[5],
            protocol: bytes[6],
            max_control_packet_size: bytes[7],
            vendor_id: word(8),
            product_id: word(10),
            bcd_device: word(12),
            manufacturer_index: bytes[14],
            product_index: bytes[15],
            serial_number: bytes[16],
            num_configurations: bytes[17],
        })
    }
}

/// A single descriptor record within a descriptor buffer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Record<'a> {
    /// Offset of the record from the start of its buffer.
    pub offset: usize,
    pub typ: u8,
    /// The `bLength` bytes of the record.
    pub bytes: &'a [u8],
}

/// Walks the records of a descriptor buffer. Stops at a zero-length record, at the end of the
/// buffer, or at a record whose header doesn't fit in what's left of the buffer.
pub struct Records<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> Records<'a> {
    pub fn new(buffer: &'a [u8]) -> Records<'a> {
        Records { buffer, offset: 0 }
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Record<'a>> {
        let length = *self.buffer.get(self.offset)? as usize;
        if length == 0 {
            return None;
        }

        let bytes = self.buffer.get(self.offset..(self.offset + length))?;
        let typ = *bytes.get(1)?;
        let record = Record { offset: self.offset, typ, bytes };
        self.offset += length;
        Some(record)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DescriptorError {
    /// A record's `bLength` is `1`, which can't even hold the record header, or a configuration
    /// record can't hold its `wTotalLength` or claims a total length shorter than itself.
    RecordTooShort { offset: usize },
    /// A record's `bLength` runs past the end of the buffer.
    RecordOverrun { offset: usize },
    /// A configuration record's `wTotalLength` runs past the end of the buffer.
    TotalLengthOverrun { offset: usize },
    /// Every descriptor table slot has already been filled.
    TooManyTables,
}

/// Check that the records of `buffer` exactly tile it, up to either its end or a terminating
/// zero-length record. Returns the number of records found.
///
/// The resolver trusts registered tables, so this should be used on a table before it is
/// registered.
pub fn validate(buffer: &[u8]) -> Result<usize, DescriptorError> {
    let mut offset = 0;
    let mut count = 0;

    while offset < buffer.len() {
        let length = buffer[offset] as usize;
        match length {
            0 => break,
            1 => return Err(DescriptorError::RecordTooShort { offset }),
            _ if offset + length > buffer.len() => return Err(DescriptorError::RecordOverrun { offset }),
            _ => (),
        }

        if DescriptorType::is_configuration(buffer[offset + 1]) {
            // `wTotalLength` has to be read from the record itself, and covers at least the record
            let record = &buffer[offset..(offset + length)];
            let total_length = total_length(record).ok_or(DescriptorError::RecordTooShort { offset })? as usize;
            if total_length < length {
                return Err(DescriptorError::RecordTooShort { offset });
            }
            if offset + total_length > buffer.len() {
                return Err(DescriptorError::TotalLengthOverrun { offset });
            }
        }

        offset += length;
        count += 1;
    }

    Ok(count)
}

/// Read `wTotalLength` from the start of a configuration record.
fn total_length(record: &[u8]) -> Option<u16> {
    Some(u16::from_le_bytes([*record.get(2)?, *record.get(3)?]))
}

/// The set of descriptors a device presents to the host. Made up of one or more buffers of
/// concatenated descriptor records, each terminated by a zero-length record (or by the end of the
/// buffer).
#[derive(Clone, Debug)]
pub struct DescriptorTable<'a> {
    buffers: [Option<&'a [u8]>; MAX_DESCRIPTOR_BUFFERS],
}

pub const MAX_DESCRIPTOR_BUFFERS: usize = 4;

impl<'a> DescriptorTable<'a> {
    pub const fn new() -> DescriptorTable<'a> {
        DescriptorTable { buffers: [None; MAX_DESCRIPTOR_BUFFERS] }
    }

    /// Validate `buffer` and add it to the table. Indices of records in later buffers continue on
    /// from the records of the same type in earlier buffers.
    pub fn register(&mut self, buffer: &'a [u8]) -> Result<usize, DescriptorError> {
        let slot = self.buffers.iter_mut().find(|slot| slot.is_none()).ok_or(DescriptorError::TooManyTables)?;
        let count = validate(buffer)?;
        *slot = Some(buffer);
        Ok(count)
    }

    pub fn is_empty(&self) -> bool {
        self.buffers[0].is_none()
    }

    /// Iterate over the records of every registered buffer, in registration order.
    pub fn records(&self) -> impl Iterator<Item = (&'a [u8], Record<'a>)> + '_ {
        self.buffers.iter().flatten().flat_map(|&buffer| Records::new(buffer).map(move |record| (buffer, record)))
    }

    /// Find the `index`th descriptor of type `typ`. The returned slice borrows directly from the
    /// registered buffer - descriptors are never copied.
    ///
    /// For configuration descriptors, the whole `wTotalLength` block is returned. `language_id`
    /// is only meaningful for string descriptors, and we currently only support a single
    /// language, so it does not affect the lookup.
    pub fn resolve(&self, typ: u8, index: u8, language_id: u16) -> Option<&'a [u8]> {
        if typ == DescriptorType::String as u8 && index != 0 {
            trace!("Looking up string descriptor {} (language {:#06x})", index, language_id);
        }

        let (buffer, record) =
            self.records().filter(|(_, record)| record.typ == typ).nth(index as usize)?;

        if DescriptorType::is_configuration(typ) {
            let total_length = total_length(record.bytes)? as usize;
            let block = buffer.get(record.offset..(record.offset + total_length));
            if block.is_none() {
                warn!("Configuration descriptor at offset {} has a bad total length ({})", record.offset, total_length);
            }
            block
        } else {
            Some(record.bytes)
        }
    }

    /// The first device descriptor in the table, if there is one.
    pub fn device_descriptor(&self) -> Option<DeviceDescriptor> {
        DeviceDescriptor::parse(self.resolve(DescriptorType::Device as u8, 0, 0)?)
    }
}

impl Default for DescriptorTable<'_> {
    fn default() -> Self {
        DescriptorTable::new()
    }
}
