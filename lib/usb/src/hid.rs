use crate::descriptor::DescriptorType;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(C)]
pub struct HidDescriptor {
    pub length: u8,
    pub typ: u8,
    pub bcd_hid: u16,
    /// The country the hardware is localized for, or `0` if it isn't localized.
    pub country_code: u8,
    /// The number of included class descriptors. Will be `>=1` as a `Report` descriptor will
    /// always be present.
    pub num_descriptors: u8,
    pub descriptor_typ: u8,
    pub descriptor_length: u16,
}

impl HidDescriptor {
    pub const LENGTH: usize = 9;

    pub fn parse(bytes: &[u8]) -> Option<HidDescriptor> {
        let bytes = bytes.get(0..Self::LENGTH)?;
        if bytes[1] != DescriptorType::Hid as u8 {
            return None;
        }

        Some(HidDescriptor {
            length: bytes[0],
            typ: bytes[1],
            bcd_hid: u16::from_le_bytes([bytes[2], bytes[3]]),
            country_code: bytes[4],
            num_descriptors: bytes[5],
            descriptor_typ: bytes[6],
            descriptor_length: u16::from_le_bytes([bytes[7], bytes[8]]),
        })
    }
}

/// Class-specific requests defined by the HID specification (section 7.2).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum HidRequest {
    GetReport = 0x01,
    GetIdle = 0x02,
    GetProtocol = 0x03,
    SetReport = 0x09,
    SetIdle = 0x0a,
    SetProtocol = 0x0b,
}

impl TryFrom<u8> for HidRequest {
    type Error = u8;

    fn try_from(value: u8) -> Result<HidRequest, u8> {
        Ok(match value {
            0x01 => HidRequest::GetReport,
            0x02 => HidRequest::GetIdle,
            0x03 => HidRequest::GetProtocol,
            0x09 => HidRequest::SetReport,
            0x0a => HidRequest::SetIdle,
            0x0b => HidRequest::SetProtocol,
            other => return Err(other),
        })
    }
}

/// Idle rates are sent in units of 4ms.
pub const IDLE_RATE_UNIT_MS: u32 = 4;
