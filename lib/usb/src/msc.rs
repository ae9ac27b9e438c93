/// Class-specific requests of the Mass Storage Bulk-Only Transport (section 3 of the BOT
/// specification).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum MassStorageRequest {
    GetMaxLun = 0xfe,
    Reset = 0xff,
}

impl TryFrom<u8> for MassStorageRequest {
    type Error = u8;

    fn try_from(value: u8) -> Result<MassStorageRequest, u8> {
        match value {
            0xfe => Ok(MassStorageRequest::GetMaxLun),
            0xff => Ok(MassStorageRequest::Reset),
            other => Err(other),
        }
    }
}

pub const CLASS_MASS_STORAGE: u8 = 0x08;
pub const SUBCLASS_SCSI: u8 = 0x06;
pub const PROTOCOL_BULK_ONLY: u8 = 0x50;
