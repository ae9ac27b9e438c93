//! Types shared by everything that speaks USB: the setup packet that starts every control
//! transfer, descriptor records and the tables they are collected into, and the request codes of
//! the device classes we deal with.

#![no_std]

pub mod descriptor;
pub mod endpoint;
pub mod hid;
pub mod msc;
pub mod setup;

/// String descriptor language IDs.
pub mod language {
    /// English (US). The only language we provide strings in.
    pub const ENGLISH_US: u16 = 0x0409;
}
