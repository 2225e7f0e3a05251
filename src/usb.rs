//! Defines for USB, mainly those covered at [usb.org](https://www.usb.org), used when interpreting audio class configuration descriptors
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::fmt;

pub mod descriptors;

/// Interface class code for the Audio class
pub const AUDIO_CLASS: u8 = 0x01;

/// Audio interface subclass; the second byte of the interface triplet
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum AudioSubclass {
    /// Subclass undefined, also the function subclass of a UAC2 IAD
    Undefined = 0x00,
    /// AudioControl
    AudioControl = 0x01,
    /// AudioStreaming
    AudioStreaming = 0x02,
    /// MIDIStreaming; present in descriptors but not modelled
    MidiStreaming = 0x03,
    /// Any other value
    Unknown = 0xff,
}

impl From<u8> for AudioSubclass {
    fn from(b: u8) -> Self {
        match b {
            0x00 => AudioSubclass::Undefined,
            0x01 => AudioSubclass::AudioControl,
            0x02 => AudioSubclass::AudioStreaming,
            0x03 => AudioSubclass::MidiStreaming,
            _ => AudioSubclass::Unknown,
        }
    }
}

/// Binary Coded Decimal release number such as bcdADC
///
/// ```
/// use uac_topology::usb::Version;
///
/// let v = Version::from_bcd(0x0200);
/// assert_eq!(v, Version(2, 0, 0));
/// assert_eq!(v.to_string(), "2.00");
/// ```
#[derive(Debug, Copy, Clone, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Version(pub u8, pub u8, pub u8);

impl Version {
    /// Extract major, minor and sub minor from a BCD u16
    pub fn from_bcd(mut raw: u16) -> Self {
        let sub_minor: u8 = (raw & 0x0F) as u8;
        raw >>= 4;
        let minor: u8 = (raw & 0x0F) as u8;
        raw >>= 4;
        let mut major: u8 = (raw & 0x0F) as u8;
        raw >>= 4;
        major += (10 * raw) as u8;

        Version(major, minor, sub_minor)
    }

    /// Back to the BCD u16 form
    pub fn to_bcd(&self) -> u16 {
        let major = ((self.0 / 10) as u16) << 12 | ((self.0 % 10) as u16) << 8;
        major | ((self.1 as u16 & 0x0F) << 4) | (self.2 as u16 & 0x0F)
    }

    /// The major version
    pub fn major(&self) -> u8 {
        self.0
    }

    /// The minor version
    pub fn minor(&self) -> u8 {
        self.1
    }

    /// The sub minor version
    pub fn sub_minor(&self) -> u8 {
        self.2
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}{}", self.major(), self.minor(), self.sub_minor())
    }
}

#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
/// Transfer and endpoint directions.
pub enum Direction {
    /// Direction for write (host to device) transfers.
    Out,
    /// Direction for read (device to host) transfers.
    In,
}

impl From<u8> for Direction {
    /// From the bEndpointAddress byte
    fn from(b: u8) -> Self {
        match (b & 0x80) >> 7 {
            1 => Direction::In,
            _ => Direction::Out,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Direction::Out => write!(f, "OUT"),
            Direction::In => write!(f, "IN"),
        }
    }
}

/// An endpoint's transfer type.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferType {
    /// Control endpoint.
    Control,
    /// Isochronous endpoint.
    Isochronous,
    /// Bulk endpoint.
    Bulk,
    /// Interrupt endpoint.
    Interrupt,
}

impl From<u8> for TransferType {
    /// From the bmAttributes byte
    fn from(b: u8) -> Self {
        match b & 0x03 {
            0 => TransferType::Control,
            1 => TransferType::Isochronous,
            2 => TransferType::Bulk,
            _ => TransferType::Interrupt,
        }
    }
}

/// Isochronous synchronization mode.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncType {
    /// No synchronisation.
    NoSync,
    /// Asynchronous.
    Asynchronous,
    /// Adaptive.
    Adaptive,
    /// Synchronous.
    Synchronous,
}

impl From<u8> for SyncType {
    /// From the bmAttributes byte
    fn from(b: u8) -> Self {
        match (b & 0x0c) >> 2 {
            0 => SyncType::NoSync,
            1 => SyncType::Asynchronous,
            2 => SyncType::Adaptive,
            _ => SyncType::Synchronous,
        }
    }
}

/// Isochronous usage type.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsageType {
    /// Data endpoint.
    Data,
    /// Feedback endpoint.
    Feedback,
    /// Explicit feedback data endpoint.
    FeedbackData,
    /// Reserved.
    Reserved,
}

impl From<u8> for UsageType {
    /// From the bmAttributes byte
    fn from(b: u8) -> Self {
        match (b & 0x30) >> 4 {
            0 => UsageType::Data,
            1 => UsageType::Feedback,
            2 => UsageType::FeedbackData,
            _ => UsageType::Reserved,
        }
    }
}

/// Address of an endpoint split into number and direction
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointAddress {
    /// Raw bEndpointAddress
    pub address: u8,
    /// Endpoint number, bits 0..3
    pub number: u8,
    /// Direction from bit 7
    pub direction: Direction,
}

impl From<u8> for EndpointAddress {
    fn from(b: u8) -> Self {
        EndpointAddress {
            address: b,
            number: b & 0x0f,
            direction: Direction::from(b),
        }
    }
}

/// Endpoint of a control or streaming interface
///
/// Built once while walking the interface and not changed after the owning topology is complete
#[skip_serializing_none]
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Address including direction
    pub address: EndpointAddress,
    /// Raw bmAttributes
    pub attributes: u8,
    /// Decoded from bmAttributes
    pub transfer_type: TransferType,
    /// Decoded from bmAttributes
    pub sync_type: SyncType,
    /// Decoded from bmAttributes
    pub usage_type: UsageType,
    /// Bytes per (micro)frame; for UAC2 the high-bandwidth transactions are already multiplied in
    pub max_packet_size: u16,
    /// bInterval
    pub interval: u8,
    /// bRefresh of a synch endpoint
    pub refresh: Option<u8>,
    /// Address of the endpoint used for synchronisation
    pub synch_address: Option<u8>,
}

impl Endpoint {
    /// New endpoint from the raw standard descriptor fields
    pub fn new(address: u8, attributes: u8, max_packet_size: u16, interval: u8) -> Self {
        Endpoint {
            address: EndpointAddress::from(address),
            attributes,
            transfer_type: TransferType::from(attributes),
            sync_type: SyncType::from(attributes),
            usage_type: UsageType::from(attributes),
            max_packet_size,
            interval,
            refresh: None,
            synch_address: None,
        }
    }

    /// Direction of the endpoint
    pub fn direction(&self) -> Direction {
        self.address.direction
    }

    /// Isochronous endpoint carrying audio data: has a sync type and is not a feedback endpoint
    pub fn is_isoc_streaming(&self) -> bool {
        self.transfer_type == TransferType::Isochronous
            && self.sync_type != SyncType::NoSync
            && self.usage_type != UsageType::Feedback
    }

    /// Isochronous explicit feedback endpoint
    pub fn is_isoc_feedback(&self) -> bool {
        self.transfer_type == TransferType::Isochronous
            && self.sync_type == SyncType::NoSync
            && self.usage_type == UsageType::Feedback
    }

    /// Interrupt endpoint such as the AudioControl status endpoint
    pub fn is_interrupt(&self) -> bool {
        self.transfer_type == TransferType::Interrupt
    }
}

/// wMaxPacketSize to bytes per microframe including additional high-bandwidth transactions
///
/// Bits 0..10 are the size, bits 11..12 the number of additional transactions
pub fn high_bandwidth_packet_size(w_max_packet_size: u16) -> u16 {
    let size = w_max_packet_size & 0x07ff;
    let transactions = ((w_max_packet_size & 0x1800) >> 11) + 1;
    size * transactions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_bcd() {
        assert_eq!(Version::from_bcd(0x0100), Version(1, 0, 0));
        assert_eq!(Version::from_bcd(0x1234), Version(12, 3, 4));
        assert_eq!(Version(12, 3, 4).to_bcd(), 0x1234);
        assert_eq!(Version(2, 0, 0).to_string(), "2.00");
    }

    #[test]
    fn test_endpoint_attributes() {
        // iso, async, data
        let ep = Endpoint::new(0x81, 0x05, 192, 1);
        assert_eq!(ep.direction(), Direction::In);
        assert_eq!(ep.address.number, 1);
        assert_eq!(ep.sync_type, SyncType::Asynchronous);
        assert!(ep.is_isoc_streaming());
        assert!(!ep.is_isoc_feedback());

        // iso, no sync, feedback
        let fb = Endpoint::new(0x82, 0x11, 4, 4);
        assert!(fb.is_isoc_feedback());
        assert!(!fb.is_isoc_streaming());

        let int = Endpoint::new(0x83, 0x03, 6, 8);
        assert!(int.is_interrupt());
    }

    #[test]
    fn test_high_bandwidth_packet_size() {
        assert_eq!(high_bandwidth_packet_size(0x0400), 1024);
        // 2 additional transactions of 1024
        assert_eq!(high_bandwidth_packet_size(0x1400), 3072);
        assert_eq!(high_bandwidth_packet_size(0x0864), 200);
    }
}
