//! Defines for USB parsed device descriptors; extends the `usb` module.
//!
//! [`DescriptorCursor`] walks the flat, length-prefixed configuration descriptor one record at a time. Every record is
//! consumed by its own bLength, never by an assumed struct size, and the cursor refuses to hand out bytes past the
//! declared wTotalLength.
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

use crate::error::{self, Error, ErrorKind};
use crate::usb::*;

pub mod audio;

/// USB Descriptor Types found in an audio configuration descriptor
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum DescriptorType {
    Device = 0x01,
    Config = 0x02,
    String = 0x03,
    Interface = 0x04,
    Endpoint = 0x05,
    InterfaceAssociation = 0x0b,
    CsInterface = 0x24,
    CsEndpoint = 0x25,
    Unknown = 0xff,
}

impl From<u8> for DescriptorType {
    fn from(b: u8) -> Self {
        match b {
            0x01 => DescriptorType::Device,
            0x02 => DescriptorType::Config,
            0x03 => DescriptorType::String,
            0x04 => DescriptorType::Interface,
            0x05 => DescriptorType::Endpoint,
            0x0b => DescriptorType::InterfaceAssociation,
            0x24 => DescriptorType::CsInterface,
            0x25 => DescriptorType::CsEndpoint,
            _ => DescriptorType::Unknown,
        }
    }
}

/// The leading bytes common to every record: bLength, bDescriptorType and bDescriptorSubtype when present
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub struct DescriptorHeader {
    /// bLength
    pub length: u8,
    /// Raw bDescriptorType
    pub descriptor_type: u8,
    /// Third byte; only meaningful for class-specific records
    pub subtype: Option<u8>,
}

impl DescriptorHeader {
    /// Decoded [`DescriptorType`]
    pub fn kind(&self) -> DescriptorType {
        DescriptorType::from(self.descriptor_type)
    }

    /// Record is a standard interface descriptor or an IAD; either ends the class-specific block of an interface
    pub fn starts_interface(&self) -> bool {
        matches!(
            self.kind(),
            DescriptorType::Interface | DescriptorType::InterfaceAssociation
        )
    }
}

/// Bounds-checked sequential reader over a configuration descriptor
#[derive(Debug, Clone)]
pub struct DescriptorCursor<'a> {
    data: &'a [u8],
    offset: usize,
    total: usize,
}

impl<'a> DescriptorCursor<'a> {
    /// New cursor over `data` limited to `total` bytes; `total` is clamped to the buffer length
    pub fn new(data: &'a [u8], total: usize) -> Self {
        if total > data.len() {
            log::warn!(
                "Declared total length {} exceeds the {} bytes supplied; limiting to buffer",
                total,
                data.len()
            );
        }
        DescriptorCursor {
            data,
            offset: 0,
            total: total.min(data.len()),
        }
    }

    /// Bytes consumed so far
    pub fn consumed(&self) -> usize {
        self.offset
    }

    /// Declared total length the cursor is bound to
    pub fn total(&self) -> usize {
        self.total
    }

    /// Bytes left before the declared total
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.offset)
    }

    /// No further records can be read
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Header of the record at the cursor without consuming it
    ///
    /// A record of zero length is [`ErrorKind::Malformed`] since the walk could not progress past it
    pub fn peek_header(&self) -> error::Result<DescriptorHeader> {
        if self.remaining() < 2 {
            return Err(Error::new_truncated("header", 2, self.remaining()));
        }
        let length = self.data[self.offset];
        if length == 0 {
            return Err(Error::new(
                ErrorKind::Malformed,
                &format!("Zero length record at offset {}", self.offset),
            ));
        }
        let subtype = if length > 2 && self.remaining() > 2 {
            Some(self.data[self.offset + 2])
        } else {
            None
        };

        Ok(DescriptorHeader {
            length,
            descriptor_type: self.data[self.offset + 1],
            subtype,
        })
    }

    /// Consume `length` bytes and return them
    pub fn take_record(&mut self, length: usize) -> error::Result<&'a [u8]> {
        if length > self.remaining() {
            return Err(Error::new_truncated("record", length, self.remaining()));
        }
        let record = &self.data[self.offset..self.offset + length];
        self.offset += length;
        Ok(record)
    }

    /// Consume the next record by its own bLength
    pub fn take_next(&mut self) -> error::Result<&'a [u8]> {
        let header = self.peek_header()?;
        self.take_record(header.length as usize)
    }

    /// Skip `length` bytes; skipping past the declared total leaves the cursor exhausted and errors
    pub fn advance_by(&mut self, length: usize) -> error::Result<()> {
        if length > self.remaining() {
            let got = self.remaining();
            self.offset = self.total;
            return Err(Error::new_truncated("skipped block", length, got));
        }
        self.offset += length;
        Ok(())
    }

    /// Move to absolute `offset`, which must lie within the declared total
    pub fn skip_to(&mut self, offset: usize) -> error::Result<()> {
        if offset > self.total {
            return Err(Error::new(
                ErrorKind::InvalidArg,
                &format!("Offset {} beyond total length {}", offset, self.total),
            ));
        }
        self.offset = offset;
        Ok(())
    }

    /// Iterator style walk; `None` once exhausted, `Some(Err)` for a record that cannot be read
    pub fn next_record(&mut self) -> Option<error::Result<&'a [u8]>> {
        if self.is_exhausted() {
            None
        } else {
            Some(self.take_next())
        }
    }
}

/// Class-specific record body after bLength, bDescriptorType and bDescriptorSubtype; empty for short records
pub fn record_body(record: &[u8]) -> &[u8] {
    record.get(3..).unwrap_or(&[])
}

/// Bytes from a hex dump such as `09 02 0x64 00,01`; separators are whitespace or commas, `0x` prefixes optional
///
/// ```
/// use uac_topology::usb::descriptors::bytes_from_hex;
///
/// assert_eq!(bytes_from_hex("09 02\n0x64,00").unwrap(), vec![9, 2, 0x64, 0]);
/// assert!(bytes_from_hex("09 zz").is_err());
/// ```
pub fn bytes_from_hex(text: &str) -> error::Result<Vec<u8>> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| {
            let s = s
                .strip_prefix("0x")
                .or_else(|| s.strip_prefix("0X"))
                .unwrap_or(s);
            u8::from_str_radix(s, 16).map_err(|e| {
                Error::new(
                    ErrorKind::Parsing,
                    &format!("Invalid hex byte '{}': {}", s, e),
                )
            })
        })
        .collect()
}

/// Little-endian field reader over the body of a single record
///
/// Every read is bounds checked so a record whose declared counts disagree with its bLength yields an error instead
/// of reading into the next record.
#[derive(Debug, Clone)]
pub struct FieldReader<'a> {
    name: &'static str,
    data: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    /// Reader for the record `name` (used in errors) starting at byte 0 of `data`
    pub fn new(name: &'static str, data: &'a [u8]) -> Self {
        FieldReader { name, data, pos: 0 }
    }

    /// Current position
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes not yet read
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Read `n` bytes
    pub fn bytes(&mut self, n: usize) -> error::Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::new_truncated(self.name, self.pos + n, self.data.len()));
        }
        let b = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(b)
    }

    /// Read a u8
    pub fn u8(&mut self) -> error::Result<u8> {
        Ok(self.bytes(1)?[0])
    }

    /// Read a little-endian u16
    pub fn u16(&mut self) -> error::Result<u16> {
        let b = self.bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Read a little-endian 24 bit value such as tSamFreq
    pub fn u24(&mut self) -> error::Result<u32> {
        let b = self.bytes(3)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], 0]))
    }

    /// Read a little-endian u32
    pub fn u32(&mut self) -> error::Result<u32> {
        let b = self.bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a little-endian value of `width` 1 to 4 bytes into a u32
    pub fn uint(&mut self, width: usize) -> error::Result<u32> {
        match width {
            1 => self.u8().map(u32::from),
            2 => self.u16().map(u32::from),
            3 => self.u24(),
            4 => self.u32(),
            w => Err(Error::new(
                ErrorKind::Malformed,
                &format!("{} field width {} not supported", self.name, w),
            )),
        }
    }
}

/// Standard Configuration Descriptor; USB 2.0 9.6.3
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ConfigurationDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub total_length: u16,
    pub num_interfaces: u8,
    pub configuration_value: u8,
    pub configuration_index: u8,
    pub attributes: u8,
    pub max_power: u8,
}

impl TryFrom<&[u8]> for ConfigurationDescriptor {
    type Error = Error;

    fn try_from(value: &[u8]) -> error::Result<Self> {
        if value.len() < 9 {
            return Err(Error::new_truncated("Configuration", 9, value.len()));
        }
        if value[0] == 0 || value[1] != DescriptorType::Config as u8 {
            return Err(Error::new(
                ErrorKind::Malformed,
                "Buffer does not start with a Configuration descriptor",
            ));
        }

        Ok(ConfigurationDescriptor {
            length: value[0],
            descriptor_type: value[1],
            total_length: u16::from_le_bytes([value[2], value[3]]),
            num_interfaces: value[4],
            configuration_value: value[5],
            configuration_index: value[6],
            attributes: value[7],
            max_power: value[8],
        })
    }
}

/// Standard Interface Descriptor; USB 2.0 9.6.5
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct InterfaceDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub interface_number: u8,
    pub alternate_setting: u8,
    pub num_endpoints: u8,
    pub interface_class: u8,
    pub interface_sub_class: u8,
    pub interface_protocol: u8,
    pub interface_index: u8,
}

impl TryFrom<&[u8]> for InterfaceDescriptor {
    type Error = Error;

    fn try_from(value: &[u8]) -> error::Result<Self> {
        if value.len() < 9 {
            return Err(Error::new_truncated("Interface", 9, value.len()));
        }

        Ok(InterfaceDescriptor {
            length: value[0],
            descriptor_type: value[1],
            interface_number: value[2],
            alternate_setting: value[3],
            num_endpoints: value[4],
            interface_class: value[5],
            interface_sub_class: value[6],
            interface_protocol: value[7],
            interface_index: value[8],
        })
    }
}

impl InterfaceDescriptor {
    /// Interface class is Audio
    pub fn is_audio(&self) -> bool {
        self.interface_class == AUDIO_CLASS
    }

    /// Decoded audio subclass
    pub fn audio_subclass(&self) -> AudioSubclass {
        AudioSubclass::from(self.interface_sub_class)
    }
}

/// The Interface Association Descriptor is a specific type of USB descriptor used to associate a group of interfaces with a particular function or feature of a USB device
///
/// UAC2 AudioControl headers no longer list their streaming interfaces, the IAD grouping the function does.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct InterfaceAssociationDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub first_interface: u8,
    pub interface_count: u8,
    pub function_class: u8,
    pub function_sub_class: u8,
    pub function_protocol: u8,
    pub function_string_index: u8,
}

impl TryFrom<&[u8]> for InterfaceAssociationDescriptor {
    type Error = Error;

    fn try_from(value: &[u8]) -> error::Result<Self> {
        if value.len() < 8 {
            return Err(Error::new_truncated("Interface Association", 8, value.len()));
        }

        Ok(InterfaceAssociationDescriptor {
            length: value[0],
            descriptor_type: value[1],
            first_interface: value[2],
            interface_count: value[3],
            function_class: value[4],
            function_sub_class: value[5],
            function_protocol: value[6],
            function_string_index: value[7],
        })
    }
}

impl InterfaceAssociationDescriptor {
    /// Audio function using the UAC2 protocol
    pub fn is_uac2_function(&self) -> bool {
        self.function_class == AUDIO_CLASS
            && self.function_sub_class == AudioSubclass::Undefined as u8
            && self.function_protocol == audio::UacProtocol::Uac2 as u8
    }

    /// Interfaces following the first (the AudioControl) in the association
    pub fn stream_interfaces(&self) -> error::Result<Vec<u8>> {
        if self.interface_count == 0 {
            return Err(Error::new(
                ErrorKind::Malformed,
                "Interface Association with bInterfaceCount 0",
            ));
        }
        Ok((1..self.interface_count)
            .map(|i| self.first_interface.wrapping_add(i))
            .collect())
    }
}

/// Standard Endpoint Descriptor; USB 2.0 9.6.6 with the audio class bRefresh and bSynchAddress extension
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct EndpointDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub endpoint_address: u8,
    pub attributes: u8,
    pub max_packet_size: u16,
    pub interval: u8,
    pub refresh: Option<u8>,
    pub synch_address: Option<u8>,
}

impl TryFrom<&[u8]> for EndpointDescriptor {
    type Error = Error;

    fn try_from(value: &[u8]) -> error::Result<Self> {
        if value.len() < 7 {
            return Err(Error::new_truncated("Endpoint", 7, value.len()));
        }

        let (refresh, synch_address) = if value.len() >= 9 {
            (Some(value[7]), Some(value[8]))
        } else {
            (None, None)
        };

        Ok(EndpointDescriptor {
            length: value[0],
            descriptor_type: value[1],
            endpoint_address: value[2],
            attributes: value[3],
            max_packet_size: u16::from_le_bytes([value[4], value[5]]),
            interval: value[6],
            refresh,
            synch_address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_walks_by_length() {
        let data = [3, 0x24, 1, 4, 0x24, 2, 0xaa, 2, 0x05];
        let mut cursor = DescriptorCursor::new(&data, data.len());
        let h = cursor.peek_header().unwrap();
        assert_eq!(h.length, 3);
        assert_eq!(h.kind(), DescriptorType::CsInterface);
        assert_eq!(h.subtype, Some(1));
        assert_eq!(cursor.take_next().unwrap(), &[3, 0x24, 1]);
        assert_eq!(cursor.take_next().unwrap(), &[4, 0x24, 2, 0xaa]);
        let h = cursor.peek_header().unwrap();
        assert_eq!(h.subtype, None);
        assert!(cursor.next_record().unwrap().is_ok());
        assert!(cursor.next_record().is_none());
        assert_eq!(cursor.consumed(), cursor.total());
    }

    #[test]
    fn test_cursor_zero_length_malformed() {
        let data = [0, 0x24, 1];
        let cursor = DescriptorCursor::new(&data, data.len());
        assert_eq!(cursor.peek_header().unwrap_err().kind(), ErrorKind::Malformed);
    }

    #[test]
    fn test_cursor_record_past_total() {
        let data = [9, 0x24, 2, 0, 0];
        let mut cursor = DescriptorCursor::new(&data, data.len());
        let err = cursor.take_next().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Truncated(_)));
        // nothing consumed on failure
        assert_eq!(cursor.consumed(), 0);
    }

    #[test]
    fn test_cursor_total_limits_buffer() {
        let data = [3, 0x24, 1, 3, 0x24, 2];
        let mut cursor = DescriptorCursor::new(&data, 3);
        assert!(cursor.take_next().is_ok());
        assert!(cursor.is_exhausted());
        assert!(cursor.advance_by(3).is_err());
        assert_eq!(cursor.consumed(), 3);

        // total beyond buffer is clamped
        let cursor = DescriptorCursor::new(&data, 100);
        assert_eq!(cursor.total(), data.len());
    }

    #[test]
    fn test_field_reader() {
        let data = [0x01, 0x02, 0x03, 0x44, 0xac, 0x00, 0xff];
        let mut r = FieldReader::new("test", &data);
        assert_eq!(r.u8().unwrap(), 1);
        assert_eq!(r.u16().unwrap(), 0x0302);
        assert_eq!(r.u24().unwrap(), 44100);
        assert_eq!(r.remaining(), 1);
        assert!(matches!(r.u16().unwrap_err().kind(), ErrorKind::Truncated(_)));
        assert_eq!(r.uint(1).unwrap(), 0xff);
    }

    #[test]
    fn test_iad_stream_interfaces() {
        let iad = InterfaceAssociationDescriptor::try_from(&[8, 0x0b, 2, 3, 1, 0, 0x20, 0][..]).unwrap();
        assert!(iad.is_uac2_function());
        assert_eq!(iad.stream_interfaces().unwrap(), vec![3, 4]);

        let iad = InterfaceAssociationDescriptor::try_from(&[8, 0x0b, 2, 0, 1, 0, 0x20, 0][..]).unwrap();
        assert_eq!(iad.stream_interfaces().unwrap_err().kind(), ErrorKind::Malformed);
    }

    #[test]
    fn test_endpoint_descriptor_audio_extension() {
        let ep = EndpointDescriptor::try_from(&[9, 5, 0x01, 0x09, 0xc0, 0x00, 1, 0, 0x82][..]).unwrap();
        assert_eq!(ep.max_packet_size, 192);
        assert_eq!(ep.synch_address, Some(0x82));

        let ep = EndpointDescriptor::try_from(&[7, 5, 0x81, 0x03, 0x06, 0x00, 8][..]).unwrap();
        assert_eq!(ep.refresh, None);
    }
}
