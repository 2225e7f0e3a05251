//! Defines for the USB Audio Class (UAC) class-specific descriptors
//!
//! AudioControl records decode into a [`Unit`], one variant per entity kind. UAC1 and UAC2 differ mostly in field
//! widths and a few extra fields, which the [`ProtocolProfile`] captures so that each unit has a single parser.
use heck::{AsShoutySnakeCase, AsTitleCase};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::convert::TryFrom;
use std::fmt;
use strum_macros::EnumIter;

use super::FieldReader;
use crate::error::{self, Error, ErrorKind};
use crate::usb::Version;

/// bDescriptorSubtype of the class-specific isochronous endpoint descriptor
pub const EP_GENERAL: u8 = 0x01;

/// Audio data format tags; UAC1 wFormatTag and the pseudo tags derived from UAC2 bmFormats
#[allow(missing_docs)]
pub mod format_tag {
    pub const TYPE_I_UNDEFINED: u16 = 0x0000;
    pub const PCM: u16 = 0x0001;
    pub const PCM8: u16 = 0x0002;
    pub const IEEE_FLOAT: u16 = 0x0003;
    pub const ALAW: u16 = 0x0004;
    pub const MULAW: u16 = 0x0005;
    pub const TYPE_II_UNDEFINED: u16 = 0x1000;
    pub const MPEG: u16 = 0x1001;
    pub const AC3: u16 = 0x1002;
    pub const TYPE_III_UNDEFINED: u16 = 0x2000;
    pub const IEC1937_AC3: u16 = 0x2001;
    pub const IEC1937_MPEG1_LAYER1: u16 = 0x2002;
    pub const IEC1937_MPEG1_LAYER2_3: u16 = 0x2003;
    pub const IEC1937_MPEG2_EXT: u16 = 0x2004;
    pub const IEC1937_MPEG2_LAYER1_LS: u16 = 0x2005;
    pub const IEC1937_MPEG2_LAYER2_3_LS: u16 = 0x2006;

    /// Tag identifies a real format rather than one of the undefined placeholders
    pub fn is_defined(tag: u16) -> bool {
        tag & 0x0fff != 0
    }
}

/// USB Audio Class (UAC) protocol byte defines the version of the UAC
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum UacProtocol {
    Uac1 = 0x00,
    Uac2 = 0x20,
    Uac3 = 0x30,
    Unknown = 0xff,
}

impl From<u8> for UacProtocol {
    fn from(b: u8) -> Self {
        match b {
            0x00 => UacProtocol::Uac1,
            0x20 => UacProtocol::Uac2,
            0x30 => UacProtocol::Uac3,
            _ => UacProtocol::Unknown,
        }
    }
}

impl fmt::Display for UacProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UacProtocol::Uac1 => write!(f, "UAC1"),
            UacProtocol::Uac2 => write!(f, "UAC2"),
            UacProtocol::Uac3 => write!(f, "UAC3"),
            UacProtocol::Unknown => write!(f, "Unknown"),
        }
    }
}

impl UacProtocol {
    /// The [`ProtocolProfile`] to decode descriptors of this version
    pub fn profile(&self) -> error::Result<&'static ProtocolProfile> {
        match self {
            UacProtocol::Uac1 => Ok(&UAC1_PROFILE),
            UacProtocol::Uac2 => Ok(&UAC2_PROFILE),
            p => Err(Error::new(
                ErrorKind::Unsupported,
                &format!("{} AudioControl interfaces are not supported", p),
            )),
        }
    }
}

/// UAC bmControl can be 1 bit for just the control type or 2 bits for control type and whether it's read-only
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum ControlType {
    BmControl1,
    BmControl2,
}

impl ControlType {
    /// Control at `index` in the bitmap is present; for [`ControlType::BmControl2`] this requires both bits (host programmable)
    pub fn is_set(&self, controls: u32, index: usize) -> bool {
        match self {
            ControlType::BmControl1 => index < 32 && (controls >> index) & 0x1 != 0,
            ControlType::BmControl2 => index < 16 && (controls >> (index * 2)) & 0x3 == 0x3,
        }
    }
}

/// The control setting for a UAC bmControls bit pair
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum ControlSetting {
    ReadOnly = 0b01,
    IllegalValue = 0b10,
    ReadWrite = 0b11,
}

impl From<u8> for ControlSetting {
    fn from(b: u8) -> Self {
        match b {
            0b01 => ControlSetting::ReadOnly,
            0b11 => ControlSetting::ReadWrite,
            _ => ControlSetting::IllegalValue,
        }
    }
}

impl fmt::Display for ControlSetting {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ControlSetting::ReadOnly => write!(f, "read-only"),
            ControlSetting::IllegalValue => write!(f, "ILLEGAL VALUE (0b10)"),
            ControlSetting::ReadWrite => write!(f, "read/write"),
        }
    }
}

/// Field widths and optional fields which differ between UAC1 and UAC2 AudioControl descriptors
///
/// Selected once per control interface from the interface protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolProfile {
    /// Protocol described
    pub protocol: UacProtocol,
    /// Offset of wTotalLength within the class-specific AC header record
    pub header_total_length_offset: usize,
    /// Width of wChannelConfig/bmChannelConfig in a channel cluster
    pub channel_config_width: usize,
    /// Terminals carry bCSourceID and clock entities and effect units exist
    pub clock_entities: bool,
    /// Terminals carry a 16 bit bmControls
    pub terminal_controls: bool,
    /// Mixer and selector units end with a bmControls byte before the string index
    pub unit_controls: bool,
    /// Fixed width of feature unit bmaControls; `None` reads bControlSize
    pub feature_control_width: Option<usize>,
    /// Fixed width of processing unit bmControls; `None` reads bControlSize
    pub processing_control_width: Option<usize>,
    /// Fixed width of extension unit bmControls; `None` reads bControlSize
    pub extension_control_width: Option<usize>,
    /// How feature and clock bitmaps are laid out
    pub control_type: ControlType,
}

/// UAC 1.0
pub const UAC1_PROFILE: ProtocolProfile = ProtocolProfile {
    protocol: UacProtocol::Uac1,
    header_total_length_offset: 5,
    channel_config_width: 2,
    clock_entities: false,
    terminal_controls: false,
    unit_controls: false,
    feature_control_width: None,
    processing_control_width: None,
    extension_control_width: None,
    control_type: ControlType::BmControl1,
};

/// UAC 2.0
pub const UAC2_PROFILE: ProtocolProfile = ProtocolProfile {
    protocol: UacProtocol::Uac2,
    header_total_length_offset: 6,
    channel_config_width: 4,
    clock_entities: true,
    terminal_controls: true,
    unit_controls: true,
    feature_control_width: Some(4),
    processing_control_width: Some(2),
    extension_control_width: Some(1),
    control_type: ControlType::BmControl2,
};

impl ProtocolProfile {
    /// Read bNrChannels, the channel config bitmap and iChannelNames
    fn read_cluster(&self, r: &mut FieldReader) -> error::Result<AudioCluster> {
        Ok(AudioCluster {
            nr_channels: r.u8()?,
            channel_config: r.uint(self.channel_config_width)?,
            channel_names_index: r.u8()?,
        })
    }

    /// Fixed control width or bControlSize read from the record
    fn read_control_size(&self, r: &mut FieldReader, fixed: Option<usize>) -> error::Result<usize> {
        match fixed {
            Some(w) => Ok(w),
            None => r.u8().map(usize::from),
        }
    }

    /// wTotalLength of the class-specific block from a complete AC header record
    pub fn header_total_length(&self, record: &[u8]) -> error::Result<u16> {
        let o = self.header_total_length_offset;
        if record.len() < o + 2 {
            return Err(Error::new_truncated("AudioControl Header", o + 2, record.len()));
        }
        Ok(u16::from_le_bytes([record[o], record[o + 1]]))
    }
}

/// USB Audio Class (UAC) interface Audio Control (AC) types based on bDescriptorSubtype
///
/// Variant order is the order in which unit registries are probed by ID.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize, EnumIter)]
#[allow(missing_docs)]
pub enum UacAcInterface {
    Undefined,
    Header,
    InputTerminal,
    OutputTerminal,
    MixerUnit,
    SelectorUnit,
    FeatureUnit,
    EffectUnit,
    ProcessingUnit,
    ExtensionUnit,
    ClockSource,
    ClockSelector,
    ClockMultiplier,
    SampleRateConverter,
}

impl fmt::Display for UacAcInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = format!("{:?}", self);
        if f.alternate() {
            // uppercase with _ instead of space for lsusb dump
            write!(f, "{}", AsShoutySnakeCase(name))
        } else {
            write!(f, "{}", AsTitleCase(name))
        }
    }
}

impl UacAcInterface {
    /// UAC1 and UAC2 define bDescriptorSubtype differently for the AudioControl interface, so we need to do some ugly remapping
    pub fn get_uac_subtype(subtype: u8, protocol: UacProtocol) -> Self {
        match (protocol, subtype) {
            (_, 0x01) => UacAcInterface::Header,
            (_, 0x02) => UacAcInterface::InputTerminal,
            (_, 0x03) => UacAcInterface::OutputTerminal,
            (_, 0x04) => UacAcInterface::MixerUnit,
            (_, 0x05) => UacAcInterface::SelectorUnit,
            (_, 0x06) => UacAcInterface::FeatureUnit,
            (UacProtocol::Uac1, 0x07) => UacAcInterface::ProcessingUnit,
            (UacProtocol::Uac1, 0x08) => UacAcInterface::ExtensionUnit,
            (UacProtocol::Uac2, 0x07) => UacAcInterface::EffectUnit,
            (UacProtocol::Uac2, 0x08) => UacAcInterface::ProcessingUnit,
            (UacProtocol::Uac2, 0x09) => UacAcInterface::ExtensionUnit,
            (UacProtocol::Uac2, 0x0a) => UacAcInterface::ClockSource,
            (UacProtocol::Uac2, 0x0b) => UacAcInterface::ClockSelector,
            (UacProtocol::Uac2, 0x0c) => UacAcInterface::ClockMultiplier,
            (UacProtocol::Uac2, 0x0d) => UacAcInterface::SampleRateConverter,
            _ => UacAcInterface::Undefined,
        }
    }

    /// Inverse of [`UacAcInterface::get_uac_subtype`]; `None` when the kind does not exist in `protocol`
    pub fn to_subtype(&self, protocol: UacProtocol) -> Option<u8> {
        let subtype = match (self, protocol) {
            (UacAcInterface::Header, _) => 0x01,
            (UacAcInterface::InputTerminal, _) => 0x02,
            (UacAcInterface::OutputTerminal, _) => 0x03,
            (UacAcInterface::MixerUnit, _) => 0x04,
            (UacAcInterface::SelectorUnit, _) => 0x05,
            (UacAcInterface::FeatureUnit, _) => 0x06,
            (UacAcInterface::ProcessingUnit, UacProtocol::Uac1) => 0x07,
            (UacAcInterface::ExtensionUnit, UacProtocol::Uac1) => 0x08,
            (UacAcInterface::EffectUnit, UacProtocol::Uac2) => 0x07,
            (UacAcInterface::ProcessingUnit, UacProtocol::Uac2) => 0x08,
            (UacAcInterface::ExtensionUnit, UacProtocol::Uac2) => 0x09,
            (UacAcInterface::ClockSource, UacProtocol::Uac2) => 0x0a,
            (UacAcInterface::ClockSelector, UacProtocol::Uac2) => 0x0b,
            (UacAcInterface::ClockMultiplier, UacProtocol::Uac2) => 0x0c,
            (UacAcInterface::SampleRateConverter, UacProtocol::Uac2) => 0x0d,
            _ => return None,
        };
        Some(subtype)
    }

    /// Subtype decodes to a [`Unit`]
    pub fn is_unit(&self) -> bool {
        !matches!(
            self,
            UacAcInterface::Undefined | UacAcInterface::Header | UacAcInterface::SampleRateConverter
        )
    }
}

/// USB Audio Class (UAC) interface Audio Streaming (AS) types based on bDescriptorSubtype
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum UacAsInterface {
    Undefined,
    General,
    FormatType,
    FormatSpecific,
    Encoder,
    Decoder,
}

impl UacAsInterface {
    /// Subtype 3 is FORMAT_SPECIFIC in UAC1 but ENCODER in UAC2
    pub fn get_uac_subtype(subtype: u8, protocol: UacProtocol) -> Self {
        match (protocol, subtype) {
            (_, 0x01) => UacAsInterface::General,
            (_, 0x02) => UacAsInterface::FormatType,
            (UacProtocol::Uac1, 0x03) => UacAsInterface::FormatSpecific,
            (UacProtocol::Uac2, 0x03) => UacAsInterface::Encoder,
            (UacProtocol::Uac2, 0x04) => UacAsInterface::Decoder,
            _ => UacAsInterface::Undefined,
        }
    }
}

impl fmt::Display for UacAsInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self, f.alternate()) {
            (UacAsInterface::General, true) => write!(f, "AS_GENERAL"),
            (s, true) => write!(f, "{}", AsShoutySnakeCase(format!("{:?}", s))),
            (s, false) => write!(f, "{}", AsTitleCase(format!("{:?}", s))),
        }
    }
}

/// bFormatType of the FORMAT_TYPE descriptor
#[derive(Debug, Copy, Clone, Default, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum FormatType {
    #[default]
    Undefined,
    TypeI,
    TypeII,
    TypeIII,
    TypeIV,
    Unknown,
}

impl From<u8> for FormatType {
    fn from(b: u8) -> Self {
        match b {
            0x00 => FormatType::Undefined,
            0x01 => FormatType::TypeI,
            0x02 => FormatType::TypeII,
            0x03 => FormatType::TypeIII,
            0x04 => FormatType::TypeIV,
            _ => FormatType::Unknown,
        }
    }
}

impl fmt::Display for FormatType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FormatType::Undefined => write!(f, "Undefined"),
            FormatType::TypeI => write!(f, "Type I"),
            FormatType::TypeII => write!(f, "Type II"),
            FormatType::TypeIII => write!(f, "Type III"),
            FormatType::TypeIV => write!(f, "Type IV"),
            FormatType::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Clock source type from bits 0..1 of the UAC2 clock source bmAttributes
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum ClockType {
    External,
    InternalFixed,
    InternalVariable,
    InternalProgrammable,
}

impl From<u8> for ClockType {
    fn from(b: u8) -> Self {
        match b & 0x03 {
            0 => ClockType::External,
            1 => ClockType::InternalFixed,
            2 => ClockType::InternalVariable,
            _ => ClockType::InternalProgrammable,
        }
    }
}

impl fmt::Display for ClockType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ClockType::External => write!(f, "External"),
            ClockType::InternalFixed => write!(f, "Internal fixed"),
            ClockType::InternalVariable => write!(f, "Internal variable"),
            ClockType::InternalProgrammable => write!(f, "Internal programmable"),
        }
    }
}

#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum LockDelayUnits {
    Undefined,
    Milliseconds,
    DecodedPcmSamples,
}

impl From<u8> for LockDelayUnits {
    fn from(b: u8) -> Self {
        match b {
            1 => LockDelayUnits::Milliseconds,
            2 => LockDelayUnits::DecodedPcmSamples,
            _ => LockDelayUnits::Undefined,
        }
    }
}

impl fmt::Display for LockDelayUnits {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LockDelayUnits::Undefined => write!(f, "Undefined"),
            LockDelayUnits::Milliseconds => write!(f, "Milliseconds"),
            LockDelayUnits::DecodedPcmSamples => write!(f, "Decoded PCM samples"),
        }
    }
}

/// Logical channel cluster: channel count, spatial location bitmap and first channel name string
#[derive(Debug, Clone, Default, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioCluster {
    /// bNrChannels
    pub nr_channels: u8,
    /// wChannelConfig (UAC1) or bmChannelConfig (UAC2)
    pub channel_config: u32,
    /// iChannelNames
    pub channel_names_index: u8,
}

/// UAC1: 4.3.2 Table 4-2; UAC2: 4.7.2 Table 4-5. Class-Specific AC Interface Header.
#[skip_serializing_none]
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct AudioHeader {
    pub version: Version,
    pub category: Option<u8>,
    pub total_length: u16,
    pub controls: Option<u8>,
    /// baInterfaceNr; UAC1 only
    pub interfaces: Vec<u8>,
}

impl AudioHeader {
    /// Decode the record body following bLength, bDescriptorType and bDescriptorSubtype
    pub fn parse(body: &[u8], profile: &ProtocolProfile) -> error::Result<Self> {
        let mut r = FieldReader::new("AudioControl Header", body);
        let version = Version::from_bcd(r.u16()?);

        if profile.protocol == UacProtocol::Uac2 {
            let category = r.u8()?;
            let total_length = r.u16()?;
            let controls = r.u8()?;
            return Ok(AudioHeader {
                version,
                category: Some(category),
                total_length,
                controls: Some(controls),
                interfaces: Vec::new(),
            });
        }

        let total_length = r.u16()?;
        let in_collection = r.u8()? as usize;
        if in_collection > r.remaining() {
            log::warn!(
                "Header declares {} interfaces in collection but only {} bytes remain",
                in_collection,
                r.remaining()
            );
        }
        let interfaces = r.bytes(in_collection.min(r.remaining()))?.to_vec();

        Ok(AudioHeader {
            version,
            category: None,
            total_length,
            controls: None,
            interfaces,
        })
    }
}

/// UAC1: 4.3.2.1 Table 4-3; UAC2: 4.7.2.4 Table 4-9. Input Terminal Descriptor.
#[skip_serializing_none]
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct InputTerminal {
    pub terminal_id: u8,
    pub terminal_type: u16,
    pub assoc_terminal: u8,
    pub clock_source_id: Option<u8>,
    pub cluster: AudioCluster,
    pub controls: Option<u16>,
    pub terminal_index: u8,
}

impl InputTerminal {
    fn parse(body: &[u8], profile: &ProtocolProfile) -> error::Result<Self> {
        let mut r = FieldReader::new("Input Terminal", body);
        let terminal_id = r.u8()?;
        let terminal_type = r.u16()?;
        let assoc_terminal = r.u8()?;
        let clock_source_id = if profile.clock_entities {
            Some(r.u8()?)
        } else {
            None
        };
        let cluster = profile.read_cluster(&mut r)?;
        let controls = if profile.terminal_controls {
            Some(r.u16()?)
        } else {
            None
        };

        Ok(InputTerminal {
            terminal_id,
            terminal_type,
            assoc_terminal,
            clock_source_id,
            cluster,
            controls,
            terminal_index: r.u8()?,
        })
    }
}

/// UAC1: 4.3.2.2 Table 4-4; UAC2: 4.7.2.5 Table 4-10. Output Terminal Descriptor.
#[skip_serializing_none]
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct OutputTerminal {
    pub terminal_id: u8,
    pub terminal_type: u16,
    pub assoc_terminal: u8,
    pub source_id: u8,
    pub clock_source_id: Option<u8>,
    pub controls: Option<u16>,
    pub terminal_index: u8,
}

impl OutputTerminal {
    fn parse(body: &[u8], profile: &ProtocolProfile) -> error::Result<Self> {
        let mut r = FieldReader::new("Output Terminal", body);
        let terminal_id = r.u8()?;
        let terminal_type = r.u16()?;
        let assoc_terminal = r.u8()?;
        let source_id = r.u8()?;
        let clock_source_id = if profile.clock_entities {
            Some(r.u8()?)
        } else {
            None
        };
        let controls = if profile.terminal_controls {
            Some(r.u16()?)
        } else {
            None
        };

        Ok(OutputTerminal {
            terminal_id,
            terminal_type,
            assoc_terminal,
            source_id,
            clock_source_id,
            controls,
            terminal_index: r.u8()?,
        })
    }
}

/// UAC1: 4.3.2.3 Table 4-5; UAC2: 4.7.2.6 Table 4-11. Mixer Unit Descriptor.
#[skip_serializing_none]
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct MixerUnit {
    pub unit_id: u8,
    pub source_ids: Vec<u8>,
    pub cluster: AudioCluster,
    /// bmControls (UAC1) or bmMixerControls (UAC2) programmable mixing bitmap
    pub mixer_controls: Vec<u8>,
    pub controls: Option<u8>,
    pub mixer_index: u8,
}

impl MixerUnit {
    fn parse(body: &[u8], profile: &ProtocolProfile) -> error::Result<Self> {
        let mut r = FieldReader::new("Mixer Unit", body);
        let unit_id = r.u8()?;
        let nr_in_pins = r.u8()? as usize;
        let source_ids = r.bytes(nr_in_pins)?.to_vec();
        let cluster = profile.read_cluster(&mut r)?;
        let trailing = if profile.unit_controls { 2 } else { 1 };
        if r.remaining() < trailing {
            return Err(Error::new_truncated(
                "Mixer Unit",
                body.len() + trailing - r.remaining(),
                body.len(),
            ));
        }
        let mixer_controls = r.bytes(r.remaining() - trailing)?.to_vec();
        let controls = if profile.unit_controls {
            Some(r.u8()?)
        } else {
            None
        };

        Ok(MixerUnit {
            unit_id,
            source_ids,
            cluster,
            mixer_controls,
            controls,
            mixer_index: r.u8()?,
        })
    }
}

/// UAC1: 4.3.2.4 Table 4-6; UAC2: 4.7.2.7 Table 4-12. Selector Unit Descriptor.
#[skip_serializing_none]
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct SelectorUnit {
    pub unit_id: u8,
    pub source_ids: Vec<u8>,
    pub controls: Option<u8>,
    pub selector_index: u8,
}

impl SelectorUnit {
    fn parse(body: &[u8], profile: &ProtocolProfile) -> error::Result<Self> {
        let mut r = FieldReader::new("Selector Unit", body);
        let unit_id = r.u8()?;
        let nr_in_pins = r.u8()? as usize;
        let source_ids = r.bytes(nr_in_pins)?.to_vec();
        let controls = if profile.unit_controls {
            Some(r.u8()?)
        } else {
            None
        };

        Ok(SelectorUnit {
            unit_id,
            source_ids,
            controls,
            selector_index: r.u8()?,
        })
    }
}

/// UAC1: 4.3.2.5 Table 4-7; UAC2: 4.7.2.8 Table 4-13. Feature Unit Descriptor.
///
/// `controls[0]` is the master channel, `controls[n]` logical channel n.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct FeatureUnit {
    pub unit_id: u8,
    pub source_id: u8,
    pub control_size: u8,
    pub control_type: ControlType,
    pub controls: Vec<u32>,
    pub feature_index: u8,
}

/// Bit positions within a feature unit bmaControls entry
const FEATURE_MUTE: usize = 0;
const FEATURE_VOLUME: usize = 1;

impl FeatureUnit {
    fn parse(body: &[u8], profile: &ProtocolProfile) -> error::Result<Self> {
        let mut r = FieldReader::new("Feature Unit", body);
        let unit_id = r.u8()?;
        let source_id = r.u8()?;
        let control_size = profile.read_control_size(&mut r, profile.feature_control_width)?;
        if control_size == 0 {
            return Err(Error::new(
                ErrorKind::Malformed,
                &format!("Feature Unit {} has bControlSize 0", unit_id),
            ));
        }
        // last byte is iFeature
        if r.remaining() < 1 {
            return Err(Error::new_truncated("Feature Unit", body.len() + 1, body.len()));
        }
        let num_controls = (r.remaining() - 1) / control_size;
        let controls = (0..num_controls)
            .map(|_| r.uint(control_size))
            .collect::<error::Result<Vec<u32>>>()?;

        Ok(FeatureUnit {
            unit_id,
            source_id,
            control_size: control_size as u8,
            control_type: profile.control_type,
            controls,
            feature_index: body[body.len() - 1],
        })
    }

    /// Number of bmaControls entries; master plus logical channels
    pub fn num_controls(&self) -> usize {
        self.controls.len()
    }

    fn channel_has(&self, channel: u8, control: usize) -> bool {
        self.controls
            .get(channel as usize)
            .map(|c| self.control_type.is_set(*c, control))
            .unwrap_or(false)
    }

    /// Channel (0 master) has a mute control; false for channels beyond the declared controls
    pub fn channel_has_mute(&self, channel: u8) -> bool {
        self.channel_has(channel, FEATURE_MUTE)
    }

    /// Channel (0 master) has a volume control; false for channels beyond the declared controls
    pub fn channel_has_volume(&self, channel: u8) -> bool {
        self.channel_has(channel, FEATURE_VOLUME)
    }
}

/// UAC2: 4.7.2.10 Table 4-15. Effect Unit Descriptor.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct EffectUnit {
    pub unit_id: u8,
    pub effect_type: u16,
    pub source_id: u8,
    pub controls: Vec<u32>,
    pub effect_index: u8,
}

impl EffectUnit {
    fn parse(body: &[u8]) -> error::Result<Self> {
        let mut r = FieldReader::new("Effect Unit", body);
        let unit_id = r.u8()?;
        let effect_type = r.u16()?;
        let source_id = r.u8()?;
        if r.remaining() < 1 {
            return Err(Error::new_truncated("Effect Unit", body.len() + 1, body.len()));
        }
        let controls = (0..(r.remaining() - 1) / 4)
            .map(|_| r.u32())
            .collect::<error::Result<Vec<u32>>>()?;

        Ok(EffectUnit {
            unit_id,
            effect_type,
            source_id,
            controls,
            effect_index: body[body.len() - 1],
        })
    }
}

/// UAC1: 4.3.2.6 Table 4-8; UAC2: 4.7.2.11 Table 4-20. Processing Unit Descriptor.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ProcessingUnit {
    pub unit_id: u8,
    pub process_type: u16,
    pub source_ids: Vec<u8>,
    pub cluster: AudioCluster,
    pub control_size: u8,
    pub controls: Vec<u8>,
    pub processing_index: u8,
}

impl ProcessingUnit {
    fn parse(body: &[u8], profile: &ProtocolProfile) -> error::Result<Self> {
        let mut r = FieldReader::new("Processing Unit", body);
        let unit_id = r.u8()?;
        let process_type = r.u16()?;
        let nr_in_pins = r.u8()? as usize;
        let source_ids = r.bytes(nr_in_pins)?.to_vec();
        let cluster = profile.read_cluster(&mut r)?;
        let control_size = profile.read_control_size(&mut r, profile.processing_control_width)?;
        let controls = r.bytes(control_size)?.to_vec();

        Ok(ProcessingUnit {
            unit_id,
            process_type,
            source_ids,
            cluster,
            control_size: control_size as u8,
            controls,
            processing_index: r.u8()?,
        })
    }
}

/// UAC1: 4.3.2.7 Table 4-15; UAC2: 4.7.2.12 Table 4-24. Extension Unit Descriptor.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ExtensionUnit {
    pub unit_id: u8,
    pub extension_code: u16,
    pub source_ids: Vec<u8>,
    pub cluster: AudioCluster,
    pub control_size: u8,
    pub controls: Vec<u8>,
    pub extension_index: u8,
}

impl ExtensionUnit {
    fn parse(body: &[u8], profile: &ProtocolProfile) -> error::Result<Self> {
        let mut r = FieldReader::new("Extension Unit", body);
        let unit_id = r.u8()?;
        let extension_code = r.u16()?;
        let nr_in_pins = r.u8()? as usize;
        let source_ids = r.bytes(nr_in_pins)?.to_vec();
        let cluster = profile.read_cluster(&mut r)?;
        let control_size = profile.read_control_size(&mut r, profile.extension_control_width)?;
        let controls = r.bytes(control_size)?.to_vec();

        Ok(ExtensionUnit {
            unit_id,
            extension_code,
            source_ids,
            cluster,
            control_size: control_size as u8,
            controls,
            extension_index: r.u8()?,
        })
    }
}

/// UAC2: 4.7.2.1 Clock Source Descriptor; Table 4-6.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ClockSource {
    pub clock_id: u8,
    pub attributes: u8,
    pub controls: u8,
    pub assoc_terminal: u8,
    pub clock_source_index: u8,
}

/// Control indices in the clock source bmControls
const CLOCK_FREQUENCY: usize = 0;

impl ClockSource {
    fn parse(body: &[u8]) -> error::Result<Self> {
        if body.len() < 5 {
            return Err(Error::new_truncated("Clock Source", 5, body.len()));
        }

        Ok(ClockSource {
            clock_id: body[0],
            attributes: body[1],
            controls: body[2],
            assoc_terminal: body[3],
            clock_source_index: body[4],
        })
    }

    /// Clock type from bmAttributes
    pub fn clock_type(&self) -> ClockType {
        ClockType::from(self.attributes)
    }

    /// Internal clock is synchronised to SOF
    pub fn is_synced_to_sof(&self) -> bool {
        self.attributes & 0x04 != 0
    }

    /// Frequency control present (bit 0), and programmable (bit 1) when `want_programmable`
    pub fn has_frequency_control(&self, want_programmable: bool) -> bool {
        let present = self.controls & 0x01 != 0;
        if want_programmable {
            ControlType::BmControl2.is_set(self.controls as u32, CLOCK_FREQUENCY)
        } else {
            present
        }
    }

    /// Clock validity control present
    pub fn has_validity_control(&self) -> bool {
        self.controls & 0x04 != 0
    }
}

/// UAC2: 4.7.2.2 Clock Selector Descriptor; Table 4-7.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ClockSelector {
    pub clock_id: u8,
    pub csource_ids: Vec<u8>,
    pub controls: u8,
    pub clock_selector_index: u8,
}

impl ClockSelector {
    fn parse(body: &[u8]) -> error::Result<Self> {
        let mut r = FieldReader::new("Clock Selector", body);
        let clock_id = r.u8()?;
        let nr_in_pins = r.u8()? as usize;
        let csource_ids = r.bytes(nr_in_pins)?.to_vec();

        Ok(ClockSelector {
            clock_id,
            csource_ids,
            controls: r.u8()?,
            clock_selector_index: r.u8()?,
        })
    }
}

/// UAC2: 4.7.2.3 Clock Multiplier Descriptor; Table 4-8.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ClockMultiplier {
    pub clock_id: u8,
    pub csource_id: u8,
    pub controls: u8,
    pub clock_multiplier_index: u8,
}

impl ClockMultiplier {
    fn parse(body: &[u8]) -> error::Result<Self> {
        if body.len() < 4 {
            return Err(Error::new_truncated("Clock Multiplier", 4, body.len()));
        }

        Ok(ClockMultiplier {
            clock_id: body[0],
            csource_id: body[1],
            controls: body[2],
            clock_multiplier_index: body[3],
        })
    }
}

/// An entity of the AudioControl graph; IDs are unique across kinds within one control interface
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum Unit {
    InputTerminal(InputTerminal),
    OutputTerminal(OutputTerminal),
    Mixer(MixerUnit),
    Selector(SelectorUnit),
    Feature(FeatureUnit),
    Effect(EffectUnit),
    Processing(ProcessingUnit),
    Extension(ExtensionUnit),
    ClockSource(ClockSource),
    ClockSelector(ClockSelector),
    ClockMultiplier(ClockMultiplier),
}

impl Unit {
    /// Decode a class-specific AC record body of `kind`
    ///
    /// Returns `None` for subtypes that are not graph entities such as the header
    pub fn parse(
        kind: UacAcInterface,
        body: &[u8],
        profile: &ProtocolProfile,
    ) -> error::Result<Option<Unit>> {
        let unit = match kind {
            UacAcInterface::InputTerminal => Unit::InputTerminal(InputTerminal::parse(body, profile)?),
            UacAcInterface::OutputTerminal => {
                Unit::OutputTerminal(OutputTerminal::parse(body, profile)?)
            }
            UacAcInterface::MixerUnit => Unit::Mixer(MixerUnit::parse(body, profile)?),
            UacAcInterface::SelectorUnit => Unit::Selector(SelectorUnit::parse(body, profile)?),
            UacAcInterface::FeatureUnit => Unit::Feature(FeatureUnit::parse(body, profile)?),
            UacAcInterface::ProcessingUnit => {
                Unit::Processing(ProcessingUnit::parse(body, profile)?)
            }
            UacAcInterface::ExtensionUnit => Unit::Extension(ExtensionUnit::parse(body, profile)?),
            UacAcInterface::EffectUnit if profile.clock_entities => {
                Unit::Effect(EffectUnit::parse(body)?)
            }
            UacAcInterface::ClockSource if profile.clock_entities => {
                Unit::ClockSource(ClockSource::parse(body)?)
            }
            UacAcInterface::ClockSelector if profile.clock_entities => {
                Unit::ClockSelector(ClockSelector::parse(body)?)
            }
            UacAcInterface::ClockMultiplier if profile.clock_entities => {
                Unit::ClockMultiplier(ClockMultiplier::parse(body)?)
            }
            _ => return Ok(None),
        };

        Ok(Some(unit))
    }

    /// Unit or terminal ID
    pub fn id(&self) -> u8 {
        match self {
            Unit::InputTerminal(u) => u.terminal_id,
            Unit::OutputTerminal(u) => u.terminal_id,
            Unit::Mixer(u) => u.unit_id,
            Unit::Selector(u) => u.unit_id,
            Unit::Feature(u) => u.unit_id,
            Unit::Effect(u) => u.unit_id,
            Unit::Processing(u) => u.unit_id,
            Unit::Extension(u) => u.unit_id,
            Unit::ClockSource(u) => u.clock_id,
            Unit::ClockSelector(u) => u.clock_id,
            Unit::ClockMultiplier(u) => u.clock_id,
        }
    }

    /// The descriptor kind
    pub fn kind(&self) -> UacAcInterface {
        match self {
            Unit::InputTerminal(_) => UacAcInterface::InputTerminal,
            Unit::OutputTerminal(_) => UacAcInterface::OutputTerminal,
            Unit::Mixer(_) => UacAcInterface::MixerUnit,
            Unit::Selector(_) => UacAcInterface::SelectorUnit,
            Unit::Feature(_) => UacAcInterface::FeatureUnit,
            Unit::Effect(_) => UacAcInterface::EffectUnit,
            Unit::Processing(_) => UacAcInterface::ProcessingUnit,
            Unit::Extension(_) => UacAcInterface::ExtensionUnit,
            Unit::ClockSource(_) => UacAcInterface::ClockSource,
            Unit::ClockSelector(_) => UacAcInterface::ClockSelector,
            Unit::ClockMultiplier(_) => UacAcInterface::ClockMultiplier,
        }
    }

    /// Upstream IDs of multi-input units: mixer, selector, processing, extension and clock selector
    pub fn source_ids(&self) -> Option<&[u8]> {
        match self {
            Unit::Mixer(u) => Some(&u.source_ids),
            Unit::Selector(u) => Some(&u.source_ids),
            Unit::Processing(u) => Some(&u.source_ids),
            Unit::Extension(u) => Some(&u.source_ids),
            Unit::ClockSelector(u) => Some(&u.csource_ids),
            _ => None,
        }
    }

    /// Upstream ID of single-input units: feature, effect, output terminal and clock multiplier
    pub fn source_id(&self) -> Option<u8> {
        match self {
            Unit::Feature(u) => Some(u.source_id),
            Unit::Effect(u) => Some(u.source_id),
            Unit::OutputTerminal(u) => Some(u.source_id),
            Unit::ClockMultiplier(u) => Some(u.csource_id),
            _ => None,
        }
    }

    /// Number of upstream connections
    pub fn num_sources(&self) -> usize {
        match self.source_ids() {
            Some(ids) => ids.len(),
            None => self.source_id().map(|_| 1).unwrap_or(0),
        }
    }

    /// Clock entity the unit derives its timing from
    pub fn clock_source_id(&self) -> Option<u8> {
        match self {
            Unit::InputTerminal(u) => u.clock_source_id,
            Unit::OutputTerminal(u) => u.clock_source_id,
            Unit::ClockMultiplier(u) => Some(u.csource_id),
            _ => None,
        }
    }

    /// Channel cluster of units that define output channels
    pub fn cluster(&self) -> Option<&AudioCluster> {
        match self {
            Unit::InputTerminal(u) => Some(&u.cluster),
            Unit::Mixer(u) => Some(&u.cluster),
            Unit::Processing(u) => Some(&u.cluster),
            Unit::Extension(u) => Some(&u.cluster),
            _ => None,
        }
    }

    /// Terminal type of input and output terminals
    pub fn terminal_type(&self) -> Option<u16> {
        match self {
            Unit::InputTerminal(u) => Some(u.terminal_type),
            Unit::OutputTerminal(u) => Some(u.terminal_type),
            _ => None,
        }
    }

    /// String descriptor index naming the unit
    pub fn string_index(&self) -> u8 {
        match self {
            Unit::InputTerminal(u) => u.terminal_index,
            Unit::OutputTerminal(u) => u.terminal_index,
            Unit::Mixer(u) => u.mixer_index,
            Unit::Selector(u) => u.selector_index,
            Unit::Feature(u) => u.feature_index,
            Unit::Effect(u) => u.effect_index,
            Unit::Processing(u) => u.processing_index,
            Unit::Extension(u) => u.extension_index,
            Unit::ClockSource(u) => u.clock_source_index,
            Unit::ClockSelector(u) => u.clock_selector_index,
            Unit::ClockMultiplier(u) => u.clock_multiplier_index,
        }
    }
}

/// UAC1: 4.5.2 Class-Specific AS Interface Descriptor; Table 4-19.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct AudioStreamingInterface1 {
    pub terminal_link: u8,
    pub delay: u8,
    pub format_tag: u16,
}

impl TryFrom<&[u8]> for AudioStreamingInterface1 {
    type Error = Error;

    fn try_from(value: &[u8]) -> error::Result<Self> {
        if value.len() < 4 {
            return Err(Error::new_truncated("AS General 1", 4, value.len()));
        }

        Ok(AudioStreamingInterface1 {
            terminal_link: value[0],
            delay: value[1],
            format_tag: u16::from_le_bytes([value[2], value[3]]),
        })
    }
}

/// UAC2: 4.9.2 Class-Specific AS Interface Descriptor; Table 4-27.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct AudioStreamingInterface2 {
    pub terminal_link: u8,
    pub controls: u8,
    pub format_type: u8,
    pub formats: u32,
    pub nr_channels: u8,
    pub channel_config: u32,
    pub channel_names_index: u8,
}

impl TryFrom<&[u8]> for AudioStreamingInterface2 {
    type Error = Error;

    fn try_from(value: &[u8]) -> error::Result<Self> {
        if value.len() < 13 {
            return Err(Error::new_truncated("AS General 2", 13, value.len()));
        }

        Ok(AudioStreamingInterface2 {
            terminal_link: value[0],
            controls: value[1],
            format_type: value[2],
            formats: u32::from_le_bytes([value[3], value[4], value[5], value[6]]),
            nr_channels: value[7],
            channel_config: u32::from_le_bytes([value[8], value[9], value[10], value[11]]),
            channel_names_index: value[12],
        })
    }
}

impl AudioStreamingInterface2 {
    /// Reduce bmFormats to a single format tag, first matching bit wins
    pub fn format_tag(&self) -> u16 {
        let f = self.formats;
        let first = |bits: &[(u32, u16)], undefined: u16| {
            bits.iter()
                .find(|(bit, _)| f & (1u32 << *bit) != 0)
                .map(|(_, tag)| *tag)
                .unwrap_or(undefined)
        };

        match FormatType::from(self.format_type) {
            FormatType::TypeI => first(
                &[
                    (0, format_tag::PCM),
                    (1, format_tag::PCM8),
                    (2, format_tag::IEEE_FLOAT),
                    (3, format_tag::ALAW),
                ],
                format_tag::TYPE_I_UNDEFINED,
            ),
            FormatType::TypeII => first(
                &[(0, format_tag::MPEG), (1, format_tag::AC3)],
                format_tag::TYPE_II_UNDEFINED,
            ),
            FormatType::TypeIII => first(
                &[
                    (0, format_tag::IEC1937_AC3),
                    (1, format_tag::IEC1937_MPEG1_LAYER1),
                    (2, format_tag::IEC1937_MPEG1_LAYER2_3),
                    (3, format_tag::IEC1937_MPEG2_EXT),
                    (5, format_tag::IEC1937_MPEG2_LAYER1_LS),
                    (6, format_tag::IEC1937_MPEG2_LAYER2_3_LS),
                ],
                format_tag::TYPE_III_UNDEFINED,
            ),
            _ => 0,
        }
    }
}

/// FORMAT_TYPE descriptor; UAC1 Frmts 2.2.5/2.3.5/2.4.1 and UAC2 Frmts 2.3.1
///
/// Fields absent for the protocol or format type are `None`.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct AudioFormatType {
    pub format_type: FormatType,
    pub nr_channels: Option<u8>,
    pub subframe_size: Option<u8>,
    pub bit_resolution: Option<u8>,
    pub max_bit_rate: Option<u16>,
    pub samples_per_frame: Option<u16>,
    /// bSamFreqType; 0 is a continuous range
    pub sam_freq_type: Option<u8>,
    /// tSamFreq entries; `[low, high]` when `sam_freq_type` is 0
    pub sam_freqs: Vec<u32>,
}

impl AudioFormatType {
    /// Decode the record body following the three byte header
    pub fn parse(body: &[u8], protocol: UacProtocol) -> error::Result<Self> {
        let mut r = FieldReader::new("Format Type", body);
        let format_type = FormatType::from(r.u8()?);
        let mut ret = AudioFormatType {
            format_type,
            ..Default::default()
        };

        match (protocol, format_type) {
            (UacProtocol::Uac1, FormatType::TypeI | FormatType::TypeIII) => {
                ret.nr_channels = Some(r.u8()?);
                ret.subframe_size = Some(r.u8()?);
                ret.bit_resolution = Some(r.u8()?);
                ret.read_sample_rates(&mut r);
            }
            (UacProtocol::Uac1, FormatType::TypeII) => {
                ret.max_bit_rate = Some(r.u16()?);
                ret.samples_per_frame = Some(r.u16()?);
                ret.read_sample_rates(&mut r);
            }
            (UacProtocol::Uac2, FormatType::TypeI | FormatType::TypeIII) => {
                ret.subframe_size = Some(r.u8()?);
                ret.bit_resolution = Some(r.u8()?);
            }
            (UacProtocol::Uac2, FormatType::TypeII) => {
                ret.max_bit_rate = Some(r.u16()?);
                ret.samples_per_frame = Some(r.u16()?);
            }
            _ => log::debug!("No fields decoded for {} {}", protocol, format_type),
        }

        Ok(ret)
    }

    /// Rates are optional to the rest of the record; a short tail keeps the format fields already read
    fn read_sample_rates(&mut self, r: &mut FieldReader) {
        let sam_freq_type = match r.u8() {
            Ok(t) => t,
            Err(e) => {
                log::warn!("Format Type has no sample rates: {}", e);
                return;
            }
        };
        self.sam_freq_type = Some(sam_freq_type);
        if sam_freq_type == 0 {
            match (r.u24(), r.u24()) {
                (Ok(low), Ok(high)) => self.sam_freqs = vec![low, high],
                _ => log::warn!("Format Type continuous range is missing its bounds"),
            }
            return;
        }

        let available = r.remaining() / 3;
        if (sam_freq_type as usize) > available {
            log::warn!(
                "Format Type declares {} sample rates but has room for {}",
                sam_freq_type,
                available
            );
        }
        self.sam_freqs = (0..(sam_freq_type as usize).min(available))
            .filter_map(|_| r.u24().ok())
            .collect();
    }
}

/// Format specific capabilities; UAC1 FORMAT_SPECIFIC or UAC2 DECODER descriptors
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum EncodedFormat {
    Mpeg { capabilities: u16, features: u8 },
    Ac3 { bsid: u32, features: u8 },
}

impl EncodedFormat {
    /// UAC1 FORMAT_SPECIFIC body; `None` for tags other than MPEG and AC-3
    pub fn from_format_specific(body: &[u8]) -> error::Result<Option<Self>> {
        let mut r = FieldReader::new("Format Specific", body);
        match r.u16()? {
            format_tag::MPEG => Ok(Some(EncodedFormat::Mpeg {
                capabilities: r.u16()?,
                features: r.u8()?,
            })),
            format_tag::AC3 => Ok(Some(EncodedFormat::Ac3 {
                bsid: r.u32()?,
                features: r.u8()?,
            })),
            _ => Ok(None),
        }
    }

    /// UAC2 DECODER body; `None` for decoders other than MPEG and AC-3
    pub fn from_decoder(body: &[u8]) -> error::Result<Option<Self>> {
        let mut r = FieldReader::new("Decoder", body);
        let _decoder_id = r.u8()?;
        match r.u8()? {
            0x02 => Ok(Some(EncodedFormat::Mpeg {
                capabilities: r.u16()?,
                features: r.u8()?,
            })),
            0x03 => Ok(Some(EncodedFormat::Ac3 {
                bsid: r.u32()?,
                features: r.u8()?,
            })),
            d => {
                log::debug!("Unsupported decoder type {:#04x}", d);
                Ok(None)
            }
        }
    }
}

/// Class-Specific AS Isochronous Audio Data Endpoint; UAC1 4.6.1.2 Table 4-21 and UAC2 4.10.1.2 Table 4-34
#[skip_serializing_none]
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct AudioDataStreamingEndpoint {
    pub protocol: UacProtocol,
    pub attributes: u8,
    pub controls: Option<u8>,
    pub lock_delay_units: u8,
    pub lock_delay: u16,
}

impl AudioDataStreamingEndpoint {
    /// Decode the EP_GENERAL body following the three byte header
    pub fn parse(body: &[u8], protocol: UacProtocol) -> error::Result<Self> {
        let mut r = FieldReader::new("AS Isochronous Endpoint", body);
        let attributes = r.u8()?;
        let controls = if protocol == UacProtocol::Uac2 {
            Some(r.u8()?)
        } else {
            None
        };

        Ok(AudioDataStreamingEndpoint {
            protocol,
            attributes,
            controls,
            lock_delay_units: r.u8()?,
            lock_delay: r.u16()?,
        })
    }

    /// Sampling frequency control; UAC2 moved this to the clock source so is always false
    pub fn has_sample_freq_control(&self) -> bool {
        self.controls.is_none() && self.attributes & 0x01 != 0
    }

    /// Pitch control
    pub fn has_pitch_control(&self) -> bool {
        match self.controls {
            Some(c) => ControlType::BmControl2.is_set(c as u32, 0),
            None => self.attributes & 0x02 != 0,
        }
    }

    /// Only packets of wMaxPacketSize may be sent
    pub fn has_max_packets_only(&self) -> bool {
        self.attributes & 0x80 != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtype_remap() {
        assert_eq!(
            UacAcInterface::get_uac_subtype(0x07, UacProtocol::Uac1),
            UacAcInterface::ProcessingUnit
        );
        assert_eq!(
            UacAcInterface::get_uac_subtype(0x07, UacProtocol::Uac2),
            UacAcInterface::EffectUnit
        );
        assert_eq!(
            UacAcInterface::get_uac_subtype(0x0a, UacProtocol::Uac1),
            UacAcInterface::Undefined
        );
        assert_eq!(
            UacAcInterface::ClockSource.to_subtype(UacProtocol::Uac2),
            Some(0x0a)
        );
        assert_eq!(UacAcInterface::ClockSource.to_subtype(UacProtocol::Uac1), None);
    }

    #[test]
    fn test_ac_interface_display() {
        assert_eq!(format!("{:#}", UacAcInterface::FeatureUnit), "FEATURE_UNIT");
        assert_eq!(format!("{}", UacAcInterface::ClockSource), "Clock Source");
        assert_eq!(format!("{:#}", UacAsInterface::General), "AS_GENERAL");
    }

    #[test]
    fn test_feature_unit1_mute_volume() {
        // bUnitID 5, bSourceID 1, bControlSize 1, master mute+volume, channel 1 none, iFeature 0
        let fu = FeatureUnit::parse(&[5, 1, 1, 0b11, 0x00, 0], &UAC1_PROFILE).unwrap();
        assert_eq!(fu.num_controls(), 2);
        assert!(fu.channel_has_mute(0));
        assert!(fu.channel_has_volume(0));
        assert!(!fu.channel_has_mute(1));
        assert!(!fu.channel_has_volume(2));
    }

    #[test]
    fn test_feature_unit1_control_size_zero() {
        let err = FeatureUnit::parse(&[5, 1, 0, 0], &UAC1_PROFILE).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[test]
    fn test_feature_unit2_control_pairs() {
        // master: mute r/w, volume read-only; ch1: volume r/w
        let body = [
            7, 3, 0b0111, 0, 0, 0, 0b1100, 0, 0, 0, 9,
        ];
        let fu = FeatureUnit::parse(&body, &UAC2_PROFILE).unwrap();
        assert_eq!(fu.controls, vec![0b0111, 0b1100]);
        assert!(fu.channel_has_mute(0));
        assert!(!fu.channel_has_volume(0));
        assert!(!fu.channel_has_mute(1));
        assert!(fu.channel_has_volume(1));
        assert_eq!(fu.feature_index, 9);
    }

    #[test]
    fn test_input_terminal2() {
        let body = [
            1, 0x01, 0x01, 0, 0x29, 2, 0x03, 0, 0, 0, 0, 0x00, 0x00, 4,
        ];
        let it = InputTerminal::parse(&body, &UAC2_PROFILE).unwrap();
        assert_eq!(it.terminal_type, 0x0101);
        assert_eq!(it.clock_source_id, Some(0x29));
        assert_eq!(it.cluster.nr_channels, 2);
        assert_eq!(it.cluster.channel_config, 3);
        assert_eq!(it.terminal_index, 4);

        assert!(InputTerminal::parse(&body[..10], &UAC2_PROFILE).is_err());
    }

    #[test]
    fn test_mixer_unit_lengths() {
        // UAC1: 2 pins, 2 channels, 1 byte of mixer controls
        let body = [6, 2, 1, 2, 2, 0x03, 0x00, 0, 0xff, 3];
        let mu = MixerUnit::parse(&body, &UAC1_PROFILE).unwrap();
        assert_eq!(mu.source_ids, vec![1, 2]);
        assert_eq!(mu.mixer_controls, vec![0xff]);
        assert_eq!(mu.controls, None);
        assert_eq!(mu.mixer_index, 3);

        // UAC2 has bmControls before iMixer
        let body = [6, 1, 1, 2, 0x03, 0, 0, 0, 0, 0xf0, 0x01, 7];
        let mu = MixerUnit::parse(&body, &UAC2_PROFILE).unwrap();
        assert_eq!(mu.mixer_controls, vec![0xf0]);
        assert_eq!(mu.controls, Some(0x01));
        assert_eq!(mu.mixer_index, 7);
    }

    #[test]
    fn test_extension_unit2_channel_names() {
        // id, code, 1 pin, source 4, nr 2, config, iChannelNames 8, bmControls 1, iExtension 9
        let body = [10, 0x34, 0x12, 1, 4, 2, 0x03, 0, 0, 0, 8, 1, 9];
        let xu = ExtensionUnit::parse(&body, &UAC2_PROFILE).unwrap();
        assert_eq!(xu.extension_code, 0x1234);
        assert_eq!(xu.cluster.channel_names_index, 8);
        assert_eq!(xu.controls, vec![1]);
        assert_eq!(xu.extension_index, 9);
    }

    #[test]
    fn test_processing_unit1() {
        // id, type, 1 pin, source 2, nr 2, config, names, bControlSize 1, bmControls, iProcessing
        let body = [11, 0x01, 0x00, 1, 2, 2, 0x03, 0x00, 0, 1, 0x01, 5];
        let pu = ProcessingUnit::parse(&body, &UAC1_PROFILE).unwrap();
        assert_eq!(pu.process_type, 1);
        assert_eq!(pu.controls, vec![0x01]);
        assert_eq!(pu.processing_index, 5);
    }

    #[test]
    fn test_clock_source_controls() {
        let cs = ClockSource::parse(&[0x29, 0x03, 0x07, 0, 0]).unwrap();
        assert_eq!(cs.clock_type(), ClockType::InternalProgrammable);
        assert!(cs.has_frequency_control(true));
        assert!(cs.has_frequency_control(false));
        assert!(cs.has_validity_control());

        let cs = ClockSource::parse(&[0x29, 0x01, 0x01, 0, 0]).unwrap();
        assert!(cs.has_frequency_control(false));
        assert!(!cs.has_frequency_control(true));
        assert!(!cs.has_validity_control());
    }

    #[test]
    fn test_unit_sources() {
        let sel = Unit::parse(UacAcInterface::ClockSelector, &[0x28, 2, 0x29, 0x2a, 0x03, 0], &UAC2_PROFILE)
            .unwrap()
            .unwrap();
        assert_eq!(sel.source_ids(), Some(&[0x29, 0x2a][..]));
        assert_eq!(sel.num_sources(), 2);
        assert_eq!(sel.source_id(), None);

        // clock entities do not exist in UAC1
        assert!(Unit::parse(UacAcInterface::ClockSource, &[1, 2, 3, 4, 5], &UAC1_PROFILE)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_uac2_format_tag_priority() {
        let mut asi = AudioStreamingInterface2 {
            terminal_link: 1,
            controls: 0,
            format_type: 1,
            formats: 0b1110,
            nr_channels: 2,
            channel_config: 3,
            channel_names_index: 0,
        };
        assert_eq!(asi.format_tag(), format_tag::PCM8);
        asi.formats = 0b1111;
        assert_eq!(asi.format_tag(), format_tag::PCM);
        asi.formats = 1 << 31;
        assert_eq!(asi.format_tag(), format_tag::TYPE_I_UNDEFINED);
        asi.format_type = 2;
        asi.formats = 0b10;
        assert_eq!(asi.format_tag(), format_tag::AC3);
        asi.format_type = 3;
        asi.formats = 0b110000;
        assert_eq!(asi.format_tag(), format_tag::IEC1937_MPEG2_LAYER1_LS);
        asi.format_type = 4;
        assert_eq!(asi.format_tag(), 0);
    }

    #[test]
    fn test_format_type1_rates() {
        // Type I, 2 ch, 3 byte subframe, 24 bit, 2 discrete rates
        let body = [1, 2, 3, 24, 2, 0x44, 0xac, 0x00, 0x80, 0xbb, 0x00];
        let ft = AudioFormatType::parse(&body, UacProtocol::Uac1).unwrap();
        assert_eq!(ft.nr_channels, Some(2));
        assert_eq!(ft.bit_resolution, Some(24));
        assert_eq!(ft.sam_freqs, vec![44100, 48000]);

        // continuous range
        let body = [1, 2, 2, 16, 0, 0x44, 0xac, 0x00, 0x00, 0x77, 0x01];
        let ft = AudioFormatType::parse(&body, UacProtocol::Uac1).unwrap();
        assert_eq!(ft.sam_freq_type, Some(0));
        assert_eq!(ft.sam_freqs, vec![44100, 96000]);

        // count larger than the record
        let body = [1, 2, 2, 16, 3, 0x44, 0xac, 0x00];
        let ft = AudioFormatType::parse(&body, UacProtocol::Uac1).unwrap();
        assert_eq!(ft.sam_freqs, vec![44100]);

        // range missing its upper bound keeps the format fields
        let body = [1, 2, 2, 16, 0, 0x44, 0xac, 0x00];
        let ft = AudioFormatType::parse(&body, UacProtocol::Uac1).unwrap();
        assert_eq!(ft.nr_channels, Some(2));
        assert_eq!(ft.bit_resolution, Some(16));
        assert_eq!(ft.sam_freq_type, Some(0));
        assert!(ft.sam_freqs.is_empty());

        // no bSamFreqType at all
        let ft = AudioFormatType::parse(&[1, 1, 2, 16], UacProtocol::Uac1).unwrap();
        assert_eq!(ft.nr_channels, Some(1));
        assert_eq!(ft.sam_freq_type, None);
    }

    #[test]
    fn test_encoded_formats() {
        let f = EncodedFormat::from_format_specific(&[0x02, 0x10, 0x01, 0x03, 0x00, 0x00, 0x01])
            .unwrap();
        assert_eq!(f, Some(EncodedFormat::Ac3 { bsid: 0x0301, features: 1 }));
        let f = EncodedFormat::from_decoder(&[1, 0x02, 0x34, 0x12, 0x05]).unwrap();
        assert_eq!(
            f,
            Some(EncodedFormat::Mpeg {
                capabilities: 0x1234,
                features: 5
            })
        );
        assert_eq!(EncodedFormat::from_format_specific(&[0x01, 0x00]).unwrap(), None);
    }

    #[test]
    fn test_iso_endpoint_general() {
        let ep = AudioDataStreamingEndpoint::parse(&[0x83, 1, 0x10, 0x00], UacProtocol::Uac1).unwrap();
        assert!(ep.has_sample_freq_control());
        assert!(ep.has_pitch_control());
        assert!(ep.has_max_packets_only());
        assert_eq!(ep.lock_delay, 16);

        let ep = AudioDataStreamingEndpoint::parse(&[0x01, 0x03, 2, 0x01, 0x00], UacProtocol::Uac2).unwrap();
        assert!(!ep.has_sample_freq_control());
        assert!(ep.has_pitch_control());
        assert!(!ep.has_max_packets_only());
        assert_eq!(LockDelayUnits::from(ep.lock_delay_units), LockDelayUnits::DecodedPcmSamples);
    }

    #[test]
    fn test_header_interfaces() {
        let h = AudioHeader::parse(&[0x00, 0x01, 0x28, 0x00, 2, 1, 2], &UAC1_PROFILE).unwrap();
        assert_eq!(h.version, Version(1, 0, 0));
        assert_eq!(h.total_length, 0x28);
        assert_eq!(h.interfaces, vec![1, 2]);

        let h = AudioHeader::parse(&[0x00, 0x02, 0x08, 0x40, 0x00, 0x00], &UAC2_PROFILE).unwrap();
        assert_eq!(h.version, Version(2, 0, 0));
        assert_eq!(h.total_length, 0x40);
        assert!(h.interfaces.is_empty());

        assert_eq!(UAC2_PROFILE.header_total_length(&[9, 0x24, 1, 0, 2, 8, 0x40, 0, 0]).unwrap(), 0x40);
        assert_eq!(UAC1_PROFILE.header_total_length(&[9, 0x24, 1, 0, 1, 0x28, 0, 1, 1]).unwrap(), 0x28);
    }
}
