//! AudioControl interface: the unit graph, its clocks and the optional status interrupt endpoint
//!
//! Units are held in descriptor order in a single list. Lookups by ID are linear scans, devices declare few units.
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use strum::IntoEnumIterator;

use crate::error::{self, Error, ErrorKind};
use crate::usb::descriptors::audio::{
    AudioCluster, AudioHeader, ClockSource, ClockType, FeatureUnit, UacAcInterface, UacProtocol,
    Unit,
};
use crate::usb::descriptors::{
    record_body, DescriptorCursor, DescriptorType, EndpointDescriptor, InterfaceDescriptor,
};
use crate::usb::{Endpoint, Version};

/// Decoded AudioControl interface
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlTopology {
    /// bInterfaceNumber
    pub interface_number: u8,
    /// bAlternateSetting; always 0 in practice
    pub alt_setting: u8,
    /// bNumEndpoints declared
    pub num_endpoints: u8,
    /// From bInterfaceProtocol
    pub protocol: UacProtocol,
    /// iInterface
    pub interface_index: u8,
    /// Class-specific header
    pub header: Option<AudioHeader>,
    /// AudioStreaming interfaces controlled; from the UAC1 header or the UAC2 interface association
    pub stream_interface_numbers: Vec<u8>,
    /// Terminals, units and clock entities in descriptor order
    pub units: Vec<Unit>,
    /// Status interrupt endpoint
    pub interrupt_endpoint: Option<Endpoint>,
}

impl ControlTopology {
    /// New control topology for `interface`; fails for protocols other than UAC1 and UAC2
    pub fn new(interface: &InterfaceDescriptor) -> error::Result<Self> {
        let protocol = UacProtocol::from(interface.interface_protocol);
        // profile lookup is the protocol check
        protocol.profile()?;

        Ok(ControlTopology {
            interface_number: interface.interface_number,
            alt_setting: interface.alternate_setting,
            num_endpoints: interface.num_endpoints,
            protocol,
            interface_index: interface.interface_index,
            header: None,
            stream_interface_numbers: Vec::new(),
            units: Vec::new(),
            interrupt_endpoint: None,
        })
    }

    /// Walk the class-specific records and endpoints of the interface up to the next interface or association
    ///
    /// Units that fail to decode are skipped with a warning; a record that cannot be read from the cursor returns the
    /// error with the units found so far retained.
    pub fn parse_body(&mut self, cursor: &mut DescriptorCursor) -> error::Result<()> {
        let profile = self.protocol.profile()?;

        while !cursor.is_exhausted() {
            let header = cursor.peek_header()?;
            if header.starts_interface() {
                break;
            }
            let record = cursor.take_record(header.length as usize)?;

            match header.kind() {
                DescriptorType::CsInterface => {
                    let subtype = header.subtype.unwrap_or(0);
                    let kind = UacAcInterface::get_uac_subtype(subtype, self.protocol);
                    let body = record_body(record);
                    log::trace!("AudioControl {} {:02x?}", kind, record);

                    if kind == UacAcInterface::Header {
                        match AudioHeader::parse(body, profile) {
                            Ok(h) => {
                                if self.protocol == UacProtocol::Uac1 {
                                    self.stream_interface_numbers = h.interfaces.clone();
                                }
                                self.header = Some(h);
                            }
                            Err(e) => log::warn!("Skipping AudioControl header: {}", e),
                        }
                        continue;
                    }

                    match Unit::parse(kind, body, profile) {
                        Ok(Some(unit)) => {
                            if self.unit_by_id(unit.id()).is_some() {
                                log::warn!("Duplicate unit ID {} ({})", unit.id(), kind);
                            }
                            self.units.push(unit);
                        }
                        Ok(None) => log::debug!("Skipping AudioControl subtype {:#04x}", subtype),
                        Err(e) => log::warn!("Skipping {}: {}", kind, e),
                    }
                }
                DescriptorType::Endpoint if self.num_endpoints == 1 => {
                    match EndpointDescriptor::try_from(record) {
                        Ok(desc) => {
                            let endpoint = Endpoint::new(
                                desc.endpoint_address,
                                desc.attributes,
                                desc.max_packet_size,
                                desc.interval,
                            );
                            if endpoint.is_interrupt() {
                                self.interrupt_endpoint = Some(endpoint);
                            } else {
                                log::debug!(
                                    "AudioControl endpoint {:#04x} is not an interrupt endpoint",
                                    desc.endpoint_address
                                );
                            }
                        }
                        Err(e) => log::warn!("Skipping AudioControl endpoint: {}", e),
                    }
                }
                _ => log::trace!("Skipping {:?} in AudioControl interface", header.kind()),
            }
        }

        Ok(())
    }

    /// Stop tracking a streaming interface, MIDI for example
    pub fn remove_stream_interface(&mut self, interface_number: u8) {
        self.stream_interface_numbers.retain(|&i| i != interface_number);
    }

    /// Interface is one of the controlled streaming interfaces
    pub fn controls_stream_interface(&self, interface_number: u8) -> bool {
        self.stream_interface_numbers.contains(&interface_number)
    }

    /// bcdADC from the header
    pub fn adc_version(&self) -> Version {
        self.header
            .as_ref()
            .map(|h| h.version)
            .unwrap_or_default()
    }

    /// Protocol of the interface
    pub fn protocol(&self) -> UacProtocol {
        self.protocol
    }

    /// Controlled streaming interface numbers
    pub fn stream_interface_numbers(&self) -> &[u8] {
        &self.stream_interface_numbers
    }

    /// Number of controlled streaming interfaces
    pub fn num_stream_interfaces(&self) -> usize {
        self.stream_interface_numbers.len()
    }

    /// Units of `kind` in descriptor order
    pub fn units_of(&self, kind: UacAcInterface) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter(move |u| u.kind() == kind)
    }

    /// Find a unit by ID, probing each kind in turn
    pub fn unit_by_id(&self, id: u8) -> Option<&Unit> {
        UacAcInterface::iter()
            .filter(|k| k.is_unit())
            .find_map(|kind| self.units_of(kind).find(|u| u.id() == id))
    }

    /// As [`ControlTopology::unit_by_id`] but [`ErrorKind::NotFound`] when absent
    pub fn unit(&self, id: u8) -> error::Result<&Unit> {
        self.unit_by_id(id).ok_or_else(|| {
            Error::not_found(&format!(
                "No unit {} in AudioControl interface {}",
                id, self.interface_number
            ))
        })
    }

    /// Feature unit `id`
    pub fn feature_unit(&self, id: u8) -> error::Result<&FeatureUnit> {
        match self.unit(id)? {
            Unit::Feature(fu) => Ok(fu),
            u => Err(Error::not_found(&format!("Unit {} is a {} not a feature unit", id, u.kind()))),
        }
    }

    /// Clock source `id`
    pub fn clock_source(&self, id: u8) -> error::Result<&ClockSource> {
        match self.unit(id)? {
            Unit::ClockSource(cs) => Ok(cs),
            u => Err(Error::not_found(&format!("Unit {} is a {} not a clock source", id, u.kind()))),
        }
    }

    /// Feature unit feeding output terminal `terminal_id`
    ///
    /// Only the immediate source of the terminal is considered: it is returned whether it is a feature unit or not.
    pub fn feature_unit_upstream_of_output_terminal(&self, terminal_id: u8) -> error::Result<u8> {
        let terminal = self
            .units_of(UacAcInterface::OutputTerminal)
            .find(|u| u.id() == terminal_id)
            .ok_or_else(|| Error::not_found(&format!("No output terminal {}", terminal_id)))?;

        match terminal.source_id() {
            Some(0) | None => Err(Error::not_found(&format!(
                "Output terminal {} has no source",
                terminal_id
            ))),
            Some(source) => {
                if !matches!(self.unit_by_id(source), Some(Unit::Feature(_))) {
                    log::debug!(
                        "Output terminal {} source {} is not a feature unit",
                        terminal_id,
                        source
                    );
                }
                Ok(source)
            }
        }
    }

    /// Feature unit channel (0 master) has a mute control; false when the unit or channel does not exist
    pub fn channel_has_mute_control(&self, feature_unit_id: u8, channel: u8) -> bool {
        self.feature_unit(feature_unit_id)
            .map(|fu| fu.channel_has_mute(channel))
            .unwrap_or(false)
    }

    /// Feature unit channel (0 master) has a volume control; false when the unit or channel does not exist
    pub fn channel_has_volume_control(&self, feature_unit_id: u8, channel: u8) -> bool {
        self.feature_unit(feature_unit_id)
            .map(|fu| fu.channel_has_volume(channel))
            .unwrap_or(false)
    }

    /// Master channel mute
    pub fn master_has_mute_control(&self, feature_unit_id: u8) -> bool {
        self.channel_has_mute_control(feature_unit_id, 0)
    }

    /// Number of bmaControls entries of a feature unit
    pub fn num_controls(&self, feature_unit_id: u8) -> error::Result<usize> {
        self.feature_unit(feature_unit_id).map(|fu| fu.num_controls())
    }

    /// Clock source has a frequency control, host programmable when `want_programmable`
    pub fn clock_source_has_frequency_control(&self, clock_id: u8, want_programmable: bool) -> bool {
        self.clock_source(clock_id)
            .map(|cs| cs.has_frequency_control(want_programmable))
            .unwrap_or(false)
    }

    /// Clock source has a validity control
    pub fn clock_source_has_validity_control(&self, clock_id: u8) -> bool {
        self.clock_source(clock_id)
            .map(|cs| cs.has_validity_control())
            .unwrap_or(false)
    }

    /// Clock source type
    pub fn clock_source_type(&self, clock_id: u8) -> error::Result<ClockType> {
        self.clock_source(clock_id).map(|cs| cs.clock_type())
    }

    /// Terminal associated with a clock source
    pub fn clock_source_assoc_terminal(&self, clock_id: u8) -> error::Result<u8> {
        self.clock_source(clock_id).map(|cs| cs.assoc_terminal)
    }

    /// Clock entity IDs referenced by input then output terminals, first seen order without duplicates
    pub fn terminal_clock_entities(&self) -> Vec<u8> {
        self.units_of(UacAcInterface::InputTerminal)
            .chain(self.units_of(UacAcInterface::OutputTerminal))
            .filter_map(|t| t.clock_source_id())
            .unique()
            .collect()
    }

    /// Upstream IDs of a multi-source unit
    pub fn get_source_ids(&self, unit_id: u8) -> error::Result<Vec<u8>> {
        let unit = self.unit(unit_id)?;
        unit.source_ids().map(|ids| ids.to_vec()).ok_or_else(|| {
            Error::new(
                ErrorKind::Unsupported,
                &format!("{} {} is not a multi-source unit", unit.kind(), unit_id),
            )
        })
    }

    /// Upstream ID of a single-source unit
    pub fn source_id(&self, unit_id: u8) -> error::Result<u8> {
        let unit = self.unit(unit_id)?;
        unit.source_id().ok_or_else(|| {
            Error::new(
                ErrorKind::Unsupported,
                &format!("{} {} is not a single-source unit", unit.kind(), unit_id),
            )
        })
    }

    /// Number of upstream connections
    pub fn num_sources(&self, unit_id: u8) -> error::Result<usize> {
        self.unit(unit_id).map(|u| u.num_sources())
    }

    /// Raw bDescriptorSubtype for the protocol of this interface
    pub fn subtype(&self, unit_id: u8) -> error::Result<u8> {
        let kind = self.unit(unit_id)?.kind();
        kind.to_subtype(self.protocol).ok_or_else(|| {
            Error::new(
                ErrorKind::Unsupported,
                &format!("{} has no subtype in {}", kind, self.protocol),
            )
        })
    }

    /// String descriptor index of a unit
    pub fn string_index(&self, unit_id: u8) -> error::Result<u8> {
        self.unit(unit_id).map(|u| u.string_index())
    }

    /// Clock entity a terminal or clock multiplier derives its timing from
    pub fn clock_source_id(&self, unit_id: u8) -> error::Result<u8> {
        let unit = self.unit(unit_id)?;
        unit.clock_source_id().ok_or_else(|| {
            Error::not_found(&format!("{} {} has no clock source", unit.kind(), unit_id))
        })
    }

    /// Channel cluster of a unit that declares output channels
    pub fn audio_cluster(&self, unit_id: u8) -> error::Result<&AudioCluster> {
        let unit = self.unit(unit_id)?;
        unit.cluster().ok_or_else(|| {
            Error::not_found(&format!("{} {} has no channel cluster", unit.kind(), unit_id))
        })
    }

    /// Terminal type of input terminal `id`
    pub fn input_terminal_type(&self, id: u8) -> error::Result<u16> {
        match self.unit(id)? {
            Unit::InputTerminal(t) => Ok(t.terminal_type),
            _ => Err(Error::not_found(&format!("No input terminal {}", id))),
        }
    }

    /// Terminal type of output terminal `id`
    pub fn output_terminal_type(&self, id: u8) -> error::Result<u16> {
        match self.unit(id)? {
            Unit::OutputTerminal(t) => Ok(t.terminal_type),
            _ => Err(Error::not_found(&format!("No output terminal {}", id))),
        }
    }

    /// The `index`th unit of `kind` in descriptor order
    pub fn indexed_unit(&self, kind: UacAcInterface, index: usize) -> error::Result<&Unit> {
        self.units_of(kind).nth(index).ok_or_else(|| {
            Error::not_found(&format!("No {} at index {}", kind, index))
        })
    }

    /// Number of units of `kind`
    pub fn num_units(&self, kind: UacAcInterface) -> usize {
        self.units_of(kind).count()
    }

    /// ID of the `index`th input terminal
    pub fn indexed_input_terminal_id(&self, index: usize) -> error::Result<u8> {
        self.indexed_unit(UacAcInterface::InputTerminal, index)
            .map(|u| u.id())
    }

    /// Terminal type of the `index`th input terminal
    pub fn indexed_input_terminal_type(&self, index: usize) -> error::Result<u16> {
        self.indexed_unit(UacAcInterface::InputTerminal, index)
            .map(|u| u.terminal_type().unwrap_or_default())
    }

    /// ID of the `index`th output terminal
    pub fn indexed_output_terminal_id(&self, index: usize) -> error::Result<u8> {
        self.indexed_unit(UacAcInterface::OutputTerminal, index)
            .map(|u| u.id())
    }

    /// Terminal type of the `index`th output terminal
    pub fn indexed_output_terminal_type(&self, index: usize) -> error::Result<u16> {
        self.indexed_unit(UacAcInterface::OutputTerminal, index)
            .map(|u| u.terminal_type().unwrap_or_default())
    }

    /// ID of the `index`th feature unit
    pub fn indexed_feature_unit_id(&self, index: usize) -> error::Result<u8> {
        self.indexed_unit(UacAcInterface::FeatureUnit, index)
            .map(|u| u.id())
    }

    /// ID of the `index`th mixer unit
    pub fn indexed_mixer_unit_id(&self, index: usize) -> error::Result<u8> {
        self.indexed_unit(UacAcInterface::MixerUnit, index)
            .map(|u| u.id())
    }

    /// ID of the `index`th selector unit
    pub fn indexed_selector_unit_id(&self, index: usize) -> error::Result<u8> {
        self.indexed_unit(UacAcInterface::SelectorUnit, index)
            .map(|u| u.id())
    }

    /// ID of the `index`th clock source
    pub fn indexed_clock_source_id(&self, index: usize) -> error::Result<u8> {
        self.indexed_unit(UacAcInterface::ClockSource, index)
            .map(|u| u.id())
    }

    /// ID of the `index`th clock selector
    pub fn indexed_clock_selector_id(&self, index: usize) -> error::Result<u8> {
        self.indexed_unit(UacAcInterface::ClockSelector, index)
            .map(|u| u.id())
    }

    /// ID of the `index`th clock multiplier
    pub fn indexed_clock_multiplier_id(&self, index: usize) -> error::Result<u8> {
        self.indexed_unit(UacAcInterface::ClockMultiplier, index)
            .map(|u| u.id())
    }

    /// Number of input terminals
    pub fn num_input_terminals(&self) -> usize {
        self.num_units(UacAcInterface::InputTerminal)
    }

    /// Number of output terminals
    pub fn num_output_terminals(&self) -> usize {
        self.num_units(UacAcInterface::OutputTerminal)
    }

    /// Number of selector units
    pub fn num_selector_units(&self) -> usize {
        self.num_units(UacAcInterface::SelectorUnit)
    }

    /// Number of clock sources
    pub fn num_clock_sources(&self) -> usize {
        self.num_units(UacAcInterface::ClockSource)
    }

    /// Number of clock selectors
    pub fn num_clock_selectors(&self) -> usize {
        self.num_units(UacAcInterface::ClockSelector)
    }

    /// Number of clock multipliers
    pub fn num_clock_multipliers(&self) -> usize {
        self.num_units(UacAcInterface::ClockMultiplier)
    }

    /// Status interrupt endpoint present
    pub fn has_interrupt_endpoint(&self) -> bool {
        self.interrupt_endpoint.is_some()
    }

    /// Address of the status interrupt endpoint
    pub fn interrupt_endpoint_address(&self) -> Option<u8> {
        self.interrupt_endpoint.as_ref().map(|e| e.address.address)
    }

    /// bInterval of the status interrupt endpoint
    pub fn interrupt_endpoint_interval(&self) -> Option<u8> {
        self.interrupt_endpoint.as_ref().map(|e| e.interval)
    }
}
