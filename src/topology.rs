//! Topology of a USB Audio Class function decoded from a configuration descriptor
//!
//! [`ConfigurationModel::parse`] walks the configuration once, decoding the requested AudioControl interface into a
//! [`ControlTopology`] and each alternate setting of the AudioStreaming interfaces it controls into a
//! [`StreamTopology`]. Corruption part way through the walk yields a partial model rather than an error; only an
//! unusable configuration header, a missing control interface or an unsupported protocol on it fail the parse.
//!
//! ```
//! use uac_topology::ConfigurationModel;
//!
//! // configuration descriptor without any audio function
//! let data = [9, 2, 9, 0, 0, 1, 0, 0x80, 50];
//! let err = ConfigurationModel::parse(&data, 0).unwrap_err();
//! assert!(err.is_not_found());
//! ```
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::error::{self, Error, ErrorKind};
use crate::usb::descriptors::audio::{
    format_tag, AudioCluster, ClockType, LockDelayUnits, UacProtocol,
};
use crate::usb::descriptors::{
    ConfigurationDescriptor, DescriptorCursor, DescriptorType, InterfaceAssociationDescriptor,
    InterfaceDescriptor,
};
use crate::usb::{AudioSubclass, Direction, Endpoint, SyncType};

pub mod control;
pub mod stream;

pub use control::ControlTopology;
pub use stream::{IsocEndpointCapabilities, SampleRates, StreamTopology};

/// A parsed audio function: one control interface and the alternate settings of its streaming interfaces
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationModel {
    /// Leading configuration descriptor
    pub configuration: ConfigurationDescriptor,
    /// Control interface number requested
    pub control_interface_number: u8,
    /// The control interface; `None` when it was found but no streaming interface could be parsed
    pub control: Option<ControlTopology>,
    /// Alternate settings in descriptor order
    pub streams: Vec<StreamTopology>,
    /// Bytes walked
    pub consumed_length: usize,
    /// Declared wTotalLength limited to the supplied buffer
    pub total_length: usize,
}

/// Parse loop state
#[derive(Debug, Default)]
struct Walk {
    control: Option<ControlTopology>,
    streams: Vec<StreamTopology>,
    associations: Vec<InterfaceAssociationDescriptor>,
    visited: Vec<u8>,
    finished: bool,
}

impl Walk {
    /// Every controlled streaming interface has been visited
    fn all_streams_visited(&self) -> bool {
        self.control
            .as_ref()
            .map(|c| {
                !c.stream_interface_numbers.is_empty()
                    && c.stream_interface_numbers
                        .iter()
                        .all(|i| self.visited.contains(i))
            })
            .unwrap_or(false)
    }
}

impl ConfigurationModel {
    /// Parse `data`, a configuration descriptor starting with the configuration record, decoding control interface
    /// `control_interface` and its streaming interfaces
    pub fn parse(data: &[u8], control_interface: u8) -> error::Result<Self> {
        if data.is_empty() {
            return Err(Error::new(
                ErrorKind::Malformed,
                "Empty configuration descriptor",
            ));
        }
        let configuration = ConfigurationDescriptor::try_from(data)?;
        let mut cursor = DescriptorCursor::new(data, configuration.total_length as usize);
        cursor.take_record(configuration.length as usize)?;

        let mut walk = Walk::default();
        while !cursor.is_exhausted() {
            let header = match cursor.peek_header() {
                Ok(h) => h,
                Err(e) => {
                    log::warn!("Stopping at offset {}: {}", cursor.consumed(), e);
                    break;
                }
            };
            let record = match cursor.take_record(header.length as usize) {
                Ok(r) => r,
                Err(e) => {
                    log::warn!("Stopping at offset {}: {}", cursor.consumed(), e);
                    break;
                }
            };

            let ret = match header.kind() {
                DescriptorType::InterfaceAssociation => {
                    Self::remember_association(&mut walk, record);
                    Ok(())
                }
                DescriptorType::Interface => match InterfaceDescriptor::try_from(record) {
                    Ok(interface) => {
                        Self::dispatch_interface(&mut walk, &mut cursor, &interface, control_interface)
                    }
                    Err(e) => {
                        log::warn!("Skipping interface: {}", e);
                        Ok(())
                    }
                },
                t => {
                    log::trace!("Skipping {:?} {:02x?}", t, record);
                    Ok(())
                }
            };

            match ret {
                Ok(()) if walk.finished => {
                    log::warn!("Stopping at offset {} with a partial model", cursor.consumed());
                    break;
                }
                Ok(()) => (),
                Err(e) => return Err(e),
            }
        }

        let Walk {
            control, streams, ..
        } = walk;
        let control = control.ok_or_else(|| {
            Error::not_found(&format!(
                "No AudioControl interface {} in configuration",
                control_interface
            ))
        })?;

        let control = if streams.is_empty() {
            log::warn!(
                "AudioControl interface {} has no usable streaming interfaces, discarding",
                control_interface
            );
            None
        } else {
            Some(control)
        };

        Ok(ConfigurationModel {
            configuration,
            control_interface_number: control_interface,
            control,
            streams,
            consumed_length: cursor.consumed(),
            total_length: cursor.total(),
        })
    }

    fn remember_association(walk: &mut Walk, record: &[u8]) {
        match InterfaceAssociationDescriptor::try_from(record) {
            Ok(iad) if iad.is_uac2_function() => walk.associations.push(iad),
            Ok(_) => (),
            Err(e) => log::warn!("Skipping interface association: {}", e),
        }
    }

    /// Route one interface descriptor; returns `Err` only for conditions fatal to the whole parse
    fn dispatch_interface(
        walk: &mut Walk,
        cursor: &mut DescriptorCursor,
        interface: &InterfaceDescriptor,
        control_interface: u8,
    ) -> error::Result<()> {
        let number = interface.interface_number;

        if walk.all_streams_visited() && !walk.visited.contains(&number) {
            log::trace!("All streaming interfaces parsed, skipping interface {}", number);
            return Ok(());
        }
        if !interface.is_audio() {
            return Ok(());
        }

        match interface.audio_subclass() {
            AudioSubclass::AudioControl if number == control_interface => {
                if walk.control.is_some() {
                    log::debug!(
                        "Skipping alternate setting {} of AudioControl interface {}",
                        interface.alternate_setting,
                        number
                    );
                    return Ok(());
                }
                let mut control = ControlTopology::new(interface)?;
                log::debug!("AudioControl interface {} {}", number, control.protocol);
                let ret = control.parse_body(cursor);

                if control.protocol == UacProtocol::Uac2 {
                    match walk
                        .associations
                        .iter()
                        .find(|iad| iad.first_interface == number)
                        .map(|iad| iad.stream_interfaces())
                    {
                        Some(Ok(streams)) => control.stream_interface_numbers = streams,
                        Some(Err(e)) => log::warn!("AudioControl interface {}: {}", number, e),
                        None => log::warn!(
                            "No interface association for UAC2 AudioControl interface {}",
                            number
                        ),
                    }
                }
                walk.control = Some(control);

                if let Err(e) = ret {
                    log::warn!("AudioControl interface {}: {}", number, e);
                    walk.finished = true;
                }
            }
            AudioSubclass::AudioControl => {
                Self::skip_control_block(cursor, interface);
            }
            AudioSubclass::AudioStreaming => {
                let controlled = walk
                    .control
                    .as_ref()
                    .map(|c| c.controls_stream_interface(number))
                    .unwrap_or(false);
                if !controlled {
                    log::trace!("Interface {} is not controlled by {}", number, control_interface);
                    return Ok(());
                }
                let protocol = UacProtocol::from(interface.interface_protocol);
                if protocol.profile().is_err() {
                    log::warn!(
                        "Skipping AudioStreaming interface {} with protocol {:#04x}",
                        number,
                        interface.interface_protocol
                    );
                    return Ok(());
                }
                if !walk.visited.contains(&number) {
                    walk.visited.push(number);
                }

                log::debug!(
                    "AudioStreaming interface {} alt {} {}",
                    number,
                    interface.alternate_setting,
                    protocol
                );
                let mut stream = StreamTopology::new(interface, protocol);
                let ret = stream.parse_body(cursor);
                walk.streams.push(stream);
                if let Err(e) = ret {
                    log::warn!("AudioStreaming interface {}: {}", number, e);
                    walk.finished = true;
                }
            }
            AudioSubclass::MidiStreaming => {
                if let Some(control) = walk.control.as_mut() {
                    if control.controls_stream_interface(number) {
                        log::debug!("Removing MIDIStreaming interface {}", number);
                        control.remove_stream_interface(number);
                    }
                }
            }
            _ => (),
        }

        Ok(())
    }

    /// Skip the class-specific block of an AudioControl interface that is not decoded, by the header wTotalLength
    fn skip_control_block(cursor: &mut DescriptorCursor, interface: &InterfaceDescriptor) {
        let Ok(profile) = UacProtocol::from(interface.interface_protocol).profile() else {
            return;
        };
        let Ok(header) = cursor.peek_header() else {
            return;
        };
        if header.kind() != DescriptorType::CsInterface || header.subtype != Some(0x01) {
            return;
        }

        let start = cursor.consumed();
        let total = cursor
            .take_next()
            .and_then(|record| profile.header_total_length(record));
        match total {
            Ok(total) => {
                let end = start + total as usize;
                log::debug!(
                    "Skipping AudioControl interface {} block to offset {}",
                    interface.interface_number,
                    end
                );
                if end > cursor.consumed() {
                    if let Err(e) = cursor.advance_by(end - cursor.consumed()) {
                        log::warn!("AudioControl interface {}: {}", interface.interface_number, e);
                    }
                }
            }
            Err(e) => log::warn!("AudioControl interface {}: {}", interface.interface_number, e),
        }
    }

    /// Interface number of the first AudioControl interface in `data`
    pub fn first_control_interface(data: &[u8]) -> error::Result<u8> {
        let configuration = ConfigurationDescriptor::try_from(data)?;
        let mut cursor = DescriptorCursor::new(data, configuration.total_length as usize);

        while let Some(record) = cursor.next_record() {
            let record = record?;
            if record.get(1).copied() != Some(DescriptorType::Interface as u8) {
                continue;
            }
            let interface = match InterfaceDescriptor::try_from(record) {
                Ok(i) => i,
                Err(e) => {
                    log::warn!("Skipping interface: {}", e);
                    continue;
                }
            };
            if interface.is_audio() && interface.audio_subclass() == AudioSubclass::AudioControl {
                return Ok(interface.interface_number);
            }
        }

        Err(Error::not_found("No AudioControl interface in configuration"))
    }

    /// The control interface
    pub fn control(&self) -> error::Result<&ControlTopology> {
        self.control.as_ref().ok_or_else(|| {
            Error::not_found(&format!(
                "AudioControl interface {} not present",
                self.control_interface_number
            ))
        })
    }

    /// Control interface number requested
    pub fn control_interface_number(&self) -> u8 {
        self.control_interface_number
    }

    /// Every alternate setting parsed
    pub fn streams(&self) -> &[StreamTopology] {
        &self.streams
    }

    /// Alternate setting `alt_setting` of streaming interface `interface`
    pub fn stream(&self, interface: u8, alt_setting: u8) -> error::Result<&StreamTopology> {
        self.streams
            .iter()
            .find(|s| s.interface_number == interface && s.alt_setting == alt_setting)
            .ok_or_else(|| {
                Error::not_found(&format!(
                    "No alternate setting {} of interface {}",
                    alt_setting, interface
                ))
            })
    }

    fn stream_mut(&mut self, interface: u8, alt_setting: u8) -> error::Result<&mut StreamTopology> {
        self.streams
            .iter_mut()
            .find(|s| s.interface_number == interface && s.alt_setting == alt_setting)
            .ok_or_else(|| {
                Error::not_found(&format!(
                    "No alternate setting {} of interface {}",
                    alt_setting, interface
                ))
            })
    }

    /// Apply `f` to a stream, [`ErrorKind::NotFound`] for a missing stream or a `None` result
    fn stream_query<'a, T>(
        &'a self,
        interface: u8,
        alt_setting: u8,
        what: &str,
        f: impl FnOnce(&'a StreamTopology) -> Option<T>,
    ) -> error::Result<T> {
        f(self.stream(interface, alt_setting)?).ok_or_else(|| {
            Error::not_found(&format!(
                "Interface {} alt {} has no {}",
                interface, alt_setting, what
            ))
        })
    }

    /// At least one alternate setting was parsed
    pub fn has_audio_streaming_interfaces(&self) -> bool {
        !self.streams.is_empty()
    }

    /// Lowest numbered controlled streaming interface
    pub fn first_stream_interface_number(&self) -> error::Result<u8> {
        self.control()?
            .stream_interface_numbers()
            .iter()
            .min()
            .copied()
            .ok_or_else(|| Error::not_found("No streaming interfaces"))
    }

    /// Number of controlled streaming interfaces
    pub fn num_stream_interfaces(&self) -> usize {
        self.control
            .as_ref()
            .map(|c| c.num_stream_interfaces())
            .unwrap_or(0)
    }

    /// Number of alternate settings parsed for `interface`
    pub fn num_alt_settings(&self, interface: u8) -> usize {
        self.streams
            .iter()
            .filter(|s| s.interface_number == interface)
            .count()
    }

    /// Parsed alternate setting numbers of `interface` in ascending order; skipped settings leave gaps
    fn alt_settings(&self, interface: u8) -> Vec<u8> {
        let mut alts: Vec<u8> = self
            .streams
            .iter()
            .filter(|s| s.interface_number == interface)
            .map(|s| s.alt_setting)
            .collect();
        alts.sort_unstable();
        alts.dedup();
        alts
    }

    /// Alternate setting 0 has an isochronous streaming endpoint; usually it is the zero bandwidth setting
    pub fn alternate_setting_zero_can_stream(&self, interface: u8) -> bool {
        self.stream(interface, 0)
            .map(|s| s.can_stream())
            .unwrap_or(false)
    }

    /// Merge candidate sample rates into one alternate setting; see [`StreamTopology::add_sample_rates`]
    pub fn add_sample_rates(
        &mut self,
        interface: u8,
        alt_setting: u8,
        rates: &[u32],
    ) -> error::Result<usize> {
        self.stream_mut(interface, alt_setting)?
            .add_sample_rates(rates)
    }

    /// Merge candidate sample rates into every UAC2 alternate setting that can stream, returning the total added
    pub fn add_sample_rates_to_all(&mut self, rates: &[u32]) -> usize {
        self.streams
            .iter_mut()
            .filter(|s| s.protocol == UacProtocol::Uac2 && s.can_stream())
            .map(|s| match s.add_sample_rates(rates) {
                Ok(n) => n,
                Err(e) => {
                    log::debug!("Interface {} alt {}: {}", s.interface_number, s.alt_setting, e);
                    0
                }
            })
            .sum()
    }

    /// Rate is supported by the alternate setting; false when it does not exist
    pub fn verify_sample_rate_is_supported(&self, interface: u8, alt_setting: u8, rate: u32) -> bool {
        self.stream(interface, alt_setting)
            .map(|s| s.verify_sample_rate_is_supported(rate))
            .unwrap_or(false)
    }

    fn next_alt_setting_where(
        &self,
        interface: u8,
        start: u8,
        what: &str,
        f: impl Fn(&StreamTopology) -> bool,
    ) -> error::Result<u8> {
        self.alt_settings(interface)
            .into_iter()
            .filter(|&alt| alt >= start)
            .find(|&alt| self.stream(interface, alt).map(&f).unwrap_or(false))
            .ok_or_else(|| {
                Error::not_found(&format!(
                    "No alternate setting of interface {} from {} with {}",
                    interface, start, what
                ))
            })
    }

    /// First alternate setting from `start` with `channels` channels
    pub fn next_alt_setting_with_channels(
        &self,
        interface: u8,
        start: u8,
        channels: u8,
    ) -> error::Result<u8> {
        self.next_alt_setting_where(interface, start, "channel count", |s| {
            s.num_channels == channels
        })
    }

    /// First alternate setting from `start` with bit resolution `sample_size`
    pub fn next_alt_setting_with_sample_size(
        &self,
        interface: u8,
        start: u8,
        sample_size: u8,
    ) -> error::Result<u8> {
        self.next_alt_setting_where(interface, start, "sample size", |s| {
            s.bit_resolution == sample_size
        })
    }

    /// First alternate setting from `start` supporting `rate`
    pub fn next_alt_setting_with_sample_rate(
        &self,
        interface: u8,
        start: u8,
        rate: u32,
    ) -> error::Result<u8> {
        self.next_alt_setting_where(interface, start, "sample rate", |s| {
            s.verify_sample_rate_is_supported(rate)
        })
    }

    /// Alternate setting matching channel count, sample size and, unless 0, sample rate
    ///
    /// Starts at alternate setting 0 only when it can stream and ignores settings with an undefined format.
    pub fn alt_setting_with_settings(
        &self,
        interface: u8,
        channels: u8,
        sample_size: u8,
        sample_rate: u32,
    ) -> error::Result<u8> {
        let alts = self.alt_settings(interface);
        let mut from: u8 = if self.alternate_setting_zero_can_stream(interface) {
            0
        } else {
            1
        };

        while let Some(alt) = alts.iter().copied().find(|&a| a >= from) {
            let defined = self
                .stream(interface, alt)
                .map(|s| format_tag::is_defined(s.format_tag))
                .unwrap_or(false);

            let mut candidate = alt;
            if defined {
                candidate = match self.next_alt_setting_with_channels(interface, alt, channels) {
                    Ok(c) => c,
                    Err(_) => break,
                };
                log::trace!("Examining interface {} alt {}", interface, candidate);

                let size_matches = self
                    .next_alt_setting_with_sample_size(interface, candidate, sample_size)
                    .map(|c| c == candidate)
                    .unwrap_or(false);
                let rate_matches = sample_rate == 0
                    || self
                        .next_alt_setting_with_sample_rate(interface, candidate, sample_rate)
                        .map(|c| c == candidate)
                        .unwrap_or(false);
                if size_matches && rate_matches {
                    return Ok(candidate);
                }
            }

            from = match candidate.checked_add(1) {
                Some(c) => c,
                None => break,
            };
        }

        Err(Error::not_found(&format!(
            "No alternate setting of interface {} with {} channels, {} bit, {} Hz",
            interface, channels, sample_size, sample_rate
        )))
    }

    /// Format tag of an alternate setting
    pub fn format_tag(&self, interface: u8, alt_setting: u8) -> error::Result<u16> {
        self.stream(interface, alt_setting).map(|s| s.format_tag)
    }

    /// Channel count of an alternate setting
    pub fn num_channels(&self, interface: u8, alt_setting: u8) -> error::Result<u8> {
        self.stream(interface, alt_setting).map(|s| s.num_channels)
    }

    /// Bit resolution of an alternate setting
    pub fn bit_resolution(&self, interface: u8, alt_setting: u8) -> error::Result<u8> {
        self.stream(interface, alt_setting).map(|s| s.bit_resolution)
    }

    /// Subframe (subslot) size of an alternate setting
    pub fn subframe_size(&self, interface: u8, alt_setting: u8) -> error::Result<u8> {
        self.stream(interface, alt_setting).map(|s| s.subframe_size)
    }

    /// Terminal linked to an alternate setting
    pub fn terminal_link(&self, interface: u8, alt_setting: u8) -> error::Result<u8> {
        self.stream_query(interface, alt_setting, "terminal link", |s| s.terminal_link)
    }

    /// Sample rates of an alternate setting
    pub fn sample_rates(&self, interface: u8, alt_setting: u8) -> error::Result<&SampleRates> {
        self.stream(interface, alt_setting).map(|s| &s.sample_rates)
    }

    /// Highest sample rate of an alternate setting
    pub fn highest_sample_rate(&self, interface: u8, alt_setting: u8) -> error::Result<u32> {
        self.stream_query(interface, alt_setting, "sample rates", |s| s.highest_sample_rate())
    }

    /// Lowest sample rate of an alternate setting
    pub fn lowest_sample_rate(&self, interface: u8, alt_setting: u8) -> error::Result<u32> {
        self.stream_query(interface, alt_setting, "sample rates", |s| s.lowest_sample_rate())
    }

    /// Discrete sample rate count of an alternate setting
    pub fn num_sample_rates(&self, interface: u8, alt_setting: u8) -> error::Result<usize> {
        self.stream(interface, alt_setting).map(|s| s.num_sample_rates())
    }

    /// Address of the first endpoint in `direction`
    pub fn isoc_endpoint_address(
        &self,
        interface: u8,
        alt_setting: u8,
        direction: Direction,
    ) -> error::Result<u8> {
        self.stream_query(interface, alt_setting, "endpoint in that direction", |s| {
            s.isoc_endpoint_address(direction)
        })
    }

    /// Direction of the endpoint at `index`
    pub fn isoc_endpoint_direction(
        &self,
        interface: u8,
        alt_setting: u8,
        index: usize,
    ) -> error::Result<Direction> {
        self.stream_query(interface, alt_setting, "endpoint at that index", |s| {
            s.isoc_endpoint_direction(index)
        })
    }

    /// bInterval of the isochronous data endpoint in `direction`
    pub fn isoc_endpoint_interval(
        &self,
        interface: u8,
        alt_setting: u8,
        direction: Direction,
    ) -> error::Result<u8> {
        self.stream_query(interface, alt_setting, "isochronous data endpoint", |s| {
            s.isoc_endpoint_interval(direction)
        })
    }

    /// Max packet size of the first endpoint in `direction`
    pub fn isoc_endpoint_max_packet_size(
        &self,
        interface: u8,
        alt_setting: u8,
        direction: Direction,
    ) -> error::Result<u16> {
        self.stream_query(interface, alt_setting, "endpoint in that direction", |s| {
            s.isoc_endpoint_max_packet_size(direction)
        })
    }

    /// Sync type of endpoint `address`
    pub fn isoc_endpoint_sync_type(
        &self,
        interface: u8,
        alt_setting: u8,
        address: u8,
    ) -> error::Result<SyncType> {
        self.stream_query(interface, alt_setting, "such endpoint", |s| {
            s.isoc_endpoint_sync_type(address)
        })
    }

    /// Synch endpoint paired with data endpoint `address`
    pub fn isoc_associated_endpoint_address(
        &self,
        interface: u8,
        alt_setting: u8,
        address: u8,
    ) -> error::Result<u8> {
        self.stream_query(interface, alt_setting, "associated endpoint", |s| {
            s.isoc_associated_endpoint_address(address)
        })
    }

    /// Max packet size of synch endpoint `address`
    pub fn isoc_associated_endpoint_max_packet_size(
        &self,
        interface: u8,
        alt_setting: u8,
        address: u8,
    ) -> error::Result<u16> {
        self.stream_query(interface, alt_setting, "such endpoint", |s| {
            s.isoc_associated_endpoint_max_packet_size(address)
        })
    }

    /// Refresh of synch endpoint `address`
    pub fn isoc_associated_endpoint_refresh(
        &self,
        interface: u8,
        alt_setting: u8,
        address: u8,
    ) -> error::Result<u8> {
        self.stream_query(interface, alt_setting, "refresh", |s| {
            s.isoc_associated_endpoint_refresh(address)
        })
    }

    /// Data endpoint sampling frequency control
    pub fn has_sample_frequency_control(&self, interface: u8, alt_setting: u8) -> bool {
        self.stream(interface, alt_setting)
            .map(|s| s.has_sample_frequency_control())
            .unwrap_or(false)
    }

    /// Data endpoint pitch control
    pub fn has_pitch_control(&self, interface: u8, alt_setting: u8) -> bool {
        self.stream(interface, alt_setting)
            .map(|s| s.has_pitch_control())
            .unwrap_or(false)
    }

    /// Data endpoint requires max size packets
    pub fn has_max_packets_only(&self, interface: u8, alt_setting: u8) -> bool {
        self.stream(interface, alt_setting)
            .map(|s| s.has_max_packets_only())
            .unwrap_or(false)
    }

    /// Lock delay of the data endpoint
    pub fn lock_delay(&self, interface: u8, alt_setting: u8) -> error::Result<u16> {
        self.stream_query(interface, alt_setting, "isochronous endpoint descriptor", |s| s.lock_delay())
    }

    /// bcdADC of the control interface
    pub fn adc_version(&self) -> error::Result<crate::usb::Version> {
        self.control().map(|c| c.adc_version())
    }

    /// Protocol of the control interface
    pub fn protocol(&self) -> error::Result<UacProtocol> {
        self.control().map(|c| c.protocol())
    }

    /// Feature unit feeding output terminal `terminal_id`; see [`ControlTopology::feature_unit_upstream_of_output_terminal`]
    pub fn feature_unit_upstream_of_output_terminal(&self, terminal_id: u8) -> error::Result<u8> {
        self.control()?
            .feature_unit_upstream_of_output_terminal(terminal_id)
    }

    /// Feature unit channel mute control
    pub fn channel_has_mute_control(&self, feature_unit_id: u8, channel: u8) -> bool {
        self.control()
            .map(|c| c.channel_has_mute_control(feature_unit_id, channel))
            .unwrap_or(false)
    }

    /// Feature unit channel volume control
    pub fn channel_has_volume_control(&self, feature_unit_id: u8, channel: u8) -> bool {
        self.control()
            .map(|c| c.channel_has_volume_control(feature_unit_id, channel))
            .unwrap_or(false)
    }

    /// Feature unit master mute control
    pub fn master_has_mute_control(&self, feature_unit_id: u8) -> bool {
        self.channel_has_mute_control(feature_unit_id, 0)
    }

    /// Clock source frequency control
    pub fn clock_source_has_frequency_control(&self, clock_id: u8, want_programmable: bool) -> bool {
        self.control()
            .map(|c| c.clock_source_has_frequency_control(clock_id, want_programmable))
            .unwrap_or(false)
    }

    /// Clock source validity control
    pub fn clock_source_has_validity_control(&self, clock_id: u8) -> bool {
        self.control()
            .map(|c| c.clock_source_has_validity_control(clock_id))
            .unwrap_or(false)
    }

    /// Clock source type
    pub fn clock_source_type(&self, clock_id: u8) -> error::Result<ClockType> {
        self.control()?.clock_source_type(clock_id)
    }

    /// Clock entities referenced by terminals
    pub fn terminal_clock_entities(&self) -> error::Result<Vec<u8>> {
        self.control().map(|c| c.terminal_clock_entities())
    }

    /// Upstream IDs of a multi-source unit
    pub fn get_source_ids(&self, unit_id: u8) -> error::Result<Vec<u8>> {
        self.control()?.get_source_ids(unit_id)
    }

    /// Upstream ID of a single-source unit
    pub fn source_id(&self, unit_id: u8) -> error::Result<u8> {
        self.control()?.source_id(unit_id)
    }

    /// Clock entity a terminal derives its timing from
    pub fn clock_source_id(&self, unit_id: u8) -> error::Result<u8> {
        self.control()?.clock_source_id(unit_id)
    }

    /// Number of upstream IDs of a unit
    pub fn num_sources(&self, unit_id: u8) -> error::Result<usize> {
        self.control()?.num_sources(unit_id)
    }

    /// Raw descriptor subtype of a unit
    pub fn subtype(&self, unit_id: u8) -> error::Result<u8> {
        self.control()?.subtype(unit_id)
    }

    /// String descriptor index of a unit
    pub fn string_index(&self, unit_id: u8) -> error::Result<u8> {
        self.control()?.string_index(unit_id)
    }

    /// Channel cluster of a unit
    pub fn audio_cluster(&self, unit_id: u8) -> error::Result<&AudioCluster> {
        self.control()?.audio_cluster(unit_id)
    }

    /// Per-channel control count of a feature unit
    pub fn num_controls(&self, feature_unit_id: u8) -> error::Result<usize> {
        self.control()?.num_controls(feature_unit_id)
    }

    /// Terminal associated with a clock source
    pub fn clock_source_assoc_terminal(&self, clock_id: u8) -> error::Result<u8> {
        self.control()?.clock_source_assoc_terminal(clock_id)
    }

    /// wTerminalType of input terminal `id`
    pub fn input_terminal_type(&self, id: u8) -> error::Result<u16> {
        self.control()?.input_terminal_type(id)
    }

    /// wTerminalType of output terminal `id`
    pub fn output_terminal_type(&self, id: u8) -> error::Result<u16> {
        self.control()?.output_terminal_type(id)
    }

    /// ID of the `index`th input terminal
    pub fn indexed_input_terminal_id(&self, index: usize) -> error::Result<u8> {
        self.control()?.indexed_input_terminal_id(index)
    }

    /// Type of the `index`th input terminal
    pub fn indexed_input_terminal_type(&self, index: usize) -> error::Result<u16> {
        self.control()?.indexed_input_terminal_type(index)
    }

    /// ID of the `index`th output terminal
    pub fn indexed_output_terminal_id(&self, index: usize) -> error::Result<u8> {
        self.control()?.indexed_output_terminal_id(index)
    }

    /// Type of the `index`th output terminal
    pub fn indexed_output_terminal_type(&self, index: usize) -> error::Result<u16> {
        self.control()?.indexed_output_terminal_type(index)
    }

    /// ID of the `index`th feature unit
    pub fn indexed_feature_unit_id(&self, index: usize) -> error::Result<u8> {
        self.control()?.indexed_feature_unit_id(index)
    }

    /// ID of the `index`th mixer unit
    pub fn indexed_mixer_unit_id(&self, index: usize) -> error::Result<u8> {
        self.control()?.indexed_mixer_unit_id(index)
    }

    /// ID of the `index`th selector unit
    pub fn indexed_selector_unit_id(&self, index: usize) -> error::Result<u8> {
        self.control()?.indexed_selector_unit_id(index)
    }

    /// ID of the `index`th clock source
    pub fn indexed_clock_source_id(&self, index: usize) -> error::Result<u8> {
        self.control()?.indexed_clock_source_id(index)
    }

    /// ID of the `index`th clock selector
    pub fn indexed_clock_selector_id(&self, index: usize) -> error::Result<u8> {
        self.control()?.indexed_clock_selector_id(index)
    }

    /// ID of the `index`th clock multiplier
    pub fn indexed_clock_multiplier_id(&self, index: usize) -> error::Result<u8> {
        self.control()?.indexed_clock_multiplier_id(index)
    }

    /// Input terminal count; 0 without a control interface
    pub fn num_input_terminals(&self) -> usize {
        self.control().map(|c| c.num_input_terminals()).unwrap_or(0)
    }

    /// Output terminal count; 0 without a control interface
    pub fn num_output_terminals(&self) -> usize {
        self.control().map(|c| c.num_output_terminals()).unwrap_or(0)
    }

    /// Selector unit count; 0 without a control interface
    pub fn num_selector_units(&self) -> usize {
        self.control().map(|c| c.num_selector_units()).unwrap_or(0)
    }

    /// Clock source count; 0 without a control interface
    pub fn num_clock_sources(&self) -> usize {
        self.control().map(|c| c.num_clock_sources()).unwrap_or(0)
    }

    /// Clock selector count; 0 without a control interface
    pub fn num_clock_selectors(&self) -> usize {
        self.control().map(|c| c.num_clock_selectors()).unwrap_or(0)
    }

    /// Clock multiplier count; 0 without a control interface
    pub fn num_clock_multipliers(&self) -> usize {
        self.control().map(|c| c.num_clock_multipliers()).unwrap_or(0)
    }

    /// Control interface has a status interrupt endpoint
    pub fn has_interrupt_endpoint(&self) -> bool {
        self.control()
            .map(|c| c.has_interrupt_endpoint())
            .unwrap_or(false)
    }

    /// Address of the status interrupt endpoint
    pub fn interrupt_endpoint_address(&self) -> error::Result<u8> {
        self.control()?
            .interrupt_endpoint_address()
            .ok_or_else(|| Error::not_found("No interrupt endpoint"))
    }

    /// bInterval of the status interrupt endpoint
    pub fn interrupt_endpoint_interval(&self) -> error::Result<u8> {
        self.control()?
            .interrupt_endpoint_interval()
            .ok_or_else(|| Error::not_found("No interrupt endpoint"))
    }

    /// Endpoint of an alternate setting by address
    pub fn endpoint_by_address(
        &self,
        interface: u8,
        alt_setting: u8,
        address: u8,
    ) -> error::Result<&Endpoint> {
        self.stream_query(interface, alt_setting, "such endpoint", |s| {
            s.endpoint_by_address(address)
        })
    }

    /// Lock delay units of the data endpoint
    pub fn lock_delay_units(&self, interface: u8, alt_setting: u8) -> error::Result<LockDelayUnits> {
        self.stream_query(interface, alt_setting, "isochronous endpoint descriptor", |s| {
            s.lock_delay_units()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rustfmt::skip]
    fn uac1_config() -> Vec<u8> {
        let mut data = vec![
            // configuration, total patched below
            9, 0x02, 0, 0, 2, 1, 0, 0x80, 50,
            // AC interface 0
            9, 0x04, 0, 0, 0, 1, 1, 0x00, 0,
            9, 0x24, 0x01, 0x00, 0x01, 0x1e, 0x00, 1, 1,
            12, 0x24, 0x02, 1, 0x01, 0x01, 0, 2, 0x03, 0x00, 0, 0,
            9, 0x24, 0x03, 2, 0x01, 0x03, 0, 1, 0,
            // AS interface 1 alt 0
            9, 0x04, 1, 0, 0, 1, 2, 0x00, 0,
            // alt 1
            9, 0x04, 1, 1, 1, 1, 2, 0x00, 0,
            7, 0x24, 0x01, 1, 1, 0x01, 0x00,
            11, 0x24, 0x02, 1, 2, 2, 16, 1, 0x80, 0xbb, 0x00,
            9, 0x05, 0x01, 0x09, 0xc0, 0x00, 1, 0, 0,
            7, 0x25, 0x01, 0x01, 0, 0x00, 0x00,
        ];
        let total = data.len() as u16;
        data[2..4].copy_from_slice(&total.to_le_bytes());
        data
    }

    #[test]
    fn test_parse_uac1() {
        let data = uac1_config();
        let model = ConfigurationModel::parse(&data, 0).unwrap();
        assert_eq!(model.consumed_length, model.total_length);
        assert_eq!(model.streams.len(), 2);
        assert_eq!(model.num_alt_settings(1), 2);
        assert_eq!(model.first_stream_interface_number().unwrap(), 1);
        assert!(!model.alternate_setting_zero_can_stream(1));
        assert_eq!(model.num_channels(1, 1).unwrap(), 2);
        assert_eq!(model.highest_sample_rate(1, 1).unwrap(), 48000);
        assert!(model.verify_sample_rate_is_supported(1, 1, 48000));
        assert_eq!(model.alt_setting_with_settings(1, 2, 16, 48000).unwrap(), 1);
        assert_eq!(model.alt_setting_with_settings(1, 2, 16, 0).unwrap(), 1);
        assert!(model.alt_setting_with_settings(1, 2, 24, 0).is_err());
        assert!(model.alt_setting_with_settings(1, 2, 16, 44100).is_err());
        assert_eq!(model.feature_unit_upstream_of_output_terminal(2).unwrap(), 1);
    }

    #[test]
    fn test_first_control_interface() {
        let data = uac1_config();
        assert_eq!(ConfigurationModel::first_control_interface(&data).unwrap(), 0);

        // short interface record ahead of the AudioControl interface
        let mut data = uac1_config();
        data.splice(9..9, [5, 0x04, 7, 0, 0]);
        let total = data.len() as u16;
        data[2..4].copy_from_slice(&total.to_le_bytes());
        assert_eq!(ConfigurationModel::first_control_interface(&data).unwrap(), 0);
    }

    #[test]
    fn test_missing_control_interface() {
        let data = uac1_config();
        assert!(ConfigurationModel::parse(&data, 3).unwrap_err().is_not_found());
    }

    #[test]
    fn test_empty_and_bad_config() {
        assert_eq!(
            ConfigurationModel::parse(&[], 0).unwrap_err().kind(),
            ErrorKind::Malformed
        );
        assert!(matches!(
            ConfigurationModel::parse(&[9, 2, 0], 0).unwrap_err().kind(),
            ErrorKind::Truncated(_)
        ));
        assert_eq!(
            ConfigurationModel::parse(&[9, 4, 0, 0, 0, 1, 1, 0, 0], 0)
                .unwrap_err()
                .kind(),
            ErrorKind::Malformed
        );
    }

    #[test]
    fn test_unsupported_control_protocol() {
        let mut data = uac1_config();
        // bInterfaceProtocol of the AC interface
        data[9 + 7] = 0x30;
        assert_eq!(
            ConfigurationModel::parse(&data, 0).unwrap_err().kind(),
            ErrorKind::Unsupported
        );
    }
}
