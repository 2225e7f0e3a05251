//! AudioStreaming interface alternate settings: format, sample rates and endpoints
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::error::{self, Error, ErrorKind};
use crate::usb::descriptors::audio::{
    self, AudioDataStreamingEndpoint, AudioFormatType, AudioStreamingInterface1,
    AudioStreamingInterface2, EncodedFormat, FormatType, LockDelayUnits, UacAsInterface,
    UacProtocol,
};
use crate::usb::descriptors::{
    record_body, DescriptorCursor, DescriptorType, EndpointDescriptor, InterfaceDescriptor,
};
use crate::usb::{high_bandwidth_packet_size, Direction, Endpoint, SyncType};

/// Sample rates of an alternate setting: a discrete list or a single continuous range, never both
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleRates {
    /// Discrete rates in descriptor then insertion order
    Discrete(Vec<u32>),
    /// Inclusive continuous range
    Range {
        /// Lower bound
        low: u32,
        /// Upper bound
        high: u32,
    },
}

impl Default for SampleRates {
    fn default() -> Self {
        SampleRates::Discrete(Vec::new())
    }
}

impl From<&AudioFormatType> for SampleRates {
    fn from(ft: &AudioFormatType) -> Self {
        match (ft.sam_freq_type, ft.sam_freqs.as_slice()) {
            (Some(0), [low, high]) => SampleRates::Range {
                low: *low,
                high: *high,
            },
            _ => SampleRates::Discrete(ft.sam_freqs.clone()),
        }
    }
}

impl SampleRates {
    /// `rate` is an exact discrete entry or lies within the range
    pub fn contains(&self, rate: u32) -> bool {
        match self {
            SampleRates::Discrete(rates) => rates.contains(&rate),
            SampleRates::Range { low, high } => (*low..=*high).contains(&rate),
        }
    }

    /// Highest rate; the range upper bound for a range
    pub fn highest(&self) -> Option<u32> {
        match self {
            SampleRates::Discrete(rates) => rates.iter().max().copied(),
            SampleRates::Range { high, .. } => Some(*high),
        }
    }

    /// Lowest rate; the range lower bound for a range
    pub fn lowest(&self) -> Option<u32> {
        match self {
            SampleRates::Discrete(rates) => rates.iter().min().copied(),
            SampleRates::Range { low, .. } => Some(*low),
        }
    }

    /// Number of discrete rates, 0 for a range
    pub fn len(&self) -> usize {
        match self {
            SampleRates::Discrete(rates) => rates.len(),
            SampleRates::Range { .. } => 0,
        }
    }

    /// No discrete rates
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rates is a continuous range
    pub fn is_range(&self) -> bool {
        matches!(self, SampleRates::Range { .. })
    }
}

/// Decoded CS_ENDPOINT EP_GENERAL of the isochronous data endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsocEndpointCapabilities {
    /// Sampling frequency control (UAC1 only)
    pub sample_freq_control: bool,
    /// Pitch control
    pub pitch_control: bool,
    /// Only packets of wMaxPacketSize
    pub max_packets_only: bool,
    /// Unit of `lock_delay`
    pub lock_delay_units: LockDelayUnits,
    /// Time to lock the internal clock recovery
    pub lock_delay: u16,
}

impl From<&AudioDataStreamingEndpoint> for IsocEndpointCapabilities {
    fn from(ep: &AudioDataStreamingEndpoint) -> Self {
        IsocEndpointCapabilities {
            sample_freq_control: ep.has_sample_freq_control(),
            pitch_control: ep.has_pitch_control(),
            max_packets_only: ep.has_max_packets_only(),
            lock_delay_units: LockDelayUnits::from(ep.lock_delay_units),
            lock_delay: ep.lock_delay,
        }
    }
}

/// One alternate setting of an AudioStreaming interface
///
/// UAC1 fields such as `delay` and UAC2 fields such as `formats` are `None` for the other protocol.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamTopology {
    /// bInterfaceNumber
    pub interface_number: u8,
    /// bAlternateSetting
    pub alt_setting: u8,
    /// bNumEndpoints declared
    pub num_endpoints: u8,
    /// bInterfaceClass
    pub interface_class: u8,
    /// bInterfaceSubClass
    pub interface_sub_class: u8,
    /// Protocol the interface was parsed with
    pub protocol: UacProtocol,
    /// iInterface
    pub interface_index: u8,
    /// bTerminalLink; terminal the endpoint connects to
    pub terminal_link: Option<u8>,
    /// bDelay; UAC1
    pub delay: Option<u8>,
    /// UAC1 wFormatTag or the tag derived from UAC2 bmFormats
    pub format_tag: u16,
    /// bmFormats; UAC2
    pub formats: Option<u32>,
    /// AS interface bmControls; UAC2
    pub controls: Option<u8>,
    /// bFormatType
    pub format_type: FormatType,
    /// bNrChannels
    pub num_channels: u8,
    /// bmChannelConfig; UAC2
    pub channel_config: Option<u32>,
    /// iChannelNames; UAC2
    pub channel_names_index: Option<u8>,
    /// bSubframeSize (UAC1) or bSubslotSize (UAC2)
    pub subframe_size: u8,
    /// bBitResolution
    pub bit_resolution: u8,
    /// wMaxBitRate; Type II
    pub max_bit_rate: Option<u16>,
    /// wSamplesPerFrame (UAC1) or wSlotsPerFrame (UAC2); Type II
    pub samples_per_frame: Option<u16>,
    /// Supported sample rates
    pub sample_rates: SampleRates,
    /// MPEG or AC-3 specific capabilities
    pub encoded_format: Option<EncodedFormat>,
    /// Endpoints in descriptor order
    pub endpoints: Vec<Endpoint>,
    /// From the CS_ENDPOINT following the data endpoint
    pub isoc_capabilities: Option<IsocEndpointCapabilities>,
}

/// Transactions per 1 ms frame for bInterval; 0 is treated as one transaction and values above 4 as 4
pub fn transactions_per_frame(interval: u8) -> u32 {
    match interval {
        0 => 1,
        i => 8 >> (i.min(4) - 1),
    }
}

impl StreamTopology {
    /// New empty alternate setting from its standard interface descriptor
    pub fn new(interface: &InterfaceDescriptor, protocol: UacProtocol) -> Self {
        StreamTopology {
            interface_number: interface.interface_number,
            alt_setting: interface.alternate_setting,
            num_endpoints: interface.num_endpoints,
            interface_class: interface.interface_class,
            interface_sub_class: interface.interface_sub_class,
            protocol,
            interface_index: interface.interface_index,
            terminal_link: None,
            delay: None,
            format_tag: 0,
            formats: None,
            controls: None,
            format_type: FormatType::Undefined,
            num_channels: 0,
            channel_config: None,
            channel_names_index: None,
            subframe_size: 0,
            bit_resolution: 0,
            max_bit_rate: None,
            samples_per_frame: None,
            sample_rates: SampleRates::default(),
            encoded_format: None,
            endpoints: Vec::new(),
            isoc_capabilities: None,
        }
    }

    /// Walk the records of this alternate setting up to the next interface or association descriptor
    ///
    /// A record that cannot be read from the cursor stops the walk with the error; fields decoded so far are kept. A
    /// complete record whose content cannot be decoded is skipped.
    pub fn parse_body(&mut self, cursor: &mut DescriptorCursor) -> error::Result<()> {
        while !cursor.is_exhausted() {
            let header = cursor.peek_header()?;
            if header.starts_interface() {
                break;
            }
            let record = cursor.take_record(header.length as usize)?;
            log::trace!(
                "Interface {} alt {} record {:?} {:02x?}",
                self.interface_number,
                self.alt_setting,
                header.kind(),
                record
            );

            let ret = match header.kind() {
                DescriptorType::CsInterface => self.parse_cs_interface(record),
                DescriptorType::Endpoint => self.parse_endpoint(record),
                DescriptorType::CsEndpoint => self.parse_cs_endpoint(record),
                _ => Ok(()),
            };
            if let Err(e) = ret {
                log::warn!(
                    "Interface {} alt {}: skipping record: {}",
                    self.interface_number,
                    self.alt_setting,
                    e
                );
            }
        }

        Ok(())
    }

    fn parse_cs_interface(&mut self, record: &[u8]) -> error::Result<()> {
        let subtype = record.get(2).copied().unwrap_or(0);
        let body = record_body(record);

        match UacAsInterface::get_uac_subtype(subtype, self.protocol) {
            UacAsInterface::General => match self.protocol {
                UacProtocol::Uac2 => {
                    let general = AudioStreamingInterface2::try_from(body)?;
                    self.format_tag = general.format_tag();
                    self.terminal_link = Some(general.terminal_link);
                    self.controls = Some(general.controls);
                    self.format_type = FormatType::from(general.format_type);
                    self.formats = Some(general.formats);
                    self.num_channels = general.nr_channels;
                    self.channel_config = Some(general.channel_config);
                    self.channel_names_index = Some(general.channel_names_index);
                }
                _ => {
                    let general = AudioStreamingInterface1::try_from(body)?;
                    self.terminal_link = Some(general.terminal_link);
                    self.delay = Some(general.delay);
                    self.format_tag = general.format_tag;
                }
            },
            UacAsInterface::FormatType => {
                let ft = AudioFormatType::parse(body, self.protocol)?;
                self.format_type = ft.format_type;
                if let Some(n) = ft.nr_channels {
                    self.num_channels = n;
                }
                if let Some(s) = ft.subframe_size {
                    self.subframe_size = s;
                }
                if let Some(b) = ft.bit_resolution {
                    self.bit_resolution = b;
                }
                self.max_bit_rate = ft.max_bit_rate;
                self.samples_per_frame = ft.samples_per_frame;
                if ft.sam_freq_type.is_some() {
                    self.sample_rates = SampleRates::from(&ft);
                }
            }
            UacAsInterface::FormatSpecific => {
                self.encoded_format = EncodedFormat::from_format_specific(body)?;
            }
            UacAsInterface::Decoder => {
                self.encoded_format = EncodedFormat::from_decoder(body)?;
            }
            s => log::debug!("Skipping AS interface subtype {} ({:#04x})", s, subtype),
        }

        Ok(())
    }

    fn parse_endpoint(&mut self, record: &[u8]) -> error::Result<()> {
        let desc = EndpointDescriptor::try_from(record)?;

        if self.protocol == UacProtocol::Uac2 {
            let mut endpoint = Endpoint::new(
                desc.endpoint_address,
                desc.attributes,
                high_bandwidth_packet_size(desc.max_packet_size),
                desc.interval,
            );
            if endpoint.is_isoc_feedback() {
                endpoint.refresh = Some(desc.interval.saturating_sub(4));
                if let Some(data) = self
                    .endpoints
                    .iter_mut()
                    .rev()
                    .find(|e| e.is_isoc_streaming())
                {
                    data.synch_address = Some(desc.endpoint_address);
                }
            }
            self.endpoints.push(endpoint);
        } else {
            let mut endpoint = Endpoint::new(
                desc.endpoint_address,
                desc.attributes,
                desc.max_packet_size,
                desc.interval,
            );
            endpoint.refresh = desc.refresh;
            endpoint.synch_address = desc.synch_address;
            self.endpoints.push(endpoint);
        }

        Ok(())
    }

    fn parse_cs_endpoint(&mut self, record: &[u8]) -> error::Result<()> {
        if record.get(2).copied() != Some(audio::EP_GENERAL) {
            return Ok(());
        }
        let ep = AudioDataStreamingEndpoint::parse(record_body(record), self.protocol)?;
        self.isoc_capabilities = Some(IsocEndpointCapabilities::from(&ep));

        Ok(())
    }

    /// Merge candidate rates, keeping those the data endpoint can carry at its interval
    ///
    /// A rate is skipped when zero, already present, or when `rate / (1000 * transactions) * channels * bytes` exceeds
    /// the max packet size of the first isochronous streaming endpoint. Returns the number of rates added.
    pub fn add_sample_rates(&mut self, candidates: &[u32]) -> error::Result<usize> {
        let rates = match &mut self.sample_rates {
            SampleRates::Discrete(rates) => rates,
            SampleRates::Range { .. } => {
                return Err(Error::new(
                    ErrorKind::Unsupported,
                    &format!(
                        "Interface {} alt {} declares a continuous sample rate range",
                        self.interface_number, self.alt_setting
                    ),
                ))
            }
        };
        let endpoint = self
            .endpoints
            .iter()
            .find(|e| e.is_isoc_streaming())
            .ok_or_else(|| {
                Error::not_found(&format!(
                    "Interface {} alt {} has no isochronous streaming endpoint",
                    self.interface_number, self.alt_setting
                ))
            })?;

        let transactions = transactions_per_frame(endpoint.interval);
        let frame_bytes = self.num_channels as u64 * (self.bit_resolution as u64 / 8);
        let mut added = 0;
        for &rate in candidates {
            if rate == 0 || rates.contains(&rate) {
                continue;
            }
            let avg_frame_size = (rate / (1000 * transactions)) as u64 * frame_bytes;
            if avg_frame_size <= endpoint.max_packet_size as u64 {
                rates.push(rate);
                added += 1;
            } else {
                log::debug!(
                    "Rate {} needs {} bytes per transaction, more than the {} of endpoint {:#04x}",
                    rate,
                    avg_frame_size,
                    endpoint.max_packet_size,
                    endpoint.address.address
                );
            }
        }

        Ok(added)
    }

    /// Rate is one of the discrete rates or within the range
    pub fn verify_sample_rate_is_supported(&self, rate: u32) -> bool {
        self.sample_rates.contains(rate)
    }

    /// Highest supported rate
    pub fn highest_sample_rate(&self) -> Option<u32> {
        self.sample_rates.highest()
    }

    /// Lowest supported rate
    pub fn lowest_sample_rate(&self) -> Option<u32> {
        self.sample_rates.lowest()
    }

    /// Discrete rate count
    pub fn num_sample_rates(&self) -> usize {
        self.sample_rates.len()
    }

    /// Endpoints carrying audio data
    pub fn isoc_streaming_endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.iter().filter(|e| e.is_isoc_streaming())
    }

    /// Has at least one isochronous streaming endpoint
    pub fn can_stream(&self) -> bool {
        self.isoc_streaming_endpoints().next().is_some()
    }

    fn first_with_direction(&self, direction: Direction) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.direction() == direction)
    }

    /// Address of the first endpoint in `direction`
    pub fn isoc_endpoint_address(&self, direction: Direction) -> Option<u8> {
        self.first_with_direction(direction).map(|e| e.address.address)
    }

    /// Direction of the endpoint at `index`
    pub fn isoc_endpoint_direction(&self, index: usize) -> Option<Direction> {
        self.endpoints.get(index).map(|e| e.direction())
    }

    /// bInterval of the first endpoint in `direction`, when it carries audio data
    pub fn isoc_endpoint_interval(&self, direction: Direction) -> Option<u8> {
        self.first_with_direction(direction)
            .filter(|e| e.is_isoc_streaming())
            .map(|e| e.interval)
    }

    /// Max packet size of the first endpoint in `direction`
    pub fn isoc_endpoint_max_packet_size(&self, direction: Direction) -> Option<u16> {
        self.first_with_direction(direction)
            .map(|e| e.max_packet_size)
    }

    /// Endpoint with bEndpointAddress `address`
    pub fn endpoint_by_address(&self, address: u8) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.address.address == address)
    }

    /// Sync type of endpoint `address`
    pub fn isoc_endpoint_sync_type(&self, address: u8) -> Option<SyncType> {
        self.endpoint_by_address(address).map(|e| e.sync_type)
    }

    /// Synch endpoint address paired with data endpoint `address`
    pub fn isoc_associated_endpoint_address(&self, address: u8) -> Option<u8> {
        self.endpoint_by_address(address)
            .and_then(|e| e.synch_address)
    }

    /// Max packet size of the associated (synch) endpoint `address`
    pub fn isoc_associated_endpoint_max_packet_size(&self, address: u8) -> Option<u16> {
        self.endpoint_by_address(address).map(|e| e.max_packet_size)
    }

    /// bRefresh of the associated (synch) endpoint `address`
    pub fn isoc_associated_endpoint_refresh(&self, address: u8) -> Option<u8> {
        self.endpoint_by_address(address).and_then(|e| e.refresh)
    }

    /// Data endpoint supports a sampling frequency control
    pub fn has_sample_frequency_control(&self) -> bool {
        self.isoc_capabilities
            .as_ref()
            .map(|c| c.sample_freq_control)
            .unwrap_or(false)
    }

    /// Data endpoint supports a pitch control
    pub fn has_pitch_control(&self) -> bool {
        self.isoc_capabilities
            .as_ref()
            .map(|c| c.pitch_control)
            .unwrap_or(false)
    }

    /// Data endpoint requires full size packets
    pub fn has_max_packets_only(&self) -> bool {
        self.isoc_capabilities
            .as_ref()
            .map(|c| c.max_packets_only)
            .unwrap_or(false)
    }

    /// wLockDelay
    pub fn lock_delay(&self) -> Option<u16> {
        self.isoc_capabilities.as_ref().map(|c| c.lock_delay)
    }

    /// bLockDelayUnits
    pub fn lock_delay_units(&self) -> Option<LockDelayUnits> {
        self.isoc_capabilities.as_ref().map(|c| c.lock_delay_units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interface(number: u8, alt: u8, protocol: u8) -> InterfaceDescriptor {
        InterfaceDescriptor::try_from(&[9, 4, number, alt, 1, 1, 2, protocol, 0][..]).unwrap()
    }

    fn parse(records: &[u8], protocol: UacProtocol) -> (StreamTopology, error::Result<()>) {
        let mut stream = StreamTopology::new(&interface(1, 1, protocol as u8), protocol);
        let mut cursor = DescriptorCursor::new(records, records.len());
        let ret = stream.parse_body(&mut cursor);
        (stream, ret)
    }

    #[rustfmt::skip]
    const UAC1_ALT: &[u8] = &[
        // AS_GENERAL: link 1, delay 1, PCM
        7, 0x24, 0x01, 1, 1, 0x01, 0x00,
        // FORMAT_TYPE I: 2 ch, 2 byte, 16 bit, 2 rates
        14, 0x24, 0x02, 1, 2, 2, 16, 2, 0x44, 0xac, 0x00, 0x80, 0xbb, 0x00,
        // iso adaptive data OUT, 192 bytes
        9, 0x05, 0x01, 0x09, 0xc0, 0x00, 1, 0, 0,
        // EP_GENERAL: sample freq control
        7, 0x25, 0x01, 0x01, 0, 0x00, 0x00,
        // next interface stops the walk
        9, 4, 1, 2, 1, 1, 2, 0, 0,
    ];

    #[test]
    fn test_uac1_alt_setting() {
        let (stream, ret) = parse(UAC1_ALT, UacProtocol::Uac1);
        assert!(ret.is_ok());
        assert_eq!(stream.terminal_link, Some(1));
        assert_eq!(stream.format_tag, audio::format_tag::PCM);
        assert_eq!(stream.num_channels, 2);
        assert_eq!(stream.bit_resolution, 16);
        assert_eq!(stream.sample_rates, SampleRates::Discrete(vec![44100, 48000]));
        assert_eq!(stream.endpoints.len(), 1);
        assert_eq!(stream.isoc_endpoint_address(Direction::Out), Some(0x01));
        assert_eq!(stream.isoc_endpoint_interval(Direction::Out), Some(1));
        assert_eq!(stream.isoc_endpoint_address(Direction::In), None);
        assert!(stream.has_sample_frequency_control());
        assert!(!stream.has_pitch_control());
        assert!(stream.verify_sample_rate_is_supported(48000));
        assert!(!stream.verify_sample_rate_is_supported(96000));
        assert_eq!(stream.highest_sample_rate(), Some(48000));
        assert_eq!(stream.lowest_sample_rate(), Some(44100));
    }

    #[test]
    fn test_truncated_format_type_keeps_general() {
        let (stream, ret) = parse(&UAC1_ALT[..12], UacProtocol::Uac1);
        assert!(matches!(ret.unwrap_err().kind(), ErrorKind::Truncated(_)));
        assert_eq!(stream.terminal_link, Some(1));
        assert_eq!(stream.format_tag, audio::format_tag::PCM);
        assert_eq!(stream.num_channels, 0);
    }

    #[rustfmt::skip]
    const UAC2_ALT: &[u8] = &[
        // AS_GENERAL: link 2, controls 0, type I, PCM, 2 ch
        16, 0x24, 0x01, 2, 0, 1, 0x01, 0, 0, 0, 2, 0x03, 0, 0, 0, 0,
        // FORMAT_TYPE I: 4 byte subslot, 24 bit
        6, 0x24, 0x02, 1, 4, 24,
        // iso async data IN, 2 transactions of 0x188
        7, 0x05, 0x81, 0x05, 0x88, 0x09, 1,
        // EP_GENERAL: pitch r/w
        8, 0x25, 0x01, 0x00, 0x03, 0, 0x00, 0x00,
        // iso feedback OUT
        7, 0x05, 0x02, 0x11, 0x04, 0x00, 4,
    ];

    #[test]
    fn test_uac2_alt_setting_endpoints() {
        let (stream, ret) = parse(UAC2_ALT, UacProtocol::Uac2);
        assert!(ret.is_ok());
        assert_eq!(stream.format_tag, audio::format_tag::PCM);
        assert_eq!(stream.num_channels, 2);
        assert_eq!(stream.subframe_size, 4);
        assert_eq!(stream.bit_resolution, 24);
        assert!(stream.sample_rates.is_empty());
        assert_eq!(stream.endpoints.len(), 2);
        assert_eq!(stream.isoc_endpoint_max_packet_size(Direction::In), Some(0x188 * 2));
        assert_eq!(stream.isoc_associated_endpoint_address(0x81), Some(0x02));
        assert_eq!(stream.isoc_associated_endpoint_refresh(0x02), Some(0));
        assert_eq!(stream.isoc_endpoint_sync_type(0x81), Some(SyncType::Asynchronous));
        assert_eq!(stream.isoc_endpoint_direction(1), Some(Direction::Out));
        assert!(stream.has_pitch_control());
        assert!(!stream.has_sample_frequency_control());
    }

    #[test]
    fn test_add_sample_rates_feasibility() {
        let (mut stream, _) = parse(UAC2_ALT, UacProtocol::Uac2);
        // 8 transactions at bInterval 1, 6 bytes per sample frame: 1536000 needs 1152 > 784
        let added = stream.add_sample_rates(&[48000, 0, 96000, 48000, 1_536_000]).unwrap();
        assert_eq!(added, 2);
        assert_eq!(stream.sample_rates, SampleRates::Discrete(vec![48000, 96000]));
        assert_eq!(stream.add_sample_rates(&[96000]).unwrap(), 0);
        assert_eq!(stream.num_sample_rates(), 2);
    }

    #[test]
    fn test_add_sample_rates_errors() {
        let (mut stream, _) = parse(UAC2_ALT, UacProtocol::Uac2);
        stream.sample_rates = SampleRates::Range {
            low: 8000,
            high: 96000,
        };
        assert_eq!(
            stream.add_sample_rates(&[48000]).unwrap_err().kind(),
            ErrorKind::Unsupported
        );

        let mut empty = StreamTopology::new(&interface(1, 0, 0x20), UacProtocol::Uac2);
        assert!(empty.add_sample_rates(&[48000]).unwrap_err().is_not_found());
    }

    #[test]
    fn test_sample_rate_range() {
        let rates = SampleRates::Range {
            low: 44100,
            high: 96000,
        };
        assert!(rates.contains(44100));
        assert!(rates.contains(96000));
        assert!(!rates.contains(44099));
        assert!(!rates.contains(96001));
        assert_eq!(rates.len(), 0);
    }

    #[test]
    fn test_transactions_per_frame() {
        assert_eq!(transactions_per_frame(0), 1);
        assert_eq!(transactions_per_frame(1), 8);
        assert_eq!(transactions_per_frame(4), 1);
        assert_eq!(transactions_per_frame(10), 1);
    }
}
