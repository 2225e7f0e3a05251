//! lsusb style text dump of a parsed [`ConfigurationModel`]
use colored::*;
use std::fmt;

use crate::topology::{ConfigurationModel, ControlTopology, SampleRates, StreamTopology};
use crate::usb::descriptors::audio::{
    self, AudioCluster, ControlSetting, ControlType, EncodedFormat, Unit,
};
use crate::usb::Endpoint;

/// Column the field name is padded to
pub const FIELD_WIDTH: usize = 24;

const UAC2_TERMINAL_BMCONTROLS: [&str; 6] = [
    "Copy Protect",
    "Connector",
    "Overload",
    "Cluster",
    "Underflow",
    "Overflow",
];
const UAC1_FEATURE_UNIT_BMCONTROLS: [&str; 13] = [
    "Mute",
    "Volume",
    "Bass",
    "Mid",
    "Treble",
    "Graphic Equalizer",
    "Automatic Gain",
    "Delay",
    "Bass Boost",
    "Loudness",
    "Input gain",
    "Input gain pad",
    "Phase invert",
];
const UAC2_FEATURE_UNIT_BMCONTROLS: [&str; 15] = [
    "Mute",
    "Volume",
    "Bass",
    "Mid",
    "Treble",
    "Graphic Equalizer",
    "Automatic Gain",
    "Delay",
    "Bass Boost",
    "Loudness",
    "Input gain",
    "Input gain pad",
    "Phase invert",
    "Underflow",
    "Overflow",
];
const UAC2_SELECTOR_UNIT_BMCONTROLS: [&str; 1] = ["Selector"];
const UAC2_CLOCK_SOURCE_BMCONTROLS: [&str; 2] = ["Clock Frequency", "Clock Validity"];
const UAC2_CLOCK_SELECTOR_BMCONTROLS: [&str; 1] = ["Clock Selector"];
const UAC2_CLOCK_MULTIPLIER_BMCONTROLS: [&str; 2] = ["Clock Numerator", "Clock Denominator"];
const UAC2_AS_INTERFACE_BMCONTROLS: [&str; 2] =
    ["Active Alternate Setting", "Valid Alternate Setting"];

/// Print `name` padded to `width` followed by `value`
pub fn dump_value<T: fmt::Display>(value: T, name: &str, indent: usize, width: usize) {
    println!("{:indent$}{:<width$} {}", "", name, value, indent = indent, width = width);
}

/// Print `name` followed by `value` as zero padded hex of `nibbles` digits
pub fn dump_hex<T: Into<u32>>(value: T, name: &str, nibbles: usize, indent: usize, width: usize) {
    dump_value(
        format!("0x{:0nibbles$x}", value.into(), nibbles = nibbles),
        name,
        indent,
        width,
    );
}

/// Print each element as `name(i)`
pub fn dump_array<T: fmt::Display>(values: &[T], name: &str, indent: usize, width: usize) {
    for (i, v) in values.iter().enumerate() {
        dump_value(v, &format!("{}({:2})", name, i), indent, width);
    }
}

fn dump_title(title: &str, indent: usize) {
    println!("{:indent$}{}", "", title.bold().blue(), indent = indent);
}

/// Names of the controls present in `controls` with their setting for [`ControlType::BmControl2`]
pub fn bitmap_control_names(
    controls: u32,
    descriptions: &[&'static str],
    control_type: &ControlType,
) -> Vec<String> {
    descriptions
        .iter()
        .enumerate()
        .filter_map(|(index, name)| match control_type {
            ControlType::BmControl1 => {
                ((controls >> index) & 0x1 != 0).then(|| format!("{} Control", name))
            }
            ControlType::BmControl2 => {
                let c = ((controls >> (index * 2)) & 0x3) as u8;
                (c != 0).then(|| format!("{} Control ({})", name, ControlSetting::from(c)))
            }
        })
        .collect()
}

fn dump_bitmap_controls(
    controls: u32,
    descriptions: &[&'static str],
    control_type: &ControlType,
    indent: usize,
) {
    for name in bitmap_control_names(controls, descriptions, control_type) {
        println!("{:indent$}{}", "", name.yellow(), indent = indent);
    }
}

fn dump_cluster(cluster: &AudioCluster, indent: usize, width: usize) {
    dump_value(cluster.nr_channels, "bNrChannels", indent, width);
    dump_hex(cluster.channel_config, "bmChannelConfig", 8, indent, width);
    dump_value(cluster.channel_names_index, "iChannelNames", indent, width);
}

fn dump_unit(unit: &Unit, control_type: &ControlType, indent: usize, width: usize) {
    dump_title(&format!("{:#}:", unit.kind()), indent - 2);
    match unit {
        Unit::InputTerminal(it) => {
            dump_value(it.terminal_id, "bTerminalID", indent, width);
            dump_hex(it.terminal_type, "wTerminalType", 4, indent, width);
            dump_value(it.assoc_terminal, "bAssocTerminal", indent, width);
            if let Some(c) = it.clock_source_id {
                dump_value(c, "bCSourceID", indent, width);
            }
            dump_cluster(&it.cluster, indent, width);
            if let Some(c) = it.controls {
                dump_hex(c, "bmControls", 4, indent, width);
                dump_bitmap_controls(c as u32, &UAC2_TERMINAL_BMCONTROLS, control_type, indent + 2);
            }
            dump_value(it.terminal_index, "iTerminal", indent, width);
        }
        Unit::OutputTerminal(ot) => {
            dump_value(ot.terminal_id, "bTerminalID", indent, width);
            dump_hex(ot.terminal_type, "wTerminalType", 4, indent, width);
            dump_value(ot.assoc_terminal, "bAssocTerminal", indent, width);
            dump_value(ot.source_id, "bSourceID", indent, width);
            if let Some(c) = ot.clock_source_id {
                dump_value(c, "bCSourceID", indent, width);
            }
            if let Some(c) = ot.controls {
                dump_hex(c, "bmControls", 4, indent, width);
                dump_bitmap_controls(c as u32, &UAC2_TERMINAL_BMCONTROLS, control_type, indent + 2);
            }
            dump_value(ot.terminal_index, "iTerminal", indent, width);
        }
        Unit::Mixer(mu) => {
            dump_value(mu.unit_id, "bUnitID", indent, width);
            dump_array(&mu.source_ids, "baSourceID", indent, width);
            dump_cluster(&mu.cluster, indent, width);
            for (i, b) in mu.mixer_controls.iter().enumerate() {
                dump_hex(*b, &format!("bmMixerControls({:2})", i), 2, indent, width);
            }
            if let Some(c) = mu.controls {
                dump_hex(c, "bmControls", 2, indent, width);
            }
            dump_value(mu.mixer_index, "iMixer", indent, width);
        }
        Unit::Selector(su) => {
            dump_value(su.unit_id, "bUnitID", indent, width);
            dump_array(&su.source_ids, "baSourceID", indent, width);
            if let Some(c) = su.controls {
                dump_hex(c, "bmControls", 2, indent, width);
                dump_bitmap_controls(c as u32, &UAC2_SELECTOR_UNIT_BMCONTROLS, control_type, indent + 2);
            }
            dump_value(su.selector_index, "iSelector", indent, width);
        }
        Unit::Feature(fu) => {
            dump_value(fu.unit_id, "bUnitID", indent, width);
            dump_value(fu.source_id, "bSourceID", indent, width);
            dump_value(fu.control_size, "bControlSize", indent, width);
            let descriptions: &[&str] = match fu.control_type {
                ControlType::BmControl1 => &UAC1_FEATURE_UNIT_BMCONTROLS,
                ControlType::BmControl2 => &UAC2_FEATURE_UNIT_BMCONTROLS,
            };
            for (i, c) in fu.controls.iter().enumerate() {
                dump_hex(*c, &format!("bmaControls({:2})", i), fu.control_size as usize * 2, indent, width);
                dump_bitmap_controls(*c, descriptions, &fu.control_type, indent + 2);
            }
            dump_value(fu.feature_index, "iFeature", indent, width);
        }
        Unit::Effect(eu) => {
            dump_value(eu.unit_id, "bUnitID", indent, width);
            dump_hex(eu.effect_type, "wEffectType", 4, indent, width);
            dump_value(eu.source_id, "bSourceID", indent, width);
            for (i, c) in eu.controls.iter().enumerate() {
                dump_hex(*c, &format!("bmaControls({:2})", i), 8, indent, width);
            }
            dump_value(eu.effect_index, "iEffects", indent, width);
        }
        Unit::Processing(pu) => {
            dump_value(pu.unit_id, "bUnitID", indent, width);
            dump_hex(pu.process_type, "wProcessType", 4, indent, width);
            dump_array(&pu.source_ids, "baSourceID", indent, width);
            dump_cluster(&pu.cluster, indent, width);
            dump_value(pu.control_size, "bControlSize", indent, width);
            for (i, b) in pu.controls.iter().enumerate() {
                dump_hex(*b, &format!("bmControls({:2})", i), 2, indent, width);
            }
            dump_value(pu.processing_index, "iProcessing", indent, width);
        }
        Unit::Extension(xu) => {
            dump_value(xu.unit_id, "bUnitID", indent, width);
            dump_hex(xu.extension_code, "wExtensionCode", 4, indent, width);
            dump_array(&xu.source_ids, "baSourceID", indent, width);
            dump_cluster(&xu.cluster, indent, width);
            dump_value(xu.control_size, "bControlSize", indent, width);
            for (i, b) in xu.controls.iter().enumerate() {
                dump_hex(*b, &format!("bmControls({:2})", i), 2, indent, width);
            }
            dump_value(xu.extension_index, "iExtension", indent, width);
        }
        Unit::ClockSource(cs) => {
            dump_value(cs.clock_id, "bClockID", indent, width);
            dump_hex(cs.attributes, "bmAttributes", 2, indent, width);
            println!("{:indent$}{}", "", cs.clock_type(), indent = indent + 2);
            if cs.is_synced_to_sof() {
                println!("{:indent$}Synced to SOF", "", indent = indent + 2);
            }
            dump_hex(cs.controls, "bmControls", 2, indent, width);
            dump_bitmap_controls(cs.controls as u32, &UAC2_CLOCK_SOURCE_BMCONTROLS, control_type, indent + 2);
            dump_value(cs.assoc_terminal, "bAssocTerminal", indent, width);
            dump_value(cs.clock_source_index, "iClockSource", indent, width);
        }
        Unit::ClockSelector(cs) => {
            dump_value(cs.clock_id, "bClockID", indent, width);
            dump_array(&cs.csource_ids, "baCSourceID", indent, width);
            dump_hex(cs.controls, "bmControls", 2, indent, width);
            dump_bitmap_controls(cs.controls as u32, &UAC2_CLOCK_SELECTOR_BMCONTROLS, control_type, indent + 2);
            dump_value(cs.clock_selector_index, "iClockSelector", indent, width);
        }
        Unit::ClockMultiplier(cm) => {
            dump_value(cm.clock_id, "bClockID", indent, width);
            dump_value(cm.csource_id, "bCSourceID", indent, width);
            dump_hex(cm.controls, "bmControls", 2, indent, width);
            dump_bitmap_controls(cm.controls as u32, &UAC2_CLOCK_MULTIPLIER_BMCONTROLS, control_type, indent + 2);
            dump_value(cm.clock_multiplier_index, "iClockMultiplier", indent, width);
        }
    }
}

fn dump_endpoint(endpoint: &Endpoint, indent: usize, width: usize) {
    dump_title("Endpoint Descriptor:", indent - 2);
    dump_hex(endpoint.address.address, "bEndpointAddress", 2, indent, width);
    println!(
        "{:indent$}EP {} {}",
        "",
        endpoint.address.number,
        endpoint.direction(),
        indent = indent + 2
    );
    dump_hex(endpoint.attributes, "bmAttributes", 2, indent, width);
    println!("{:indent$}Transfer Type {:?}", "", endpoint.transfer_type, indent = indent + 2);
    println!("{:indent$}Synch Type {:?}", "", endpoint.sync_type, indent = indent + 2);
    println!("{:indent$}Usage Type {:?}", "", endpoint.usage_type, indent = indent + 2);
    dump_value(endpoint.max_packet_size, "wMaxPacketSize", indent, width);
    dump_value(endpoint.interval, "bInterval", indent, width);
    if let Some(r) = endpoint.refresh {
        dump_value(r, "bRefresh", indent, width);
    }
    if let Some(a) = endpoint.synch_address {
        dump_hex(a, "bSynchAddress", 2, indent, width);
    }
}

/// Dump the control interface with its units and interrupt endpoint
pub fn dump_control(control: &ControlTopology, indent: usize) {
    let width = FIELD_WIDTH;
    let control_type = match control.protocol.profile() {
        Ok(p) => p.control_type,
        Err(_) => ControlType::BmControl1,
    };

    dump_title(
        &format!("AudioControl Interface {}:", control.interface_number),
        indent,
    );
    let indent = indent + 2;
    dump_value(control.protocol, "bInterfaceProtocol", indent, width);
    if let Some(header) = control.header.as_ref() {
        dump_value(header.version, "bcdADC", indent, width);
        dump_value(header.total_length, "wTotalLength", indent, width);
        if let Some(c) = header.category {
            dump_hex(c, "bCategory", 2, indent, width);
        }
    }
    dump_array(control.stream_interface_numbers(), "baInterfaceNr", indent, width);

    for unit in control.units.iter() {
        dump_unit(unit, &control_type, indent + 2, width);
    }
    if let Some(ep) = control.interrupt_endpoint.as_ref() {
        dump_endpoint(ep, indent + 2, width);
    }
}

fn dump_sample_rates(rates: &SampleRates, indent: usize, width: usize) {
    match rates {
        SampleRates::Range { low, high } => {
            dump_value(format!("{} Hz", low), "tLowerSamFreq", indent, width);
            dump_value(format!("{} Hz", high), "tUpperSamFreq", indent, width);
        }
        SampleRates::Discrete(r) => {
            dump_value(r.len(), "bSamFreqType", indent, width);
            for (i, rate) in r.iter().enumerate() {
                dump_value(format!("{} Hz", rate), &format!("tSamFreq[{:2}]", i), indent, width);
            }
        }
    }
}

/// Dump one alternate setting of a streaming interface
pub fn dump_stream(stream: &StreamTopology, indent: usize) {
    let width = FIELD_WIDTH;
    dump_title(
        &format!(
            "AudioStreaming Interface {} alt {}:",
            stream.interface_number, stream.alt_setting
        ),
        indent,
    );
    let indent = indent + 2;
    dump_value(stream.protocol, "bInterfaceProtocol", indent, width);
    dump_value(stream.num_endpoints, "bNumEndpoints", indent, width);
    if let Some(t) = stream.terminal_link {
        dump_value(t, "bTerminalLink", indent, width);
    }
    if let Some(d) = stream.delay {
        dump_value(format!("{} frames", d), "bDelay", indent, width);
    }
    dump_hex(stream.format_tag, "wFormatTag", 4, indent, width);
    if let Some(f) = stream.formats {
        dump_hex(f, "bmFormats", 8, indent, width);
    }
    if let Some(c) = stream.controls {
        dump_hex(c, "bmControls", 2, indent, width);
        dump_bitmap_controls(
            c as u32,
            &UAC2_AS_INTERFACE_BMCONTROLS,
            &ControlType::BmControl2,
            indent + 2,
        );
    }
    dump_value(stream.format_type, "bFormatType", indent, width);
    dump_value(stream.num_channels, "bNrChannels", indent, width);
    if let Some(c) = stream.channel_config {
        dump_hex(c, "bmChannelConfig", 8, indent, width);
    }
    dump_value(stream.subframe_size, "bSubslotSize", indent, width);
    dump_value(stream.bit_resolution, "bBitResolution", indent, width);
    if let Some(r) = stream.max_bit_rate {
        dump_value(r, "wMaxBitRate", indent, width);
    }
    if let Some(s) = stream.samples_per_frame {
        dump_value(s, "wSamplesPerFrame", indent, width);
    }
    dump_sample_rates(&stream.sample_rates, indent, width);
    match stream.encoded_format.as_ref() {
        Some(EncodedFormat::Mpeg {
            capabilities,
            features,
        }) => {
            dump_hex(*capabilities, "bmMPEGCapabilities", 4, indent, width);
            dump_hex(*features, "bmMPEGFeatures", 2, indent, width);
        }
        Some(EncodedFormat::Ac3 { bsid, features }) => {
            dump_hex(*bsid, "bmBSID", 8, indent, width);
            dump_hex(*features, "bmAC3Features", 2, indent, width);
        }
        None => (),
    }

    for ep in stream.endpoints.iter() {
        dump_endpoint(ep, indent + 2, width);
    }
    if let Some(caps) = stream.isoc_capabilities.as_ref() {
        dump_title(&format!("{}:", audio::UacAsInterface::General), indent);
        dump_value(caps.sample_freq_control, "Sampling Frequency", indent + 2, width);
        dump_value(caps.pitch_control, "Pitch", indent + 2, width);
        dump_value(caps.max_packets_only, "MaxPacketsOnly", indent + 2, width);
        dump_value(caps.lock_delay_units, "bLockDelayUnits", indent + 2, width);
        dump_value(caps.lock_delay, "wLockDelay", indent + 2, width);
    }
}

/// Dump the whole model
pub fn dump_model(model: &ConfigurationModel) {
    let width = FIELD_WIDTH;
    dump_title("Configuration Descriptor:", 0);
    dump_value(model.configuration.total_length, "wTotalLength", 2, width);
    dump_value(model.configuration.num_interfaces, "bNumInterfaces", 2, width);
    dump_value(model.configuration.configuration_value, "bConfigurationValue", 2, width);
    dump_hex(model.configuration.attributes, "bmAttributes", 2, 2, width);
    dump_value(
        format!("{}mA", model.configuration.max_power as u32 * 2),
        "MaxPower",
        2,
        width,
    );
    if model.consumed_length != model.total_length {
        println!(
            "{}",
            format!(
                "  ** parsed {} of {} bytes",
                model.consumed_length, model.total_length
            )
            .red()
        );
    }

    match model.control.as_ref() {
        Some(c) => dump_control(c, 2),
        None => println!(
            "{}",
            format!(
                "  ** AudioControl interface {} has no streaming interfaces",
                model.control_interface_number
            )
            .red()
        ),
    }
    for stream in model.streams.iter() {
        dump_stream(stream, 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitmap_control_names_bmcontrol1() {
        let names = bitmap_control_names(
            0b11,
            &UAC1_FEATURE_UNIT_BMCONTROLS,
            &ControlType::BmControl1,
        );
        assert_eq!(names, vec!["Mute Control", "Volume Control"]);
    }

    #[test]
    fn test_bitmap_control_names_bmcontrol2() {
        let names = bitmap_control_names(
            0b0111,
            &UAC2_CLOCK_SOURCE_BMCONTROLS,
            &ControlType::BmControl2,
        );
        assert_eq!(names.len(), 2);
        assert!(names[0].starts_with("Clock Frequency Control"));
        assert!(names[1].starts_with("Clock Validity Control"));
    }
}
