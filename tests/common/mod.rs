//! Descriptor builders and a binary runner shared by the integration tests; runner adapted from 'fd' method: https://github.com/sharkdp/fd/blob/master/tests/testenv/mod.rs
#![allow(dead_code)]
use std::fs;
use std::path::PathBuf;
use std::process;

/// Seed for the truncation and corruption loops so failures reproduce
pub const FUZZ_SEED: u64 = 0x5541_4332;

pub const CS_INTERFACE: u8 = 0x24;
pub const CS_ENDPOINT: u8 = 0x25;

/// Prefix `records` with a configuration descriptor whose wTotalLength covers them
pub fn configuration(num_interfaces: u8, records: &[Vec<u8>]) -> Vec<u8> {
    let body: Vec<u8> = records.concat();
    let total = (9 + body.len()) as u16;
    let mut ret = vec![9, 0x02];
    ret.extend_from_slice(&total.to_le_bytes());
    ret.extend_from_slice(&[num_interfaces, 1, 0, 0x80, 50]);
    ret.extend(body);
    ret
}

pub fn interface(number: u8, alt: u8, num_endpoints: u8, subclass: u8, protocol: u8) -> Vec<u8> {
    vec![9, 0x04, number, alt, num_endpoints, 0x01, subclass, protocol, 0]
}

pub fn interface_association(first: u8, count: u8, protocol: u8) -> Vec<u8> {
    vec![8, 0x0b, first, count, 0x01, 0x00, protocol, 0]
}

/// UAC1 AC header followed by `units`, wTotalLength covering both
pub fn uac1_control_block(stream_interfaces: &[u8], units: &[Vec<u8>]) -> Vec<u8> {
    let header_len = 8 + stream_interfaces.len();
    let total = (header_len + units.iter().map(|u| u.len()).sum::<usize>()) as u16;
    let mut ret = vec![header_len as u8, CS_INTERFACE, 0x01, 0x00, 0x01];
    ret.extend_from_slice(&total.to_le_bytes());
    ret.push(stream_interfaces.len() as u8);
    ret.extend_from_slice(stream_interfaces);
    ret.extend(units.concat());
    ret
}

/// UAC2 AC header followed by `units`, wTotalLength covering both
pub fn uac2_control_block(units: &[Vec<u8>]) -> Vec<u8> {
    let total = (9 + units.iter().map(|u| u.len()).sum::<usize>()) as u16;
    let mut ret = vec![9, CS_INTERFACE, 0x01, 0x00, 0x02, 0x08];
    ret.extend_from_slice(&total.to_le_bytes());
    ret.push(0x00);
    ret.extend(units.concat());
    ret
}

pub fn input_terminal1(id: u8, terminal_type: u16, channels: u8) -> Vec<u8> {
    let t = terminal_type.to_le_bytes();
    vec![12, CS_INTERFACE, 0x02, id, t[0], t[1], 0, channels, 0x03, 0x00, 0, 0]
}

pub fn output_terminal1(id: u8, terminal_type: u16, source: u8) -> Vec<u8> {
    let t = terminal_type.to_le_bytes();
    vec![9, CS_INTERFACE, 0x03, id, t[0], t[1], 0, source, 0]
}

/// UAC1 feature unit with one byte per channel control bitmap, master first
pub fn feature_unit1(id: u8, source: u8, controls: &[u8]) -> Vec<u8> {
    let mut ret = vec![(7 + controls.len()) as u8, CS_INTERFACE, 0x06, id, source, 1];
    ret.extend_from_slice(controls);
    ret.push(0);
    ret
}

pub fn selector_unit1(id: u8, sources: &[u8]) -> Vec<u8> {
    let mut ret = vec![(6 + sources.len()) as u8, CS_INTERFACE, 0x05, id, sources.len() as u8];
    ret.extend_from_slice(sources);
    ret.push(0);
    ret
}

pub fn input_terminal2(id: u8, terminal_type: u16, clock: u8, channels: u8) -> Vec<u8> {
    let t = terminal_type.to_le_bytes();
    vec![
        17, CS_INTERFACE, 0x02, id, t[0], t[1], 0, clock, channels, 0x03, 0, 0, 0, 0, 0x00, 0x00,
        0,
    ]
}

pub fn output_terminal2(id: u8, terminal_type: u16, source: u8, clock: u8) -> Vec<u8> {
    let t = terminal_type.to_le_bytes();
    vec![12, CS_INTERFACE, 0x03, id, t[0], t[1], 0, source, clock, 0x00, 0x00, 0]
}

/// UAC2 feature unit with four byte per channel control bitmaps, master first
pub fn feature_unit2(id: u8, source: u8, controls: &[u32]) -> Vec<u8> {
    let mut ret = vec![(6 + 4 * controls.len()) as u8, CS_INTERFACE, 0x06, id, source];
    for c in controls {
        ret.extend_from_slice(&c.to_le_bytes());
    }
    ret.push(0);
    ret
}

pub fn clock_source(id: u8, attributes: u8, controls: u8) -> Vec<u8> {
    vec![8, CS_INTERFACE, 0x0a, id, attributes, controls, 0, 0]
}

pub fn as_general1(terminal_link: u8, format_tag: u16) -> Vec<u8> {
    let t = format_tag.to_le_bytes();
    vec![7, CS_INTERFACE, 0x01, terminal_link, 1, t[0], t[1]]
}

/// UAC1 Type I format with discrete sample rates
pub fn format_type1(channels: u8, subframe: u8, bits: u8, rates: &[u32]) -> Vec<u8> {
    let mut ret = vec![
        (8 + 3 * rates.len()) as u8,
        CS_INTERFACE,
        0x02,
        0x01,
        channels,
        subframe,
        bits,
        rates.len() as u8,
    ];
    for r in rates {
        ret.extend_from_slice(&r.to_le_bytes()[..3]);
    }
    ret
}

/// UAC1 Type I format with a continuous range
pub fn format_type1_range(channels: u8, subframe: u8, bits: u8, low: u32, high: u32) -> Vec<u8> {
    let mut ret = vec![14, CS_INTERFACE, 0x02, 0x01, channels, subframe, bits, 0];
    ret.extend_from_slice(&low.to_le_bytes()[..3]);
    ret.extend_from_slice(&high.to_le_bytes()[..3]);
    ret
}

pub fn as_general2(terminal_link: u8, format_type: u8, formats: u32, channels: u8) -> Vec<u8> {
    let mut ret = vec![16, CS_INTERFACE, 0x01, terminal_link, 0x00, format_type];
    ret.extend_from_slice(&formats.to_le_bytes());
    ret.extend_from_slice(&[channels, 0x03, 0, 0, 0, 0]);
    ret
}

pub fn format_type2(subslot: u8, bits: u8) -> Vec<u8> {
    vec![6, CS_INTERFACE, 0x02, 0x01, subslot, bits]
}

/// Audio class endpoint with bRefresh and bSynchAddress
pub fn endpoint1(address: u8, attributes: u8, max_packet: u16, interval: u8, synch: u8) -> Vec<u8> {
    let m = max_packet.to_le_bytes();
    vec![9, 0x05, address, attributes, m[0], m[1], interval, 0, synch]
}

pub fn endpoint2(address: u8, attributes: u8, max_packet: u16, interval: u8) -> Vec<u8> {
    let m = max_packet.to_le_bytes();
    vec![7, 0x05, address, attributes, m[0], m[1], interval]
}

pub fn cs_endpoint1(attributes: u8, lock_units: u8, lock_delay: u16) -> Vec<u8> {
    let l = lock_delay.to_le_bytes();
    vec![7, CS_ENDPOINT, 0x01, attributes, lock_units, l[0], l[1]]
}

pub fn cs_endpoint2(attributes: u8, controls: u8) -> Vec<u8> {
    vec![8, CS_ENDPOINT, 0x01, attributes, controls, 0, 0, 0]
}

/// UAC1 playback function: USB streaming IT 1 -> FU 2 -> speaker OT 3, streaming interface 1 with a zero bandwidth
/// alt 0, 16 bit stereo at alt 1 and 24 bit stereo at alt 2, then a MIDI interface 2 listed in the header
pub fn uac1_speaker() -> Vec<u8> {
    configuration(
        3,
        &[
            interface(0, 0, 0, 0x01, 0x00),
            uac1_control_block(
                &[1, 2],
                &[
                    input_terminal1(1, 0x0101, 2),
                    feature_unit1(2, 1, &[0x01, 0x02, 0x02]),
                    output_terminal1(3, 0x0301, 2),
                ],
            ),
            interface(1, 0, 0, 0x02, 0x00),
            interface(1, 1, 1, 0x02, 0x00),
            as_general1(1, 0x0001),
            format_type1(2, 2, 16, &[44100, 48000]),
            endpoint1(0x01, 0x09, 192, 1, 0),
            cs_endpoint1(0x81, 2, 1),
            interface(1, 2, 1, 0x02, 0x00),
            as_general1(1, 0x0001),
            format_type1(2, 3, 24, &[48000, 96000]),
            endpoint1(0x01, 0x09, 576, 1, 0),
            cs_endpoint1(0x01, 0, 0),
            interface(2, 0, 0, 0x03, 0x00),
            vec![7, CS_INTERFACE, 0x01, 0x00, 0x01, 7, 0],
        ],
    )
}

/// UAC2 playback function with explicit feedback: clock 0x10 -> IT 1 -> FU 2 -> OT 3, streaming interface 1 with alt 0
/// idle, alt 1 24 bit stereo and alt 2 16 bit stereo
pub fn uac2_speaker() -> Vec<u8> {
    configuration(
        2,
        &[
            interface_association(0, 2, 0x20),
            interface(0, 0, 1, 0x01, 0x20),
            uac2_control_block(&[
                clock_source(0x10, 0x03, 0x07),
                input_terminal2(1, 0x0101, 0x10, 2),
                feature_unit2(2, 1, &[0x0000_000f, 0x0000_000c, 0x0000_000c]),
                output_terminal2(3, 0x0301, 2, 0x10),
            ]),
            endpoint2(0x83, 0x03, 6, 8),
            interface(1, 0, 0, 0x02, 0x20),
            interface(1, 1, 2, 0x02, 0x20),
            as_general2(1, 0x01, 0x0000_0001, 2),
            format_type2(3, 24),
            endpoint2(0x01, 0x05, 288, 1),
            cs_endpoint2(0x00, 0x03),
            endpoint2(0x81, 0x11, 4, 4),
            interface(1, 2, 2, 0x02, 0x20),
            as_general2(1, 0x01, 0x0000_0001, 2),
            format_type2(2, 16),
            endpoint2(0x01, 0x05, 192, 1),
            cs_endpoint2(0x00, 0x00),
            endpoint2(0x81, 0x11, 4, 4),
        ],
    )
}

/// Environment for the integration tests.
pub struct TestEnv {
    /// Path to the *uac-topology* executable.
    exe: PathBuf,
    /// Scratch directory for descriptor files
    dir: PathBuf,
}

/// Format an error message for when *uac-topology* did not exit successfully.
fn format_exit_error(args: &[&str], output: &process::Output) -> String {
    format!(
        "`uac-topology {}` did not exit successfully.\nstdout:\n---\n{}---\nstderr:\n---\n{}---",
        args.join(" "),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

impl TestEnv {
    pub fn new(name: &str) -> TestEnv {
        let dir = std::env::temp_dir().join(format!("uac-topology-{}-{}", name, process::id()));
        fs::create_dir_all(&dir).expect("scratch directory");

        TestEnv {
            exe: PathBuf::from(env!("CARGO_BIN_EXE_uac-topology")),
            dir,
        }
    }

    /// Write `contents` to a scratch file and return its path
    pub fn write(&self, file_name: &str, contents: &[u8]) -> PathBuf {
        let path = self.dir.join(file_name);
        fs::write(&path, contents).expect("write descriptor file");
        path
    }

    fn run(&self, file: &PathBuf, args: &[&str]) -> process::Output {
        process::Command::new(&self.exe)
            .arg(file)
            .args(args)
            .env("NO_COLOR", "1")
            .output()
            .expect("uac-topology output")
    }

    /// Assert that calling *uac-topology* on `file` with `args` succeeds and return stdout
    pub fn assert_success_and_get_output(&self, file: &PathBuf, args: &[&str]) -> String {
        let output = self.run(file, args);

        if !output.status.success() {
            panic!("{}", format_exit_error(args, &output));
        }

        String::from_utf8_lossy(&output.stdout).to_string()
    }

    /// Assert `--json` output includes `expected`
    pub fn assert_output_json(&self, file: &PathBuf, args: &[&str], expected: serde_json::Value) {
        let mut args = args.to_vec();
        args.push("--json");
        let actual = self.assert_success_and_get_output(file, &args);
        let actual: serde_json::Value =
            serde_json::from_str(&actual).expect("json output parses");

        assert_json_diff::assert_json_include!(actual: actual, expected: expected);
    }

    /// Assert that calling *uac-topology* fails with stderr starting with `expected`
    pub fn assert_failure_with_error(&self, file: &PathBuf, args: &[&str], expected: &str) {
        let output = self.run(file, args);
        if output.status.success() {
            panic!("error '{}' did not occur.", expected);
        }
        let actual_err = String::from_utf8_lossy(&output.stderr);
        if !actual_err.trim_start().starts_with(expected) {
            panic!("{}", format_exit_error(args, &output));
        }
    }
}

impl Drop for TestEnv {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.dir);
    }
}
