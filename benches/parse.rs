use criterion::{black_box, criterion_group, criterion_main, Criterion};
use uac_topology::ConfigurationModel;

/// UAC2 stereo speaker with explicit feedback: clock -> IT -> FU -> OT and three alternate settings
#[rustfmt::skip]
const UAC2_SPEAKER: &[u8] = &[
    0x09, 0x02, 0xd4, 0x00, 0x02, 0x01, 0x00, 0x80, 0x32,
    0x08, 0x0b, 0x00, 0x02, 0x01, 0x00, 0x20, 0x00,
    0x09, 0x04, 0x00, 0x00, 0x01, 0x01, 0x01, 0x20, 0x00,
    0x09, 0x24, 0x01, 0x00, 0x02, 0x08, 0x40, 0x00, 0x00,
    0x08, 0x24, 0x0a, 0x10, 0x03, 0x07, 0x00, 0x00,
    0x11, 0x24, 0x02, 0x01, 0x01, 0x01, 0x00, 0x10, 0x02, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x12, 0x24, 0x06, 0x02, 0x01, 0x0f, 0x00, 0x00, 0x00, 0x0c, 0x00, 0x00, 0x00, 0x0c, 0x00, 0x00, 0x00, 0x00,
    0x0c, 0x24, 0x03, 0x03, 0x01, 0x03, 0x00, 0x02, 0x10, 0x00, 0x00, 0x00,
    0x07, 0x05, 0x83, 0x03, 0x06, 0x00, 0x08,
    0x09, 0x04, 0x01, 0x00, 0x00, 0x01, 0x02, 0x20, 0x00,
    0x09, 0x04, 0x01, 0x01, 0x02, 0x01, 0x02, 0x20, 0x00,
    0x10, 0x24, 0x01, 0x01, 0x00, 0x01, 0x01, 0x00, 0x00, 0x00, 0x02, 0x03, 0x00, 0x00, 0x00, 0x00,
    0x06, 0x24, 0x02, 0x01, 0x03, 0x18,
    0x07, 0x05, 0x01, 0x05, 0x20, 0x01, 0x01,
    0x08, 0x25, 0x01, 0x00, 0x03, 0x00, 0x00, 0x00,
    0x07, 0x05, 0x81, 0x11, 0x04, 0x00, 0x04,
    0x09, 0x04, 0x01, 0x02, 0x02, 0x01, 0x02, 0x20, 0x00,
    0x10, 0x24, 0x01, 0x01, 0x00, 0x01, 0x01, 0x00, 0x00, 0x00, 0x02, 0x03, 0x00, 0x00, 0x00, 0x00,
    0x06, 0x24, 0x02, 0x01, 0x02, 0x10,
    0x07, 0x05, 0x01, 0x05, 0xc0, 0x00, 0x01,
    0x08, 0x25, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x07, 0x05, 0x81, 0x11, 0x04, 0x00, 0x04,
];

pub fn parse(c: &mut Criterion) {
    c.bench_function("parse_uac2", |b| {
        b.iter(|| {
            let result = ConfigurationModel::parse(black_box(UAC2_SPEAKER), 0);
            black_box(result)
        });
    });
}

pub fn alt_setting_search(c: &mut Criterion) {
    let mut model = ConfigurationModel::parse(UAC2_SPEAKER, 0).unwrap();
    model.add_sample_rates_to_all(&[44100, 48000, 96000, 192000]);
    c.bench_function("alt_setting_with_settings", |b| {
        b.iter(|| {
            let result = model.alt_setting_with_settings(1, black_box(2), 16, 48000);
            black_box(result)
        });
    });
}

criterion_group!(benches, parse, alt_setting_search);
criterion_main!(benches);
