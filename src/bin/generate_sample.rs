//! Writes `demo_mask.json`, a synthetic Interpretation-group export with a
//! handful of fish schools, for trying the pipeline without LSSS data.
//!
//! Usage: `cargo run --bin generate_sample [OUTPUT]`

use std::path::PathBuf;

use anyhow::Context;
use serde_json::{json, Value};

/// First ping time, milliseconds since 1601-01-01.
const START_MS: f64 = 13_189_218_000_000.0;
const PING_INTERVAL_MS: f64 = 1000.0;

/// SONAR-netCDF4 region classes.
const REGION_TYPES: [(&str, i64); 5] = [
    ("empty_water", 0),
    ("no_data", 1),
    ("analysis", 2),
    ("track", 3),
    ("marker", 4),
];

const CATEGORIES: [&str; 4] = ["herring", "sprat", "mackerel", "0-group"];

/// splitmix64, enough for reproducible shapes.
struct SimpleRng(u64);

impl SimpleRng {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `[lo, hi)`.
    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        let unit = (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
        lo + unit * (hi - lo)
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }
}

struct School {
    id: i64,
    type_code: i64,
    times: Vec<f64>,
    depths: Vec<Vec<f64>>,
}

impl School {
    fn generate(id: i64, first_ping: usize, rng: &mut SimpleRng) -> Self {
        let pings = 5 + rng.below(20);
        let centre = rng.uniform(30.0, 250.0);
        let height = rng.uniform(5.0, 25.0);

        let mut times = Vec::with_capacity(pings);
        let mut depths = Vec::with_capacity(pings);
        for p in 0..pings {
            times.push(START_MS + (first_ping + p) as f64 * PING_INTERVAL_MS);

            // Lens-shaped school, sometimes split into two layers.
            let shape = (std::f64::consts::PI * (p as f64 + 0.5) / pings as f64).sin();
            let top = centre - height * shape;
            let bottom = centre + height * shape;
            let ranges = if rng.below(4) == 0 {
                let gap = rng.uniform(0.2, 0.4) * (bottom - top);
                let mid = (top + bottom) / 2.0;
                vec![round1(top), round1(mid - gap / 2.0), round1(mid + gap / 2.0), round1(bottom)]
            } else {
                vec![round1(top), round1(bottom)]
            };
            depths.push(ranges);
        }

        School {
            id,
            type_code: if rng.below(5) == 0 { 4 } else { 3 },
            times,
            depths,
        }
    }

    fn min_depth(&self) -> f64 {
        self.depths.iter().flatten().copied().fold(f64::INFINITY, f64::min)
    }

    fn max_depth(&self) -> f64 {
        self.depths.iter().flatten().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn build_export(schools: &[School], rng: &mut SimpleRng) -> Value {
    let mut category_ids = Vec::new();
    let mut category_names = Vec::new();
    let mut proportions = Vec::new();
    for school in schools {
        let first = CATEGORIES[rng.below(CATEGORIES.len())];
        if rng.below(2) == 0 {
            let share = round1(rng.uniform(0.5, 0.9));
            let second = CATEGORIES[rng.below(CATEGORIES.len())];
            category_ids.extend([school.id, school.id]);
            category_names.extend([first, second]);
            proportions.extend([share, round1(1.0 - share)]);
        } else {
            category_ids.push(school.id);
            category_names.push(first);
            proportions.push(1.0);
        }
    }

    let enum_table: serde_json::Map<String, Value> = REGION_TYPES
        .iter()
        .map(|&(label, code)| (label.to_string(), json!(code)))
        .collect();

    let times: Vec<&Vec<f64>> = schools.iter().map(|s| &s.times).collect();
    let depths: Vec<&Vec<Vec<f64>>> = schools.iter().map(|s| &s.depths).collect();
    let min_depth: Vec<f64> = schools.iter().map(School::min_depth).collect();
    let max_depth: Vec<f64> = schools.iter().map(School::max_depth).collect();
    let start_time: Vec<f64> = schools.iter().map(|s| s.times[0]).collect();
    let end_time: Vec<f64> = schools.iter().map(|s| s.times[s.times.len() - 1]).collect();
    let ids: Vec<i64> = schools.iter().map(|s| s.id).collect();
    let names: Vec<String> = schools.iter().map(|s| format!("school {}", s.id)).collect();
    let type_codes: Vec<i64> = schools.iter().map(|s| s.type_code).collect();

    json!({
        "Interpretation/v1": {
            "mask_times": {
                "data": times,
                "attrs": {
                    "units": "milliseconds since 1601-01-01 00:00:00Z",
                    "calendar": "gregorian"
                }
            },
            "mask_depths": { "data": depths, "attrs": { "units": "m" } },
            "sound_speed": { "data": 1496.0, "attrs": { "units": "m/s" } },
            "min_depth": { "data": min_depth },
            "max_depth": { "data": max_depth },
            "start_time": { "data": start_time },
            "end_time": { "data": end_time },
            "region_id": { "data": ids },
            "region_name": { "data": names },
            "region_type": { "data": type_codes, "enum": enum_table },
            "region_category_ids": { "data": category_ids },
            "region_category_names": { "data": category_names },
            "region_category_proportions": { "data": proportions }
        }
    })
}

fn main() -> anyhow::Result<()> {
    let output = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("demo_mask.json"));

    let mut rng = SimpleRng(42);
    let mut schools = Vec::new();
    let mut ping = 0;
    for id in 1..=8 {
        ping += 10 + rng.below(30);
        let school = School::generate(id, ping, &mut rng);
        ping += school.times.len();
        schools.push(school);
    }

    let export = build_export(&schools, &mut rng);
    let text = serde_json::to_string_pretty(&export)?;
    std::fs::write(&output, text).with_context(|| format!("writing {}", output.display()))?;

    println!(
        "Wrote {} regions ({} pings) to {}",
        schools.len(),
        schools.iter().map(|s| s.times.len()).sum::<usize>(),
        output.display()
    );
    Ok(())
}
