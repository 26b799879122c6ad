use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Deserialize;

#[derive(Deserialize)]
struct PlatformsFile {
    known: Vec<String>,
    groups: BTreeMap<String, Vec<String>>,
}

fn split_pair(pair: &str) -> (&str, &str) {
    match pair.split_once('/') {
        Some((os, arch)) if !os.is_empty() && !arch.is_empty() && !arch.contains('/') => {
            (os, arch)
        }
        _ => panic!("malformed os/arch pair in platforms.json: {pair:?}"),
    }
}

fn main() {
    let platforms_path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("data")
        .join("platforms.json");

    println!(
        "cargo:rerun-if-changed={}",
        platforms_path.canonicalize().unwrap().display()
    );

    let contents = fs::read_to_string(&platforms_path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", platforms_path.display()));

    let data: PlatformsFile = serde_json::from_str(&contents)
        .unwrap_or_else(|e| panic!("failed to parse platforms.json: {e}"));

    for (name, members) in &data.groups {
        if name == "all" {
            panic!("group name `all` is reserved for the dynamic platform list");
        }
        for pair in members {
            if !data.known.contains(pair) {
                panic!("group {name} references unknown platform {pair}");
            }
        }
    }

    let out_dir = env::var("OUT_DIR").unwrap();
    let out_path = Path::new(&out_dir).join("platforms_generated.rs");
    let mut out = fs::File::create(&out_path).unwrap();

    writeln!(out, "// Generated by build.rs from data/platforms.json. Do not edit.").unwrap();
    writeln!(out).unwrap();

    // Every os/arch pair `go tool dist list` knows about.
    writeln!(out, "pub static KNOWN_PLATFORMS: &[(&str, &str)] = &[").unwrap();
    for pair in &data.known {
        let (os, arch) = split_pair(pair);
        writeln!(out, "    ({os:?}, {arch:?}),").unwrap();
    }
    writeln!(out, "];").unwrap();
    writeln!(out).unwrap();

    // Named groups, sorted by name.
    writeln!(
        out,
        "pub static PLATFORM_GROUPS: &[(&str, &[(&str, &str)])] = &["
    )
    .unwrap();
    for (name, members) in &data.groups {
        let pairs: Vec<String> = members
            .iter()
            .map(|pair| {
                let (os, arch) = split_pair(pair);
                format!("({os:?}, {arch:?})")
            })
            .collect();
        writeln!(out, "    ({name:?}, &[{}]),", pairs.join(", ")).unwrap();
    }
    writeln!(out, "];").unwrap();
}
