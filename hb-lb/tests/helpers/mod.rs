//! Test helpers: timing-system data trees on disk

#![allow(dead_code)]

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const EVENT_ID: &str = "spring-cup";
pub const ROUND_ID: &str = "round-1";

/// A source root under a temp dir, populated through the builder methods
pub struct SourceFixture {
    pub dir: TempDir,
}

impl SourceFixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Should create temp dir"),
        }
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    pub fn event_dir(&self, event_id: &str) -> PathBuf {
        self.dir.path().join("events").join(event_id)
    }

    pub fn write_json(&self, path: &Path, value: &Value) {
        fs::create_dir_all(path.parent().expect("Path has parent")).expect("Should create dirs");
        fs::write(path, serde_json::to_vec_pretty(value).expect("Should serialize"))
            .expect("Should write fixture");
    }

    /// Event with one valid Race round
    pub fn write_event(&self, event_id: &str, name: &str, laps: u32, pilots: &[(&str, &str)]) {
        let dir = self.event_dir(event_id);
        self.write_json(
            &dir.join("Event.json"),
            &json!([{ "ID": event_id, "Name": name, "Laps": laps }]),
        );
        let pilots: Vec<Value> = pilots
            .iter()
            .map(|(id, name)| json!({ "ID": id, "Name": name, "PhotoPath": format!("pilots/{}.jpg", id) }))
            .collect();
        self.write_json(&dir.join("Pilots.json"), &Value::Array(pilots));
        self.write_json(
            &dir.join("Rounds.json"),
            &json!([{ "ID": ROUND_ID, "RoundNumber": 1, "EventType": "Race", "Valid": true }]),
        );
        self.write_json(
            &self.dir.path().join("httpfiles").join("Channels.json"),
            &json!([{ "ID": "ch-r1", "DisplayName": "R1" }, { "ID": "ch-f2", "DisplayName": "F2" }]),
        );
    }

    /// Race directory with the given per-pilot laps `(lap number, seconds)`
    pub fn write_race(
        &self,
        event_id: &str,
        race_dir: &str,
        race_number: i32,
        start_time: &str,
        pilots: &[(&str, &str, &[(i32, f64)])],
    ) {
        let mut laps = Vec::new();
        let mut detections = Vec::new();
        let mut channels = Vec::new();
        for (pilot_id, channel, pilot_laps) in pilots {
            channels.push(json!({ "Pilot": pilot_id, "Channel": channel }));
            for (number, seconds) in pilot_laps.iter() {
                let detection_id = format!("{}-d{}", pilot_id, number);
                detections.push(json!({ "ID": detection_id, "Pilot": pilot_id, "Valid": true }));
                laps.push(json!({
                    "ID": format!("{}-l{}", pilot_id, number),
                    "Detection": detection_id,
                    "LapNumber": number,
                    "LengthSeconds": seconds,
                    "StartTime": start_time,
                }));
            }
        }

        self.write_json(
            &self.event_dir(event_id).join(race_dir).join("Race.json"),
            &json!([{
                "ID": format!("{}-{}", event_id, race_dir),
                "Round": ROUND_ID,
                "RaceNumber": race_number,
                "Valid": true,
                "Laps": laps,
                "Detections": detections,
                "PilotChannels": channels,
            }]),
        );
    }

    /// Event with one race: pilot A flies a holeshot and four laps, pilot B
    /// two laps without a holeshot
    pub fn two_pilot_event() -> Self {
        let fixture = Self::new();
        fixture.write_event(EVENT_ID, "Spring Cup", 3, &[("pa", "Alpha"), ("pb", "Bravo")]);
        fixture.write_race(
            EVENT_ID,
            "race-01",
            1,
            "2024-05-01T10:00:00",
            &[
                ("pa", "ch-r1", &[(0, 2.0), (1, 28.0), (2, 27.0), (3, 27.5), (4, 29.0)]),
                ("pb", "ch-f2", &[(1, 30.0), (2, 31.0)]),
            ],
        );
        fixture
    }
}

/// Settings pointing at `root` with a specific event selected
pub fn settings_for(root: &Path, event_id: &str) -> hb_common::Settings {
    hb_common::Settings {
        source_root_path: root.to_path_buf(),
        selected_event_id: event_id.to_string(),
        ..hb_common::Settings::default()
    }
}
