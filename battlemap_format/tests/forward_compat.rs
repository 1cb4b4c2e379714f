// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Loading data written by newer or damaged writers.

use battlemap_format::{FormatError, Persist, TokenReader, TokenWriter, from_str, to_string};

#[derive(Debug, PartialEq)]
struct Room {
    name: String,
    doors: Vec<f64>,
}

impl Persist for Room {
    fn serialize(&self, w: &mut TokenWriter) {
        w.begin_object();
        w.write_str(&self.name);
        self.doors.serialize(w);
        w.end_object();
    }

    fn deserialize(r: &mut TokenReader<'_>) -> Result<Self, FormatError> {
        r.expect_object_begin()?;
        let name = r.read_string()?;
        let doors = Vec::deserialize(r)?;
        r.expect_object_end()?;
        Ok(Self { name, doors })
    }
}

#[test]
fn damaged_room_does_not_lose_the_others() {
    let rooms = vec![
        Room {
            name: "hall".into(),
            doors: vec![1.0, 2.0],
        },
        Room {
            name: "vault".into(),
            doors: vec![],
        },
        Room {
            name: "crypt".into(),
            doors: vec![9.5],
        },
    ];
    let text = to_string(&rooms);
    // Break the second room's name so its object cannot be read.
    let damaged = text.replace("\"vault\"", "12");
    let loaded: Vec<Room> = from_str(&damaged).unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0], rooms[0]);
    assert_eq!(loaded[1], rooms[2]);
}

#[test]
fn newer_fields_are_ignored_at_every_level() {
    let text = "[\n{\n\"hall\"\n[\n1\n]\n{\n\"lighting\"\n0.5\n}\n[\n]\n}\n]\n";
    let loaded: Vec<Room> = from_str(text).unwrap();
    assert_eq!(
        loaded,
        vec![Room {
            name: "hall".into(),
            doors: vec![1.0],
        }]
    );
}
