//! Fixtures shared by the unit tests.

use std::{
    fs,
    path::{Path, PathBuf},
};

use super::bus::SLAVE_LIST_FILE;
use super::thermometer::TEMPERATURE_FILE;

pub const GOOD_CRC_LINE: &str = "39 01 4b 46 7f ff 07 10 8d : crc=8d YES";
pub const BAD_CRC_LINE: &str = "39 01 4b 46 7f ff 07 10 8d : crc=8c NO";

/// Path of a checked-in bus master under `tests/data/thermo`.
pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data/thermo")
        .join(name)
}

/// Writes a bus master with the given `(serial, w1_slave contents)` devices,
/// listing them in order in `w1_master_slaves`. Existing files are replaced.
pub fn write_bus(root: &Path, devices: &[(&str, &str)]) {
    let mut slaves = String::new();
    for (serial, reading) in devices {
        let dir = root.join(serial);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(TEMPERATURE_FILE), reading).unwrap();
        slaves.push_str(serial);
        slaves.push('\n');
    }
    fs::write(root.join(SLAVE_LIST_FILE), slaves).unwrap();
}

/// `w1_slave` contents reporting `millis` with a good CRC.
pub fn good_reading(millis: i64) -> String {
    format!("{}\n39 01 4b 46 7f ff 07 10 8d t={}\n", GOOD_CRC_LINE, millis)
}

/// `w1_slave` contents with a failed CRC.
pub fn bad_reading() -> String {
    format!("{}\n39 01 4b 46 7f ff 07 10 8d t=19562\n", BAD_CRC_LINE)
}
